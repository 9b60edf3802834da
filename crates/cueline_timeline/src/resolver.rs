// SPDX-License-Identifier: MIT OR Apache-2.0
//! Resolution of timed elements into absolute instances.

use crate::cache::{InstanceFingerprint, ResolverCache};
use crate::element::{ElementId, EnableSpec, LayerId, Time, TimeExpr, TimedElement};
use crate::expression::{Expression, ReferenceProperty, SyntaxError, Unresolvable};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Concrete timing of one instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInstance {
    /// Start time, never negative
    pub start: Time,
    /// End time (`None` when open-ended)
    pub end: Option<Time>,
    /// Duration (`None` when open-ended)
    pub duration: Option<Time>,
    /// Elements named by this element's enable
    pub direct_references: BTreeSet<ElementId>,
    /// Elements this element depends on, directly or not
    pub transitive_references: BTreeSet<ElementId>,
}

/// A resolved element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedObject {
    /// Element ID
    pub id: ElementId,
    /// Element layer
    pub layer: LayerId,
    /// Whether the enable declared several instances
    pub multi_instance: bool,
    /// Instances in declaration order
    pub instances: Vec<ResolvedInstance>,
}

impl ResolvedObject {
    /// The first (for single enables, the only) instance
    pub fn instance(&self) -> Option<&ResolvedInstance> {
        self.instances.first()
    }
}

/// Absolute timing of every element in a timeline
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedTimeline {
    /// Resolved elements in input order
    pub objects: IndexMap<ElementId, ResolvedObject>,
    /// Element IDs per layer, in input order
    pub layers: IndexMap<LayerId, Vec<ElementId>>,
}

impl ResolvedTimeline {
    /// Get a resolved element
    pub fn object(&self, id: &ElementId) -> Option<&ResolvedObject> {
        self.objects.get(id)
    }

    /// Get the first instance of an element
    pub fn instance(&self, id: &ElementId) -> Option<&ResolvedInstance> {
        self.objects.get(id)?.instance()
    }

    /// Start of the first instance of an element
    pub fn start_of(&self, id: &ElementId) -> Option<Time> {
        self.instance(id).map(|i| i.start)
    }

    /// Number of resolved elements
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the timeline has no elements
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Layer display settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    /// Display name of the layer
    pub layer_name: String,
}

/// Layer mappings by layer ID
pub type Mappings = IndexMap<LayerId, Mapping>;

/// Resolve `elements` against `anchor` (the value of `now`).
///
/// The cache only affects speed; results are identical with a cold cache.
pub fn resolve(
    elements: &[TimedElement],
    anchor: Time,
    cache: &mut ResolverCache,
) -> Result<ResolvedTimeline, ResolveError> {
    let mut by_id: IndexMap<&ElementId, &TimedElement> = IndexMap::with_capacity(elements.len());
    for element in elements {
        if by_id.insert(&element.id, element).is_some() {
            return Err(ResolveError::DuplicateElement(element.id.clone()));
        }
    }

    // Parse every expression up front so missing references surface before cycles.
    let mut parsed: HashMap<&ElementId, Vec<ParsedSpec>> = HashMap::with_capacity(elements.len());
    let mut references: HashMap<&ElementId, BTreeSet<ElementId>> = HashMap::with_capacity(elements.len());
    for element in elements {
        let mut specs = Vec::with_capacity(element.enable.specs().len());
        let mut refs = BTreeSet::new();
        for spec in element.enable.specs() {
            let parsed_spec = ParsedSpec::parse(element, spec, cache)?;
            for (text, expression) in parsed_spec.expressions() {
                for referenced in expression.references() {
                    if !by_id.contains_key(&referenced) {
                        return Err(ResolveError::UnresolvableExpression {
                            element: element.id.clone(),
                            expression: text.to_string(),
                            reason: Unresolvable::MissingElement(referenced),
                        });
                    }
                    refs.insert(referenced);
                }
            }
            specs.push(parsed_spec);
        }
        parsed.insert(&element.id, specs);
        references.insert(&element.id, refs);
    }

    let order = topological_order(&by_id, &references)?;

    let mut objects: HashMap<ElementId, ResolvedObject> = HashMap::with_capacity(elements.len());
    for id in order {
        let element = by_id[id];
        let refs = &references[id];

        let fingerprint = InstanceFingerprint {
            enable: element.enable.clone(),
            anchor,
            inputs: refs
                .iter()
                .map(|r| (r.clone(), objects.get(r).and_then(|o| o.instance()).cloned()))
                .collect(),
        };

        let instances = match cache.instances(id, &fingerprint) {
            Some(instances) => instances,
            None => {
                let instances = evaluate_element(element, &parsed[id], refs, anchor, &objects)?;
                cache.store_instances(id.clone(), fingerprint, instances.clone());
                instances
            }
        };

        objects.insert(
            id.clone(),
            ResolvedObject {
                id: id.clone(),
                layer: element.layer.clone(),
                multi_instance: element.enable.is_multiple(),
                instances,
            },
        );
    }

    let mut resolved = ResolvedTimeline::default();
    for element in elements {
        if let Some(object) = objects.remove(&element.id) {
            resolved
                .layers
                .entry(element.layer.clone())
                .or_default()
                .push(element.id.clone());
            resolved.objects.insert(element.id.clone(), object);
        }
    }

    let stats = cache.stats();
    tracing::trace!(
        elements = elements.len(),
        anchor,
        cache_hits = stats.hits,
        cache_misses = stats.misses,
        "resolved timeline"
    );

    Ok(resolved)
}

/// Latest point of the timeline: the latest end, where open-ended
/// instances count by their start
pub fn total_duration(resolved: &ResolvedTimeline) -> Time {
    resolved
        .objects
        .values()
        .flat_map(|o| o.instances.iter())
        .map(|i| i.end.unwrap_or(i.start))
        .max()
        .unwrap_or(0)
}

/// Layers ordered by their mapped display name.
///
/// Unmapped layers sort as an empty name; equal names keep timeline order.
pub fn sorted_layers<'a>(
    resolved: &'a ResolvedTimeline,
    mappings: &Mappings,
) -> Vec<(&'a LayerId, &'a [ElementId])> {
    let mut layers: Vec<(&LayerId, &[ElementId])> = resolved
        .layers
        .iter()
        .map(|(layer, ids)| (layer, ids.as_slice()))
        .collect();
    let name = |layer: &LayerId| mappings.get(layer).map_or("", |m| m.layer_name.as_str());
    layers.sort_by(|a, b| name(a.0).cmp(name(b.0)));
    layers
}

struct ParsedSpec {
    start: (String, Option<Arc<Expression>>, Option<Time>),
    duration: Option<(String, Option<Arc<Expression>>, Option<Time>)>,
}

impl ParsedSpec {
    fn parse(
        element: &TimedElement,
        spec: &EnableSpec,
        cache: &mut ResolverCache,
    ) -> Result<Self, ResolveError> {
        let mut part = |value: &TimeExpr| match value {
            TimeExpr::Millis(ms) => Ok((ms.to_string(), None, Some(*ms))),
            TimeExpr::Expression(text) => cache
                .parse(&element.id, text)
                .map(|e| (text.clone(), Some(e), None))
                .map_err(|source| ResolveError::ExpressionSyntax {
                    element: element.id.clone(),
                    expression: text.clone(),
                    source,
                }),
        };
        let start = part(&spec.start)?;
        let duration = match &spec.duration {
            Some(duration) => Some(part(duration)?),
            None => None,
        };
        Ok(Self { start, duration })
    }

    fn expressions(&self) -> impl Iterator<Item = (&str, &Expression)> {
        std::iter::once(&self.start)
            .chain(self.duration.as_ref())
            .filter_map(|(text, expression, _)| expression.as_deref().map(|e| (text.as_str(), e)))
    }
}

fn evaluate_element(
    element: &TimedElement,
    specs: &[ParsedSpec],
    refs: &BTreeSet<ElementId>,
    anchor: Time,
    objects: &HashMap<ElementId, ResolvedObject>,
) -> Result<Vec<ResolvedInstance>, ResolveError> {
    let lookup = |id: &ElementId, property: ReferenceProperty| -> Result<Time, Unresolvable> {
        let instance = objects
            .get(id)
            .and_then(ResolvedObject::instance)
            .ok_or_else(|| Unresolvable::MissingElement(id.clone()))?;
        match property {
            ReferenceProperty::Start => Ok(instance.start),
            ReferenceProperty::End => instance.end.ok_or_else(|| Unresolvable::OpenEnded(id.clone())),
            ReferenceProperty::Duration => instance
                .duration
                .ok_or_else(|| Unresolvable::OpenEnded(id.clone())),
        }
    };

    let evaluate = |(text, expression, literal): &(String, Option<Arc<Expression>>, Option<Time>)| {
        match (expression, literal) {
            (Some(expression), _) => {
                expression
                    .evaluate(anchor, &lookup)
                    .map_err(|reason| ResolveError::UnresolvableExpression {
                        element: element.id.clone(),
                        expression: text.clone(),
                        reason,
                    })
            }
            (None, Some(ms)) => Ok(*ms),
            (None, None) => Ok(0),
        }
    };

    let mut transitive = refs.clone();
    for r in refs {
        if let Some(instance) = objects.get(r).and_then(ResolvedObject::instance) {
            transitive.extend(instance.transitive_references.iter().cloned());
        }
    }

    let mut instances = Vec::with_capacity(specs.len());
    for spec in specs {
        let start = evaluate(&spec.start)?.max(0);
        let (duration, end) = match &spec.duration {
            Some(duration) => {
                let d = evaluate(duration)?.max(0);
                let end = start
                    .checked_add(d)
                    .ok_or_else(|| ResolveError::UnresolvableExpression {
                        element: element.id.clone(),
                        expression: duration.0.clone(),
                        reason: Unresolvable::NotFinite,
                    })?;
                (Some(d), Some(end))
            }
            None => (None, None),
        };
        instances.push(ResolvedInstance {
            start,
            end,
            duration,
            direct_references: refs.clone(),
            transitive_references: transitive.clone(),
        });
    }
    Ok(instances)
}

/// Order elements so every element comes after the elements it references
fn topological_order<'a>(
    by_id: &IndexMap<&'a ElementId, &'a TimedElement>,
    references: &HashMap<&ElementId, BTreeSet<ElementId>>,
) -> Result<Vec<&'a ElementId>, ResolveError> {
    let mut visited = HashSet::new();
    let mut stack = Vec::new();
    let mut order = Vec::with_capacity(by_id.len());

    for id in by_id.keys() {
        if !visited.contains(*id) {
            visit(*id, by_id, references, &mut visited, &mut stack, &mut order)?;
        }
    }

    Ok(order)
}

fn visit<'a>(
    id: &'a ElementId,
    by_id: &IndexMap<&'a ElementId, &'a TimedElement>,
    references: &HashMap<&ElementId, BTreeSet<ElementId>>,
    visited: &mut HashSet<&'a ElementId>,
    stack: &mut Vec<&'a ElementId>,
    order: &mut Vec<&'a ElementId>,
) -> Result<(), ResolveError> {
    if let Some(pos) = stack.iter().position(|s| *s == id) {
        let cycle = stack[pos..].iter().map(|s| (*s).clone()).collect();
        return Err(ResolveError::CyclicReference { cycle });
    }
    if visited.contains(id) {
        return Ok(());
    }

    stack.push(id);
    if let Some(refs) = references.get(id) {
        for referenced in refs {
            if let Some((key, _)) = by_id.get_key_value(referenced) {
                visit(*key, by_id, references, visited, stack, order)?;
            }
        }
    }
    stack.pop();

    visited.insert(id);
    order.push(id);
    Ok(())
}

fn display_cycle(cycle: &[ElementId]) -> String {
    let mut out: Vec<String> = cycle.iter().map(|id| format!("#{id}")).collect();
    if let Some(first) = cycle.first() {
        out.push(format!("#{first}"));
    }
    out.join(" -> ")
}

/// Error during timeline resolution
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    /// Elements reference each other in a loop
    #[error("Cyclic reference: {}", display_cycle(.cycle))]
    CyclicReference {
        /// Elements on the cycle, in discovery order
        cycle: Vec<ElementId>,
    },

    /// An expression cannot produce a value
    #[error("Cannot resolve '{expression}' on #{element}: {reason}")]
    UnresolvableExpression {
        /// Element carrying the expression
        element: ElementId,
        /// Expression text
        expression: String,
        /// Why
        reason: Unresolvable,
    },

    /// An expression could not be parsed
    #[error("Invalid expression '{expression}' on #{element}: {source}")]
    ExpressionSyntax {
        /// Element carrying the expression
        element: ElementId,
        /// Expression text
        expression: String,
        /// Parser error
        source: SyntaxError,
    },

    /// Two elements share an ID
    #[error("Duplicate element id #{0}")]
    DuplicateElement(ElementId),
}
