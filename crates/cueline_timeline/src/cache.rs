// SPDX-License-Identifier: MIT OR Apache-2.0
//! Caller-owned memo for timeline resolution.
//!
//! A miss is always safe: every entry can be recomputed from the elements.

use crate::element::{ElementId, Enable, Time};
use crate::expression::{Expression, SyntaxError};
use crate::resolver::ResolvedInstance;
use std::collections::HashMap;
use std::sync::Arc;

/// Default number of entries kept before the cache is flushed
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that had to be computed
    pub misses: u64,
    /// Entries currently stored
    pub size: usize,
}

impl CacheStats {
    /// Fraction of lookups answered from the cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Everything an element's resolved instances depend on
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InstanceFingerprint {
    pub enable: Enable,
    pub anchor: Time,
    /// First instance of each directly referenced element, in id order
    pub inputs: Vec<(ElementId, Option<ResolvedInstance>)>,
}

#[derive(Debug, Clone)]
struct CachedInstances {
    fingerprint: InstanceFingerprint,
    instances: Vec<ResolvedInstance>,
}

/// Memo of parsed expressions and resolved instances
#[derive(Debug, Clone)]
pub struct ResolverCache {
    expressions: HashMap<(ElementId, String), Arc<Expression>>,
    instances: HashMap<ElementId, CachedInstances>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl ResolverCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Create an empty cache that flushes after `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            expressions: HashMap::new(),
            instances: HashMap::new(),
            capacity: capacity.max(1),
            hits: 0,
            misses: 0,
        }
    }

    /// Drop every entry (counters are kept)
    pub fn clear(&mut self) {
        self.expressions.clear();
        self.instances.clear();
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.expressions.len() + self.instances.len()
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            size: self.len(),
        }
    }

    fn make_room(&mut self) {
        if self.len() >= self.capacity {
            tracing::debug!(entries = self.len(), "resolver cache full, flushing");
            self.clear();
        }
    }

    /// Parse `text` for `element`, reusing an earlier parse when possible
    pub(crate) fn parse(
        &mut self,
        element: &ElementId,
        text: &str,
    ) -> Result<Arc<Expression>, SyntaxError> {
        let key = (element.clone(), text.to_string());
        if let Some(expression) = self.expressions.get(&key) {
            self.hits += 1;
            return Ok(Arc::clone(expression));
        }
        self.misses += 1;

        let expression = Arc::new(Expression::parse(text)?);
        self.make_room();
        self.expressions.insert(key, Arc::clone(&expression));
        Ok(expression)
    }

    /// Instances computed earlier from identical inputs
    pub(crate) fn instances(
        &mut self,
        element: &ElementId,
        fingerprint: &InstanceFingerprint,
    ) -> Option<Vec<ResolvedInstance>> {
        match self.instances.get(element) {
            Some(cached) if cached.fingerprint == *fingerprint => {
                self.hits += 1;
                Some(cached.instances.clone())
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    /// Remember the instances computed for `element`
    pub(crate) fn store_instances(
        &mut self,
        element: ElementId,
        fingerprint: InstanceFingerprint,
        instances: Vec<ResolvedInstance>,
    ) {
        if !self.instances.contains_key(&element) {
            self.make_room();
        }
        self.instances.insert(
            element,
            CachedInstances {
                fingerprint,
                instances,
            },
        );
    }
}

impl Default for ResolverCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_memoized() {
        let mut cache = ResolverCache::new();
        let id = ElementId::new("a");

        cache.parse(&id, "#b.end").unwrap();
        cache.parse(&id, "#b.end").unwrap();

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn test_parse_error_not_stored() {
        let mut cache = ResolverCache::new();
        assert!(cache.parse(&ElementId::new("a"), "#b.").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_flushes() {
        let mut cache = ResolverCache::with_capacity(2);
        let id = ElementId::new("a");
        cache.parse(&id, "1").unwrap();
        cache.parse(&id, "2").unwrap();
        cache.parse(&id, "3").unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            size: 0,
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
