// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timed elements and their enable expressions.

use crate::content::ElementContent;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Time in milliseconds
pub type Time = i64;

/// Identifier of a timed element, unique within a part's timeline
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementId(pub String);

impl ElementId {
    /// Create an element ID from text
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identifier of a playout layer
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LayerId(pub String);

impl LayerId {
    /// Create a layer ID from text
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A start or duration value: either literal milliseconds or an expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeExpr {
    /// Literal milliseconds
    Millis(Time),
    /// Expression text, e.g. `#intro.end + 500`
    Expression(String),
}

impl TimeExpr {
    /// Create an expression value
    pub fn expr(text: impl Into<String>) -> Self {
        Self::Expression(text.into())
    }

    /// Literal value, if this is not an expression
    pub fn as_millis(&self) -> Option<Time> {
        match self {
            Self::Millis(ms) => Some(*ms),
            Self::Expression(_) => None,
        }
    }
}

impl fmt::Display for TimeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Millis(ms) => write!(f, "{ms}"),
            Self::Expression(text) => f.write_str(text),
        }
    }
}

impl From<Time> for TimeExpr {
    fn from(ms: Time) -> Self {
        Self::Millis(ms)
    }
}

impl From<i32> for TimeExpr {
    fn from(ms: i32) -> Self {
        Self::Millis(Time::from(ms))
    }
}

impl From<&str> for TimeExpr {
    fn from(text: &str) -> Self {
        Self::expr(text)
    }
}

/// Start and duration of one instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnableSpec {
    /// When the instance starts
    pub start: TimeExpr,
    /// How long it lasts (`None` is open-ended)
    #[serde(default)]
    pub duration: Option<TimeExpr>,
}

impl EnableSpec {
    /// Create a spec from a start and a duration
    pub fn new(start: impl Into<TimeExpr>, duration: impl Into<TimeExpr>) -> Self {
        Self {
            start: start.into(),
            duration: Some(duration.into()),
        }
    }

    /// Create an open-ended spec
    pub fn open_ended(start: impl Into<TimeExpr>) -> Self {
        Self {
            start: start.into(),
            duration: None,
        }
    }
}

/// When an element is enabled
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Enable {
    /// A single instance
    Single(EnableSpec),
    /// Several alternative instances
    Multiple(Vec<EnableSpec>),
}

impl Enable {
    /// Whether this enable describes more than one instance
    pub fn is_multiple(&self) -> bool {
        matches!(self, Self::Multiple(_))
    }

    /// The single spec, if this is not a multi-instance enable
    pub fn single(&self) -> Option<&EnableSpec> {
        match self {
            Self::Single(spec) => Some(spec),
            Self::Multiple(_) => None,
        }
    }

    /// All specs in declaration order
    pub fn specs(&self) -> &[EnableSpec] {
        match self {
            Self::Single(spec) => std::slice::from_ref(spec),
            Self::Multiple(specs) => specs,
        }
    }
}

impl From<EnableSpec> for Enable {
    fn from(spec: EnableSpec) -> Self {
        Self::Single(spec)
    }
}

/// A timed playout element inside a part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedElement {
    /// Element ID
    pub id: ElementId,
    /// Layer the element plays on
    pub layer: LayerId,
    /// Timing
    pub enable: Enable,
    /// Device content
    #[serde(default)]
    pub content: ElementContent,
}

impl TimedElement {
    /// Create an element without device content
    pub fn new(id: impl Into<String>, layer: impl Into<String>, enable: impl Into<Enable>) -> Self {
        Self {
            id: ElementId::new(id),
            layer: LayerId::new(layer),
            enable: enable.into(),
            content: ElementContent::default(),
        }
    }

    /// Set the content
    pub fn with_content(mut self, content: ElementContent) -> Self {
        self.content = content;
        self
    }

    /// Replace the start of a single-instance enable, keeping its duration.
    /// Returns false for multi-instance enables, which are left untouched.
    pub fn set_start(&mut self, start: TimeExpr) -> bool {
        match &mut self.enable {
            Enable::Single(spec) => {
                spec.start = start;
                true
            }
            Enable::Multiple(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_start_keeps_duration() {
        let mut element = TimedElement::new("a", "l", EnableSpec::new(100, "#b.duration"));
        assert!(element.set_start(TimeExpr::Millis(400)));

        let spec = element.enable.single().unwrap();
        assert_eq!(spec.start, TimeExpr::Millis(400));
        assert_eq!(spec.duration, Some(TimeExpr::expr("#b.duration")));
    }

    #[test]
    fn test_set_start_ignores_multiple() {
        let mut element = TimedElement::new(
            "a",
            "l",
            Enable::Multiple(vec![EnableSpec::new(0, 10), EnableSpec::new(20, 10)]),
        );
        assert!(!element.set_start(TimeExpr::Millis(5)));
        assert_eq!(element.enable.specs()[0].start, TimeExpr::Millis(0));
    }

    #[test]
    fn test_load_from_ron() {
        let text = r##"(
            id: ("lower-third"),
            layer: ("ccg-2"),
            enable: Single((start: Expression("#intro.end + 500"), duration: Some(Millis(4000)))),
        )"##;
        let element: TimedElement = ron::from_str(text).unwrap();
        assert_eq!(element.id.as_str(), "lower-third");
        assert_eq!(element.enable, Enable::Single(EnableSpec::new("#intro.end + 500", 4000)));
        assert_eq!(element.content, ElementContent::Abstract);
    }

    #[test]
    fn test_time_expr_display() {
        assert_eq!(TimeExpr::Millis(250).to_string(), "250");
        assert_eq!(TimeExpr::expr("#x.end").to_string(), "#x.end");
    }
}
