//! Semantic value kinds
//!
//! Typed properties are declared with one of a closed set of kinds. A value
//! is classified by a single function applying a fixed, ordered list of
//! rules, most specific first:
//!
//! 1. sequence
//! 2. date
//! 3. boolean
//! 4. text
//! 5. number
//! 6. callable
//! 7. record or instance (structured object)
//!
//! Null has no kind.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Semantic kind of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Text
    Text,
    /// Number
    Number,
    /// Boolean
    Boolean,
    /// Date
    Date,
    /// Ordered sequence
    Sequence,
    /// Structured object (record or instance)
    Object,
    /// Callable
    Callable,
}

/// Injectable kind classification function
pub type KindDetector = Rc<dyn Fn(&Value) -> Option<ValueKind>>;

impl ValueKind {
    /// Classify a value
    pub fn of(value: &Value) -> Option<ValueKind> {
        match value {
            Value::Sequence(_) => Some(ValueKind::Sequence),
            Value::Date(_) => Some(ValueKind::Date),
            Value::Bool(_) => Some(ValueKind::Boolean),
            Value::Text(_) => Some(ValueKind::Text),
            Value::Number(_) => Some(ValueKind::Number),
            Value::Function(_) => Some(ValueKind::Callable),
            Value::Record(_) | Value::Instance(_) => Some(ValueKind::Object),
            Value::Null => None,
        }
    }

    /// Check whether a value has exactly this kind
    pub fn matches(self, value: &Value) -> bool {
        Self::of(value) == Some(self)
    }

    /// The default detector, wrapping [`ValueKind::of`]
    pub fn detector() -> KindDetector {
        Rc::new(ValueKind::of)
    }

    /// Kind name
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Text => "text",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Date => "date",
            ValueKind::Sequence => "sequence",
            ValueKind::Object => "object",
            ValueKind::Callable => "callable",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
