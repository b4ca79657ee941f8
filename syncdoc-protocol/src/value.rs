use crate::ObjectId;
use serde::{Deserialize, Serialize};

/// A primitive value stored in a register.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ScalarValue {
    Str(String),
    Number(f64),
    Boolean(bool),
    Null,
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::Str(s.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        ScalarValue::Str(s)
    }
}

impl From<f64> for ScalarValue {
    fn from(n: f64) -> Self {
        ScalarValue::Number(n)
    }
}

impl From<i64> for ScalarValue {
    fn from(n: i64) -> Self {
        ScalarValue::Number(n as f64)
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        ScalarValue::Boolean(b)
    }
}

/// The only interpreted datatype: milliseconds since the unix epoch.
/// Deserializing any other tag fails, so changes from a future version
/// are rejected rather than silently misread.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Timestamp,
}

/// The value carried by a diff or a conflict: either a primitive or a
/// reference to another object in the document. References serialize as
/// `"value": <objectId>, "link": true`.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Primitive(ScalarValue),
    Link(ObjectId),
}

impl ElementValue {
    pub fn is_link(&self) -> bool {
        matches!(self, ElementValue::Link(_))
    }

    pub fn link_target(&self) -> Option<&ObjectId> {
        match self {
            ElementValue::Primitive(_) => None,
            ElementValue::Link(object_id) => Some(object_id),
        }
    }
}

impl From<ScalarValue> for ElementValue {
    fn from(value: ScalarValue) -> Self {
        ElementValue::Primitive(value)
    }
}
