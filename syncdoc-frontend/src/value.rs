use std::collections::HashMap;
use syncdoc_protocol::{DataType, MapType, ScalarValue, SequenceType};
use unicode_segmentation::UnicodeSegmentation;

/// A materialized view of (part of) a document. Text objects are
/// sequences whose elements are single-grapheme strings.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Map(HashMap<String, Value>, MapType),
    Sequence(Vec<Value>, SequenceType),
    Primitive(ScalarValue, Option<DataType>),
}

impl Value {
    pub fn map(entries: HashMap<String, Value>) -> Value {
        Value::Map(entries, MapType::Map)
    }

    pub fn table(entries: HashMap<String, Value>) -> Value {
        Value::Map(entries, MapType::Table)
    }

    pub fn list(elements: Vec<Value>) -> Value {
        Value::Sequence(elements, SequenceType::List)
    }

    /// A text object: one element per grapheme of `content`.
    pub fn text(content: &str) -> Value {
        Value::Sequence(
            content
                .graphemes(true)
                .map(|grapheme| Value::Primitive(ScalarValue::Str(grapheme.to_string()), None))
                .collect(),
            SequenceType::Text,
        )
    }

    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), Value::from_json(value)))
                    .collect(),
                MapType::Map,
            ),
            serde_json::Value::Array(elements) => Value::Sequence(
                elements.iter().map(Value::from_json).collect(),
                SequenceType::List,
            ),
            serde_json::Value::String(s) => {
                Value::Primitive(ScalarValue::Str(s.to_string()), None)
            }
            serde_json::Value::Number(n) => {
                Value::Primitive(ScalarValue::Number(n.as_f64().unwrap_or(0.0)), None)
            }
            serde_json::Value::Bool(b) => Value::Primitive(ScalarValue::Boolean(*b), None),
            serde_json::Value::Null => Value::Primitive(ScalarValue::Null, None),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Map(entries, _) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            Value::Sequence(elements, SequenceType::Text) => {
                let mut content = String::new();
                for element in elements {
                    if let Value::Primitive(ScalarValue::Str(grapheme), _) = element {
                        content.push_str(grapheme);
                    }
                }
                serde_json::Value::String(content)
            }
            Value::Sequence(elements, SequenceType::List) => {
                serde_json::Value::Array(elements.iter().map(Value::to_json).collect())
            }
            Value::Primitive(ScalarValue::Str(s), _) => serde_json::Value::String(s.clone()),
            Value::Primitive(ScalarValue::Number(n), _) => serde_json::Value::Number(
                serde_json::Number::from_f64(*n).unwrap_or_else(|| serde_json::Number::from(0)),
            ),
            Value::Primitive(ScalarValue::Boolean(b), _) => serde_json::Value::Bool(*b),
            Value::Primitive(ScalarValue::Null, _) => serde_json::Value::Null,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Primitive(ScalarValue::Str(s.to_string()), None)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Primitive(ScalarValue::Number(n), None)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Primitive(ScalarValue::Number(n as f64), None)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Primitive(ScalarValue::Boolean(b), None)
    }
}
