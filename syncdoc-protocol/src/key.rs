use crate::error::InvalidElementId;
use crate::ElementId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The key of an assignment operation: a map key for map and table
/// objects, or the string form of an element id for lists and texts.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Key(pub String);

impl Key {
    pub fn head() -> Key {
        Key("_head".to_string())
    }

    pub fn as_element_id(&self) -> Result<ElementId, InvalidElementId> {
        ElementId::from_str(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key(s)
    }
}

impl From<&ElementId> for Key {
    fn from(elem_id: &ElementId) -> Self {
        elem_id.as_key()
    }
}
