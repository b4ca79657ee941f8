use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The object id of the document root.
pub const ROOT_ID_STR: &str = "00000000-0000-0000-0000-000000000000";

/// Identifies an object (map, table, list or text) within a document.
/// Every id other than the root is a string that must be unique within
/// the document; in practice mutation sessions mint v4 uuids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectId {
    Root,
    Id(String),
}

impl ObjectId {
    pub fn is_root(&self) -> bool {
        matches!(self, ObjectId::Root)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ObjectId::Root => write!(f, "{}", ROOT_ID_STR),
            ObjectId::Id(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for ObjectId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ROOT_ID_STR {
            Ok(ObjectId::Root)
        } else {
            Ok(ObjectId::Id(s.to_string()))
        }
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        s.parse().unwrap()
    }
}

impl Serialize for ObjectId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().unwrap())
    }
}
