use crate::{DataType, ElementId, Key, ObjectId, ScalarValue};
use serde::{Deserialize, Serialize};

/// The wire tag for the type of an object, as it appears in diffs.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ObjType {
    Map,
    Table,
    List,
    Text,
}

impl ObjType {
    pub fn is_sequence(self) -> bool {
        matches!(self, ObjType::List | ObjType::Text)
    }
}

/// Tables are maps with unordered row keys; both share the map machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapType {
    Map,
    Table,
}

/// Text objects are lists of single-grapheme strings; both share the
/// sequence machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceType {
    List,
    Text,
}

impl From<MapType> for ObjType {
    fn from(map_type: MapType) -> Self {
        match map_type {
            MapType::Map => ObjType::Map,
            MapType::Table => ObjType::Table,
        }
    }
}

impl From<SequenceType> for ObjType {
    fn from(seq_type: SequenceType) -> Self {
        match seq_type {
            SequenceType::List => ObjType::List,
            SequenceType::Text => ObjType::Text,
        }
    }
}

/// One primitive edit. Creation ops mint a fresh object, `ins` adds a
/// position to a sequence (without making it visible), and the three
/// assignment ops write to a field register. An unknown `action` tag
/// fails deserialization.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "action")]
pub enum Operation {
    #[serde(rename = "makeMap")]
    MakeMap { obj: ObjectId },
    #[serde(rename = "makeTable")]
    MakeTable { obj: ObjectId },
    #[serde(rename = "makeList")]
    MakeList { obj: ObjectId },
    #[serde(rename = "makeText")]
    MakeText { obj: ObjectId },
    #[serde(rename = "ins")]
    Insert {
        obj: ObjectId,
        key: ElementId,
        elem: u32,
    },
    #[serde(rename = "set")]
    Set {
        obj: ObjectId,
        key: Key,
        value: ScalarValue,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        datatype: Option<DataType>,
    },
    #[serde(rename = "link")]
    Link {
        obj: ObjectId,
        key: Key,
        value: ObjectId,
    },
    #[serde(rename = "del")]
    Delete { obj: ObjectId, key: Key },
}

impl Operation {
    pub fn set(obj: ObjectId, key: Key, value: ScalarValue) -> Operation {
        Operation::Set {
            obj,
            key,
            value,
            datatype: None,
        }
    }

    pub fn set_with_datatype(
        obj: ObjectId,
        key: Key,
        value: ScalarValue,
        datatype: DataType,
    ) -> Operation {
        Operation::Set {
            obj,
            key,
            value,
            datatype: Some(datatype),
        }
    }

    pub fn link(obj: ObjectId, key: Key, value: ObjectId) -> Operation {
        Operation::Link { obj, key, value }
    }

    pub fn delete(obj: ObjectId, key: Key) -> Operation {
        Operation::Delete { obj, key }
    }

    pub fn insert(obj: ObjectId, key: ElementId, elem: u32) -> Operation {
        Operation::Insert { obj, key, elem }
    }

    /// The object this operation targets.
    pub fn obj(&self) -> &ObjectId {
        match self {
            Operation::MakeMap { obj }
            | Operation::MakeTable { obj }
            | Operation::MakeList { obj }
            | Operation::MakeText { obj }
            | Operation::Insert { obj, .. }
            | Operation::Set { obj, .. }
            | Operation::Link { obj, .. }
            | Operation::Delete { obj, .. } => obj,
        }
    }

    /// The field key, for assignment operations.
    pub fn key(&self) -> Option<&Key> {
        match self {
            Operation::Set { key, .. }
            | Operation::Link { key, .. }
            | Operation::Delete { key, .. } => Some(key),
            _ => None,
        }
    }

    pub fn make_type(&self) -> Option<ObjType> {
        match self {
            Operation::MakeMap { .. } => Some(ObjType::Map),
            Operation::MakeTable { .. } => Some(ObjType::Table),
            Operation::MakeList { .. } => Some(ObjType::List),
            Operation::MakeText { .. } => Some(ObjType::Text),
            _ => None,
        }
    }

    pub fn is_make(&self) -> bool {
        self.make_type().is_some()
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, Operation::Insert { .. })
    }

    /// Whether this is a `set`/`link`/`del` on a field register.
    pub fn is_assign(&self) -> bool {
        matches!(
            self,
            Operation::Set { .. } | Operation::Link { .. } | Operation::Delete { .. }
        )
    }

    pub fn link_target(&self) -> Option<&ObjectId> {
        match self {
            Operation::Link { value, .. } => Some(value),
            _ => None,
        }
    }
}
