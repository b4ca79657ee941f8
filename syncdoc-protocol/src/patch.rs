use crate::{
    ActorId, Clock, DataType, ElementId, ElementValue, Key, ObjType, ObjectId, ScalarValue,
};
use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiffAction {
    Create,
    Set,
    Insert,
    Remove,
}

/// One step on a path from the root to an object: a map key or a list
/// index.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum PathElement {
    Key(String),
    Index(u32),
}

/// One entry of a patch: a single edit to a single object, in the order
/// the backend applied it. `value`/`link`/`datatype` describe the new
/// contents for `set` and `insert`; `conflicts` lists the losing
/// concurrent writes when there are any.
#[derive(Debug, Clone, PartialEq)]
pub struct Diff {
    pub action: DiffAction,
    pub obj_type: ObjType,
    pub object_id: ObjectId,
    pub key: Option<Key>,
    pub index: Option<u32>,
    pub elem_id: Option<ElementId>,
    pub value: Option<ElementValue>,
    pub datatype: Option<DataType>,
    pub path: Option<Vec<PathElement>>,
    pub conflicts: Vec<Conflict>,
}

impl Diff {
    pub fn new(action: DiffAction, obj_type: ObjType, object_id: ObjectId) -> Diff {
        Diff {
            action,
            obj_type,
            object_id,
            key: None,
            index: None,
            elem_id: None,
            value: None,
            datatype: None,
            path: None,
            conflicts: Vec::new(),
        }
    }

    pub fn create(obj_type: ObjType, object_id: ObjectId) -> Diff {
        Diff::new(DiffAction::Create, obj_type, object_id)
    }

    pub fn with_key(mut self, key: Key) -> Diff {
        self.key = Some(key);
        self
    }

    pub fn with_index(mut self, index: u32) -> Diff {
        self.index = Some(index);
        self
    }

    pub fn with_elem_id(mut self, elem_id: ElementId) -> Diff {
        self.elem_id = Some(elem_id);
        self
    }

    pub fn with_value(mut self, value: ElementValue) -> Diff {
        self.value = Some(value);
        self
    }

    pub fn with_datatype(mut self, datatype: Option<DataType>) -> Diff {
        self.datatype = datatype;
        self
    }

    pub fn with_conflicts(mut self, conflicts: Vec<Conflict>) -> Diff {
        self.conflicts = conflicts;
        self
    }

    pub fn with_path(mut self, path: Vec<PathElement>) -> Diff {
        self.path = Some(path);
        self
    }
}

/// A losing concurrent write to a register, keyed by the actor that made
/// it.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub actor: ActorId,
    pub value: Option<ElementValue>,
    pub datatype: Option<DataType>,
}

/// The diff between two materialized document states, plus the metadata
/// the frontend needs to keep its pending-request queue in step.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub actor: Option<ActorId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub seq: Option<u32>,
    pub clock: Clock,
    pub deps: Clock,
    pub can_undo: bool,
    pub can_redo: bool,
    pub diffs: Vec<Diff>,
}

// The value/link pair flattens an `ElementValue` into the wire shape, so
// diffs and conflicts get handwritten serde impls.

fn serialize_element_value<S>(
    map: &mut S,
    value: &Option<ElementValue>,
) -> Result<(), S::Error>
where
    S: SerializeMap,
{
    match value {
        Some(ElementValue::Primitive(primitive)) => map.serialize_entry("value", primitive)?,
        Some(ElementValue::Link(object_id)) => {
            map.serialize_entry("value", &object_id.to_string())?;
            map.serialize_entry("link", &true)?;
        }
        None => {}
    }
    Ok(())
}

fn element_value_from_parts<E>(
    value: Option<ScalarValue>,
    link: bool,
) -> Result<Option<ElementValue>, E>
where
    E: de::Error,
{
    match (value, link) {
        (Some(ScalarValue::Str(s)), true) => Ok(Some(ElementValue::Link(s.parse().unwrap()))),
        (Some(_), true) => Err(de::Error::custom("link value must be an object id string")),
        (Some(primitive), false) => Ok(Some(ElementValue::Primitive(primitive))),
        (None, true) => Err(de::Error::custom("link without a value")),
        (None, false) => Ok(None),
    }
}

impl Serialize for Diff {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("action", &self.action)?;
        map.serialize_entry("type", &self.obj_type)?;
        map.serialize_entry("obj", &self.object_id)?;
        if let Some(ref key) = self.key {
            map.serialize_entry("key", key)?;
        }
        if let Some(index) = self.index {
            map.serialize_entry("index", &index)?;
        }
        if let Some(ref elem_id) = self.elem_id {
            map.serialize_entry("elemId", elem_id)?;
        }
        serialize_element_value(&mut map, &self.value)?;
        if let Some(datatype) = self.datatype {
            map.serialize_entry("datatype", &datatype)?;
        }
        if let Some(ref path) = self.path {
            map.serialize_entry("path", path)?;
        }
        if !self.conflicts.is_empty() {
            map.serialize_entry("conflicts", &self.conflicts)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Diff {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DiffVisitor;

        impl<'de> Visitor<'de> for DiffVisitor {
            type Value = Diff;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a diff object")
            }

            fn visit_map<M>(self, mut map: M) -> Result<Diff, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut action: Option<DiffAction> = None;
                let mut obj_type: Option<ObjType> = None;
                let mut object_id: Option<ObjectId> = None;
                let mut key: Option<Key> = None;
                let mut index: Option<u32> = None;
                let mut elem_id: Option<ElementId> = None;
                let mut value: Option<ScalarValue> = None;
                let mut link = false;
                let mut datatype: Option<DataType> = None;
                let mut path: Option<Vec<PathElement>> = None;
                let mut conflicts: Option<Vec<Conflict>> = None;

                while let Some(field) = map.next_key::<String>()? {
                    match field.as_str() {
                        "action" => action = Some(map.next_value()?),
                        "type" => obj_type = Some(map.next_value()?),
                        "obj" => object_id = Some(map.next_value()?),
                        "key" => key = Some(map.next_value()?),
                        "index" => index = Some(map.next_value()?),
                        "elemId" => elem_id = Some(map.next_value()?),
                        "value" => value = Some(map.next_value()?),
                        "link" => link = map.next_value()?,
                        "datatype" => datatype = Some(map.next_value()?),
                        "path" => path = map.next_value()?,
                        "conflicts" => conflicts = Some(map.next_value()?),
                        _ => {
                            let _: IgnoredAny = map.next_value()?;
                        }
                    }
                }

                Ok(Diff {
                    action: action.ok_or_else(|| de::Error::missing_field("action"))?,
                    obj_type: obj_type.ok_or_else(|| de::Error::missing_field("type"))?,
                    object_id: object_id.ok_or_else(|| de::Error::missing_field("obj"))?,
                    key,
                    index,
                    elem_id,
                    value: element_value_from_parts(value, link)?,
                    datatype,
                    path,
                    conflicts: conflicts.unwrap_or_default(),
                })
            }
        }

        deserializer.deserialize_map(DiffVisitor)
    }
}

impl Serialize for Conflict {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("actor", &self.actor)?;
        serialize_element_value(&mut map, &self.value)?;
        if let Some(datatype) = self.datatype {
            map.serialize_entry("datatype", &datatype)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Conflict {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ConflictVisitor;

        impl<'de> Visitor<'de> for ConflictVisitor {
            type Value = Conflict;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a conflict object")
            }

            fn visit_map<M>(self, mut map: M) -> Result<Conflict, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut actor: Option<ActorId> = None;
                let mut value: Option<ScalarValue> = None;
                let mut link = false;
                let mut datatype: Option<DataType> = None;

                while let Some(field) = map.next_key::<String>()? {
                    match field.as_str() {
                        "actor" => actor = Some(map.next_value()?),
                        "value" => value = Some(map.next_value()?),
                        "link" => link = map.next_value()?,
                        "datatype" => datatype = Some(map.next_value()?),
                        _ => {
                            let _: IgnoredAny = map.next_value()?;
                        }
                    }
                }

                Ok(Conflict {
                    actor: actor.ok_or_else(|| de::Error::missing_field("actor"))?,
                    value: element_value_from_parts(value, link)?,
                    datatype,
                })
            }
        }

        deserializer.deserialize_map(ConflictVisitor)
    }
}
