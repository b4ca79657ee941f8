use crate::cache::{CachedObject, DocumentCache};
use crate::error::FrontendError;
use crate::value::Value;
use syncdoc_protocol::{
    ActorId, DataType, Diff, DiffAction, ElementId, ElementValue, Key, MapType, ObjType, ObjectId,
    Operation, PathElement, ScalarValue, SequenceType,
};
use unicode_segmentation::UnicodeSegmentation;

/// A location in the document, as map keys and list indices from the
/// root.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path(Vec<PathElement>);

impl Path {
    pub fn root() -> Path {
        Path(Vec::new())
    }

    pub fn key(mut self, key: &str) -> Path {
        self.0.push(PathElement::Key(key.to_string()));
        self
    }

    pub fn index(mut self, index: u32) -> Path {
        self.0.push(PathElement::Index(index));
        self
    }

    pub(crate) fn elements(&self) -> &[PathElement] {
        &self.0
    }

    pub(crate) fn name(&self) -> Option<&PathElement> {
        self.0.last()
    }

    pub(crate) fn parent(&self) -> Path {
        let mut elements = self.0.clone();
        elements.pop();
        Path(elements)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocalOperation {
    Set(Value),
    Delete,
    Insert(Value),
    InsertMany(Vec<Value>),
}

/// One edit made inside a mutation session.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalChange {
    path: Path,
    operation: LocalOperation,
}

impl LocalChange {
    /// Set the value at `path` to `value`.
    pub fn set<V>(path: Path, value: V) -> LocalChange
    where
        V: Into<Value>,
    {
        LocalChange {
            path,
            operation: LocalOperation::Set(value.into()),
        }
    }

    /// Delete the entry at `path`.
    pub fn delete(path: Path) -> LocalChange {
        LocalChange {
            path,
            operation: LocalOperation::Delete,
        }
    }

    /// Insert `value` so that it ends up at `path` (the last path
    /// element is the index).
    pub fn insert<V>(path: Path, value: V) -> LocalChange
    where
        V: Into<Value>,
    {
        LocalChange {
            path,
            operation: LocalOperation::Insert(value.into()),
        }
    }

    pub fn insert_many(path: Path, values: Vec<Value>) -> LocalChange {
        LocalChange {
            path,
            operation: LocalOperation::InsertMany(values),
        }
    }
}

pub trait MutableDocument {
    fn value_at_path(&self, path: &Path) -> Option<Value>;
    fn add_change(&mut self, change: LocalChange) -> Result<(), FrontendError>;
}

/// The context a mutation closure runs in. Every edit is turned into
/// real ops (fresh uuids for new objects, `ins` counters drawn from the
/// cached `max_elem`) plus the diffs the backend would emit for them.
/// The diffs are applied to a working copy of the cache right away, so
/// later edits in the same session see earlier ones.
pub struct MutationTracker {
    cache: DocumentCache,
    actor_id: ActorId,
    ops: Vec<Operation>,
    diffs: Vec<Diff>,
}

fn new_object_id() -> ObjectId {
    ObjectId::Id(uuid::Uuid::new_v4().to_string())
}

/// A snapshot of the fields of a sequence object that op generation
/// needs, cloned out of the cache to keep borrows simple.
struct SequenceInfo {
    object_id: ObjectId,
    sequence_type: SequenceType,
    elem_ids: Vec<ElementId>,
    max_elem: u32,
}

impl MutationTracker {
    pub(crate) fn new(cache: DocumentCache, actor_id: ActorId) -> MutationTracker {
        MutationTracker {
            cache,
            actor_id,
            ops: Vec::new(),
            diffs: Vec::new(),
        }
    }

    pub(crate) fn finish(self) -> (Vec<Operation>, Vec<Diff>, DocumentCache) {
        (self.ops, self.diffs, self.cache)
    }

    fn push(&mut self, ops: Vec<Operation>, diffs: Vec<Diff>) -> Result<(), FrontendError> {
        self.cache.apply_diffs(&diffs)?;
        self.ops.extend(ops);
        self.diffs.extend(diffs);
        Ok(())
    }

    /// The value to assign plus the ops and diffs that build it. For a
    /// composite value this creates the object tree and returns a link.
    fn compose_value(
        &self,
        value: &Value,
    ) -> Result<(ElementValue, Option<DataType>, Vec<Operation>, Vec<Diff>), FrontendError> {
        match value {
            Value::Primitive(scalar, datatype) => Ok((
                ElementValue::Primitive(scalar.clone()),
                *datatype,
                Vec::new(),
                Vec::new(),
            )),
            _ => {
                let (object_id, ops, diffs) = self.compose_object(value)?;
                Ok((ElementValue::Link(object_id), None, ops, diffs))
            }
        }
    }

    fn compose_object(
        &self,
        value: &Value,
    ) -> Result<(ObjectId, Vec<Operation>, Vec<Diff>), FrontendError> {
        match value {
            Value::Map(entries, map_type) => {
                let object_id = new_object_id();
                let obj_type = ObjType::from(*map_type);
                let mut ops = vec![match map_type {
                    MapType::Map => Operation::MakeMap {
                        obj: object_id.clone(),
                    },
                    MapType::Table => Operation::MakeTable {
                        obj: object_id.clone(),
                    },
                }];
                let mut diffs = vec![Diff::create(obj_type, object_id.clone())];

                let mut keys: Vec<&String> = entries.keys().collect();
                keys.sort();
                for key in keys {
                    let (value, datatype, mut child_ops, mut child_diffs) =
                        self.compose_value(&entries[key])?;
                    ops.append(&mut child_ops);
                    diffs.append(&mut child_diffs);
                    ops.push(assign_op(&object_id, key.as_str().into(), &value, datatype));
                    diffs.push(
                        Diff::new(DiffAction::Set, obj_type, object_id.clone())
                            .with_key(key.as_str().into())
                            .with_value(value)
                            .with_datatype(datatype),
                    );
                }
                Ok((object_id, ops, diffs))
            }
            Value::Sequence(elements, sequence_type) => {
                let object_id = new_object_id();
                let obj_type = ObjType::from(*sequence_type);
                let mut ops = vec![match sequence_type {
                    SequenceType::List => Operation::MakeList {
                        obj: object_id.clone(),
                    },
                    SequenceType::Text => Operation::MakeText {
                        obj: object_id.clone(),
                    },
                }];
                let mut diffs = vec![Diff::create(obj_type, object_id.clone())];

                let info = SequenceInfo {
                    object_id,
                    sequence_type: *sequence_type,
                    elem_ids: Vec::new(),
                    max_elem: 0,
                };
                let (mut elem_ops, mut elem_diffs) = self.compose_inserts(&info, 0, elements)?;
                ops.append(&mut elem_ops);
                diffs.append(&mut elem_diffs);
                Ok((info.object_id, ops, diffs))
            }
            Value::Primitive(..) => Err(FrontendError::InvalidChangeRequest(
                "a primitive cannot be the root of an object".to_string(),
            )),
        }
    }

    /// Ops and diffs inserting `values` into a sequence starting at
    /// `index`.
    fn compose_inserts(
        &self,
        info: &SequenceInfo,
        index: usize,
        values: &[Value],
    ) -> Result<(Vec<Operation>, Vec<Diff>), FrontendError> {
        let obj_type = ObjType::from(info.sequence_type);
        let mut ops = Vec::new();
        let mut diffs = Vec::new();
        let mut predecessor = if index == 0 {
            ElementId::Head
        } else {
            info.elem_ids
                .get(index - 1)
                .cloned()
                .ok_or_else(|| {
                    FrontendError::InvalidChangeRequest(format!(
                        "insert index {} out of bounds",
                        index
                    ))
                })?
        };
        let mut elem = info.max_elem;

        for (offset, value) in values.iter().enumerate() {
            if info.sequence_type == SequenceType::Text {
                check_is_grapheme(value)?;
            }
            elem += 1;
            let elem_id = ElementId::Id(self.actor_id.clone(), elem);
            ops.push(Operation::insert(
                info.object_id.clone(),
                predecessor.clone(),
                elem,
            ));
            let (element_value, datatype, mut child_ops, mut child_diffs) =
                self.compose_value(value)?;
            ops.append(&mut child_ops);
            diffs.append(&mut child_diffs);
            ops.push(assign_op(
                &info.object_id,
                elem_id.as_key(),
                &element_value,
                datatype,
            ));
            diffs.push(
                Diff::new(DiffAction::Insert, obj_type, info.object_id.clone())
                    .with_index((index + offset) as u32)
                    .with_elem_id(elem_id.clone())
                    .with_value(element_value)
                    .with_datatype(datatype),
            );
            predecessor = elem_id;
        }
        Ok((ops, diffs))
    }

    fn sequence_info(&self, path: &Path) -> Option<SequenceInfo> {
        match &**self.cache.object_at(path.elements())? {
            CachedObject::Sequence {
                object_id,
                sequence_type,
                elem_ids,
                max_elem,
                ..
            } => Some(SequenceInfo {
                object_id: object_id.clone(),
                sequence_type: *sequence_type,
                elem_ids: elem_ids.iter().cloned().collect(),
                max_elem: *max_elem,
            }),
            CachedObject::Map { .. } => None,
        }
    }

    /// Assign each key of a map value to a key of the root object.
    fn wrap_root_assignment(&mut self, value: Value) -> Result<(), FrontendError> {
        match value {
            Value::Map(entries, MapType::Map) => {
                let mut keys: Vec<&String> = entries.keys().collect();
                keys.sort();
                let changes: Vec<LocalChange> = keys
                    .into_iter()
                    .map(|key| LocalChange::set(Path::root().key(key), entries[key].clone()))
                    .collect();
                for change in changes {
                    self.add_change(change)?;
                }
                Ok(())
            }
            _ => Err(FrontendError::InvalidChangeRequest(
                "only a map can be assigned to the document root".to_string(),
            )),
        }
    }

    fn set_at(&mut self, path: &Path, value: Value) -> Result<(), FrontendError> {
        let name = match path.name() {
            Some(name) => name.clone(),
            None => return self.wrap_root_assignment(value),
        };
        let parent_path = path.parent();
        let parent = self
            .cache
            .object_at(parent_path.elements())
            .ok_or_else(|| FrontendError::NoSuchPath(path.clone()))?;

        match (&**parent, name) {
            (
                CachedObject::Map {
                    object_id,
                    map_type,
                    ..
                },
                PathElement::Key(key),
            ) => {
                let object_id = object_id.clone();
                let obj_type = ObjType::from(*map_type);
                let (element_value, datatype, mut ops, mut diffs) = self.compose_value(&value)?;
                ops.push(assign_op(
                    &object_id,
                    key.as_str().into(),
                    &element_value,
                    datatype,
                ));
                diffs.push(
                    Diff::new(DiffAction::Set, obj_type, object_id)
                        .with_key(key.as_str().into())
                        .with_value(element_value)
                        .with_datatype(datatype),
                );
                self.push(ops, diffs)
            }
            (CachedObject::Sequence { .. }, PathElement::Index(index)) => {
                let info = self
                    .sequence_info(&parent_path)
                    .ok_or_else(|| FrontendError::NoSuchPath(path.clone()))?;
                let elem_id = info
                    .elem_ids
                    .get(index as usize)
                    .cloned()
                    .ok_or_else(|| FrontendError::NoSuchPath(path.clone()))?;
                if info.sequence_type == SequenceType::Text {
                    check_is_grapheme(&value)?;
                }
                let obj_type = ObjType::from(info.sequence_type);
                let (element_value, datatype, mut ops, mut diffs) = self.compose_value(&value)?;
                ops.push(assign_op(
                    &info.object_id,
                    elem_id.as_key(),
                    &element_value,
                    datatype,
                ));
                diffs.push(
                    Diff::new(DiffAction::Set, obj_type, info.object_id.clone())
                        .with_index(index)
                        .with_elem_id(elem_id)
                        .with_value(element_value)
                        .with_datatype(datatype),
                );
                self.push(ops, diffs)
            }
            _ => Err(FrontendError::NoSuchPath(path.clone())),
        }
    }

    fn delete_at(&mut self, path: &Path) -> Result<(), FrontendError> {
        let name = match path.name() {
            Some(name) => name.clone(),
            None => {
                return Err(FrontendError::InvalidChangeRequest(
                    "the document root cannot be deleted".to_string(),
                ))
            }
        };
        let parent_path = path.parent();
        let parent = self
            .cache
            .object_at(parent_path.elements())
            .ok_or_else(|| FrontendError::NoSuchPath(path.clone()))?;

        match (&**parent, name) {
            (
                CachedObject::Map {
                    object_id,
                    map_type,
                    props,
                },
                PathElement::Key(key),
            ) => {
                if !props.contains_key(&key) {
                    return Err(FrontendError::NoSuchPath(path.clone()));
                }
                let object_id = object_id.clone();
                let obj_type = ObjType::from(*map_type);
                let ops = vec![Operation::delete(object_id.clone(), key.as_str().into())];
                let diffs = vec![Diff::new(DiffAction::Remove, obj_type, object_id)
                    .with_key(key.as_str().into())];
                self.push(ops, diffs)
            }
            (CachedObject::Sequence { .. }, PathElement::Index(index)) => {
                let info = self
                    .sequence_info(&parent_path)
                    .ok_or_else(|| FrontendError::NoSuchPath(path.clone()))?;
                let elem_id = info
                    .elem_ids
                    .get(index as usize)
                    .cloned()
                    .ok_or_else(|| FrontendError::NoSuchPath(path.clone()))?;
                let obj_type = ObjType::from(info.sequence_type);
                let ops = vec![Operation::delete(info.object_id.clone(), elem_id.as_key())];
                let diffs = vec![Diff::new(DiffAction::Remove, obj_type, info.object_id)
                    .with_index(index)
                    .with_elem_id(elem_id)];
                self.push(ops, diffs)
            }
            _ => Err(FrontendError::NoSuchPath(path.clone())),
        }
    }

    fn insert_at(&mut self, path: &Path, values: &[Value]) -> Result<(), FrontendError> {
        let index = match path.name() {
            Some(PathElement::Index(index)) => *index as usize,
            _ => {
                return Err(FrontendError::InvalidChangeRequest(format!(
                    "insert needs an index path, got {:?}",
                    path
                )))
            }
        };
        let parent_path = path.parent();
        let info = self
            .sequence_info(&parent_path)
            .ok_or_else(|| FrontendError::NoSuchPath(path.clone()))?;
        if index > info.elem_ids.len() {
            return Err(FrontendError::NoSuchPath(path.clone()));
        }
        let (ops, diffs) = self.compose_inserts(&info, index, values)?;
        self.push(ops, diffs)
    }
}

impl MutableDocument for MutationTracker {
    fn value_at_path(&self, path: &Path) -> Option<Value> {
        if path.elements().is_empty() {
            return Some(self.cache.value());
        }
        if let Some(object) = self.cache.object_at(path.elements()) {
            return Some(object.value());
        }
        self.cache
            .slot_at(path.elements())
            .map(|slot| slot.value.value())
    }

    fn add_change(&mut self, change: LocalChange) -> Result<(), FrontendError> {
        match change.operation {
            LocalOperation::Set(value) => self.set_at(&change.path, value),
            LocalOperation::Delete => self.delete_at(&change.path),
            LocalOperation::Insert(value) => self.insert_at(&change.path, &[value]),
            LocalOperation::InsertMany(values) => self.insert_at(&change.path, &values),
        }
    }
}

fn assign_op(
    object_id: &ObjectId,
    key: Key,
    value: &ElementValue,
    datatype: Option<DataType>,
) -> Operation {
    match value {
        ElementValue::Primitive(scalar) => match datatype {
            Some(datatype) => {
                Operation::set_with_datatype(object_id.clone(), key, scalar.clone(), datatype)
            }
            None => Operation::set(object_id.clone(), key, scalar.clone()),
        },
        ElementValue::Link(child_id) => {
            Operation::link(object_id.clone(), key, child_id.clone())
        }
    }
}

fn check_is_grapheme(value: &Value) -> Result<(), FrontendError> {
    match value {
        Value::Primitive(ScalarValue::Str(s), _) if s.graphemes(true).count() == 1 => Ok(()),
        _ => Err(FrontendError::InvalidChangeRequest(format!(
            "text elements must be single graphemes, got {:?}",
            value
        ))),
    }
}

/// Keep `ins` and `make*` ops in order, but for each `(obj, key)` only
/// the last assignment survives. This is the shape the backend expects
/// from a change request.
pub(crate) fn filter_ops(ops: Vec<Operation>) -> Vec<Operation> {
    let mut latest: std::collections::HashMap<(ObjectId, Key), usize> =
        std::collections::HashMap::new();
    for (position, op) in ops.iter().enumerate() {
        if op.is_assign() {
            if let Some(key) = op.key() {
                latest.insert((op.obj().clone(), key.clone()), position);
            }
        }
    }
    let keep: std::collections::HashSet<usize> = latest.values().copied().collect();
    ops.into_iter()
        .enumerate()
        .filter(|(position, op)| !op.is_assign() || keep.contains(position))
        .map(|(_, op)| op)
        .collect()
}
