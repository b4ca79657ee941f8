use crate::error::FrontendError;
use crate::value::Value;
use fxhash::FxHashMap;
use im::HashMap as SharedMap;
use im::Vector;
use std::collections::HashSet;
use std::rc::Rc;
use syncdoc_protocol::{
    Conflict, DataType, Diff, DiffAction, ElementId, ElementValue, MapType, ObjType, ObjectId,
    PathElement, ScalarValue, SequenceType,
};

/// The resolved contents of one map key or list position: the winning
/// value plus any conflicting concurrent writes.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Slot {
    pub value: CachedValue,
    pub conflicts: Vec<Conflict>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CachedValue {
    Primitive(ScalarValue, Option<DataType>),
    Object(Rc<CachedObject>),
}

/// A materialized object held in the cache. Sequences keep their
/// element ids and max counter so mutation sessions can mint fresh
/// positions without asking the backend.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CachedObject {
    Map {
        object_id: ObjectId,
        map_type: MapType,
        props: SharedMap<String, Slot>,
    },
    Sequence {
        object_id: ObjectId,
        sequence_type: SequenceType,
        elems: Vector<Slot>,
        elem_ids: Vector<ElementId>,
        max_elem: u32,
    },
}

impl CachedObject {
    fn empty(obj_type: ObjType, object_id: ObjectId) -> CachedObject {
        match obj_type {
            ObjType::Map => CachedObject::Map {
                object_id,
                map_type: MapType::Map,
                props: SharedMap::new(),
            },
            ObjType::Table => CachedObject::Map {
                object_id,
                map_type: MapType::Table,
                props: SharedMap::new(),
            },
            ObjType::List => CachedObject::Sequence {
                object_id,
                sequence_type: SequenceType::List,
                elems: Vector::new(),
                elem_ids: Vector::new(),
                max_elem: 0,
            },
            ObjType::Text => CachedObject::Sequence {
                object_id,
                sequence_type: SequenceType::Text,
                elems: Vector::new(),
                elem_ids: Vector::new(),
                max_elem: 0,
            },
        }
    }

    pub fn object_id(&self) -> &ObjectId {
        match self {
            CachedObject::Map { object_id, .. } => object_id,
            CachedObject::Sequence { object_id, .. } => object_id,
        }
    }

    pub fn value(&self) -> Value {
        match self {
            CachedObject::Map {
                props, map_type, ..
            } => Value::Map(
                props
                    .iter()
                    .map(|(key, slot)| (key.clone(), slot.value.value()))
                    .collect(),
                *map_type,
            ),
            CachedObject::Sequence {
                elems,
                sequence_type,
                ..
            } => Value::Sequence(
                elems.iter().map(|slot| slot.value.value()).collect(),
                *sequence_type,
            ),
        }
    }

    /// Replace every reference to `child`'s object id with `child`.
    fn with_child(&self, child: &Rc<CachedObject>) -> CachedObject {
        let target = child.object_id();
        let mut updated = self.clone();
        match &mut updated {
            CachedObject::Map { props, .. } => {
                let keys: Vec<String> = props
                    .iter()
                    .filter(|(_, slot)| slot.value.references(target))
                    .map(|(key, _)| key.clone())
                    .collect();
                for key in keys {
                    if let Some(slot) = props.get_mut(&key) {
                        slot.value = CachedValue::Object(child.clone());
                    }
                }
            }
            CachedObject::Sequence { elems, .. } => {
                for position in 0..elems.len() {
                    if elems[position].value.references(target) {
                        elems[position].value = CachedValue::Object(child.clone());
                    }
                }
            }
        }
        updated
    }
}

impl CachedValue {
    pub fn value(&self) -> Value {
        match self {
            CachedValue::Primitive(value, datatype) => {
                Value::Primitive(value.clone(), *datatype)
            }
            CachedValue::Object(object) => object.value(),
        }
    }

    fn references(&self, object_id: &ObjectId) -> bool {
        match self {
            CachedValue::Primitive(..) => false,
            CachedValue::Object(object) => object.object_id() == object_id,
        }
    }

    fn child_id(&self) -> Option<&ObjectId> {
        match self {
            CachedValue::Primitive(..) => None,
            CachedValue::Object(object) => Some(object.object_id()),
        }
    }
}

/// The frontend's materialized document: an immutable object table plus
/// the single-parent inbound index. Applying a patch stages its edits
/// in a transient `updated` table, then clones the chain of ancestors
/// of every touched object up to the root; untouched objects keep their
/// identity across snapshots.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DocumentCache {
    objects: SharedMap<ObjectId, Rc<CachedObject>>,
    inbound: SharedMap<ObjectId, ObjectId>,
}

impl DocumentCache {
    pub fn new() -> DocumentCache {
        let mut objects = SharedMap::new();
        objects.insert(
            ObjectId::Root,
            Rc::new(CachedObject::empty(ObjType::Map, ObjectId::Root)),
        );
        DocumentCache {
            objects,
            inbound: SharedMap::new(),
        }
    }

    pub fn root(&self) -> &Rc<CachedObject> {
        self.objects
            .get(&ObjectId::Root)
            .expect("the root object always exists")
    }

    pub fn value(&self) -> Value {
        self.root().value()
    }

    pub fn object(&self, object_id: &ObjectId) -> Option<&Rc<CachedObject>> {
        self.objects.get(object_id)
    }

    /// Walk a path from the root to the object it names.
    pub fn object_at(&self, path: &[PathElement]) -> Option<&Rc<CachedObject>> {
        let mut current = self.objects.get(&ObjectId::Root)?;
        for element in path {
            let slot = match (&**current, element) {
                (CachedObject::Map { props, .. }, PathElement::Key(key)) => props.get(key)?,
                (CachedObject::Sequence { elems, .. }, PathElement::Index(index)) => {
                    elems.get(*index as usize)?
                }
                _ => return None,
            };
            match &slot.value {
                CachedValue::Object(object) => current = object,
                CachedValue::Primitive(..) => return None,
            }
        }
        Some(current)
    }

    /// The slot a path names, if any.
    pub fn slot_at(&self, path: &[PathElement]) -> Option<&Slot> {
        let (name, parent_path) = path.split_last()?;
        let parent = self.object_at(parent_path)?;
        match (&**parent, name) {
            (CachedObject::Map { props, .. }, PathElement::Key(key)) => props.get(key),
            (CachedObject::Sequence { elems, .. }, PathElement::Index(index)) => {
                elems.get(*index as usize)
            }
            _ => None,
        }
    }

    /// Apply a patch's diffs. Fails without touching the cache if any
    /// diff is malformed.
    pub fn apply_diffs(&mut self, diffs: &[Diff]) -> Result<(), FrontendError> {
        let mut staged = self.clone();
        let mut updated: FxHashMap<ObjectId, Rc<CachedObject>> = FxHashMap::default();
        for diff in diffs {
            staged.apply_diff(diff, &mut updated)?;
        }
        staged.propagate(&mut updated);
        for (object_id, object) in updated {
            staged.objects.insert(object_id, object);
        }
        *self = staged;
        Ok(())
    }

    /// Best-effort reapplication of the recorded diffs of a pending
    /// local request over a new base. Diffs invalidated by the remote
    /// patch (their object disappeared, or their index fell off the
    /// end) are silently dropped; the backend's patch for the request
    /// remains authoritative.
    pub fn replay_diffs(&mut self, diffs: &[Diff]) {
        for diff in diffs {
            let _ = self.apply_diffs(std::slice::from_ref(diff));
        }
    }

    fn apply_diff(
        &mut self,
        diff: &Diff,
        updated: &mut FxHashMap<ObjectId, Rc<CachedObject>>,
    ) -> Result<(), FrontendError> {
        if diff.action == DiffAction::Create {
            updated.insert(
                diff.object_id.clone(),
                Rc::new(CachedObject::empty(diff.obj_type, diff.object_id.clone())),
            );
            return Ok(());
        }

        let base = updated
            .get(&diff.object_id)
            .cloned()
            .or_else(|| self.objects.get(&diff.object_id).cloned())
            .ok_or_else(|| FrontendError::MissingObject(diff.object_id.clone()))?;
        let mut object = (*base).clone();

        match (&mut object, diff.action) {
            (CachedObject::Map { props, .. }, DiffAction::Set) => {
                let key = diff
                    .key
                    .clone()
                    .ok_or_else(|| FrontendError::InvalidPatch("set without key".to_string()))?;
                self.unlink_old_child(&diff.object_id, props.get(&key.0));
                let slot = self.slot_from_diff(diff, updated)?;
                props.insert(key.0, slot);
            }
            (CachedObject::Map { props, .. }, DiffAction::Remove) => {
                let key = diff
                    .key
                    .clone()
                    .ok_or_else(|| FrontendError::InvalidPatch("remove without key".to_string()))?;
                self.unlink_old_child(&diff.object_id, props.get(&key.0));
                props.remove(&key.0);
            }
            (
                CachedObject::Sequence {
                    elems,
                    elem_ids,
                    max_elem,
                    ..
                },
                DiffAction::Insert,
            ) => {
                let index = diff_index(diff)?;
                if index > elems.len() {
                    return Err(FrontendError::InvalidPatch(format!(
                        "insert index {} out of bounds",
                        index
                    )));
                }
                let elem_id = diff.elem_id.clone().ok_or_else(|| {
                    FrontendError::InvalidPatch("insert without elemId".to_string())
                })?;
                if let Some(counter) = elem_id.counter() {
                    *max_elem = std::cmp::max(*max_elem, counter);
                }
                let slot = self.slot_from_diff(diff, updated)?;
                elems.insert(index, slot);
                elem_ids.insert(index, elem_id);
            }
            (CachedObject::Sequence { elems, .. }, DiffAction::Set) => {
                let index = diff_index(diff)?;
                if index >= elems.len() {
                    return Err(FrontendError::InvalidPatch(format!(
                        "set index {} out of bounds",
                        index
                    )));
                }
                self.unlink_old_child(&diff.object_id, elems.get(index));
                let slot = self.slot_from_diff(diff, updated)?;
                elems[index] = slot;
            }
            (
                CachedObject::Sequence {
                    elems, elem_ids, ..
                },
                DiffAction::Remove,
            ) => {
                let index = diff_index(diff)?;
                if index >= elems.len() {
                    return Err(FrontendError::InvalidPatch(format!(
                        "remove index {} out of bounds",
                        index
                    )));
                }
                self.unlink_old_child(&diff.object_id, elems.get(index));
                elems.remove(index);
                elem_ids.remove(index);
            }
            _ => {
                return Err(FrontendError::InvalidPatch(format!(
                    "diff action {:?} does not apply to a {:?}",
                    diff.action, diff.obj_type
                )))
            }
        }

        updated.insert(diff.object_id.clone(), Rc::new(object));
        Ok(())
    }

    fn slot_from_diff(
        &mut self,
        diff: &Diff,
        updated: &FxHashMap<ObjectId, Rc<CachedObject>>,
    ) -> Result<Slot, FrontendError> {
        let value = match &diff.value {
            Some(ElementValue::Primitive(value)) => {
                CachedValue::Primitive(value.clone(), diff.datatype)
            }
            Some(ElementValue::Link(child_id)) => {
                if let Some(parent) = self.inbound.get(child_id) {
                    if parent != &diff.object_id {
                        return Err(FrontendError::MultipleParents(child_id.clone()));
                    }
                }
                let child = updated
                    .get(child_id)
                    .cloned()
                    .or_else(|| self.objects.get(child_id).cloned())
                    .ok_or_else(|| FrontendError::MissingObject(child_id.clone()))?;
                self.inbound.insert(child_id.clone(), diff.object_id.clone());
                CachedValue::Object(child)
            }
            None => {
                return Err(FrontendError::InvalidPatch(
                    "set or insert without a value".to_string(),
                ))
            }
        };
        Ok(Slot {
            value,
            conflicts: diff.conflicts.clone(),
        })
    }

    /// When a slot holding a child object is overwritten or removed,
    /// drop the child's inbound edge, making it unreachable.
    fn unlink_old_child(&mut self, parent_id: &ObjectId, old_slot: Option<&Slot>) {
        if let Some(child_id) = old_slot.and_then(|slot| slot.value.child_id()) {
            if self.inbound.get(child_id) == Some(parent_id) {
                self.inbound.remove(child_id);
            }
        }
    }

    /// Clone the chain of ancestors of every updated object so the new
    /// tree references the new children. Untouched subtrees share
    /// structure with the previous snapshot.
    fn propagate(&self, updated: &mut FxHashMap<ObjectId, Rc<CachedObject>>) {
        let changed: Vec<ObjectId> = updated.keys().cloned().collect();
        for start in changed {
            let mut current = start;
            let mut seen = HashSet::new();
            while let Some(parent_id) = self.inbound.get(&current).cloned() {
                if !seen.insert(parent_id.clone()) {
                    break;
                }
                let child = match updated.get(&current) {
                    Some(child) => child.clone(),
                    None => break,
                };
                let parent = updated
                    .get(&parent_id)
                    .cloned()
                    .or_else(|| self.objects.get(&parent_id).cloned());
                let parent = match parent {
                    Some(parent) => parent,
                    None => break,
                };
                updated.insert(parent_id.clone(), Rc::new(parent.with_child(&child)));
                current = parent_id;
            }
        }
    }
}

fn diff_index(diff: &Diff) -> Result<usize, FrontendError> {
    diff.index
        .map(|index| index as usize)
        .ok_or_else(|| FrontendError::InvalidPatch("sequence diff without an index".to_string()))
}
