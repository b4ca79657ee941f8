use crate::change_log::ChangeLog;
use crate::error::BackendError;
use crate::op_meta::OpMeta;
use crate::registers::Register;
use crate::skip_list::SkipList;
use fxhash::FxHashMap;
use itertools::Itertools;
use std::collections::{BTreeSet, HashSet};
use syncdoc_protocol::{
    ActorId, Diff, DiffAction, ElementId, ElementValue, Key, MapType, ObjType, ObjectId,
    Operation, PathElement, SequenceType,
};

/// A live `link` op pointing into an object, recorded on the target so
/// that diffs and paths can walk from any object back towards the root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct InboundRef {
    pub obj: ObjectId,
    pub key: Key,
    pub actor_id: ActorId,
    pub seq: u32,
}

impl InboundRef {
    fn from_op(op: &OpMeta) -> Option<InboundRef> {
        op.key().map(|key| InboundRef {
            obj: op.obj().clone(),
            key: key.clone(),
            actor_id: op.actor_id.clone(),
            seq: op.seq,
        })
    }
}

/// Per-object state. Tables are maps with a different type tag, texts
/// are lists of single graphemes; each pair shares a representation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ObjectState {
    Map(MapState),
    List(ListState),
}

impl ObjectState {
    fn new(obj_type: ObjType, object_id: ObjectId) -> ObjectState {
        match obj_type {
            ObjType::Map => ObjectState::Map(MapState::new(MapType::Map, object_id)),
            ObjType::Table => ObjectState::Map(MapState::new(MapType::Table, object_id)),
            ObjType::List => ObjectState::List(ListState::new(SequenceType::List, object_id)),
            ObjType::Text => ObjectState::List(ListState::new(SequenceType::Text, object_id)),
        }
    }

    pub fn obj_type(&self) -> ObjType {
        match self {
            ObjectState::Map(map) => map.map_type.into(),
            ObjectState::List(list) => list.sequence_type.into(),
        }
    }

    pub(crate) fn inbound(&self) -> &BTreeSet<InboundRef> {
        match self {
            ObjectState::Map(map) => &map.inbound,
            ObjectState::List(list) => &list.inbound,
        }
    }

    fn inbound_mut(&mut self) -> &mut BTreeSet<InboundRef> {
        match self {
            ObjectState::Map(map) => &mut map.inbound,
            ObjectState::List(list) => &mut list.inbound,
        }
    }
}

/// Field registers for a map or table object.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MapState {
    pub object_id: ObjectId,
    pub map_type: MapType,
    pub props: FxHashMap<Key, Register>,
    pub inbound: BTreeSet<InboundRef>,
}

impl MapState {
    fn new(map_type: MapType, object_id: ObjectId) -> MapState {
        MapState {
            object_id,
            map_type,
            props: FxHashMap::default(),
            inbound: BTreeSet::new(),
        }
    }

    fn apply_assign(
        &mut self,
        op: &OpMeta,
        key: &Key,
        log: &ChangeLog,
    ) -> Result<(Option<Diff>, Vec<Operation>, Vec<OpMeta>), BackendError> {
        let register = self.props.entry(key.clone()).or_insert_with(Register::new);
        let undo_ops = register.inverse_ops(&self.object_id, key);
        let overwritten = register.incorporate(op, log);

        let obj_type = ObjType::from(self.map_type);
        let diff = match register.winner() {
            Some(winner) => {
                let value = winner.element_value().ok_or_else(|| {
                    BackendError::InvalidRequest(
                        "non-assignment op in a field register".to_string(),
                    )
                })?;
                Diff::new(DiffAction::Set, obj_type, self.object_id.clone())
                    .with_key(key.clone())
                    .with_value(value)
                    .with_datatype(winner.datatype())
                    .with_conflicts(register.conflicts())
            }
            None => Diff::new(DiffAction::Remove, obj_type, self.object_id.clone())
                .with_key(key.clone()),
        };
        Ok((Some(diff), undo_ops, overwritten))
    }
}

/// Field registers plus the insertion tree and position index for a
/// list or text object.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ListState {
    pub object_id: ObjectId,
    pub sequence_type: SequenceType,
    pub props: FxHashMap<ElementId, Register>,
    /// elem id -> the element it was inserted after
    pub insertions: FxHashMap<ElementId, ElementId>,
    /// parent elem id -> elements inserted after it, in arrival order
    pub following: FxHashMap<ElementId, Vec<ElementId>>,
    pub max_elem: u32,
    /// the visible elements, indexed by position
    pub elem_ids: SkipList<ElementId, ElementValue>,
    pub inbound: BTreeSet<InboundRef>,
}

impl ListState {
    fn new(sequence_type: SequenceType, object_id: ObjectId) -> ListState {
        ListState {
            object_id,
            sequence_type,
            props: FxHashMap::default(),
            insertions: FxHashMap::default(),
            following: FxHashMap::default(),
            max_elem: 0,
            elem_ids: SkipList::new(),
            inbound: BTreeSet::new(),
        }
    }

    fn add_insertion(
        &mut self,
        op: &OpMeta,
        parent: &ElementId,
        elem: u32,
    ) -> Result<(), BackendError> {
        let elem_id = ElementId::Id(op.actor_id.clone(), elem);
        if self.insertions.contains_key(&elem_id) {
            return Err(BackendError::DuplicateElem(elem_id));
        }
        if !parent.is_head() && !self.insertions.contains_key(parent) {
            return Err(BackendError::UnknownPred(parent.clone()));
        }
        self.insertions.insert(elem_id.clone(), parent.clone());
        self.following
            .entry(parent.clone())
            .or_insert_with(Vec::new)
            .push(elem_id);
        self.max_elem = std::cmp::max(self.max_elem, elem);
        Ok(())
    }

    /// The elements inserted directly after `parent`, ordered by elem
    /// counter descending then actor id descending. This is the Lamport
    /// tie-break for concurrent inserts at the same position.
    fn children(&self, parent: &ElementId) -> Vec<ElementId> {
        let mut children = self.following.get(parent).cloned().unwrap_or_default();
        children.sort();
        children.reverse();
        children
    }

    /// In-order successor in the insertion tree: the first child, or
    /// the next sibling of the nearest ancestor.
    pub fn next_element(&self, elem_id: &ElementId) -> Option<ElementId> {
        if let Some(first_child) = self.children(elem_id).first() {
            return Some(first_child.clone());
        }
        let mut cursor = elem_id.clone();
        loop {
            let parent = self.insertions.get(&cursor)?.clone();
            let siblings = self.children(&parent);
            let position = siblings.iter().position(|sibling| sibling == &cursor)?;
            if position + 1 < siblings.len() {
                return Some(siblings[position + 1].clone());
            }
            cursor = parent;
        }
    }

    /// In-order predecessor: the parent when this is the first child
    /// (unless the parent is the head), otherwise the last descendant of
    /// the previous sibling.
    pub fn previous_element(&self, elem_id: &ElementId) -> Option<ElementId> {
        let parent = self.insertions.get(elem_id)?;
        let siblings = self.children(parent);
        let position = siblings.iter().position(|sibling| sibling == elem_id)?;
        if position == 0 {
            if parent.is_head() {
                None
            } else {
                Some(parent.clone())
            }
        } else {
            let mut cursor = siblings[position - 1].clone();
            loop {
                match self.children(&cursor).last() {
                    Some(last) => cursor = last.clone(),
                    None => return Some(cursor),
                }
            }
        }
    }

    /// All inserted elements in document order, visible or not.
    pub fn elements_in_order(&self) -> Vec<ElementId> {
        let mut elements = Vec::new();
        let mut cursor = self.next_element(&ElementId::Head);
        while let Some(elem_id) = cursor {
            cursor = self.next_element(&elem_id);
            elements.push(elem_id);
        }
        elements
    }

    /// The nearest preceding element that is currently visible.
    fn previous_visible(&self, elem_id: &ElementId) -> Option<ElementId> {
        let mut cursor = self.previous_element(elem_id)?;
        loop {
            if self.elem_ids.contains_key(&cursor) {
                return Some(cursor);
            }
            cursor = self.previous_element(&cursor)?;
        }
    }

    fn apply_assign(
        &mut self,
        op: &OpMeta,
        key: &Key,
        log: &ChangeLog,
    ) -> Result<(Option<Diff>, Vec<Operation>, Vec<OpMeta>), BackendError> {
        let elem_id = key.as_element_id().map_err(|_| {
            BackendError::InvalidRequest(format!(
                "assignment to a sequence with a non-element key {:?}",
                key
            ))
        })?;
        if !self.insertions.contains_key(&elem_id) {
            return Err(BackendError::InvalidRequest(format!(
                "assignment to an element that was never inserted: {}",
                elem_id
            )));
        }

        let register = self
            .props
            .entry(elem_id.clone())
            .or_insert_with(Register::new);
        let undo_ops = register.inverse_ops(&self.object_id, key);
        let overwritten = register.incorporate(op, log);
        let winner = register.winner().cloned();
        let conflicts = register.conflicts();

        let obj_type = ObjType::from(self.sequence_type);
        let present = self.elem_ids.index_of(&elem_id);
        let diff = match (present, winner) {
            (Some(index), Some(winner)) => {
                let value = element_value(&winner)?;
                self.elem_ids = self.elem_ids.set(&elem_id, value.clone())?;
                Some(
                    Diff::new(DiffAction::Set, obj_type, self.object_id.clone())
                        .with_index(index as u32)
                        .with_elem_id(elem_id)
                        .with_value(value)
                        .with_datatype(winner.datatype())
                        .with_conflicts(conflicts),
                )
            }
            (Some(_), None) => {
                let (elem_ids, index) = self.elem_ids.remove_key(&elem_id)?;
                self.elem_ids = elem_ids;
                Some(
                    Diff::new(DiffAction::Remove, obj_type, self.object_id.clone())
                        .with_index(index as u32)
                        .with_elem_id(elem_id),
                )
            }
            (None, Some(winner)) => {
                let value = element_value(&winner)?;
                let index = match self.previous_visible(&elem_id) {
                    Some(prev) => self
                        .elem_ids
                        .index_of(&prev)
                        .map(|index| index + 1)
                        .unwrap_or(0),
                    None => 0,
                };
                self.elem_ids = self
                    .elem_ids
                    .insert_index(index, elem_id.clone(), value.clone())?;
                Some(
                    Diff::new(DiffAction::Insert, obj_type, self.object_id.clone())
                        .with_index(index as u32)
                        .with_elem_id(elem_id)
                        .with_value(value)
                        .with_datatype(winner.datatype())
                        .with_conflicts(conflicts),
                )
            }
            (None, None) => None,
        };
        Ok((diff, undo_ops, overwritten))
    }
}

fn element_value(op: &OpMeta) -> Result<ElementValue, BackendError> {
    op.element_value().ok_or_else(|| {
        BackendError::InvalidRequest("non-assignment op in a field register".to_string())
    })
}

/// The by-object-id store. Incorporating an operation returns the diff
/// to ship to frontends plus the inverse ops the undo machinery records.
/// The caller is responsible for only feeding it causally ready changes.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ObjectStore {
    objects: im::HashMap<ObjectId, ObjectState>,
}

impl ObjectStore {
    pub fn new() -> ObjectStore {
        let mut objects = im::HashMap::new();
        objects.insert(
            ObjectId::Root,
            ObjectState::new(ObjType::Map, ObjectId::Root),
        );
        ObjectStore { objects }
    }

    pub fn get(&self, object_id: &ObjectId) -> Result<&ObjectState, BackendError> {
        self.objects
            .get(object_id)
            .ok_or_else(|| BackendError::UnknownObject(object_id.clone()))
    }

    fn get_mut(&mut self, object_id: &ObjectId) -> Result<&mut ObjectState, BackendError> {
        self.objects
            .get_mut(object_id)
            .ok_or_else(|| BackendError::UnknownObject(object_id.clone()))
    }

    pub fn apply_make(&mut self, op: &OpMeta) -> Result<Diff, BackendError> {
        let obj_type = op.operation.make_type().ok_or_else(|| {
            BackendError::InvalidRequest("apply_make called with a non-creation op".to_string())
        })?;
        let object_id = op.obj().clone();
        if self.objects.contains_key(&object_id) {
            return Err(BackendError::DuplicateCreate(object_id));
        }
        self.objects
            .insert(object_id.clone(), ObjectState::new(obj_type, object_id.clone()));
        Ok(Diff::create(obj_type, object_id))
    }

    /// Record an insertion. This makes the position known but not
    /// visible; visibility comes from a later assignment to the element.
    pub fn apply_insert(&mut self, op: &OpMeta) -> Result<(), BackendError> {
        let (parent, elem) = match &op.operation {
            Operation::Insert { key, elem, .. } => (key.clone(), *elem),
            _ => {
                return Err(BackendError::InvalidRequest(
                    "apply_insert called with a non-insert op".to_string(),
                ))
            }
        };
        match self.get_mut(op.obj())? {
            ObjectState::Map(_) => Err(BackendError::InvalidRequest(format!(
                "insert into a non-sequence object {}",
                op.obj()
            ))),
            ObjectState::List(list) => list.add_insertion(op, &parent, elem),
        }
    }

    /// Run an assignment through the register for `(obj, key)` and keep
    /// the inbound link index in step with any overwritten links.
    pub fn apply_assign(
        &mut self,
        op: &OpMeta,
        log: &ChangeLog,
    ) -> Result<(Option<Diff>, Vec<Operation>), BackendError> {
        let key = match op.key() {
            Some(key) => key.clone(),
            None => {
                return Err(BackendError::InvalidRequest(
                    "apply_assign called with a non-assignment op".to_string(),
                ))
            }
        };
        let (diff, undo_ops, overwritten) = match self.get_mut(op.obj())? {
            ObjectState::Map(map) => map.apply_assign(op, &key, log)?,
            ObjectState::List(list) => list.apply_assign(op, &key, log)?,
        };

        for old in &overwritten {
            if let Some(target) = old.link_target() {
                if let (Some(reference), Ok(state)) =
                    (InboundRef::from_op(old), self.get_mut(&target.clone()))
                {
                    state.inbound_mut().remove(&reference);
                }
            }
        }
        if let Some(target) = op.link_target().cloned() {
            let reference = InboundRef::from_op(op).ok_or_else(|| {
                BackendError::InvalidRequest("link op without a key".to_string())
            })?;
            self.get_mut(&target)?.inbound_mut().insert(reference);
        }
        Ok((diff, undo_ops))
    }

    /// The ops that would restore the current value of `(obj, key)` if
    /// reapplied, or a `del` if the field is empty or unknown. This is
    /// what undo records and what redo synthesis reads.
    pub fn inverse_ops(&self, obj: &ObjectId, key: &Key) -> Vec<Operation> {
        let register = self.objects.get(obj).and_then(|state| match state {
            ObjectState::Map(map) => map.props.get(key),
            ObjectState::List(list) => key
                .as_element_id()
                .ok()
                .and_then(|elem_id| list.props.get(&elem_id)),
        });
        match register {
            Some(register) => register.inverse_ops(obj, key),
            None => vec![Operation::delete(obj.clone(), key.clone())],
        }
    }

    /// Depth-first materialization of the whole document into diffs:
    /// every reachable object is created and filled before the diff
    /// that links it into its parent.
    pub fn generate_diffs(&self) -> Vec<Diff> {
        let mut diffs = Vec::new();
        let mut visited = HashSet::new();
        self.materialize_object(&ObjectId::Root, &[], &mut visited, &mut diffs);
        diffs
    }

    fn materialize_object(
        &self,
        object_id: &ObjectId,
        path: &[PathElement],
        visited: &mut HashSet<ObjectId>,
        out: &mut Vec<Diff>,
    ) {
        if !visited.insert(object_id.clone()) {
            return;
        }
        let state = match self.objects.get(object_id) {
            Some(state) => state,
            None => return,
        };
        let obj_type = state.obj_type();
        if !object_id.is_root() {
            out.push(Diff::create(obj_type, object_id.clone()).with_path(path.to_vec()));
        }
        match state {
            ObjectState::Map(map) => {
                for key in map.props.keys().sorted() {
                    let register = &map.props[key];
                    let winner = match register.winner() {
                        Some(winner) => winner,
                        None => continue,
                    };
                    if let Some(target) = winner.link_target() {
                        let mut child_path = path.to_vec();
                        child_path.push(PathElement::Key(key.0.clone()));
                        self.materialize_object(target, &child_path, visited, out);
                    }
                    if let Some(value) = winner.element_value() {
                        out.push(
                            Diff::new(DiffAction::Set, obj_type, object_id.clone())
                                .with_key(key.clone())
                                .with_value(value)
                                .with_datatype(winner.datatype())
                                .with_conflicts(register.conflicts())
                                .with_path(path.to_vec()),
                        );
                    }
                }
            }
            ObjectState::List(list) => {
                let mut index: u32 = 0;
                for elem_id in list.elements_in_order() {
                    let register = match list.props.get(&elem_id) {
                        Some(register) if !register.is_empty() => register,
                        _ => continue,
                    };
                    let winner = match register.winner() {
                        Some(winner) => winner,
                        None => continue,
                    };
                    if let Some(target) = winner.link_target() {
                        let mut child_path = path.to_vec();
                        child_path.push(PathElement::Index(index));
                        self.materialize_object(target, &child_path, visited, out);
                    }
                    if let Some(value) = winner.element_value() {
                        out.push(
                            Diff::new(DiffAction::Insert, obj_type, object_id.clone())
                                .with_index(index)
                                .with_elem_id(elem_id)
                                .with_value(value)
                                .with_datatype(winner.datatype())
                                .with_conflicts(register.conflicts())
                                .with_path(path.to_vec()),
                        );
                    }
                    index += 1;
                }
            }
        }
    }

    /// One root path to `object_id`, as map keys and list indices, or
    /// `None` if the object is unreachable.
    pub fn path_to_object(&self, object_id: &ObjectId) -> Option<Vec<PathElement>> {
        let mut path = Vec::new();
        let mut cursor = object_id.clone();
        let mut seen = HashSet::new();
        while !cursor.is_root() {
            if !seen.insert(cursor.clone()) {
                return None;
            }
            let state = self.objects.get(&cursor)?;
            let inbound = state.inbound().iter().next()?;
            match self.objects.get(&inbound.obj)? {
                ObjectState::Map(_) => path.push(PathElement::Key(inbound.key.0.clone())),
                ObjectState::List(list) => {
                    let elem_id = inbound.key.as_element_id().ok()?;
                    let index = list.elem_ids.index_of(&elem_id)?;
                    path.push(PathElement::Index(index as u32));
                }
            }
            cursor = inbound.obj.clone();
        }
        path.reverse();
        Some(path)
    }
}
