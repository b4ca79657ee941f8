use syncdoc_protocol::{
    ActorId, Conflict, DataType, ElementValue, Key, ObjectId, Operation,
};

/// An operation together with the identity of the change that carried
/// it. Operations are deserialized as part of a `Change`, but the
/// conflict engine needs the actor and sequence number of every field
/// op, so each one is paired up with its metadata at apply time.
#[derive(Debug, Clone, PartialEq)]
pub struct OpMeta {
    pub actor_id: ActorId,
    pub seq: u32,
    pub operation: Operation,
}

impl OpMeta {
    pub fn new(actor_id: ActorId, seq: u32, operation: Operation) -> OpMeta {
        OpMeta {
            actor_id,
            seq,
            operation,
        }
    }

    pub fn obj(&self) -> &ObjectId {
        self.operation.obj()
    }

    pub fn key(&self) -> Option<&Key> {
        self.operation.key()
    }

    pub fn is_delete(&self) -> bool {
        matches!(self.operation, Operation::Delete { .. })
    }

    pub fn link_target(&self) -> Option<&ObjectId> {
        self.operation.link_target()
    }

    /// The value this op assigns, as it appears in diffs. `None` for
    /// deletes and non-assignment ops.
    pub fn element_value(&self) -> Option<ElementValue> {
        match &self.operation {
            Operation::Set { value, .. } => Some(ElementValue::Primitive(value.clone())),
            Operation::Link { value, .. } => Some(ElementValue::Link(value.clone())),
            _ => None,
        }
    }

    pub fn datatype(&self) -> Option<DataType> {
        match &self.operation {
            Operation::Set { datatype, .. } => *datatype,
            _ => None,
        }
    }

    pub fn as_conflict(&self) -> Conflict {
        Conflict {
            actor: self.actor_id.clone(),
            value: self.element_value(),
            datatype: self.datatype(),
        }
    }
}
