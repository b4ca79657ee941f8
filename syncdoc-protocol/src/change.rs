use crate::{ActorId, Clock, Operation};
use serde::{Deserialize, Serialize};

/// A causally stamped unit of user intent: all the operations produced
/// by one mutation session, delivered and applied atomically. `(actor,
/// seq)` uniquely identifies a change; `deps` lists the highest sequence
/// number per other actor that the change observed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Change {
    #[serde(rename = "actor")]
    pub actor_id: ActorId,
    pub seq: u32,
    pub deps: Clock,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    #[serde(rename = "ops")]
    pub operations: Vec<Operation>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RequestType {
    Change,
    Undo,
    Redo,
}

/// What a frontend submits to its backend. For `change` requests the ops
/// come from the mutation session; for `undo`/`redo` the backend draws
/// the ops from its own stacks and `ops` is absent.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequest {
    pub actor: ActorId,
    pub seq: u32,
    pub deps: Clock,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    #[serde(default = "ChangeRequest::default_undoable")]
    pub undoable: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ops: Option<Vec<Operation>>,
    pub request_type: RequestType,
}

impl ChangeRequest {
    pub(crate) fn default_undoable() -> bool {
        true
    }
}
