use syncdoc_protocol::{ActorId, ElementId, ObjectId};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum BackendError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Duplicate creation of object {0}")]
    DuplicateCreate(ObjectId),
    #[error("Unknown object: {0}")]
    UnknownObject(ObjectId),
    #[error("Duplicate element id {0}")]
    DuplicateElem(ElementId),
    #[error("Unknown predecessor element {0}")]
    UnknownPred(ElementId),
    #[error("Inconsistent reuse of sequence number {seq} by actor {actor}")]
    InconsistentReuse { actor: ActorId, seq: u32 },
    #[error("Clocks have diverged")]
    DivergedClocks,
    #[error("Nothing to undo")]
    EmptyUndo,
    #[error("Nothing to redo")]
    EmptyRedo,
    #[error("Skip list error: {0}")]
    SkipList(String),
}
