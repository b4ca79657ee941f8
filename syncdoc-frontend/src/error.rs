use crate::Path;
use syncdoc_backend::BackendError;
use syncdoc_protocol::ObjectId;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum FrontendError {
    #[error("Invalid change request: {0}")]
    InvalidChangeRequest(String),
    #[error("Missing object: {0}")]
    MissingObject(ObjectId),
    #[error("No such path: {0:?}")]
    NoSuchPath(Path),
    #[error("Mismatched sequence number: expected {expected}, got {actual}")]
    MismatchedSequenceNumber { expected: u32, actual: u32 },
    #[error("Object {0} has multiple parents")]
    MultipleParents(ObjectId),
    #[error("Malformed patch: {0}")]
    InvalidPatch(String),
    #[error("Nothing to undo")]
    NothingToUndo,
    #[error("Nothing to redo")]
    NothingToRedo,
    #[error(transparent)]
    Backend(#[from] BackendError),
}
