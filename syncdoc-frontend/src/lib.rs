mod cache;
mod document;
mod error;
mod mutation;
mod value;

pub use crate::document::Document;
pub use crate::error::FrontendError;
pub use crate::mutation::{LocalChange, LocalOperation, MutableDocument, MutationTracker, Path};
pub use crate::value::Value;

// Re-export the backend handle and wire types so embedders only need
// one import.
pub use syncdoc_backend::Backend;
pub use syncdoc_protocol::{
    ActorId, Change, ChangeRequest, Clock, Conflict, DataType, Diff, DiffAction, ElementId,
    ElementValue, Key, MapType, ObjType, ObjectId, Operation, Patch, PathElement, RequestType,
    ScalarValue, SequenceType,
};
