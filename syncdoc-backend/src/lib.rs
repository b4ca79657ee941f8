#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::similar_names)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::use_self)]
#![allow(clippy::too_many_lines)]

mod backend;
mod change_log;
mod error;
mod object_store;
mod op_meta;
mod registers;
mod skip_list;
mod undo;

pub use crate::backend::Backend;
pub use crate::error::BackendError;
pub use crate::op_meta::OpMeta;

// Re-export the wire types so embedders and tests only need one import.
pub use syncdoc_protocol::{
    ActorId, Change, ChangeRequest, Clock, Conflict, DataType, Diff, DiffAction, ElementId,
    ElementValue, Key, MapType, ObjType, ObjectId, Operation, Patch, PathElement, RequestType,
    ScalarValue, SequenceType,
};
