mod actor_id;
mod change;
mod clock;
mod element_id;
pub mod error;
mod key;
mod object_id;
mod op;
mod patch;
mod value;

pub use actor_id::ActorId;
pub use change::{Change, ChangeRequest, RequestType};
pub use clock::Clock;
pub use element_id::ElementId;
pub use key::Key;
pub use object_id::{ObjectId, ROOT_ID_STR};
pub use op::{MapType, ObjType, Operation, SequenceType};
pub use patch::{Conflict, Diff, DiffAction, Patch, PathElement};
pub use value::{DataType, ElementValue, ScalarValue};
