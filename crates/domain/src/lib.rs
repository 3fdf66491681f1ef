mod models;
pub mod format;
pub mod thread;
pub mod validation;

pub use models::{CommentId, CommentRecord, NewComment, User, UserId};
pub use thread::{build_forest, Forest, OrphanReason, ParentLink, ThreadNode};
pub use validation::{Field, Registration, ValidationError};
