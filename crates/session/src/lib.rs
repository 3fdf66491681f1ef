mod draft;
mod error;
mod feed;
mod register;
mod store;

#[cfg(test)]
mod testing;

pub use draft::{ReplyDraft, ReplyTarget, SubmitOutcome};
pub use error::SessionError;
pub use feed::{PageOutcome, PaginationController, DEFAULT_PAGE_SIZE};
pub use register::register;
pub use store::CommentStore;
