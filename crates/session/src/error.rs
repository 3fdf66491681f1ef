use domain::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Rejected before reaching the store.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("store operation failed: {0}")]
    Store(#[from] anyhow::Error),

    #[error("a comment is already being submitted")]
    SubmitInFlight,

    #[error("window {window} with page size {page_size} is past the last addressable row")]
    OffsetOverflow { window: u32, page_size: u32 },
}

impl SessionError {
    pub fn is_validation(&self) -> bool {
        matches!(self, SessionError::Validation(_))
    }
}
