use crate::{CommentStore, PaginationController, SessionError};
use chrono::Utc;
use domain::{validation, CommentId, CommentRecord, NewComment, UserId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

/// The comment a draft replies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTarget {
    pub id: CommentId,
    pub author_email: String,
    pub text: String,
}

impl From<&CommentRecord> for ReplyTarget {
    fn from(comment: &CommentRecord) -> Self {
        Self {
            id: comment.id,
            author_email: comment.author_email.clone(),
            text: comment.text.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub comment_id: CommentId,
    pub parent_id: Option<CommentId>,
    /// False when the comment was stored but reloading the feed failed.
    pub refreshed: bool,
}

#[derive(Debug, Default)]
struct DraftState {
    target: Option<ReplyTarget>,
    text: String,
}

/// Pending comment input and the reply target it is aimed at.
pub struct ReplyDraft<S> {
    store: Arc<S>,
    feed: Arc<PaginationController<S>>,
    page_size: u32,
    state: Mutex<DraftState>,
    submitting: AtomicBool,
}

impl<S: CommentStore> ReplyDraft<S> {
    pub fn new(store: Arc<S>, feed: Arc<PaginationController<S>>, page_size: u32) -> Self {
        Self {
            store,
            feed,
            page_size,
            state: Mutex::new(DraftState::default()),
            submitting: AtomicBool::new(false),
        }
    }

    /// Aims the draft at `comment`. Typed text is kept.
    pub fn start_reply(&self, comment: &CommentRecord) {
        self.state().target = Some(ReplyTarget::from(comment));
    }

    /// Drops the reply target together with any typed text.
    pub fn cancel_reply(&self) {
        let mut state = self.state();
        state.target = None;
        state.text.clear();
    }

    pub fn set_text(&self, text: impl Into<String>) {
        self.state().text = text.into();
    }

    pub fn text(&self) -> String {
        self.state().text.clone()
    }

    pub fn target(&self) -> Option<ReplyTarget> {
        self.state().target.clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    pub fn prompt(&self) -> &'static str {
        if self.state().target.is_some() {
            "Replying to comment..."
        } else {
            "Add a comment"
        }
    }

    pub fn action_label(&self) -> &'static str {
        if self.state().target.is_some() {
            "Reply"
        } else {
            "Add Comment"
        }
    }

    /// Stores `text` as a new comment, replying to the current target if any,
    /// then reloads the feed from its first window.
    ///
    /// Blank text is rejected without a store call. While one submit is in
    /// flight any other fails with [`SessionError::SubmitInFlight`]. If the
    /// store rejects the comment, the target and typed text are kept for a
    /// retry. On success only the target and text the submit started with
    /// are cleared; edits made while the insert was pending stay.
    pub async fn submit(
        &self,
        text: &str,
        author_id: UserId,
    ) -> Result<SubmitOutcome, SessionError> {
        let body = validation::comment_text(text)?;

        if self.submitting.swap(true, Ordering::AcqRel) {
            return Err(SessionError::SubmitInFlight);
        }
        let _in_flight = InFlight(&self.submitting);

        let (parent_id, typed) = {
            let state = self.state();
            (state.target.as_ref().map(|t| t.id), state.text.clone())
        };
        let comment = NewComment {
            author_id,
            parent_id,
            text: body.to_string(),
            created_at: Utc::now().naive_utc(),
        };

        let comment_id = match self.store.insert_comment(&comment).await {
            Ok(id) => id,
            Err(e) => {
                warn!(%author_id, parent = ?parent_id, "Failed to add comment: {:#}", e);
                return Err(SessionError::Store(e));
            }
        };
        info!(id = %comment_id, %author_id, parent = ?parent_id, "comment added");

        {
            let mut state = self.state();
            if state.target.as_ref().map(|t| t.id) == parent_id {
                state.target = None;
            }
            if state.text == typed {
                state.text.clear();
            }
        }

        let refreshed = match self.feed.refresh(self.page_size).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Comment stored but feed refresh failed: {}", e);
                false
            }
        };

        Ok(SubmitOutcome {
            comment_id,
            parent_id,
            refreshed,
        })
    }

    fn state(&self) -> MutexGuard<'_, DraftState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the submitting flag when the submit finishes or is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
