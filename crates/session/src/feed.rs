//! Windowed comment loading.
//!
//! A [`PaginationController`] pulls fixed-size windows of comments from the
//! store, newest first, and keeps the accumulated list the reply forest is
//! built from. At most one fetch per controller is outstanding at a time.

use crate::{CommentStore, SessionError};
use domain::{build_forest, CommentId, CommentRecord, Forest, ValidationError};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Window size used by the comment screen.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// A window was fetched and merged.
    Loaded {
        window: u32,
        fetched: usize,
        /// Records that were not already loaded.
        added: usize,
        has_more: bool,
    },
    /// Another fetch was outstanding; nothing was requested.
    Skipped,
    /// The previous window came back short; nothing left to request.
    Exhausted,
    /// The controller was reset while this fetch was outstanding, so its
    /// result was dropped.
    Discarded,
}

#[derive(Debug)]
struct FeedState {
    comments: Vec<CommentRecord>,
    loaded: HashSet<CommentId>,
    window: u32,
    has_more: bool,
    /// Bumped by every reset so that stale fetches can be recognised.
    generation: u64,
}

impl FeedState {
    fn new() -> Self {
        Self {
            comments: Vec::new(),
            loaded: HashSet::new(),
            window: 0,
            has_more: true,
            generation: 0,
        }
    }

    fn replace(&mut self, page: Vec<CommentRecord>) -> usize {
        self.comments.clear();
        self.loaded.clear();
        self.append(page)
    }

    /// Appends records not yet loaded. New comments posted between two fetches
    /// shift the offset windows, so a page can repeat the tail of the last one.
    fn append(&mut self, page: Vec<CommentRecord>) -> usize {
        let before = self.comments.len();
        for record in page {
            if self.loaded.insert(record.id) {
                self.comments.push(record);
            }
        }
        self.comments.len() - before
    }
}

pub struct PaginationController<S> {
    store: Arc<S>,
    state: Mutex<FeedState>,
    /// Held for the duration of a fetch.
    fetch_gate: tokio::sync::Mutex<()>,
}

impl<S: CommentStore> PaginationController<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            state: Mutex::new(FeedState::new()),
            fetch_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Forgets everything loaded so far. A fetch still outstanding will have
    /// its result discarded.
    pub fn reset(&self) {
        let mut state = self.state();
        let generation = state.generation.wrapping_add(1);
        *state = FeedState {
            generation,
            ..FeedState::new()
        };
        debug!(generation, "comment feed reset");
    }

    /// Fetches the next window. Window 0 replaces the accumulated comments,
    /// later windows append to them.
    ///
    /// Returns [`PageOutcome::Skipped`] without touching the store when a
    /// fetch is already outstanding. On a store failure the accumulated
    /// comments and the window index are left as they were.
    pub async fn load_next_page(&self, page_size: u32) -> Result<PageOutcome, SessionError> {
        check_page_size(page_size)?;
        let Ok(_gate) = self.fetch_gate.try_lock() else {
            debug!("comment fetch already in flight, skipping");
            return Ok(PageOutcome::Skipped);
        };
        self.fetch_window(page_size).await
    }

    /// Scroll-triggered load: like [`Self::load_next_page`], but does nothing
    /// once the store has run out of comments.
    pub async fn load_more(&self, page_size: u32) -> Result<PageOutcome, SessionError> {
        if !self.has_more() {
            return Ok(PageOutcome::Exhausted);
        }
        self.load_next_page(page_size).await
    }

    /// Waits for any outstanding fetch, then reloads from the first window.
    pub async fn refresh(&self, page_size: u32) -> Result<PageOutcome, SessionError> {
        check_page_size(page_size)?;
        let _gate = self.fetch_gate.lock().await;
        self.reset();
        self.fetch_window(page_size).await
    }

    async fn fetch_window(&self, page_size: u32) -> Result<PageOutcome, SessionError> {
        let (window, generation) = {
            let state = self.state();
            (state.window, state.generation)
        };
        let offset = window
            .checked_mul(page_size)
            .ok_or(SessionError::OffsetOverflow { window, page_size })?;

        let page = match self.store.fetch_comments_page(page_size, offset).await {
            Ok(page) => page,
            Err(e) => {
                warn!(window, offset, "Failed to fetch comments: {:#}", e);
                return Err(SessionError::Store(e));
            }
        };

        let mut state = self.state();
        if state.generation != generation {
            debug!(window, "feed was reset during fetch, dropping page");
            return Ok(PageOutcome::Discarded);
        }

        let fetched = page.len();
        let has_more = fetched == page_size as usize;
        let added = if window == 0 {
            state.replace(page)
        } else {
            state.append(page)
        };
        state.has_more = has_more;
        state.window += 1;

        debug!(window, fetched, added, has_more, "comment window merged");
        Ok(PageOutcome::Loaded {
            window,
            fetched,
            added,
            has_more,
        })
    }

    pub fn comments(&self) -> Vec<CommentRecord> {
        self.state().comments.clone()
    }

    /// The reply forest for everything loaded so far.
    pub fn forest(&self) -> Forest {
        build_forest(&self.state().comments)
    }

    pub fn find(&self, id: CommentId) -> Option<CommentRecord> {
        self.state().comments.iter().find(|c| c.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state().comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_more(&self) -> bool {
        self.state().has_more
    }

    pub fn window_index(&self) -> u32 {
        self.state().window
    }

    pub fn is_loading(&self) -> bool {
        self.fetch_gate.try_lock().is_err()
    }

    fn state(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn check_page_size(page_size: u32) -> Result<(), ValidationError> {
    if page_size == 0 {
        return Err(ValidationError::ZeroPageSize);
    }
    Ok(())
}
