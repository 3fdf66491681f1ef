//! In-process store used by the unit tests.

use crate::CommentStore;
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use domain::{CommentId, CommentRecord, NewComment, UserId};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

pub(crate) fn at(minutes: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .unwrap()
        + Duration::minutes(minutes)
}

#[derive(Default)]
pub(crate) struct FakeStore {
    comments: Mutex<Vec<CommentRecord>>,
    next_id: AtomicI64,
    fetches: AtomicUsize,
    inserts: AtomicUsize,
    users: AtomicUsize,
    pub fail_fetch: AtomicBool,
    pub fail_insert: AtomicBool,
    gate: Option<Arc<Semaphore>>,
}

impl FakeStore {
    /// A store whose fetches and inserts block until [`FakeStore::release`].
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    pub fn with_roots(count: i64) -> Self {
        let store = Self::default();
        for i in 0..count {
            store.push(None, at(i));
        }
        store
    }

    pub fn push(&self, parent: Option<CommentId>, created_at: NaiveDateTime) -> CommentId {
        let id = CommentId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.comments.lock().unwrap().push(CommentRecord {
            id,
            author_id: UserId::new(1),
            author_email: "user@example.com".to_string(),
            parent_id: parent,
            text: format!("comment {}", id.get()),
            created_at,
        });
        id
    }

    pub fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn users(&self) -> usize {
        self.users.load(Ordering::SeqCst)
    }

    pub fn stored(&self) -> Vec<CommentRecord> {
        self.comments.lock().unwrap().clone()
    }

    async fn pass_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
    }
}

#[async_trait]
impl CommentStore for FakeStore {
    async fn insert_user(&self, _email: &str, _username: &str) -> Result<UserId> {
        let n = self.users.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(UserId::new(n as i64))
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<CommentId> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;
        if self.fail_insert.load(Ordering::SeqCst) {
            bail!("disk I/O error");
        }
        let id = self.push(comment.parent_id, comment.created_at);
        if let Some(stored) = self.comments.lock().unwrap().last_mut() {
            stored.author_id = comment.author_id;
            stored.text = comment.text.clone();
        }
        Ok(id)
    }

    async fn fetch_comments_page(&self, limit: u32, offset: u32) -> Result<Vec<CommentRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;
        if self.fail_fetch.load(Ordering::SeqCst) {
            bail!("database is locked");
        }
        let mut all = self.stored();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(all
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}
