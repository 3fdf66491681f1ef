use anyhow::Result;
use async_trait::async_trait;
use domain::{CommentId, CommentRecord, NewComment, UserId};
use storage::Db;

/// The persistence operations the comment session needs.
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn insert_user(&self, email: &str, username: &str) -> Result<UserId>;

    async fn insert_comment(&self, comment: &NewComment) -> Result<CommentId>;

    /// Comments newest first, joined with their author's email.
    async fn fetch_comments_page(&self, limit: u32, offset: u32) -> Result<Vec<CommentRecord>>;
}

#[async_trait]
impl CommentStore for Db {
    async fn insert_user(&self, email: &str, username: &str) -> Result<UserId> {
        Db::insert_user(self, email, username).await
    }

    async fn insert_comment(&self, comment: &NewComment) -> Result<CommentId> {
        Db::insert_comment(
            self,
            comment.author_id,
            comment.parent_id,
            &comment.text,
            comment.created_at,
        )
        .await
    }

    async fn fetch_comments_page(&self, limit: u32, offset: u32) -> Result<Vec<CommentRecord>> {
        Db::fetch_comments_page(self, limit, offset).await
    }
}
