use crate::{models::SqlComment, Db};
use chrono::NaiveDateTime;
use domain::{CommentId, CommentRecord, UserId};
use sqlx::Row;
use tracing::debug;

impl Db {
    pub async fn insert_comment(
        &self,
        author_id: UserId,
        parent_id: Option<CommentId>,
        text: &str,
        created_at: NaiveDateTime,
    ) -> anyhow::Result<CommentId> {
        let result = sqlx::query(
            r#"
            INSERT INTO comments (author_id, parent_id, text, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(author_id.get())
        .bind(parent_id.map(CommentId::get))
        .bind(text)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        let id = CommentId::new(result.last_insert_rowid());
        debug!(%id, %author_id, parent = ?parent_id, "comment stored");
        Ok(id)
    }

    /// One window of comments, newest first, each joined with its author's
    /// email. Equal timestamps fall back to the higher id first.
    pub async fn fetch_comments_page(
        &self,
        limit: u32,
        offset: u32,
    ) -> anyhow::Result<Vec<CommentRecord>> {
        let rows = sqlx::query_as::<_, SqlComment>(
            r#"
            SELECT
                c.id,
                c.author_id,
                c.parent_id,
                c.text,
                c.created_at,
                u.email AS author_email
            FROM comments c
            JOIN users u ON c.author_id = u.id
            ORDER BY c.created_at DESC, c.id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        debug!(limit, offset, fetched = rows.len(), "comment page loaded");
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn count_comments(&self) -> anyhow::Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM comments")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }
}
