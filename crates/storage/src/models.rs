use chrono::NaiveDateTime;
use domain::{CommentId, CommentRecord, UserId};
use sqlx::FromRow;

#[derive(FromRow)]
pub struct SqlComment {
    pub id: i64,
    pub author_id: i64,
    pub parent_id: Option<i64>,
    pub text: String,
    pub created_at: NaiveDateTime,

    // joined from users
    pub author_email: String,
}

impl From<SqlComment> for CommentRecord {
    fn from(sql: SqlComment) -> Self {
        CommentRecord {
            id: CommentId::new(sql.id),
            author_id: UserId::new(sql.author_id),
            author_email: sql.author_email,
            parent_id: sql.parent_id.map(CommentId::new),
            text: sql.text,
            created_at: sql.created_at,
        }
    }
}
