use crate::Db;
use domain::{User, UserId};
use sqlx::Row;

impl Db {
    pub async fn insert_user(&self, email: &str, username: &str) -> anyhow::Result<UserId> {
        let result = sqlx::query("INSERT INTO users (email, username) VALUES (?, ?)")
            .bind(email)
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(UserId::new(result.last_insert_rowid()))
    }

    pub async fn get_user(&self, id: UserId) -> anyhow::Result<Option<User>> {
        let row = sqlx::query("SELECT id, email, username FROM users WHERE id = ?")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| User {
            id: UserId::new(r.get("id")),
            email: r.get("email"),
            username: r.get("username"),
        }))
    }
}
