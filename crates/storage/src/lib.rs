use anyhow::Context;
use sqlx::{
    migrate::{MigrateDatabase, Migrator},
    sqlite::SqlitePoolOptions,
    Pool, Sqlite,
};
use std::{fs, path::Path};
use tracing::info;

mod models;
mod repo;

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

const MEMORY_URL: &str = "sqlite::memory:";

/// Handle to the local comment store. Cloning shares the underlying pool.
#[derive(Clone)]
pub struct Db {
    pub(crate) pool: Pool<Sqlite>,
}

impl Db {
    /// Opens the database at `db_url`, creating the file and its directory
    /// when missing. The schema is not touched; see [`Db::create_schema`].
    pub async fn new(db_url: &str) -> anyhow::Result<Self> {
        if is_memory(db_url) {
            return Self::in_memory().await;
        }

        if db_url.starts_with("sqlite://") {
            let path_str = db_url.trim_start_matches("sqlite://");
            let path = Path::new(path_str);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create database directory {}", parent.display())
                    })?;
                }
            }
        }
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            info!("Creating database at {}", db_url);
            Sqlite::create_database(db_url).await?;
        }
        let pool = SqlitePoolOptions::new()
            .connect(db_url)
            .await
            .with_context(|| format!("Failed to open database {}", db_url))?;
        sqlx::query("PRAGMA journal_mode = WAL;")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA synchronous = NORMAL;")
            .execute(&pool)
            .await?;
        Ok(Self { pool })
    }

    /// A private database that lives as long as this handle (and its clones).
    pub async fn in_memory() -> anyhow::Result<Self> {
        // Every SQLite connection to :memory: is a separate database, so the
        // pool is pinned to a single connection that never expires.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(MEMORY_URL)
            .await
            .context("Failed to open in-memory database")?;
        Ok(Self { pool })
    }

    /// Ensures the users and comments tables exist. Safe to call repeatedly.
    pub async fn create_schema(&self) -> anyhow::Result<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .context("Failed to apply schema migrations")?;
        Ok(())
    }

    /// Drops every table, including the migration bookkeeping.
    pub async fn drop_all(&self) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        for table in ["comments", "users", "_sqlx_migrations"] {
            sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to drop table {table}"))?;
        }
        tx.commit().await?;
        info!("Dropped all tables");
        Ok(())
    }

    /// Drops and recreates the schema, leaving an empty store.
    pub async fn recreate(&self) -> anyhow::Result<()> {
        self.drop_all().await?;
        self.create_schema().await
    }
}

fn is_memory(db_url: &str) -> bool {
    db_url.contains(":memory:") || db_url.contains("mode=memory")
}
