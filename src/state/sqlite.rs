// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use sqlx::sqlite::{
    Sqlite, SqliteConnectOptions, SqliteLockingMode, SqlitePool, SqlitePoolOptions,
};
use sqlx::{QueryBuilder, Row};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::state::traits::{StateError, StateStore};

/// Keeps `IN (...)` lists well below SQLite's bound parameter limit
const MAX_KEYS_PER_QUERY: usize = 500;

/// SQLite-backed state store.
///
/// The database is opened in exclusive locking mode over a single pooled
/// connection, so a second process (or a second store in this process)
/// opening the same file fails with [`StateError::AlreadyInUse`].
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    pub async fn new(db_path: &Path) -> Result<Self, StateError> {
        let path_str = db_path.display().to_string();

        let options = if db_path == Path::new(":memory:") {
            SqliteConnectOptions::from_str("sqlite::memory:")?
        } else {
            if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            SqliteConnectOptions::new()
                .filename(db_path)
                .create_if_missing(true)
        };
        let options = options
            .locking_mode(SqliteLockingMode::Exclusive)
            .busy_timeout(Duration::ZERO);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await
            .map_err(|e| classify(&path_str, e))?;

        let store = Self { pool };
        store.init_schema().await.map_err(|e| match e {
            StateError::Database(err) => classify(&path_str, err),
            other => other,
        })?;

        info!(path = %path_str, "Opened local state store");
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StateError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Take the write lock now; in exclusive mode it is held until the pool closes
        sqlx::raw_sql("BEGIN EXCLUSIVE; COMMIT;")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Close the underlying connection and release the file lock
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn classify(path: &str, err: sqlx::Error) -> StateError {
    if let sqlx::Error::Database(db_err) = &err {
        // SQLITE_BUSY / SQLITE_LOCKED
        let busy = db_err.code().is_some_and(|code| code == "5" || code == "6")
            || db_err.message().contains("database is locked");
        if busy {
            return StateError::AlreadyInUse(path.to_string());
        }
    }
    StateError::Database(err)
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StateError> {
        let row = sqlx::query("SELECT value FROM kv WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get::<String, _>("value")))
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, StateError> {
        let mut found: HashMap<String, String> = HashMap::with_capacity(keys.len());

        for chunk in keys.chunks(MAX_KEYS_PER_QUERY) {
            let mut builder = QueryBuilder::<Sqlite>::new("SELECT key, value FROM kv WHERE key IN (");
            let mut separated = builder.separated(", ");
            for key in chunk {
                separated.push_bind(key.clone());
            }
            separated.push_unseparated(")");

            let rows = builder.build().fetch_all(&self.pool).await?;
            for row in rows {
                found.insert(row.get::<String, _>("key"), row.get::<String, _>("value"));
            }
        }

        Ok(keys.iter().map(|key| found.get(key).cloned()).collect())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StateError> {
        sqlx::query(
            r#"
            INSERT INTO kv (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        debug!(key, "Stored state value");
        Ok(())
    }

    async fn clear(&self) -> Result<(), StateError> {
        let result = sqlx::query("DELETE FROM kv")
            .execute(&self.pool)
            .await?;

        info!(removed = result.rows_affected(), "Cleared local state store");
        Ok(())
    }
}
