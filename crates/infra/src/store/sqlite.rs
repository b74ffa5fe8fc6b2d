//! SQLite-backed inventory store.
//!
//! Layout (schema version 1, tracked in `PRAGMA user_version`):
//!
//! - `items`: one row per item code, JSON payload in `data`
//! - `metadata`: singleton row (`id = 1`), JSON payload in `data`
//!
//! The store is constructed closed and must be [`SqliteInventoryStore::open`]ed
//! once per process before use.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::sync::Mutex;

use stocktake_inventory::{ImportMetadata, Item};

use super::r#trait::{InventoryStore, StoreError};

pub const SCHEMA_VERSION: i64 = 1;

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        StoreError::Backend(value.to_string())
    }
}

/// SQLite-backed durable store.
///
/// Cheap to clone; clones share the same pool. The pool holds a single
/// connection so writes are applied in the order they are issued.
#[derive(Debug, Clone)]
pub struct SqliteInventoryStore {
    path: PathBuf,
    pool: Arc<Mutex<Option<SqlitePool>>>,
}

impl SqliteInventoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pool: Arc::new(Mutex::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Connect and create the schema if needed. Opening twice is a no-op.
    pub async fn open(&self) -> Result<(), StoreError> {
        let mut pool_guard = self.pool.lock().await;
        if pool_guard.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Backend(format!("failed to create store directory {parent:?}: {e}"))
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        migrate(&pool).await?;

        tracing::info!(path = %self.path.display(), "inventory store opened");
        *pool_guard = Some(pool);
        Ok(())
    }

    pub async fn close(&self) {
        if let Some(pool) = self.pool.lock().await.take() {
            pool.close().await;
        }
    }

    async fn pool(&self) -> Result<SqlitePool, StoreError> {
        self.pool.lock().await.clone().ok_or(StoreError::Unavailable)
    }
}

async fn migrate(pool: &SqlitePool) -> Result<(), StoreError> {
    let version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await?;

    match version {
        0 => {
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS items (
                    code       TEXT PRIMARY KEY,
                    data       TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )
                "#,
            )
            .execute(pool)
            .await?;

            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS metadata (
                    id   INTEGER PRIMARY KEY CHECK (id = 1),
                    data TEXT NOT NULL
                )
                "#,
            )
            .execute(pool)
            .await?;

            sqlx::query(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))
                .execute(pool)
                .await?;
            Ok(())
        }
        SCHEMA_VERSION => Ok(()),
        other => Err(StoreError::Backend(format!(
            "unsupported schema version {other} (expected {SCHEMA_VERSION})"
        ))),
    }
}

const UPSERT_ITEM: &str = r#"
    INSERT INTO items (code, data, updated_at)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(code)
    DO UPDATE SET
        data = excluded.data,
        updated_at = excluded.updated_at
"#;

#[async_trait]
impl InventoryStore for SqliteInventoryStore {
    async fn load_all(&self) -> Result<Vec<Item>, StoreError> {
        let pool = self.pool().await?;
        let rows = sqlx::query("SELECT data FROM items ORDER BY rowid")
            .fetch_all(&pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<Item, StoreError> {
                let data: String = row.try_get("data")?;
                Ok(serde_json::from_str::<Item>(&data)?)
            })
            .collect()
    }

    async fn upsert(&self, item: &Item) -> Result<(), StoreError> {
        let pool = self.pool().await?;
        let payload = serde_json::to_string(item)?;
        sqlx::query(UPSERT_ITEM)
            .bind(item.code().as_str())
            .bind(&payload)
            .bind(Utc::now().to_rfc3339())
            .execute(&pool)
            .await?;
        Ok(())
    }

    async fn replace_all(&self, items: &[Item]) -> Result<(), StoreError> {
        let pool = self.pool().await?;
        let now = Utc::now().to_rfc3339();

        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM items").execute(&mut *tx).await?;
        for item in items {
            let payload = serde_json::to_string(item)?;
            sqlx::query(UPSERT_ITEM)
                .bind(item.code().as_str())
                .bind(&payload)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let pool = self.pool().await?;
        sqlx::query("DELETE FROM items").execute(&pool).await?;
        Ok(())
    }

    async fn load_metadata(&self) -> Result<Option<ImportMetadata>, StoreError> {
        let pool = self.pool().await?;
        let row = sqlx::query("SELECT data FROM metadata WHERE id = 1")
            .fetch_optional(&pool)
            .await?;

        match row {
            Some(row) => {
                let data: String = row.try_get("data")?;
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => Ok(None),
        }
    }

    async fn save_metadata(&self, metadata: &ImportMetadata) -> Result<(), StoreError> {
        let pool = self.pool().await?;
        let payload = serde_json::to_string(metadata)?;
        sqlx::query(
            r#"
            INSERT INTO metadata (id, data)
            VALUES (1, ?1)
            ON CONFLICT(id)
            DO UPDATE SET data = excluded.data
            "#,
        )
        .bind(&payload)
        .execute(&pool)
        .await?;
        Ok(())
    }

    async fn clear_metadata(&self) -> Result<(), StoreError> {
        let pool = self.pool().await?;
        sqlx::query("DELETE FROM metadata").execute(&pool).await?;
        Ok(())
    }
}
