use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use stocktake_inventory::{ImportMetadata, Item};

/// Persistent store operation error.
///
/// These are **infrastructure errors** as opposed to domain errors (validation,
/// uniqueness, parsing), which are rejected before anything reaches a store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store was never opened (or has been closed).
    #[error("store unavailable: not opened")]
    Unavailable,

    /// The backend rejected or failed the operation.
    #[error("store backend error: {0}")]
    Backend(String),

    /// A stored payload could not be encoded or decoded.
    #[error("store serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        StoreError::Serialization(value.to_string())
    }
}

/// Durable mirror of the item collection and its import metadata.
///
/// Two logical collections: items keyed by code, and a singleton metadata
/// record. The in-memory collection stays authoritative; the store is brought
/// in line by explicit writes after each mutation.
///
/// ## Implementation Requirements
///
/// - every operation fails with [`StoreError::Unavailable`] before the store is opened
/// - `upsert` overwrites by code and keeps the original position
/// - `load_all` returns items in first-insertion order
/// - `replace_all` is atomic: readers see the old set or the new set, never a mix
/// - failures are returned, never swallowed
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn load_all(&self) -> Result<Vec<Item>, StoreError>;

    async fn upsert(&self, item: &Item) -> Result<(), StoreError>;

    async fn replace_all(&self, items: &[Item]) -> Result<(), StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;

    async fn load_metadata(&self) -> Result<Option<ImportMetadata>, StoreError>;

    async fn save_metadata(&self, metadata: &ImportMetadata) -> Result<(), StoreError>;

    async fn clear_metadata(&self) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    async fn load_all(&self) -> Result<Vec<Item>, StoreError> {
        (**self).load_all().await
    }

    async fn upsert(&self, item: &Item) -> Result<(), StoreError> {
        (**self).upsert(item).await
    }

    async fn replace_all(&self, items: &[Item]) -> Result<(), StoreError> {
        (**self).replace_all(items).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        (**self).clear().await
    }

    async fn load_metadata(&self) -> Result<Option<ImportMetadata>, StoreError> {
        (**self).load_metadata().await
    }

    async fn save_metadata(&self, metadata: &ImportMetadata) -> Result<(), StoreError> {
        (**self).save_metadata(metadata).await
    }

    async fn clear_metadata(&self) -> Result<(), StoreError> {
        (**self).clear_metadata().await
    }
}
