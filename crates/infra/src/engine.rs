//! Reconciliation engine (application-level orchestration).
//!
//! The engine owns the session's [`ItemCollection`] and mirrors every mutation
//! into an [`InventoryStore`]:
//!
//! ```text
//! operation
//!   ↓
//! 1. Validate + apply to the in-memory collection (fail fast, no partial mutation)
//!   ↓
//! 2. Mirror to the store (awaited, or queued to the write-behind worker)
//!   ↓
//! 3. Return the new value together with the persistence status
//! ```
//!
//! A failed store write never rolls back step 1. The in-memory state stays
//! authoritative for the rest of the session and the failure is reported in
//! the returned [`Outcome`]; memory and store may diverge until the next
//! successful write.

use std::sync::Arc;

use stocktake_core::{DomainResult, ItemCode};
use stocktake_inventory::{ImportMetadata, Item, ItemCollection};

use crate::store::{InventoryStore, StoreError};
use crate::write_behind::{PersistenceFailure, StoreOp, WriteBehind};

/// How mutations are mirrored to the store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PersistenceMode {
    /// Await each write before the operation returns.
    #[default]
    WriteThrough,
    /// Queue writes to an ordered background worker.
    WriteBehind,
}

/// What happened to the durable mirror of a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceStatus {
    Written,
    Queued,
    /// The mutation was applied in memory but the store write failed.
    Failed(StoreError),
}

/// Result of a mutation that was applied in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub persistence: PersistenceStatus,
}

impl<T> Outcome<T> {
    pub fn write_error(&self) -> Option<&StoreError> {
        match &self.persistence {
            PersistenceStatus::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            persistence: self.persistence,
        }
    }
}

pub struct ReconciliationEngine<S>
where
    S: InventoryStore + ?Sized + 'static,
{
    collection: ItemCollection,
    store: Arc<S>,
    writer: Option<WriteBehind>,
}

impl<S> ReconciliationEngine<S>
where
    S: InventoryStore + ?Sized + 'static,
{
    /// Engine with an empty collection in write-through mode.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            collection: ItemCollection::new(),
            store,
            writer: None,
        }
    }

    /// Write-behind mode spawns a worker, so this must run inside a tokio runtime.
    pub fn with_mode(store: Arc<S>, mode: PersistenceMode) -> Self {
        let writer = match mode {
            PersistenceMode::WriteThrough => None,
            PersistenceMode::WriteBehind => Some(WriteBehind::spawn(store.clone())),
        };
        Self {
            collection: ItemCollection::new(),
            store,
            writer,
        }
    }

    pub fn mode(&self) -> PersistenceMode {
        if self.writer.is_some() {
            PersistenceMode::WriteBehind
        } else {
            PersistenceMode::WriteThrough
        }
    }

    /// Replace the in-memory state with what the store holds.
    ///
    /// Called once at start-up. On error the collection is left as it was.
    pub async fn load(&mut self) -> Result<usize, StoreError> {
        let items = self.store.load_all().await?;
        let metadata = self.store.load_metadata().await?;
        self.collection = ItemCollection::from_parts(items, metadata);
        tracing::info!(items = self.collection.len(), "inventory loaded from store");
        Ok(self.collection.len())
    }

    pub fn collection(&self) -> &ItemCollection {
        &self.collection
    }

    pub fn metadata(&self) -> Option<&ImportMetadata> {
        self.collection.metadata()
    }

    pub fn find_by_code(&self, code: &ItemCode) -> Option<&Item> {
        self.collection.find_by_code(code)
    }

    /// Create an uncounted item. `DuplicateCode` leaves everything untouched.
    pub async fn create_item(&mut self, code: ItemCode, name: &str) -> DomainResult<Outcome<Item>> {
        let item = self.collection.create_item(code, name)?.clone();
        tracing::info!(code = %item.code(), name = item.name(), "item created");
        let persistence = self.persist(vec![StoreOp::Upsert(item.clone())]).await;
        Ok(Outcome { value: item, persistence })
    }

    /// Accumulate `delta` into the item's counted quantity (floored at zero).
    pub async fn accumulate_quantity(&mut self, code: &ItemCode, delta: i64) -> DomainResult<Outcome<Item>> {
        let item = self.collection.accumulate_quantity(code, delta)?.clone();
        tracing::debug!(
            code = %item.code(),
            delta,
            actual = item.actual_quantity(),
            status = item.status().as_str(),
            "quantity accumulated"
        );
        let persistence = self.persist(vec![StoreOp::Upsert(item.clone())]).await;
        Ok(Outcome { value: item, persistence })
    }

    /// Replace the whole item set and its metadata (import path).
    ///
    /// Returns the number of items now in the collection.
    pub async fn bulk_replace(&mut self, items: Vec<Item>, metadata: ImportMetadata) -> Outcome<usize> {
        self.collection.bulk_replace(items, Some(metadata.clone()));
        let count = self.collection.len();
        tracing::info!(items = count, source = %metadata.source_name, "item set replaced");
        let persistence = self
            .persist(vec![
                StoreOp::ReplaceAll(self.collection.items().to_vec()),
                StoreOp::SaveMetadata(metadata),
            ])
            .await;
        Outcome { value: count, persistence }
    }

    /// Empty the collection and metadata, then purge the store.
    pub async fn clear_all(&mut self) -> Outcome<()> {
        let dropped = self.collection.len();
        self.collection.clear_all();
        tracing::info!(items = dropped, "inventory cleared");
        let persistence = self.persist(vec![StoreOp::Clear, StoreOp::ClearMetadata]).await;
        Outcome { value: (), persistence }
    }

    /// Wait for queued background writes. No-op in write-through mode.
    pub async fn flush(&self) {
        if let Some(writer) = &self.writer {
            writer.flush().await;
        }
    }

    /// Background write failures reported since the last call.
    pub fn drain_failures(&mut self) -> Vec<PersistenceFailure> {
        self.writer
            .as_mut()
            .map(WriteBehind::drain_failures)
            .unwrap_or_default()
    }

    /// Stop the background writer after it has drained its queue.
    pub async fn shutdown(mut self) {
        if let Some(writer) = self.writer.take() {
            writer.shutdown().await;
        }
    }

    async fn persist(&self, ops: Vec<StoreOp>) -> PersistenceStatus {
        if let Some(writer) = &self.writer {
            for op in ops {
                let description = op.describe();
                if let Err(error) = writer.enqueue(op) {
                    tracing::error!(operation = %description, %error, "failed to queue store write");
                    return PersistenceStatus::Failed(error);
                }
            }
            return PersistenceStatus::Queued;
        }

        // Attempt every write even after a failure; report the first one.
        let mut first_error = None;
        for op in ops {
            if let Err(error) = op.apply(&*self.store).await {
                tracing::error!(operation = %op.describe(), %error, "store write failed");
                first_error.get_or_insert(error);
            }
        }
        match first_error {
            Some(error) => PersistenceStatus::Failed(error),
            None => PersistenceStatus::Written,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stocktake_core::DomainError;
    use stocktake_inventory::ItemStatus;

    use crate::store::InMemoryInventoryStore;

    fn code(s: &str) -> ItemCode {
        ItemCode::new(s).unwrap()
    }

    fn dataset() -> (Vec<Item>, ImportMetadata) {
        (
            vec![
                Item::imported(code("100"), "Bolt", 10, 2.5),
                Item::imported(code("200"), "Nut", 5, 1.0),
            ],
            ImportMetadata::new("stock.xlsx", Utc::now(), 2),
        )
    }

    async fn loaded_engine(store: Arc<InMemoryInventoryStore>) -> ReconciliationEngine<InMemoryInventoryStore> {
        let mut engine = ReconciliationEngine::new(store);
        let (items, meta) = dataset();
        let outcome = engine.bulk_replace(items, meta).await;
        assert_eq!(outcome.persistence, PersistenceStatus::Written);
        engine
    }

    #[tokio::test]
    async fn accumulate_writes_through_to_store() {
        let store = Arc::new(InMemoryInventoryStore::opened());
        let mut engine = loaded_engine(store.clone()).await;

        let outcome = engine.accumulate_quantity(&code("200"), 3).await.unwrap();
        assert_eq!(outcome.value.status(), ItemStatus::Shortage);
        assert_eq!(outcome.persistence, PersistenceStatus::Written);

        let stored = store.load_all().await.unwrap();
        assert_eq!(stored[1].actual_quantity(), Some(3));
    }

    #[tokio::test]
    async fn failed_write_keeps_memory_change() {
        let store = Arc::new(InMemoryInventoryStore::opened());
        let mut engine = loaded_engine(store.clone()).await;
        store.set_fail_writes(true);

        let outcome = engine.accumulate_quantity(&code("100"), 10).await.unwrap();
        assert!(matches!(outcome.write_error(), Some(StoreError::Backend(_))));
        assert_eq!(
            engine.find_by_code(&code("100")).unwrap().status(),
            ItemStatus::Match
        );
        assert_eq!(store.load_all().await.unwrap()[0].actual_quantity(), None);
    }

    #[tokio::test]
    async fn write_to_closed_store_is_reported() {
        let store = Arc::new(InMemoryInventoryStore::new());
        let mut engine = ReconciliationEngine::new(store);
        let outcome = engine.create_item(code("7"), "Seven").await.unwrap();
        assert_eq!(outcome.persistence, PersistenceStatus::Failed(StoreError::Unavailable));
        assert!(engine.find_by_code(&code("7")).is_some());
    }

    #[tokio::test]
    async fn duplicate_create_fails_before_store() {
        let store = Arc::new(InMemoryInventoryStore::opened());
        let mut engine = loaded_engine(store.clone()).await;
        let writes = store.write_count();

        let err = engine.create_item(code("100"), "Again").await.unwrap_err();
        assert_eq!(err, DomainError::DuplicateCode("100".to_string()));
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn load_restores_items_and_metadata() {
        let store = Arc::new(InMemoryInventoryStore::opened());
        {
            let mut engine = loaded_engine(store.clone()).await;
            engine.accumulate_quantity(&code("100"), 4).await.unwrap();
        }

        let mut engine = ReconciliationEngine::new(store);
        assert_eq!(engine.load().await.unwrap(), 2);
        assert_eq!(engine.find_by_code(&code("100")).unwrap().actual_quantity(), Some(4));
        assert_eq!(engine.metadata().unwrap().source_name, "stock.xlsx");
    }

    #[tokio::test]
    async fn load_from_unopened_store_fails() {
        let mut engine = ReconciliationEngine::new(Arc::new(InMemoryInventoryStore::new()));
        assert_eq!(engine.load().await.unwrap_err(), StoreError::Unavailable);
    }

    #[tokio::test]
    async fn clear_all_purges_store() {
        let store = Arc::new(InMemoryInventoryStore::opened());
        let mut engine = loaded_engine(store.clone()).await;
        let outcome = engine.clear_all().await;
        assert_eq!(outcome.persistence, PersistenceStatus::Written);
        assert!(engine.collection().is_empty());
        assert!(engine.metadata().is_none());
        assert!(store.load_all().await.unwrap().is_empty());
        assert!(store.load_metadata().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_behind_queues_and_converges() {
        let store = Arc::new(InMemoryInventoryStore::opened());
        let mut engine = ReconciliationEngine::with_mode(store.clone(), PersistenceMode::WriteBehind);
        assert_eq!(engine.mode(), PersistenceMode::WriteBehind);

        let (items, meta) = dataset();
        assert_eq!(engine.bulk_replace(items, meta).await.persistence, PersistenceStatus::Queued);
        let outcome = engine.accumulate_quantity(&code("100"), 10).await.unwrap();
        assert_eq!(outcome.persistence, PersistenceStatus::Queued);

        engine.flush().await;
        let stored = store.load_all().await.unwrap();
        assert_eq!(stored[0].status(), ItemStatus::Match);
        assert!(engine.drain_failures().is_empty());
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn write_behind_failures_are_drained() {
        let store = Arc::new(InMemoryInventoryStore::opened());
        let mut engine = ReconciliationEngine::with_mode(store.clone(), PersistenceMode::WriteBehind);
        store.set_fail_writes(true);
        engine.create_item(code("1"), "One").await.unwrap();
        engine.flush().await;

        let failures = engine.drain_failures();
        assert_eq!(failures.len(), 1);
        assert!(engine.find_by_code(&code("1")).is_some());
    }
}
