use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use stocktake_inventory::{ImportMetadata, Item};

use super::r#trait::{InventoryStore, StoreError};

#[derive(Debug, Default)]
struct MemoryState {
    items: Vec<Item>,
    metadata: Option<ImportMetadata>,
}

/// In-memory inventory store.
///
/// Intended for tests/dev. Like the durable store it must be opened before
/// use, and writes can be made to fail on demand.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    opened: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
    state: RwLock<MemoryState>,
}

impl InMemoryInventoryStore {
    /// A closed store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that is already open.
    pub fn opened() -> Self {
        let store = Self::new();
        store.open();
        store
    }

    pub fn open(&self) {
        self.opened.store(true, Ordering::SeqCst);
    }

    pub fn close(&self) {
        self.opened.store(false, Ordering::SeqCst);
    }

    /// Make every subsequent write fail with a backend error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.opened.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }

    fn write<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> Result<R, StoreError> {
        self.ensure_open()?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected write failure".to_string()));
        }
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        let out = f(&mut state);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(out)
    }

    fn read<R>(&self, f: impl FnOnce(&MemoryState) -> R) -> Result<R, StoreError> {
        self.ensure_open()?;
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        Ok(f(&state))
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn load_all(&self) -> Result<Vec<Item>, StoreError> {
        self.read(|s| s.items.clone())
    }

    async fn upsert(&self, item: &Item) -> Result<(), StoreError> {
        self.write(|s| match s.items.iter().position(|i| i.code() == item.code()) {
            Some(idx) => s.items[idx] = item.clone(),
            None => s.items.push(item.clone()),
        })
    }

    async fn replace_all(&self, items: &[Item]) -> Result<(), StoreError> {
        // Swapped under a single write lock.
        self.write(|s| s.items = items.to_vec())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.write(|s| s.items.clear())
    }

    async fn load_metadata(&self) -> Result<Option<ImportMetadata>, StoreError> {
        self.read(|s| s.metadata.clone())
    }

    async fn save_metadata(&self, metadata: &ImportMetadata) -> Result<(), StoreError> {
        self.write(|s| s.metadata = Some(metadata.clone()))
    }

    async fn clear_metadata(&self) -> Result<(), StoreError> {
        self.write(|s| s.metadata = None)
    }
}
