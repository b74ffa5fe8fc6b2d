//! Ordered background writer for the inventory store.
//!
//! In write-behind mode the interactive path never waits for storage: each
//! mutation enqueues a [`StoreOp`] and returns. A single worker task applies
//! the operations strictly in order, so the store converges on the in-memory
//! state. Failed writes are logged and reported on a failure channel; they are
//! not retried.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use stocktake_inventory::{ImportMetadata, Item};

use crate::store::{InventoryStore, StoreError};

/// A single store write.
#[derive(Debug, Clone)]
pub enum StoreOp {
    Upsert(Item),
    ReplaceAll(Vec<Item>),
    Clear,
    SaveMetadata(ImportMetadata),
    ClearMetadata,
}

impl StoreOp {
    pub async fn apply<S>(&self, store: &S) -> Result<(), StoreError>
    where
        S: InventoryStore + ?Sized,
    {
        match self {
            StoreOp::Upsert(item) => store.upsert(item).await,
            StoreOp::ReplaceAll(items) => store.replace_all(items).await,
            StoreOp::Clear => store.clear().await,
            StoreOp::SaveMetadata(metadata) => store.save_metadata(metadata).await,
            StoreOp::ClearMetadata => store.clear_metadata().await,
        }
    }

    /// Short description for logs and notices.
    pub fn describe(&self) -> String {
        match self {
            StoreOp::Upsert(item) => format!("save item {}", item.code()),
            StoreOp::ReplaceAll(items) => format!("replace item set ({} items)", items.len()),
            StoreOp::Clear => "clear items".to_string(),
            StoreOp::SaveMetadata(m) => format!("save metadata for {}", m.source_name),
            StoreOp::ClearMetadata => "clear metadata".to_string(),
        }
    }
}

/// A write that failed after the in-memory change was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceFailure {
    pub operation: String,
    pub error: StoreError,
}

enum Message {
    Op(StoreOp),
    Flush(oneshot::Sender<()>),
}

/// Handle to the background writer task.
///
/// Dropping the handle closes the queue; the worker finishes pending writes
/// and exits.
#[derive(Debug)]
pub struct WriteBehind {
    tx: mpsc::UnboundedSender<Message>,
    failures: mpsc::UnboundedReceiver<PersistenceFailure>,
    worker: JoinHandle<()>,
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Message::Op(op) => f.debug_tuple("Op").field(op).finish(),
            Message::Flush(_) => f.write_str("Flush"),
        }
    }
}

impl WriteBehind {
    /// Start the worker. Must be called from within a tokio runtime.
    pub fn spawn<S>(store: Arc<S>) -> Self
    where
        S: InventoryStore + ?Sized + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        let (failure_tx, failures) = mpsc::unbounded_channel();

        let worker = tokio::spawn(async move {
            tracing::debug!("write-behind worker started");
            while let Some(message) = rx.recv().await {
                match message {
                    Message::Op(op) => {
                        if let Err(error) = op.apply(&*store).await {
                            tracing::error!(operation = %op.describe(), %error, "background store write failed");
                            let _ = failure_tx.send(PersistenceFailure {
                                operation: op.describe(),
                                error,
                            });
                        }
                    }
                    Message::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            tracing::debug!("write-behind worker stopped");
        });

        Self { tx, failures, worker }
    }

    pub fn enqueue(&self, op: StoreOp) -> Result<(), StoreError> {
        self.tx
            .send(Message::Op(op))
            .map_err(|_| StoreError::Backend("write-behind worker is not running".to_string()))
    }

    /// Wait until every write queued before this call has been attempted.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Message::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Failures reported since the last drain.
    pub fn drain_failures(&mut self) -> Vec<PersistenceFailure> {
        let mut out = Vec::new();
        while let Ok(failure) = self.failures.try_recv() {
            out.push(failure);
        }
        out
    }

    /// Close the queue and wait for the worker to finish pending writes.
    pub async fn shutdown(self) {
        let WriteBehind { tx, worker, .. } = self;
        drop(tx);
        if let Err(err) = worker.await {
            tracing::error!("write-behind worker panicked: {err:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryInventoryStore;
    use stocktake_core::ItemCode;

    fn item(code: &str, name: &str) -> Item {
        Item::imported(ItemCode::new(code).unwrap(), name, 1, 1.0)
    }

    #[tokio::test]
    async fn writes_apply_in_order() {
        let store = Arc::new(InMemoryInventoryStore::opened());
        let writer = WriteBehind::spawn(store.clone());
        writer.enqueue(StoreOp::Upsert(item("1", "first"))).unwrap();
        writer.enqueue(StoreOp::Clear).unwrap();
        writer.enqueue(StoreOp::Upsert(item("2", "second"))).unwrap();
        writer.enqueue(StoreOp::Upsert(item("2", "third"))).unwrap();
        writer.flush().await;

        let items = store.load_all().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name(), "third");
    }

    #[tokio::test]
    async fn failures_are_reported_not_retried() {
        let store = Arc::new(InMemoryInventoryStore::opened());
        store.set_fail_writes(true);
        let mut writer = WriteBehind::spawn(store.clone());
        writer.enqueue(StoreOp::Upsert(item("1", "a"))).unwrap();
        writer.flush().await;

        let failures = writer.drain_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].operation, "save item 1");
        assert!(writer.drain_failures().is_empty());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn shutdown_drains_queue() {
        let store = Arc::new(InMemoryInventoryStore::opened());
        let writer = WriteBehind::spawn(store.clone());
        for n in 0..20 {
            writer.enqueue(StoreOp::Upsert(item(&n.to_string(), "x"))).unwrap();
        }
        writer.shutdown().await;
        assert_eq!(store.load_all().await.unwrap().len(), 20);
    }
}
