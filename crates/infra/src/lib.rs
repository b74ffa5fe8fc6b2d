//! Infrastructure layer: durable store, background writer, reconciliation engine.

pub mod engine;
pub mod store;
pub mod write_behind;

pub use engine::{Outcome, PersistenceMode, PersistenceStatus, ReconciliationEngine};
pub use store::{InMemoryInventoryStore, InventoryStore, SqliteInventoryStore, StoreError};
pub use write_behind::{PersistenceFailure, StoreOp, WriteBehind};
