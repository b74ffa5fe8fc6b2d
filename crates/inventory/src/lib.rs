//! Inventory reconciliation domain.
//!
//! This crate contains the business rules for a stock count, implemented purely
//! as deterministic domain logic (no IO, no storage, no rendering):
//!
//! - [`item`]: the item record and the status derivation rule
//! - [`quantity`]: the typed-digits quantity entry convention
//! - [`collection`]: the in-memory item set with its uniqueness invariant
//! - [`projection`]: read-only filtered views and aggregate statistics

pub mod collection;
pub mod item;
pub mod projection;
pub mod quantity;

pub use collection::ItemCollection;
pub use item::{ImportMetadata, Item, ItemStatus};
pub use projection::{
    DiscrepancyRow, InventoryStats, ItemView, SortKey, StatusFilter, ViewQuery, discrepancies,
    project,
};
pub use quantity::QuantityEntry;
