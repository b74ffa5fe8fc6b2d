//! The in-memory item set.
//!
//! `ItemCollection` is the single source of truth for a session. It enforces
//! code uniqueness and is the only way to change an item's counted quantity.
//! Persistence is not its concern; callers mirror changes to a store.

use std::collections::HashMap;

use stocktake_core::{DomainError, DomainResult, Entity, ItemCode};

use crate::item::{ImportMetadata, Item};

#[derive(Debug, Clone, Default)]
pub struct ItemCollection {
    items: Vec<Item>,
    index: HashMap<ItemCode, usize>,
    metadata: Option<ImportMetadata>,
}

impl ItemCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from stored or imported parts.
    ///
    /// Order is preserved. If a code appears more than once the later item
    /// replaces the earlier one in place.
    pub fn from_parts(items: impl IntoIterator<Item = Item>, metadata: Option<ImportMetadata>) -> Self {
        let mut collection = Self {
            metadata,
            ..Self::default()
        };
        for item in items {
            collection.insert_or_replace(item);
        }
        collection
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in collection order (import order, scanned-in items appended).
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn metadata(&self) -> Option<&ImportMetadata> {
        self.metadata.as_ref()
    }

    /// Exact, case-sensitive lookup.
    pub fn find_by_code(&self, code: &ItemCode) -> Option<&Item> {
        self.index.get(code).map(|&idx| &self.items[idx])
    }

    pub fn contains(&self, code: &ItemCode) -> bool {
        self.index.contains_key(code)
    }

    /// Create an uncounted item with zero expectation.
    ///
    /// Fails with `DuplicateCode` (collection untouched) if the code exists.
    pub fn create_item(&mut self, code: ItemCode, name: &str) -> DomainResult<&Item> {
        if self.contains(&code) {
            return Err(DomainError::duplicate_code(code.into_inner()));
        }
        let item = Item::scanned(code, name)?;
        let idx = self.items.len();
        self.index.insert(item.code().clone(), idx);
        self.items.push(item);
        Ok(&self.items[idx])
    }

    /// Add `delta` to the counted quantity of `code`, floored at zero.
    pub fn accumulate_quantity(&mut self, code: &ItemCode, delta: i64) -> DomainResult<&Item> {
        let idx = *self
            .index
            .get(code)
            .ok_or_else(|| DomainError::not_found(code.as_str()))?;
        self.items[idx].apply_delta(delta);
        Ok(&self.items[idx])
    }

    /// Replace the whole item set and its metadata.
    pub fn bulk_replace(&mut self, items: Vec<Item>, metadata: Option<ImportMetadata>) {
        *self = Self::from_parts(items, metadata);
    }

    /// Empty the collection and reset metadata.
    pub fn clear_all(&mut self) {
        self.items.clear();
        self.index.clear();
        self.metadata = None;
    }

    fn insert_or_replace(&mut self, item: Item) {
        match self.index.get(item.id()) {
            Some(&idx) => self.items[idx] = item,
            None => {
                self.index.insert(item.id().clone(), self.items.len());
                self.items.push(item);
            }
        }
    }
}
