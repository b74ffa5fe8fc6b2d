//! Read-only views over an [`ItemCollection`].
//!
//! Projections are disposable: they hold no state of their own and are
//! recomputed after every mutation, whatever renders them.

use crate::collection::ItemCollection;
use crate::item::{Item, ItemStatus};

/// Status filter control.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(ItemStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: ItemStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

impl core::str::FromStr for StatusFilter {
    type Err = stocktake_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        s.parse::<ItemStatus>().map(StatusFilter::Only)
    }
}

/// Row ordering for the item list.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Collection order.
    #[default]
    Import,
    Code,
    Name,
    /// Discrepancies first, then unchecked, then matches.
    Status,
}

impl core::str::FromStr for SortKey {
    type Err = stocktake_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "import" => Ok(SortKey::Import),
            "code" => Ok(SortKey::Code),
            "name" => Ok(SortKey::Name),
            "status" => Ok(SortKey::Status),
            other => Err(stocktake_core::DomainError::validation(format!(
                "unknown sort key '{other}'"
            ))),
        }
    }
}

/// Client-supplied view parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewQuery {
    pub status: StatusFilter,
    /// Case-insensitive substring matched against name or code. Blank = all.
    pub text: String,
    pub sort: SortKey,
}

impl ViewQuery {
    fn matches(&self, item: &Item, needle: &str) -> bool {
        if !self.status.matches(item.status()) {
            return false;
        }
        needle.is_empty()
            || item.name().to_lowercase().contains(needle)
            || item.code().as_str().to_lowercase().contains(needle)
    }
}

/// Aggregate counts over the whole collection (filters do not apply).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InventoryStats {
    pub total: usize,
    pub checked: usize,
    pub unchecked: usize,
    pub matched: usize,
    pub shortage: usize,
    pub excess: usize,
    /// `shortage + excess`.
    pub discrepancies: usize,
    /// `checked / total` in `[0, 1]`; zero for an empty collection.
    pub progress: f64,
}

impl InventoryStats {
    pub fn of<'a>(items: impl IntoIterator<Item = &'a Item>) -> Self {
        let mut stats = InventoryStats::default();
        for item in items {
            stats.total += 1;
            match item.status() {
                ItemStatus::Unchecked => stats.unchecked += 1,
                ItemStatus::Match => stats.matched += 1,
                ItemStatus::Shortage => stats.shortage += 1,
                ItemStatus::Excess => stats.excess += 1,
            }
        }
        stats.checked = stats.total - stats.unchecked;
        stats.discrepancies = stats.shortage + stats.excess;
        stats.progress = if stats.total == 0 {
            0.0
        } else {
            stats.checked as f64 / stats.total as f64
        };
        stats
    }

    pub fn count(&self, status: ItemStatus) -> usize {
        match status {
            ItemStatus::Unchecked => self.unchecked,
            ItemStatus::Match => self.matched,
            ItemStatus::Shortage => self.shortage,
            ItemStatus::Excess => self.excess,
        }
    }

    pub fn progress_percent(&self) -> f64 {
        self.progress * 100.0
    }
}

/// Filtered, sorted rows plus collection-wide statistics.
#[derive(Debug, Clone)]
pub struct ItemView<'a> {
    pub rows: Vec<&'a Item>,
    pub stats: InventoryStats,
}

/// One line of the results (discrepancy) view.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscrepancyRow {
    pub code: String,
    pub name: String,
    pub status: ItemStatus,
    pub expected: u64,
    pub actual: u64,
    pub difference: i64,
}

pub fn project<'a>(collection: &'a ItemCollection, query: &ViewQuery) -> ItemView<'a> {
    let needle = query.text.trim().to_lowercase();
    let mut rows: Vec<&Item> = collection
        .iter()
        .filter(|item| query.matches(item, &needle))
        .collect();

    match query.sort {
        SortKey::Import => {}
        SortKey::Code => rows.sort_by(|a, b| a.code().cmp(b.code())),
        SortKey::Name => rows.sort_by_key(|item| item.name().to_lowercase()),
        SortKey::Status => rows.sort_by_key(|item| status_rank(item.status())),
    }

    ItemView {
        rows,
        stats: InventoryStats::of(collection.iter()),
    }
}

/// Items whose status is `Shortage` or `Excess`, in collection order.
pub fn discrepancies(collection: &ItemCollection) -> Vec<DiscrepancyRow> {
    collection
        .iter()
        .filter(|item| item.status().is_discrepancy())
        .map(|item| DiscrepancyRow {
            code: item.code().to_string(),
            name: item.name().to_string(),
            status: item.status(),
            expected: item.expected_quantity(),
            actual: item.actual_quantity().unwrap_or(0),
            difference: item.difference().unwrap_or(0),
        })
        .collect()
}

fn status_rank(status: ItemStatus) -> u8 {
    match status {
        ItemStatus::Shortage => 0,
        ItemStatus::Excess => 1,
        ItemStatus::Unchecked => 2,
        ItemStatus::Match => 3,
    }
}
