//! Reconciliation report (export side).
//!
//! The report is built as a plain in-memory document so its contents can be
//! checked without touching a file; [`crate::xlsx::write_report`] renders it.

use chrono::{DateTime, Utc};

use stocktake_core::{DomainError, DomainResult};
use stocktake_inventory::{ImportMetadata, InventoryStats, Item, ItemStatus};

pub const DETAIL_SHEET: &str = "Inventory";
pub const SUMMARY_SHEET: &str = "Summary";

pub const DETAIL_HEADERS: [&str; 7] = [
    "Code",
    "Name",
    "Expected",
    "Actual",
    "Status",
    "Difference",
    "Unit cost",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

#[derive(Debug, Clone, PartialEq)]
pub enum ReportCell {
    Blank,
    Text(String),
    Number(f64),
}

impl From<&str> for ReportCell {
    fn from(value: &str) -> Self {
        ReportCell::Text(value.to_string())
    }
}

impl From<String> for ReportCell {
    fn from(value: String) -> Self {
        ReportCell::Text(value)
    }
}

impl From<f64> for ReportCell {
    fn from(value: f64) -> Self {
        ReportCell::Number(value)
    }
}

impl From<u64> for ReportCell {
    fn from(value: u64) -> Self {
        ReportCell::Number(value as f64)
    }
}

impl From<i64> for ReportCell {
    fn from(value: i64) -> Self {
        ReportCell::Number(value as f64)
    }
}

impl From<usize> for ReportCell {
    fn from(value: usize) -> Self {
        ReportCell::Number(value as f64)
    }
}

impl<T: Into<ReportCell>> From<Option<T>> for ReportCell {
    fn from(value: Option<T>) -> Self {
        value.map_or(ReportCell::Blank, Into::into)
    }
}

/// A named sheet. An empty `header` means the sheet has no header row.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSheet {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<ReportCell>>,
}

/// Totals shown on the summary sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub source_name: Option<String>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub exported_at: DateTime<Utc>,
    pub stats: InventoryStats,
    /// Σ expected × cost
    pub expected_value: f64,
    /// Σ actual-or-0 × cost
    pub actual_value: f64,
    /// Σ (actual-or-0 − expected) × cost
    pub variance_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub sheets: Vec<ReportSheet>,
    pub summary: ReportSummary,
}

impl ReportDocument {
    pub fn sheet(&self, name: &str) -> Option<&ReportSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

/// Build the two-sheet reconciliation report.
///
/// An empty item list is rejected: there is nothing to report.
pub fn export_report(
    items: &[Item],
    metadata: Option<&ImportMetadata>,
    exported_at: DateTime<Utc>,
) -> DomainResult<ReportDocument> {
    if items.is_empty() {
        return Err(DomainError::validation("nothing to export: no items loaded"));
    }

    let summary = ReportSummary {
        source_name: metadata.map(|m| m.source_name.clone()),
        loaded_at: metadata.map(|m| m.loaded_at),
        exported_at,
        stats: InventoryStats::of(items),
        expected_value: items.iter().map(Item::expected_value).sum(),
        actual_value: items.iter().map(Item::actual_value).sum(),
        variance_value: items.iter().map(Item::variance_value).sum(),
    };

    Ok(ReportDocument {
        sheets: vec![detail_sheet(items), summary_sheet(&summary)],
        summary,
    })
}

fn detail_sheet(items: &[Item]) -> ReportSheet {
    let rows = items
        .iter()
        .map(|item| {
            vec![
                item.code().as_str().into(),
                item.name().into(),
                item.expected_quantity().into(),
                item.actual_quantity().into(),
                item.status().label().into(),
                item.difference().into(),
                item.unit_cost().into(),
            ]
        })
        .collect();

    ReportSheet {
        name: DETAIL_SHEET.to_string(),
        header: DETAIL_HEADERS.iter().map(|h| h.to_string()).collect(),
        rows,
    }
}

fn summary_sheet(summary: &ReportSummary) -> ReportSheet {
    let stamp = |at: DateTime<Utc>| ReportCell::Text(at.format(TIMESTAMP_FORMAT).to_string());
    let pair = |label: &str, value: ReportCell| vec![ReportCell::from(label), value];
    let blank = || vec![ReportCell::Blank, ReportCell::Blank];
    let stats = &summary.stats;

    let rows = vec![
        pair("Inventory report", ReportCell::Blank),
        pair(
            "Source file",
            summary.source_name.as_deref().unwrap_or("Unknown").into(),
        ),
        pair(
            "Loaded at",
            summary.loaded_at.map_or_else(|| "Unknown".into(), stamp),
        ),
        pair("Exported at", stamp(summary.exported_at)),
        blank(),
        pair("Statistics", ReportCell::Blank),
        pair("Total items", stats.total.into()),
        pair("Checked", stats.checked.into()),
        pair(ItemStatus::Match.label(), stats.matched.into()),
        pair(ItemStatus::Shortage.label(), stats.shortage.into()),
        pair(ItemStatus::Excess.label(), stats.excess.into()),
        blank(),
        pair("Financials", ReportCell::Blank),
        pair("Total expected value", summary.expected_value.into()),
        pair("Total actual value", summary.actual_value.into()),
        pair("Variance value", summary.variance_value.into()),
    ];

    ReportSheet {
        name: SUMMARY_SHEET.to_string(),
        header: Vec::new(),
        rows,
    }
}
