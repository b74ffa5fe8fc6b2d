//! Spreadsheet import/export.
//!
//! Row-level conversion ([`rows`]) and report building ([`report`]) are pure
//! and work on in-memory cells; [`xlsx`] is the thin file adapter on top.

pub mod error;
pub mod report;
pub mod rows;
pub mod xlsx;

pub use error::SpreadsheetError;
pub use report::{ReportCell, ReportDocument, ReportSheet, ReportSummary, export_report};
pub use rows::{Field, RawCell, RawRow, import_rows};
pub use xlsx::{ImportedDataset, default_report_file_name, import_workbook, read_workbook, write_report};
