use std::path::PathBuf;

use stocktake_core::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("failed to open workbook {}: {message}", .path.display())]
    Open { path: PathBuf, message: String },

    #[error("workbook {} contains no sheets", .0.display())]
    NoSheets(PathBuf),

    #[error("first sheet of {} has no header row", .0.display())]
    NoHeaderRow(PathBuf),

    #[error("failed to write workbook {}: {message}", .path.display())]
    Write { path: PathBuf, message: String },

    #[error(transparent)]
    Domain(#[from] DomainError),
}
