//! Excel workbook adapter.
//!
//! Reading goes through `calamine` (first sheet only, first row is the
//! header); writing goes through `rust_xlsxwriter`.

use std::fmt;
use std::path::Path;

use calamine::{Data, Reader, Sheets, open_workbook_auto};
use chrono::{DateTime, TimeZone, Utc};
use rust_xlsxwriter::{Format, Workbook};

use stocktake_inventory::{ImportMetadata, Item};

use crate::error::SpreadsheetError;
use crate::report::{ReportCell, ReportDocument};
use crate::rows::{RawCell, RawRow, import_rows};

/// Items parsed from a workbook plus the metadata describing the load.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedDataset {
    pub items: Vec<Item>,
    pub metadata: ImportMetadata,
}

fn raw_cell(cell: &Data) -> RawCell {
    match cell {
        Data::Empty => RawCell::Empty,
        Data::String(s) => RawCell::Text(s.clone()),
        Data::Float(v) => RawCell::Number(*v),
        Data::Int(v) => RawCell::Number(*v as f64),
        // Dates come through as serial numbers, like any other numeric cell.
        Data::DateTime(dt) => RawCell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => RawCell::Text(s.clone()),
        Data::Bool(_) | Data::Error(_) => RawCell::Empty,
    }
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Read the first sheet of a workbook (xlsx, xls, xlsb, ods) as header-keyed rows.
///
/// Fully blank rows are skipped.
pub fn read_workbook(path: &Path) -> Result<Vec<RawRow>, SpreadsheetError> {
    let open_error = |e: calamine::Error| SpreadsheetError::Open {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut workbook: Sheets<_> = open_workbook_auto(path).map_err(open_error)?;
    let Some(first) = workbook.sheet_names().first().cloned() else {
        return Err(SpreadsheetError::NoSheets(path.to_path_buf()));
    };
    let range = workbook.worksheet_range(&first).map_err(open_error)?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(cells) if cells.iter().any(|c| !matches!(c, Data::Empty)) => {
            cells.iter().map(header_text).collect()
        }
        _ => return Err(SpreadsheetError::NoHeaderRow(path.to_path_buf())),
    };

    let out: Vec<RawRow> = rows
        .map(|cells| {
            let mut row = RawRow::new();
            for (header, cell) in headers.iter().zip(cells) {
                row.push(header.clone(), raw_cell(cell));
            }
            row
        })
        .filter(|row| !row.is_blank())
        .collect();

    tracing::debug!(path = %path.display(), sheet = %first, rows = out.len(), "workbook read");
    Ok(out)
}

/// Read and parse a workbook into items.
///
/// The metadata's source name is the file name; the item count is taken after
/// duplicate codes have been merged.
pub fn import_workbook(path: &Path, loaded_at: DateTime<Utc>) -> Result<ImportedDataset, SpreadsheetError> {
    let rows = read_workbook(path)?;
    let row_count = rows.len();
    let items = import_rows(rows)?;

    let source_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    tracing::info!(
        source = %source_name,
        rows = row_count,
        items = items.len(),
        "workbook imported"
    );

    let metadata = ImportMetadata::new(source_name, loaded_at, items.len());
    Ok(ImportedDataset { items, metadata })
}

/// Write a report document to `path`, one worksheet per sheet, bold header row.
pub fn write_report(doc: &ReportDocument, path: &Path) -> Result<(), SpreadsheetError> {
    let write_error = |e: rust_xlsxwriter::XlsxError| SpreadsheetError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    for sheet in &doc.sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name).map_err(write_error)?;

        let mut row_idx: u32 = 0;
        if !sheet.header.is_empty() {
            for (col, title) in sheet.header.iter().enumerate() {
                worksheet
                    .write_string_with_format(row_idx, col as u16, title, &bold)
                    .map_err(write_error)?;
            }
            row_idx += 1;
        }

        for cells in &sheet.rows {
            for (col, cell) in cells.iter().enumerate() {
                let col = col as u16;
                match cell {
                    ReportCell::Blank => {}
                    ReportCell::Text(s) => {
                        worksheet.write_string(row_idx, col, s).map_err(write_error)?;
                    }
                    ReportCell::Number(n) => {
                        worksheet.write_number(row_idx, col, *n).map_err(write_error)?;
                    }
                }
            }
            row_idx += 1;
        }
    }

    workbook.save(path).map_err(write_error)?;
    tracing::info!(path = %path.display(), sheets = doc.sheets.len(), "report written");
    Ok(())
}

/// `Inventory_YYYYMMDD_HHMM.xlsx` in the timezone of `now`.
pub fn default_report_file_name<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    now.format("Inventory_%Y%m%d_%H%M.xlsx").to_string()
}
