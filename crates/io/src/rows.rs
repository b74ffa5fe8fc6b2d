//! Spreadsheet rows to items.
//!
//! Columns are recognised by header fragments rather than position, so sheets
//! exported from different accounting tools (Ukrainian or English headers, any
//! column order) import the same way.

use std::collections::HashMap;

use stocktake_core::{DomainError, DomainResult, ItemCode};
use stocktake_inventory::Item;

/// A single cell value as read from a sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
}

impl RawCell {
    pub fn text(s: impl Into<String>) -> Self {
        RawCell::Text(s.into())
    }

    fn as_string(&self) -> Option<String> {
        match self {
            RawCell::Empty => None,
            RawCell::Text(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            RawCell::Number(n) => Some(render_number(*n)),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            RawCell::Empty => None,
            RawCell::Text(s) => s.trim().parse::<f64>().ok(),
            RawCell::Number(n) => Some(*n),
        }
    }
}

/// Whole numbers print without a fractional part (`100`, not `100.0`).
fn render_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// One data row: `(header, cell)` pairs in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    cells: Vec<(String, RawCell)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, header: impl Into<String>, cell: RawCell) -> Self {
        self.push(header, cell);
        self
    }

    pub fn push(&mut self, header: impl Into<String>, cell: RawCell) {
        self.cells.push((header.into(), cell));
    }

    pub fn cells(&self) -> &[(String, RawCell)] {
        &self.cells
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, c)| c.as_string().is_none())
    }
}

/// Item field a column can map to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Code,
    Name,
    Expected,
    Cost,
}

const HEADER_FRAGMENTS: &[(Field, &[&str])] = &[
    (Field::Code, &["артикул", "sku", "code"]),
    (Field::Name, &["назва", "name"]),
    (Field::Expected, &["залишок", "expected", "stock"]),
    (Field::Cost, &["собівартість", "cost"]),
];

impl Field {
    /// Case-insensitive substring match; the first field in
    /// code/name/expected/cost order wins.
    pub fn for_header(header: &str) -> Option<Field> {
        let header = header.to_lowercase();
        HEADER_FRAGMENTS
            .iter()
            .find(|(_, fragments)| fragments.iter().any(|f| header.contains(f)))
            .map(|(field, _)| *field)
    }
}

#[derive(Debug, Default)]
struct Extracted {
    code: Option<String>,
    name: Option<String>,
    expected: Option<f64>,
    cost: Option<f64>,
}

fn extract(row: &RawRow) -> Extracted {
    let mut out = Extracted::default();
    for (header, cell) in row.cells() {
        let Some(field) = Field::for_header(header) else {
            continue;
        };
        // First non-empty column per field.
        match field {
            Field::Code if out.code.is_none() => out.code = cell.as_string(),
            Field::Name if out.name.is_none() => out.name = cell.as_string(),
            Field::Expected if out.expected.is_none() => out.expected = cell.as_f64(),
            Field::Cost if out.cost.is_none() => out.cost = cell.as_f64(),
            _ => {}
        }
    }
    out
}

/// Fractions are truncated; negative, non-finite and missing values become 0.
fn expected_quantity(value: Option<f64>) -> u64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v.trunc() as u64,
        _ => 0,
    }
}

/// Convert sheet rows into items.
///
/// Rows without a usable code are dropped. A missing name falls back to the
/// code, missing numbers to 0. When a code repeats, the later row replaces the
/// earlier one but keeps its position. An empty result is
/// [`DomainError::ImportEmpty`].
pub fn import_rows<I>(rows: I) -> DomainResult<Vec<Item>>
where
    I: IntoIterator<Item = RawRow>,
{
    let mut items: Vec<Item> = Vec::new();
    let mut index: HashMap<ItemCode, usize> = HashMap::new();
    let mut dropped = 0usize;

    for row in rows {
        let fields = extract(&row);
        let Some(code) = fields.code.and_then(|c| ItemCode::new(c).ok()) else {
            if !row.is_blank() {
                dropped += 1;
            }
            continue;
        };

        let item = Item::imported(
            code.clone(),
            fields.name.unwrap_or_default(),
            expected_quantity(fields.expected),
            fields.cost.unwrap_or(0.0),
        );

        match index.get(&code) {
            Some(&idx) => {
                tracing::warn!(code = %code, "duplicate code in import; later row wins");
                items[idx] = item;
            }
            None => {
                index.insert(code, items.len());
                items.push(item);
            }
        }
    }

    if dropped > 0 {
        tracing::warn!(rows = dropped, "rows without an item code were skipped");
    }
    if items.is_empty() {
        return Err(DomainError::ImportEmpty);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(code: RawCell, name: &str, expected: RawCell, cost: RawCell) -> RawRow {
        RawRow::new()
            .with("Артикул", code)
            .with("Назва товару", RawCell::text(name))
            .with("Залишок", expected)
            .with("Собівартість, грн", cost)
    }

    #[test]
    fn header_fragments_match_case_insensitively() {
        assert_eq!(Field::for_header("АРТИКУЛ"), Some(Field::Code));
        assert_eq!(Field::for_header("Item SKU"), Some(Field::Code));
        assert_eq!(Field::for_header("Product name"), Some(Field::Name));
        assert_eq!(Field::for_header("In stock"), Some(Field::Expected));
        assert_eq!(Field::for_header("Unit cost"), Some(Field::Cost));
        assert_eq!(Field::for_header("Actual"), None);
        assert_eq!(Field::for_header("Назва артикулу"), Some(Field::Code));
    }

    #[test]
    fn imports_ukrainian_sheet() {
        let items = import_rows(vec![
            row(RawCell::Number(100.0), "Bolt", RawCell::Number(10.0), RawCell::Number(2.5)),
            row(RawCell::text("200"), "Nut", RawCell::text("5"), RawCell::text("1.0")),
        ])
        .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].code().as_str(), "100");
        assert_eq!(items[0].expected_quantity(), 10);
        assert_eq!(items[0].unit_cost(), 2.5);
        assert_eq!(items[1].name(), "Nut");
        assert_eq!(items[1].expected_quantity(), 5);
        assert_eq!(items[1].actual_quantity(), None);
    }

    #[test]
    fn column_order_does_not_matter() {
        let items = import_rows(vec![
            RawRow::new()
                .with("cost", RawCell::Number(3.0))
                .with("name", RawCell::text("Washer"))
                .with("code", RawCell::text("W-1"))
                .with("expected", RawCell::Number(7.0)),
        ])
        .unwrap();
        assert_eq!(items[0].code().as_str(), "W-1");
        assert_eq!(items[0].expected_quantity(), 7);
        assert_eq!(items[0].unit_cost(), 3.0);
    }

    #[test]
    fn rows_without_code_are_dropped() {
        let items = import_rows(vec![
            row(RawCell::Empty, "Note row", RawCell::Empty, RawCell::Empty),
            row(RawCell::text("   "), "Blank code", RawCell::Number(1.0), RawCell::Empty),
            row(RawCell::text("1"), "One", RawCell::Number(1.0), RawCell::Empty),
        ])
        .unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn missing_fields_default() {
        let items = import_rows(vec![RawRow::new().with("SKU", RawCell::text("X"))]).unwrap();
        assert_eq!(items[0].name(), "X");
        assert_eq!(items[0].expected_quantity(), 0);
        assert_eq!(items[0].unit_cost(), 0.0);
    }

    #[test]
    fn bad_numbers_become_zero_and_floats_truncate() {
        let items = import_rows(vec![
            row(RawCell::text("a"), "A", RawCell::text("lots"), RawCell::Number(-4.0)),
            row(RawCell::text("b"), "B", RawCell::Number(7.9), RawCell::text("n/a")),
            row(RawCell::text("c"), "C", RawCell::Number(-3.0), RawCell::Number(1.25)),
        ])
        .unwrap();
        assert_eq!(items[0].expected_quantity(), 0);
        assert_eq!(items[0].unit_cost(), 0.0);
        assert_eq!(items[1].expected_quantity(), 7);
        assert_eq!(items[1].unit_cost(), 0.0);
        assert_eq!(items[2].expected_quantity(), 0);
    }

    #[test]
    fn non_integral_numeric_code_keeps_fraction() {
        let items = import_rows(vec![RawRow::new().with("code", RawCell::Number(12.5))]).unwrap();
        assert_eq!(items[0].code().as_str(), "12.5");
    }

    #[test]
    fn duplicate_code_last_row_wins_in_first_position() {
        let items = import_rows(vec![
            row(RawCell::text("1"), "First", RawCell::Number(1.0), RawCell::Empty),
            row(RawCell::text("2"), "Two", RawCell::Number(2.0), RawCell::Empty),
            row(RawCell::text("1"), "Again", RawCell::Number(9.0), RawCell::Empty),
        ])
        .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name(), "Again");
        assert_eq!(items[0].expected_quantity(), 9);
    }

    #[test]
    fn empty_result_is_import_empty() {
        assert_eq!(import_rows(Vec::new()).unwrap_err(), DomainError::ImportEmpty);
        let err = import_rows(vec![RawRow::new().with("Comment", RawCell::text("hello"))]).unwrap_err();
        assert_eq!(err, DomainError::ImportEmpty);
    }
}
