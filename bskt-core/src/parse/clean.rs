//! Text normalization of holdings cells.

use crate::domain::HoldingsTable;

/// Trim, remove leading apostrophes and upper-case one cell.
///
/// Leading whitespace and apostrophes are stripped as one run, so applying
/// this twice gives the same result as applying it once.
pub fn normalize_text(cell: &str) -> String {
    cell.trim_start_matches(|c: char| c.is_whitespace() || c == '\'')
        .trim_end()
        .to_uppercase()
}

/// Normalize every non-numeric column of `table`. Numeric columns are untouched.
///
/// Cells go through [`normalize_text`], so a value whose text really starts
/// with an apostrophe after leading spaces (`" 'A"`) loses it too.
pub fn normalize_holdings(mut table: HoldingsTable) -> HoldingsTable {
    let kinds = table.column_kinds();
    for (idx, kind) in kinds.into_iter().enumerate() {
        if !kind.is_numeric() {
            table.map_column(idx, normalize_text);
        }
    }
    table
}
