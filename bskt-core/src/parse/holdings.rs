//! Holdings table construction from the header line onward.

use crate::domain::HoldingsTable;

use super::normalize::strip_quote_prefix;

/// Parse `holdings_lines` (header first) as one CSV document.
///
/// Rows are reconciled to the header width by [`HoldingsTable::from_parts`].
/// Empty input yields an empty table. Ragged rows and stray quotes are read
/// leniently, so the error path only covers the reader's own failures.
pub fn build_holdings(holdings_lines: &[String]) -> Result<HoldingsTable, csv::Error> {
    if holdings_lines.is_empty() {
        return Ok(HoldingsTable::empty());
    }

    let document = holdings_lines.join("\n");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(document.as_bytes());

    let mut records = reader.records();
    let columns: Vec<String> = match records.next() {
        Some(header) => header?
            .iter()
            .map(|name| strip_quote_prefix(name.trim()).to_string())
            .collect(),
        None => return Ok(HoldingsTable::empty()),
    };

    let mut rows = Vec::new();
    for record in records {
        rows.push(record?.iter().map(str::to_string).collect());
    }

    Ok(HoldingsTable::from_parts(columns, rows))
}
