//! JSON and CSV export of parsed records.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use bskt_core::{FundRecord, HoldingsTable, ParsedFile};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a parsed file (records, diagnostics, provenance) to pretty JSON.
pub fn records_to_json(parsed: &ParsedFile) -> Result<String> {
    serde_json::to_string_pretty(parsed).context("failed to serialize parsed file to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export a holdings table as CSV, header first.
pub fn holdings_to_csv(table: &HoldingsTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    if table.width() > 0 {
        wtr.write_record(table.columns())?;
        for row in table.rows() {
            wtr.write_record(row)?;
        }
    }
    finish(wtr)
}

/// Export one metadata row per record. Columns are `FUND_INDEX` followed by
/// every metadata key in sorted order; missing and null values are empty.
pub fn metadata_to_csv(records: &[FundRecord]) -> Result<String> {
    let keys: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.metadata.keys().map(String::as_str))
        .collect();

    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["FUND_INDEX"];
    header.extend(keys.iter().copied());
    wtr.write_record(&header)?;

    for record in records {
        let mut row = vec![record.block_index.to_string()];
        row.extend(keys.iter().map(|k| record.get(k).to_string()));
        wtr.write_record(&row)?;
    }
    finish(wtr)
}
