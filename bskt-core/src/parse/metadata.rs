//! Metadata extraction from the lines preceding the holdings header.
//!
//! The first metadata line is positional:
//!
//! | field | key               |
//! |-------|-------------------|
//! | 0 / 1 | `field[0]` → `field[1]` (normally `TRADE_DATE`) |
//! | 2     | `SS_LONG_CODE`    |
//! | 4     | `FULL_NAME`       |
//! | 5     | `TICKER`          |
//! | 7     | `BASE_CURRENCY`   |
//!
//! Fields 3 and 6 are reserved columns of the file format and are skipped.
//! Every later line is a flat run of `key,value,key,value,...` cells.

use std::collections::BTreeMap;

use super::normalize::comparison_form;

/// Key → raw string value, before type coercion.
pub type RawMetadata = BTreeMap<String, String>;

/// Positional keys of the first metadata line (field index, key).
pub const POSITIONAL_KEYS: [(usize, &str); 4] = [
    (2, "SS_LONG_CODE"),
    (4, "FULL_NAME"),
    (5, "TICKER"),
    (7, "BASE_CURRENCY"),
];

/// Split a single line into CSV fields, honoring double-quote escaping.
///
/// A blank line yields no fields. The reader is flexible and the input is
/// already UTF-8, so malformed quoting is read leniently rather than
/// returned as an error.
pub fn split_csv_line(line: &str) -> Result<Vec<String>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());

    match reader.records().next() {
        Some(record) => Ok(record?.iter().map(str::to_string).collect()),
        None => Ok(Vec::new()),
    }
}

fn metadata_key(raw: &str) -> String {
    comparison_form(raw)
}

/// Parse metadata lines into a raw key/value map. Later keys overwrite earlier ones.
pub fn extract_metadata(metadata_lines: &[String]) -> Result<RawMetadata, csv::Error> {
    let mut metadata = RawMetadata::new();
    let Some((first, rest)) = metadata_lines.split_first() else {
        return Ok(metadata);
    };

    let fields = split_csv_line(first)?;
    if fields.len() >= 2 {
        let key = metadata_key(&fields[0]);
        if !key.is_empty() {
            metadata.insert(key, fields[1].clone());
        }
    }
    for (idx, key) in POSITIONAL_KEYS {
        if let Some(value) = fields.get(idx) {
            metadata.insert(key.to_string(), value.clone());
        }
    }

    for line in rest {
        let fields = split_csv_line(line)?;
        for pair in fields.chunks_exact(2) {
            let key = metadata_key(&pair[0]);
            if key.is_empty() {
                continue;
            }
            metadata.insert(key, pair[1].clone());
        }
    }

    Ok(metadata)
}
