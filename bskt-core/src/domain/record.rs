//! Parser output: fund records and the per-file report.

use serde::Serialize;

use super::diagnostic::Diagnostic;
use super::table::HoldingsTable;
use super::value::{MetadataMap, MetadataValue};

/// One parsed block: typed metadata paired with its holdings table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundRecord {
    /// Index of the originating block in the input.
    pub block_index: usize,
    /// 1-based line number of the block's marker line.
    pub start_line: usize,
    pub metadata: MetadataMap,
    pub holdings: HoldingsTable,
}

impl FundRecord {
    /// Metadata value for `key`, treating a missing key as null.
    pub fn get(&self, key: &str) -> &MetadataValue {
        self.metadata.get(key).unwrap_or(&MetadataValue::Null)
    }

    /// Fund ticker from the metadata, if present.
    pub fn ticker(&self) -> Option<&str> {
        self.get("TICKER").as_str()
    }
}

/// Everything produced from one input: records in block order plus diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedFile {
    pub records: Vec<FundRecord>,
    pub diagnostics: Vec<Diagnostic>,
    /// Number of marker-delimited blocks found.
    pub block_count: usize,
    /// BLAKE3 hex digest of the input lines.
    pub source_hash: String,
}

impl ParsedFile {
    /// Blocks that produced no record because no header was found.
    pub fn skipped_blocks(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_skip()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::diagnostic::DiagnosticKind;

    #[test]
    fn missing_key_reads_as_null() {
        let mut metadata = MetadataMap::new();
        metadata.insert("TICKER".into(), MetadataValue::String("TST".into()));
        let record = FundRecord {
            block_index: 0,
            start_line: 1,
            metadata,
            holdings: HoldingsTable::empty(),
        };
        assert_eq!(record.ticker(), Some("TST"));
        assert!(record.get("NAV").is_null());
    }

    #[test]
    fn skipped_blocks_counts_missing_headers_only() {
        let parsed = ParsedFile {
            records: Vec::new(),
            diagnostics: vec![
                Diagnostic::new(0, 1, DiagnosticKind::MissingHeader),
                Diagnostic::new(1, 4, DiagnosticKind::EmptyMetadata),
                Diagnostic::new(2, 9, DiagnosticKind::MissingHeader),
            ],
            block_count: 3,
            source_hash: String::new(),
        };
        assert_eq!(parsed.skipped_blocks(), 2);
        assert!(parsed.is_empty());
    }
}
