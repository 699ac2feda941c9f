//! Per-file pipeline run: read → parse → validate → fill → transform.
//!
//! Loading is left to the caller so the same processed output can be
//! written to SQLite, exported, or just inspected.

use std::path::Path;

use bskt_core::ParsedFile;
use serde::Serialize;
use tracing::{info, warn};

use crate::cleaning::fill_missing;
use crate::config::PipelineConfig;
use crate::reader::{parse_file, ReadError};
use crate::transform::apply_transform;
use crate::validator::{validate_holdings, validate_metadata, ValidationReport};

/// Validation outcome for one fund record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordReport {
    pub block_index: usize,
    pub start_line: usize,
    pub metadata: ValidationReport,
    pub holdings: ValidationReport,
}

impl RecordReport {
    pub fn is_valid(&self) -> bool {
        self.metadata.valid && self.holdings.valid
    }
}

/// Parsed file after the cleaning stages, with per-record validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedFile {
    pub parsed: ParsedFile,
    pub reports: Vec<RecordReport>,
}

impl ProcessedFile {
    /// Records that failed either schema.
    pub fn invalid_records(&self) -> usize {
        self.reports.iter().filter(|r| !r.is_valid()).count()
    }
}

/// Validate, fill and transform every record of `parsed`.
///
/// Validation runs on the records as parsed; failures are reported, never
/// fatal. Records keep their order.
pub fn process(mut parsed: ParsedFile, config: &PipelineConfig) -> ProcessedFile {
    let mut reports = Vec::with_capacity(parsed.records.len());

    for record in &mut parsed.records {
        let report = RecordReport {
            block_index: record.block_index,
            start_line: record.start_line,
            metadata: validate_metadata(&record.metadata, &config.validate.metadata),
            holdings: validate_holdings(&record.holdings, &config.validate.holdings),
        };
        if !report.is_valid() {
            let errors: Vec<&str> = report
                .metadata
                .errors
                .iter()
                .chain(&report.holdings.errors)
                .map(String::as_str)
                .collect();
            warn!(
                block_index = record.block_index,
                start_line = record.start_line,
                errors = ?errors,
                "record failed validation"
            );
        }
        reports.push(report);

        let holdings = std::mem::take(&mut record.holdings);
        let holdings = fill_missing(holdings, &config.fill);
        record.holdings = apply_transform(holdings, &config.transform);
    }

    let processed = ProcessedFile { parsed, reports };
    info!(
        records = processed.parsed.records.len(),
        invalid = processed.invalid_records(),
        "processed records"
    );
    processed
}

/// Read, parse and process one file.
pub fn run_file(path: &Path, config: &PipelineConfig) -> Result<ProcessedFile, ReadError> {
    let parsed = parse_file(path, &config.parser)?;
    info!(
        path = %path.display(),
        blocks = parsed.block_count,
        records = parsed.records.len(),
        skipped = parsed.skipped_blocks(),
        "parsed file"
    );
    Ok(process(parsed, config))
}
