//! Block-structured record parsing.
//!
//! Raw lines flow through the stages below, one block at a time:
//!
//! 1. [`split::split_blocks`] partitions the input at marker lines
//! 2. [`header::locate_header`] finds the holdings header inside a block
//! 3. [`metadata::extract_metadata`] reads the lines above the header
//! 4. [`coerce::coerce_metadata`] types the metadata through the registry
//! 5. [`holdings::build_holdings`] reads the header and rows below it
//! 6. [`clean::normalize_holdings`] normalizes text columns
//!
//! Blocks are independent. A failure inside one block is recorded as a
//! [`Diagnostic`] and never aborts the rest of the file.

pub mod clean;
pub mod coerce;
pub mod header;
pub mod holdings;
pub mod metadata;
pub mod normalize;
pub mod split;
pub mod timestamp;

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ParserConfig;
use crate::domain::{Diagnostic, DiagnosticKind, FundRecord, HoldingsTable, ParsedFile};

use split::Block;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to encode row {row} as CSV: {reason}")]
    RowEncoding { row: usize, reason: String },
}

/// Result of parsing a single block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockOutcome {
    /// `None` when the block was skipped.
    pub record: Option<FundRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse one block into a fund record.
pub fn parse_block(block: &Block<'_>, config: &ParserConfig) -> BlockOutcome {
    let mut outcome = BlockOutcome::default();
    let start_line = block.start_line();
    let report = |kind: DiagnosticKind| Diagnostic::new(block.index, start_line, kind);

    let Some(header_idx) = header::locate_header(block.lines, &config.header_markers) else {
        warn!(
            block_index = block.index,
            start_line, "no holdings header found, skipping block"
        );
        outcome.diagnostics.push(report(DiagnosticKind::MissingHeader));
        return outcome;
    };

    let (metadata_lines, holdings_lines) = block.lines.split_at(header_idx);

    if metadata_lines.is_empty() {
        warn!(block_index = block.index, start_line, "no metadata lines in block");
        outcome.diagnostics.push(report(DiagnosticKind::EmptyMetadata));
    }

    let raw = match metadata::extract_metadata(metadata_lines) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(block_index = block.index, start_line, error = %e, "failed to read metadata");
            outcome.diagnostics.push(report(DiagnosticKind::MalformedMetadata {
                reason: e.to_string(),
            }));
            Default::default()
        }
    };

    let coerced = coerce::coerce_metadata(&raw, &config.types, &config.null_sentinels);
    for failure in coerced.failures {
        debug!(
            block_index = block.index,
            start_line,
            key = %failure.key,
            raw = %failure.raw,
            expected = %failure.target,
            "metadata value did not coerce, using null"
        );
        outcome.diagnostics.push(report(DiagnosticKind::CoercionFallback {
            key: failure.key,
            raw: failure.raw,
            target: failure.target,
        }));
    }

    let holdings = match holdings::build_holdings(holdings_lines) {
        Ok(table) => clean::normalize_holdings(table),
        Err(e) => {
            warn!(block_index = block.index, start_line, error = %e, "failed to parse holdings block");
            outcome.diagnostics.push(report(DiagnosticKind::MalformedHoldings {
                reason: e.to_string(),
            }));
            HoldingsTable::empty()
        }
    };

    outcome.record = Some(FundRecord {
        block_index: block.index,
        start_line,
        metadata: coerced.values,
        holdings,
    });
    outcome
}

/// BLAKE3 digest over the stored lines, newline-terminated.
fn hash_lines(lines: &[String]) -> String {
    let mut hasher = blake3::Hasher::new();
    for line in lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}

/// Parse raw text lines into fund records.
///
/// Trailing line endings are removed; everything else about each line is
/// preserved until the per-field normalization steps.
pub fn parse_lines<S: AsRef<str>>(lines: &[S], config: &ParserConfig) -> ParsedFile {
    let stored: Vec<String> = lines
        .iter()
        .map(|l| normalize::strip_line_ending(l.as_ref()).to_string())
        .collect();

    let blocks = split::split_blocks(&stored, &config.start_marker);

    let outcomes: Vec<BlockOutcome> = if config.parallel {
        // Indexed parallel collect keeps block order.
        blocks
            .par_iter()
            .map(|block| parse_block(block, config))
            .collect()
    } else {
        blocks.iter().map(|block| parse_block(block, config)).collect()
    };

    let mut parsed = ParsedFile {
        block_count: blocks.len(),
        source_hash: hash_lines(&stored),
        ..Default::default()
    };
    for outcome in outcomes {
        parsed.diagnostics.extend(outcome.diagnostics);
        if let Some(record) = outcome.record {
            parsed.records.push(record);
        }
    }

    info!(
        lines = stored.len(),
        blocks = parsed.block_count,
        records = parsed.records.len(),
        skipped = parsed.skipped_blocks(),
        "parsed basket input"
    );
    parsed
}

/// Re-encode one tokenized row as a CSV line.
pub fn encode_row<S: AsRef<str>>(row: &[S], row_index: usize) -> Result<String, ParseError> {
    if row.is_empty() {
        return Ok(String::new());
    }
    let encoding_error = |reason: String| ParseError::RowEncoding {
        row: row_index,
        reason,
    };

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    wtr.write_record(row.iter().map(|c| c.as_ref()))
        .map_err(|e| encoding_error(e.to_string()))?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| encoding_error(e.to_string()))?;
    let line = String::from_utf8(bytes).map_err(|e| encoding_error(e.to_string()))?;
    Ok(normalize::strip_line_ending(&line).to_string())
}

/// Parse already-tokenized rows (for example from a tab-delimited reader).
pub fn parse_rows<R, S>(rows: &[R], config: &ParserConfig) -> Result<ParsedFile, ParseError>
where
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let lines = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| encode_row(row.as_ref(), idx))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parse_lines(&lines, config))
}
