//! BSKT Core — block-structured parsing of multi-fund basket files.
//!
//! A basket file packs several fund records into one flat text file. Each
//! record starts at a `TRADE_DATE` marker line, continues with metadata
//! key/value lines and ends with a holdings table. This crate contains:
//! - Line normalization, block splitting and header detection
//! - Positional and paired metadata extraction
//! - Registry-driven metadata type coercion with null sentinels
//! - Holdings table construction and text normalization
//! - Per-block diagnostics (skipped blocks, malformed sections, coercion fallbacks)

pub mod config;
pub mod domain;
pub mod parse;

pub use config::{ConfigError, NullSentinels, ParserConfig, TypeRegistry};
pub use domain::{
    CellValue, ColumnKind, Diagnostic, DiagnosticKind, FundRecord, HoldingsTable, MetadataMap,
    MetadataValue, ParsedFile, ValueType,
};
pub use parse::{parse_block, parse_lines, parse_rows, BlockOutcome, ParseError};
