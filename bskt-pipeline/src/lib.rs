//! BSKT Pipeline — the stages around the core parser.
//!
//! This crate builds on `bskt-core` to provide:
//! - Extension-dispatching file reading (CSV, tab-delimited, JSON lines, spreadsheets)
//! - Schema validation of metadata and holdings
//! - Fill-missing cleaning and rename/compute/drop transforms
//! - SQLite loading with value-typed columns
//! - JSON and CSV export

pub mod cleaning;
pub mod config;
pub mod export;
pub mod reader;
pub mod runner;
pub mod sqlite;
pub mod transform;
pub mod validator;

pub use cleaning::{fill_missing, ConstantValue, FillMethod, FillStrategy};
pub use config::{PipelineConfig, ValidateConfig};
pub use export::{holdings_to_csv, metadata_to_csv, records_to_json};
pub use reader::{parse_file, read_input, read_spreadsheet, BasketInput, FileKind, ReadError};
pub use runner::{process, run_file, ProcessedFile, RecordReport};
pub use sqlite::{IfExists, LoadError, LoadSummary, SqliteLoader};
pub use transform::{apply_transform, ComputedColumn, Expr, TransformError, TransformRules};
pub use validator::{
    validate_holdings, validate_metadata, ColumnRule, ExpectedKind, ValidationReport,
    ValidationSchema,
};
