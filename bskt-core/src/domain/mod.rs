//! Domain types: typed metadata, holdings tables, fund records, diagnostics.

pub mod diagnostic;
pub mod record;
pub mod table;
pub mod value;

pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use record::{FundRecord, ParsedFile};
pub use table::{CellValue, ColumnKind, HoldingsTable};
pub use value::{MetadataMap, MetadataValue, ValueType};
