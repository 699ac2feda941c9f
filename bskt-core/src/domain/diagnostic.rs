//! Per-block diagnostics.
//!
//! Block-level failures never abort a parse. Each one is recorded here with
//! the block's position so operators can find the offending input.

use serde::Serialize;
use std::fmt;

use super::value::ValueType;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// No holdings header inside the block; the block produced no record.
    MissingHeader,
    /// The holdings section could not be read; an empty table was substituted.
    MalformedHoldings { reason: String },
    /// The metadata lines could not be read; an empty mapping was substituted.
    MalformedMetadata { reason: String },
    /// The block has no metadata lines before its header.
    EmptyMetadata,
    /// A metadata value did not coerce to its registered type and became null.
    CoercionFallback {
        key: String,
        raw: String,
        target: ValueType,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub block_index: usize,
    /// 1-based line number of the block's marker line.
    pub start_line: usize,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(block_index: usize, start_line: usize, kind: DiagnosticKind) -> Self {
        Self {
            block_index,
            start_line,
            kind,
        }
    }

    /// True when the block behind this diagnostic produced no record.
    pub fn is_skip(&self) -> bool {
        matches!(self.kind, DiagnosticKind::MissingHeader)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block {} (line {}): ", self.block_index, self.start_line)?;
        match &self.kind {
            DiagnosticKind::MissingHeader => write!(f, "no holdings header, block skipped"),
            DiagnosticKind::MalformedHoldings { reason } => {
                write!(f, "malformed holdings ({reason}), empty table used")
            }
            DiagnosticKind::MalformedMetadata { reason } => {
                write!(f, "malformed metadata ({reason}), empty metadata used")
            }
            DiagnosticKind::EmptyMetadata => write!(f, "no metadata lines"),
            DiagnosticKind::CoercionFallback { key, raw, target } => {
                write!(f, "{key}={raw:?} is not a valid {target}, set to null")
            }
        }
    }
}
