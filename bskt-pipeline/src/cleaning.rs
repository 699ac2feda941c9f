//! Fill-missing cleaner for holdings tables.
//!
//! Blank cells of selected columns are replaced by a per-column statistic
//! or a constant. The parser itself never imputes; this stage runs only
//! when a [`FillStrategy`] is configured.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use bskt_core::domain::table::parse_float_cell;
use bskt_core::{ColumnKind, HoldingsTable};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A literal cell value from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstantValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Integer(v) => write!(f, "{v}"),
            ConstantValue::Float(v) => write!(f, "{v}"),
            ConstantValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum FillMethod {
    Median,
    Mean,
    /// Most frequent non-blank value. Ties go to the smallest value.
    Mode,
    Constant { value: ConstantValue },
}

/// Column name → fill method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FillStrategy {
    #[serde(default)]
    pub columns: BTreeMap<String, FillMethod>,
}

impl FillStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, method: FillMethod) -> Self {
        self.columns.insert(column.to_string(), method);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

fn is_blank(cell: &str) -> bool {
    cell.trim().is_empty()
}

fn numeric_values(cells: &[&str]) -> Vec<f64> {
    cells.iter().filter_map(|c| parse_float_cell(c)).collect()
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn mode(cells: &[&str], kind: ColumnKind) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for cell in cells.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
        *counts.entry(cell).or_default() += 1;
    }
    let top = counts.values().copied().max()?;
    let order = |a: &&str, b: &&str| -> Ordering {
        match (kind.is_numeric(), parse_float_cell(a), parse_float_cell(b)) {
            (true, Some(x), Some(y)) => x.total_cmp(&y),
            _ => a.cmp(b),
        }
    };
    counts
        .into_iter()
        .filter(|(_, n)| *n == top)
        .map(|(cell, _)| cell)
        .min_by(order)
        .map(str::to_string)
}

/// Render a statistic in the column's own style: whole numbers stay
/// integers in integer columns.
fn format_stat(value: f64, kind: ColumnKind) -> String {
    if kind == ColumnKind::Integer && value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Value used to fill the blank cells of column `idx`, if one can be computed.
fn fill_value(table: &HoldingsTable, idx: usize, column: &str, method: &FillMethod) -> Option<String> {
    let cells: Vec<&str> = table.rows().iter().map(|r| r[idx].as_str()).collect();
    let kind = table.column_kind(idx);

    match method {
        FillMethod::Median | FillMethod::Mean if !kind.is_numeric() => {
            warn!(column, ?method, "statistic needs a numeric column, skipping");
            None
        }
        FillMethod::Median => median(numeric_values(&cells)).map(|v| format_stat(v, kind)),
        FillMethod::Mean => mean(&numeric_values(&cells)).map(|v| format_stat(v, kind)),
        FillMethod::Mode => mode(&cells, kind),
        FillMethod::Constant { value } => Some(value.to_string()),
    }
}

/// Replace blank cells per `strategy`. Columns not in the table are ignored.
pub fn fill_missing(mut table: HoldingsTable, strategy: &FillStrategy) -> HoldingsTable {
    for (column, method) in &strategy.columns {
        let Some(idx) = table.column_index(column) else {
            debug!(column = column.as_str(), "fill column not present, skipping");
            continue;
        };
        let Some(value) = fill_value(&table, idx, column, method) else {
            continue;
        };

        let mut filled = 0usize;
        table.map_column(idx, |cell| {
            if is_blank(cell) {
                filled += 1;
                value.clone()
            } else {
                cell.to_string()
            }
        });
        debug!(column = column.as_str(), filled, %value, "filled missing cells");
    }
    table
}
