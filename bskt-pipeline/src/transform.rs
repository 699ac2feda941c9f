//! Column rename, computed columns and drops on holdings tables.
//!
//! Rules apply in a fixed order: rename, then computed columns, then drop.
//! A computed column that cannot be evaluated is left absent.

use std::collections::BTreeMap;

use bskt_core::domain::table::parse_float_cell;
use bskt_core::HoldingsTable;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::cleaning::ConstantValue;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("column {0} not found")]
    MissingColumn(String),

    #[error("column {column} is not numeric (row {row}: {value:?})")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },
}

/// Expression producing one value per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Expr {
    /// `left * right`.
    Product { left: String, right: String },
    /// `left / right`. A zero divisor gives a blank cell.
    Ratio { left: String, right: String },
    Constant { value: ConstantValue },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedColumn {
    pub name: String,
    pub expr: Expr,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformRules {
    /// Columns removed last.
    #[serde(default)]
    pub drop: Vec<String>,
    /// Old name → new name.
    #[serde(default)]
    pub rename: BTreeMap<String, String>,
    #[serde(default)]
    pub computed: Vec<ComputedColumn>,
}

impl TransformRules {
    pub fn is_empty(&self) -> bool {
        self.rename.is_empty() && self.computed.is_empty() && self.drop.is_empty()
    }
}

/// Numeric view of a column; blank cells are `None`.
fn numeric_column(table: &HoldingsTable, name: &str) -> Result<Vec<Option<f64>>, TransformError> {
    let cells = table
        .column(name)
        .ok_or_else(|| TransformError::MissingColumn(name.to_string()))?;
    cells
        .iter()
        .enumerate()
        .map(|(row, cell)| {
            if cell.trim().is_empty() {
                return Ok(None);
            }
            parse_float_cell(cell)
                .map(Some)
                .ok_or_else(|| TransformError::NonNumeric {
                    column: name.to_string(),
                    row,
                    value: cell.to_string(),
                })
        })
        .collect()
}

fn binary<F>(table: &HoldingsTable, left: &str, right: &str, op: F) -> Result<Vec<String>, TransformError>
where
    F: Fn(f64, f64) -> Option<f64>,
{
    let lhs = numeric_column(table, left)?;
    let rhs = numeric_column(table, right)?;
    Ok(lhs
        .into_iter()
        .zip(rhs)
        .map(|pair| match pair {
            (Some(a), Some(b)) => op(a, b).map(|v| v.to_string()).unwrap_or_default(),
            _ => String::new(),
        })
        .collect())
}

/// Evaluate `expr` against every row of `table`.
pub fn evaluate(table: &HoldingsTable, expr: &Expr) -> Result<Vec<String>, TransformError> {
    match expr {
        Expr::Product { left, right } => binary(table, left, right, |a, b| Some(a * b)),
        Expr::Ratio { left, right } => {
            binary(table, left, right, |a, b| (b != 0.0).then(|| a / b))
        }
        Expr::Constant { value } => Ok(vec![value.to_string(); table.height()]),
    }
}

/// Apply `rules` to `table`.
pub fn apply_transform(mut table: HoldingsTable, rules: &TransformRules) -> HoldingsTable {
    for (from, to) in &rules.rename {
        if !table.rename_column(from, to) {
            debug!(from = from.as_str(), to = to.as_str(), "rename source column not present");
        }
    }

    for computed in &rules.computed {
        match evaluate(&table, &computed.expr) {
            Ok(values) => table.set_column(&computed.name, values),
            Err(e) => warn!(
                column = computed.name.as_str(),
                error = %e,
                "computed column failed, leaving it absent"
            ),
        }
    }

    for name in &rules.drop {
        table.drop_column(name);
    }
    table
}
