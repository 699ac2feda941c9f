//! Rectangular holdings table.
//!
//! Cells are stored as strings exactly as the CSV reader produced them.
//! Column kinds are inferred on demand: a column is numeric when it has at
//! least one non-blank cell and every non-blank cell parses as a number.

use serde::{Deserialize, Serialize};

/// Inferred type of a holdings column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }
}

/// A single cell interpreted through its column's kind.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Null,
}

/// Parse a cell as an integer. Surrounding whitespace is ignored.
pub fn parse_int_cell(cell: &str) -> Option<i64> {
    cell.trim().parse::<i64>().ok()
}

/// Parse a cell as a finite float. Surrounding whitespace is ignored.
pub fn parse_float_cell(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn is_blank(cell: &str) -> bool {
    cell.trim().is_empty()
}

/// Ordered named columns and rows of equal width.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HoldingsTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl HoldingsTable {
    /// An empty table with no columns and no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table, right-padding short rows with empty cells, truncating
    /// long rows to the header width and dropping rows that are entirely blank.
    pub fn from_parts(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .filter(|row| !row.iter().all(|c| is_blank(c)))
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }

    /// Position of the first column named `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All cells of a column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(self.column_at(idx))
    }

    fn column_at(&self, idx: usize) -> Vec<&str> {
        self.rows.iter().map(|row| row[idx].as_str()).collect()
    }

    /// Cell at (`row`, column `name`).
    pub fn cell(&self, row: usize, name: &str) -> Option<&str> {
        let idx = self.column_index(name)?;
        self.rows.get(row).map(|r| r[idx].as_str())
    }

    /// Inferred kind of the column at `idx`.
    pub fn column_kind(&self, idx: usize) -> ColumnKind {
        let mut seen = false;
        let mut all_int = true;
        for row in &self.rows {
            let cell = row[idx].as_str();
            if is_blank(cell) {
                continue;
            }
            seen = true;
            if parse_int_cell(cell).is_some() {
                continue;
            }
            all_int = false;
            if parse_float_cell(cell).is_none() {
                return ColumnKind::Text;
            }
        }
        match (seen, all_int) {
            (false, _) => ColumnKind::Text,
            (true, true) => ColumnKind::Integer,
            (true, false) => ColumnKind::Float,
        }
    }

    pub fn column_kinds(&self) -> Vec<ColumnKind> {
        (0..self.width()).map(|idx| self.column_kind(idx)).collect()
    }

    /// Rows with each cell interpreted through its column kind. Blank cells are `Null`.
    pub fn typed_rows(&self) -> Vec<Vec<CellValue>> {
        let kinds = self.column_kinds();
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&kinds)
                    .map(|(cell, kind)| typed_cell(cell, *kind))
                    .collect()
            })
            .collect()
    }

    /// Apply `f` to every cell of the column at `idx`.
    pub fn map_column<F>(&mut self, idx: usize, mut f: F)
    where
        F: FnMut(&str) -> String,
    {
        for row in &mut self.rows {
            let updated = f(&row[idx]);
            row[idx] = updated;
        }
    }

    /// Rename column `from` to `to`. Returns false when `from` does not exist.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.column_index(from) {
            Some(idx) => {
                self.columns[idx] = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Remove column `name`. Returns false when it does not exist.
    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        true
    }

    /// Append a column, or replace an existing one with the same name.
    /// `values` is padded or truncated to the table height.
    pub fn set_column(&mut self, name: &str, mut values: Vec<String>) {
        values.resize(self.height(), String::new());
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
    }
}

fn typed_cell(cell: &str, kind: ColumnKind) -> CellValue {
    if is_blank(cell) {
        return CellValue::Null;
    }
    match kind {
        ColumnKind::Integer => parse_int_cell(cell).map_or(CellValue::Null, CellValue::Integer),
        ColumnKind::Float => parse_float_cell(cell).map_or(CellValue::Null, CellValue::Float),
        ColumnKind::Text => CellValue::Text(cell.to_string()),
    }
}
