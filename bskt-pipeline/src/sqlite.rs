//! SQLite loader for parsed fund records.
//!
//! Column SQL types follow the cell values: integers → `INTEGER`, floats →
//! `REAL`, everything else (text, timestamps) → `TEXT`. Blank cells and
//! null metadata values are stored as `NULL`.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use bskt_core::{CellValue, ColumnKind, FundRecord, HoldingsTable, MetadataValue, ParsedFile};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Name of the column linking holdings rows to their metadata row.
pub const FUND_INDEX_COLUMN: &str = "FUND_INDEX";
/// Name of the metadata column carrying the input's BLAKE3 digest.
pub const SOURCE_HASH_COLUMN: &str = "SOURCE_HASH";
/// Name of the metadata column holding the record's block position in its file.
pub const BLOCK_INDEX_COLUMN: &str = "BLOCK_INDEX";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid table name: {0:?}")]
    InvalidTableName(String),
}

/// What to do when the target table already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IfExists {
    /// Drop and recreate the table.
    #[default]
    Replace,
    /// Keep existing rows; add any new columns.
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Integer,
    Real,
    Text,
}

impl SqlType {
    pub fn as_sql(self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Text => "TEXT",
        }
    }

    fn from_kind(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Integer => SqlType::Integer,
            ColumnKind::Float => SqlType::Real,
            ColumnKind::Text => SqlType::Text,
        }
    }

    /// Narrowest type holding both `self` and `other`.
    fn widen(self, other: SqlType) -> SqlType {
        match (self, other) {
            (a, b) if a == b => a,
            (SqlType::Integer, SqlType::Real) | (SqlType::Real, SqlType::Integer) => SqlType::Real,
            _ => SqlType::Text,
        }
    }
}

/// Rows sharing one column layout, ready to insert.
///
/// A column type stays `None` until a non-null value is seen and is
/// written as `TEXT` if it never is.
#[derive(Debug, Clone, Default, PartialEq)]
struct SqlTable {
    columns: Vec<(String, Option<SqlType>)>,
    rows: Vec<Vec<Value>>,
}

impl SqlTable {
    fn column_position(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|(c, _)| c.eq_ignore_ascii_case(name))
    }

    /// Merge `ty` into the type of column `idx`. `None` is no evidence.
    fn widen_column(&mut self, idx: usize, ty: Option<SqlType>) {
        let current = self.columns[idx].1;
        self.columns[idx].1 = match (current, ty) {
            (Some(a), Some(b)) => Some(a.widen(b)),
            (a, b) => a.or(b),
        };
    }

    /// Add a column if missing, otherwise widen its type. Returns its position.
    fn ensure_column(&mut self, name: &str, ty: Option<SqlType>) -> usize {
        match self.column_position(name) {
            Some(idx) => {
                self.widen_column(idx, ty);
                idx
            }
            None => {
                self.columns.push((name.to_string(), ty));
                for row in &mut self.rows {
                    row.push(Value::Null);
                }
                self.columns.len() - 1
            }
        }
    }
}

fn sql_type(ty: Option<SqlType>) -> &'static str {
    ty.unwrap_or(SqlType::Text).as_sql()
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn check_table_name(name: &str) -> Result<(), LoadError> {
    if name.trim().is_empty() || name.contains('\0') {
        return Err(LoadError::InvalidTableName(name.to_string()));
    }
    Ok(())
}

/// Column names usable in SQL: blanks become `COLUMN_n` (1-based) and
/// case-insensitive duplicates get a numeric suffix.
pub fn sql_column_names(columns: &[String]) -> Vec<String> {
    reserved_column_names(&[], columns)
}

/// Like [`sql_column_names`], but names in `reserved` are taken up front
/// so a user column spelled the same way gets a suffix instead.
fn reserved_column_names(reserved: &[&str], columns: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = reserved.iter().map(|r| r.to_ascii_uppercase()).collect();
    columns
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let base = match name.trim() {
                "" => format!("COLUMN_{}", idx + 1),
                trimmed => trimmed.to_string(),
            };
            let mut candidate = base.clone();
            let mut suffix = 2;
            while !seen.insert(candidate.to_ascii_uppercase()) {
                candidate = format!("{base}_{suffix}");
                suffix += 1;
            }
            if reserved.iter().any(|r| base.eq_ignore_ascii_case(r)) {
                warn!(
                    column = base.as_str(),
                    renamed = candidate.as_str(),
                    "column name is reserved, renamed"
                );
            }
            candidate
        })
        .collect()
}

/// `(name, declared type)` of every column of `table`, in table order.
fn table_info(conn: &Connection, table: &str) -> Result<Vec<(String, String)>, LoadError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

fn cell_to_sql(cell: CellValue) -> Value {
    match cell {
        CellValue::Integer(v) => Value::Integer(v),
        CellValue::Float(v) => Value::Real(v),
        CellValue::Text(s) => Value::Text(s),
        CellValue::Null => Value::Null,
    }
}

fn metadata_to_sql(value: &MetadataValue) -> (Value, Option<SqlType>) {
    match value {
        MetadataValue::String(s) => (Value::Text(s.clone()), Some(SqlType::Text)),
        MetadataValue::Float(v) => (Value::Real(*v), Some(SqlType::Real)),
        MetadataValue::Integer(v) => (Value::Integer(*v), Some(SqlType::Integer)),
        MetadataValue::Timestamp(ts) => (
            Value::Text(ts.format(TIMESTAMP_FORMAT).to_string()),
            Some(SqlType::Text),
        ),
        MetadataValue::Null => (Value::Null, None),
    }
}

fn holdings_table(table: &HoldingsTable, reserved: &[&str]) -> SqlTable {
    let rows: Vec<Vec<Value>> = table
        .typed_rows()
        .into_iter()
        .map(|row| row.into_iter().map(cell_to_sql).collect())
        .collect();
    let columns = reserved_column_names(reserved, table.columns())
        .into_iter()
        .zip(table.column_kinds())
        .enumerate()
        .map(|(idx, (name, kind))| {
            let has_values = rows.iter().any(|row| row[idx] != Value::Null);
            (name, has_values.then(|| SqlType::from_kind(kind)))
        })
        .collect();
    SqlTable { columns, rows }
}

/// Where a batch of records came from, written alongside them by
/// [`SqliteLoader::load_records`].
#[derive(Debug, Clone, Copy)]
struct Provenance<'a> {
    source_hash: &'a str,
    /// Added to each record's block index to form its `FUND_INDEX`.
    fund_offset: i64,
}

fn fund_index(record: &FundRecord, provenance: Option<&Provenance<'_>>) -> i64 {
    provenance.map_or(0, |p| p.fund_offset) + record.block_index as i64
}

fn metadata_table(records: &[FundRecord], provenance: Option<&Provenance<'_>>) -> SqlTable {
    let reserved: &[&str] = match provenance {
        Some(_) => &[FUND_INDEX_COLUMN, SOURCE_HASH_COLUMN, BLOCK_INDEX_COLUMN],
        None => &[FUND_INDEX_COLUMN],
    };

    // Union of keys in first-seen order.
    let mut seen = HashSet::new();
    let mut keys: Vec<String> = Vec::new();
    for key in records.iter().flat_map(|r| r.metadata.keys()) {
        if seen.insert(key.as_str()) {
            keys.push(key.clone());
        }
    }
    let names = reserved_column_names(reserved, &keys);

    let mut out = SqlTable::default();
    out.ensure_column(FUND_INDEX_COLUMN, Some(SqlType::Integer));
    if provenance.is_some() {
        out.ensure_column(SOURCE_HASH_COLUMN, Some(SqlType::Text));
        out.ensure_column(BLOCK_INDEX_COLUMN, Some(SqlType::Integer));
    }
    let positions: HashMap<&str, usize> = keys
        .iter()
        .zip(&names)
        .map(|(key, name)| (key.as_str(), out.ensure_column(name, None)))
        .collect();

    for record in records {
        let mut row = vec![Value::Null; out.columns.len()];
        row[0] = Value::Integer(fund_index(record, provenance));
        if let Some(p) = provenance {
            row[1] = Value::Text(p.source_hash.to_string());
            row[2] = Value::Integer(record.block_index as i64);
        }
        for (key, value) in &record.metadata {
            let (sql_value, ty) = metadata_to_sql(value);
            let idx = positions[key.as_str()];
            out.widen_column(idx, ty);
            row[idx] = sql_value;
        }
        out.rows.push(row);
    }
    out
}

/// All records' holdings stacked into one table, each row tagged with
/// its record's `FUND_INDEX`.
fn combined_holdings(records: &[FundRecord], provenance: Option<&Provenance<'_>>) -> SqlTable {
    let mut out = SqlTable::default();
    out.ensure_column(FUND_INDEX_COLUMN, Some(SqlType::Integer));

    for record in records {
        let part = holdings_table(&record.holdings, &[FUND_INDEX_COLUMN]);
        let positions: Vec<usize> = part
            .columns
            .iter()
            .map(|(name, ty)| out.ensure_column(name, *ty))
            .collect();
        for cells in part.rows {
            let mut row = vec![Value::Null; out.columns.len()];
            row[0] = Value::Integer(fund_index(record, provenance));
            for (pos, value) in positions.iter().zip(cells) {
                row[*pos] = value;
            }
            out.rows.push(row);
        }
    }
    out
}

/// Rows written by [`SqliteLoader::load_records`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub metadata_rows: usize,
    pub holdings_rows: usize,
}

/// Writes holdings tables and metadata to a SQLite database.
pub struct SqliteLoader {
    conn: Connection,
}

impl SqliteLoader {
    pub fn open(path: &Path) -> Result<Self, LoadError> {
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened sqlite database");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, LoadError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Underlying connection, for ad-hoc queries.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn write_table(&mut self, name: &str, table: &SqlTable, mode: IfExists) -> Result<usize, LoadError> {
        check_table_name(name)?;
        if table.columns.is_empty() {
            warn!(table = name, "no columns to write, skipping table");
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        if mode == IfExists::Replace {
            tx.execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)), [])?;
        }

        let defs: Vec<String> = table
            .columns
            .iter()
            .map(|(col, ty)| format!("{} {}", quote_ident(col), sql_type(*ty)))
            .collect();
        tx.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} ({})",
                quote_ident(name),
                defs.join(", ")
            ),
            [],
        )?;

        if mode == IfExists::Append {
            let existing: HashSet<String> = table_info(&tx, name)?
                .into_iter()
                .map(|(col, _)| col.to_ascii_uppercase())
                .collect();
            for (col, ty) in &table.columns {
                if !existing.contains(&col.to_ascii_uppercase()) {
                    debug!(table = name, column = col.as_str(), "adding column");
                    tx.execute(
                        &format!(
                            "ALTER TABLE {} ADD COLUMN {} {}",
                            quote_ident(name),
                            quote_ident(col),
                            sql_type(*ty)
                        ),
                        [],
                    )?;
                }
            }
        }

        let column_list: Vec<String> = table.columns.iter().map(|(c, _)| quote_ident(c)).collect();
        let placeholders = vec!["?"; table.columns.len()].join(", ");
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(name),
            column_list.join(", "),
            placeholders
        );
        {
            let mut stmt = tx.prepare(&insert)?;
            // Rows built before a later column appeared are short; pad with NULL.
            let width = table.columns.len();
            for row in &table.rows {
                let cells = row.iter().chain(std::iter::repeat(&Value::Null)).take(width);
                stmt.execute(params_from_iter(cells))?;
            }
        }
        tx.commit()?;

        debug!(table = name, rows = table.rows.len(), ?mode, "table written");
        Ok(table.rows.len())
    }

    /// Write one holdings table. Returns the number of rows inserted.
    pub fn upload_holdings(
        &mut self,
        table: &HoldingsTable,
        name: &str,
        mode: IfExists,
    ) -> Result<usize, LoadError> {
        self.write_table(name, &holdings_table(table, &[]), mode)
    }

    /// Write one metadata row per record, keyed by `FUND_INDEX`.
    pub fn upload_metadata(
        &mut self,
        records: &[FundRecord],
        name: &str,
        mode: IfExists,
    ) -> Result<usize, LoadError> {
        self.write_table(name, &metadata_table(records, None), mode)
    }

    /// First free `FUND_INDEX` in `table`, or 0 when it has none.
    fn next_fund_index(&self, table: &str) -> Result<i64, LoadError> {
        let has_column = table_info(&self.conn, table)?
            .iter()
            .any(|(col, _)| col.eq_ignore_ascii_case(FUND_INDEX_COLUMN));
        if !has_column {
            return Ok(0);
        }
        let max: Option<i64> = self.conn.query_row(
            &format!(
                "SELECT MAX({}) FROM {}",
                quote_ident(FUND_INDEX_COLUMN),
                quote_ident(table)
            ),
            [],
            |row| row.get(0),
        )?;
        Ok(max.map_or(0, |m| m + 1))
    }

    /// Write `{prefix}_metadata` and `{prefix}_holdings` for a parsed file.
    ///
    /// `FUND_INDEX` is the record's block index, shifted past the largest
    /// `FUND_INDEX` already stored when appending, so it stays unique across
    /// files. The metadata table also keeps `SOURCE_HASH` and `BLOCK_INDEX`.
    pub fn load_records(
        &mut self,
        parsed: &ParsedFile,
        prefix: &str,
        mode: IfExists,
    ) -> Result<LoadSummary, LoadError> {
        let metadata_name = format!("{prefix}_metadata");
        let holdings_name = format!("{prefix}_holdings");
        check_table_name(&metadata_name)?;

        let fund_offset = match mode {
            IfExists::Replace => 0,
            IfExists::Append => self
                .next_fund_index(&metadata_name)?
                .max(self.next_fund_index(&holdings_name)?),
        };
        let provenance = Provenance {
            source_hash: &parsed.source_hash,
            fund_offset,
        };
        let metadata = metadata_table(&parsed.records, Some(&provenance));
        let holdings = combined_holdings(&parsed.records, Some(&provenance));

        let summary = LoadSummary {
            metadata_rows: self.write_table(&metadata_name, &metadata, mode)?,
            holdings_rows: self.write_table(&holdings_name, &holdings, mode)?,
        };
        info!(
            prefix,
            fund_offset,
            metadata_rows = summary.metadata_rows,
            holdings_rows = summary.holdings_rows,
            "loaded records into sqlite"
        );
        Ok(summary)
    }

    /// `SELECT COUNT(*)` over `table`.
    pub fn query_count(&self, table: &str) -> Result<i64, LoadError> {
        check_table_name(table)?;
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Declared SQL type of every column of `table`, in table order.
    pub fn column_types(&self, table: &str) -> Result<Vec<(String, String)>, LoadError> {
        check_table_name(table)?;
        table_info(&self.conn, table)
    }
}
