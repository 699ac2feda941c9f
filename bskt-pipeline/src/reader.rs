//! Extension-dispatching file reader.
//!
//! Turns a file on disk into either raw text lines or pre-tokenized rows,
//! then hands them to the core parser:
//! - `.csv`, `.ndm01` → raw lines
//! - `.txt` → tab-delimited rows
//! - `.json` → line-delimited JSON, one array of cells (or one raw line string) per line
//! - `.xls`, `.xlsx`, `.xlsm`, `.xlsb` → rows of the first worksheet
//!
//! Anything else is an unsupported file type, fatal for that file.

use std::path::Path;

use bskt_core::parse::metadata::split_csv_line;
use calamine::{open_workbook_auto, Data, DataType, Reader};
use bskt_core::{parse_lines, parse_rows, ParseError, ParsedFile, ParserConfig};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("unsupported file type: {ext}")]
    UnsupportedFileType { ext: String },

    #[error("failed to read spreadsheet {path}: {source}")]
    Spreadsheet {
        path: String,
        #[source]
        source: calamine::Error,
    },

    #[error("spreadsheet has no worksheets: {path}")]
    EmptyWorkbook { path: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line}: expected a JSON array of cells or a string, found {found}")]
    JsonShape { line: usize, found: &'static str },

    #[error("line {line}: invalid CSV in JSON string: {source}")]
    Csv {
        line: usize,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Input format, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Tab,
    JsonLines,
    Spreadsheet,
}

impl FileKind {
    /// Classify `path` by its (case-insensitive) extension.
    pub fn from_path(path: &Path) -> Result<Self, ReadError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "ndm01" => Ok(FileKind::Csv),
            "txt" => Ok(FileKind::Tab),
            "json" => Ok(FileKind::JsonLines),
            "xls" | "xlsx" | "xlsm" | "xlsb" => Ok(FileKind::Spreadsheet),
            _ => Err(ReadError::UnsupportedFileType {
                ext: if ext.is_empty() {
                    "(none)".to_string()
                } else {
                    format!(".{ext}")
                },
            }),
        }
    }
}

/// Contents of an input file in the shape the parser accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum BasketInput {
    Lines(Vec<String>),
    Rows(Vec<Vec<String>>),
}

impl BasketInput {
    /// Number of lines or rows read.
    pub fn len(&self) -> usize {
        match self {
            BasketInput::Lines(lines) => lines.len(),
            BasketInput::Rows(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the core parser over this input.
    pub fn parse(&self, config: &ParserConfig) -> Result<ParsedFile, ParseError> {
        match self {
            BasketInput::Lines(lines) => Ok(parse_lines(lines, config)),
            BasketInput::Rows(rows) => parse_rows(rows, config),
        }
    }
}

fn read_text(path: &Path) -> Result<String, ReadError> {
    let bytes = std::fs::read(path).map_err(|source| ReadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            warn!(path = %path.display(), "input is not valid UTF-8, replacing invalid bytes");
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn json_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Read line-delimited JSON. Blank lines are skipped.
pub fn read_json_lines(text: &str) -> Result<Vec<Vec<String>>, ReadError> {
    let mut rows = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line).map_err(|source| ReadError::Json {
            line: line_no,
            source,
        })?;
        let row = match &value {
            Value::Array(cells) => {
                if let Some(nested) = cells.iter().find(|c| c.is_array() || c.is_object()) {
                    return Err(ReadError::JsonShape {
                        line: line_no,
                        found: json_kind(nested),
                    });
                }
                cells.iter().map(json_cell).collect()
            }
            Value::String(raw) => split_csv_line(raw).map_err(|source| ReadError::Csv {
                line: line_no,
                source,
            })?,
            other => {
                return Err(ReadError::JsonShape {
                    line: line_no,
                    found: json_kind(other),
                })
            }
        };
        rows.push(row);
    }
    Ok(rows)
}

/// Split tab-delimited text into rows.
pub fn read_tab_rows(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(|line| {
            line.strip_suffix('\r')
                .unwrap_or(line)
                .split('\t')
                .map(str::to_string)
                .collect()
        })
        .collect()
}

/// Render one spreadsheet cell the way it would appear in a CSV export.
fn sheet_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) if dt.format("%H:%M:%S").to_string() == "00:00:00" => {
                dt.format("%Y-%m-%d").to_string()
            }
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => cell.to_string(),
        },
        other => other.to_string(),
    }
}

/// Read the first worksheet of `path` as rows of cells.
///
/// Trailing empty cells are dropped from each row. Empty rows above the
/// used range are kept so row numbers match the sheet.
pub fn read_spreadsheet(path: &Path) -> Result<Vec<Vec<String>>, ReadError> {
    let sheet_error = |source| ReadError::Spreadsheet {
        path: path.display().to_string(),
        source,
    };

    let mut workbook = open_workbook_auto(path).map_err(sheet_error)?;
    let sheet = workbook.sheet_names().first().cloned();
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(sheet_error)?,
        None => {
            return Err(ReadError::EmptyWorkbook {
                path: path.display().to_string(),
            })
        }
    };
    debug!(path = %path.display(), ?sheet, "reading first worksheet");

    let leading = range.start().map_or(0, |(row, _)| row as usize);
    let mut rows: Vec<Vec<String>> = vec![Vec::new(); leading];
    for cells in range.rows() {
        let mut row: Vec<String> = cells.iter().map(sheet_cell).collect();
        while row.last().is_some_and(|cell| cell.is_empty()) {
            row.pop();
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Read `path` according to its [`FileKind`].
pub fn read_input(path: &Path) -> Result<BasketInput, ReadError> {
    let kind = FileKind::from_path(path)?;
    debug!(path = %path.display(), ?kind, "reading input");

    let input = match kind {
        FileKind::Spreadsheet => BasketInput::Rows(read_spreadsheet(path)?),
        FileKind::Csv => {
            BasketInput::Lines(read_text(path)?.lines().map(str::to_string).collect())
        }
        FileKind::Tab => BasketInput::Rows(read_tab_rows(&read_text(path)?)),
        FileKind::JsonLines => BasketInput::Rows(read_json_lines(&read_text(path)?)?),
    };

    debug!(path = %path.display(), entries = input.len(), "input read");
    Ok(input)
}

/// Read and parse a basket file in one step.
pub fn parse_file(path: &Path, config: &ParserConfig) -> Result<ParsedFile, ReadError> {
    Ok(read_input(path)?.parse(config)?)
}
