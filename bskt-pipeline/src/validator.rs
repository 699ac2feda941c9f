//! Schema checks over holdings tables and metadata maps.
//!
//! A schema names columns (or metadata keys), whether each is required and
//! which kind of value it must hold. Checks never fail; every problem is a
//! message in the returned [`ValidationReport`].

use std::collections::BTreeMap;

use bskt_core::domain::table::parse_float_cell;
use bskt_core::parse::timestamp::parse_timestamp;
use bskt_core::{HoldingsTable, MetadataMap, MetadataValue};
use serde::{Deserialize, Serialize};

/// Kind of value a column is expected to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedKind {
    Numeric,
    String,
    Datetime,
}

impl ExpectedKind {
    fn name(self) -> &'static str {
        match self {
            ExpectedKind::Numeric => "numeric",
            ExpectedKind::String => "string",
            ExpectedKind::Datetime => "datetime",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnRule {
    #[serde(default)]
    pub required: bool,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ExpectedKind>,
}

impl ColumnRule {
    pub fn required(kind: ExpectedKind) -> Self {
        Self {
            required: true,
            kind: Some(kind),
        }
    }

    pub fn optional(kind: ExpectedKind) -> Self {
        Self {
            required: false,
            kind: Some(kind),
        }
    }
}

/// Column name → rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSchema {
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnRule>,
}

impl ValidationSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, rule: ColumnRule) -> Self {
        self.columns.insert(column.to_string(), rule);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Outcome of one validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

fn missing(column: &str) -> String {
    format!("missing required column: {column}")
}

fn mismatch(column: &str, kind: ExpectedKind) -> String {
    format!("column {column} expected {}", kind.name())
}

/// Blank cells never count against a kind.
fn cells_match(cells: &[&str], kind: ExpectedKind) -> bool {
    let filled: Vec<&str> = cells
        .iter()
        .copied()
        .filter(|c| !c.trim().is_empty())
        .collect();
    let numeric = || filled.iter().all(|c| parse_float_cell(c).is_some());
    match kind {
        ExpectedKind::Numeric => numeric(),
        ExpectedKind::Datetime => filled.iter().all(|c| parse_timestamp(c).is_some()),
        ExpectedKind::String => filled.is_empty() || !numeric(),
    }
}

/// Check a holdings table against `schema`.
///
/// A `string` column must not be uniformly numeric; `numeric` and
/// `datetime` columns must parse in every non-blank cell.
pub fn validate_holdings(table: &HoldingsTable, schema: &ValidationSchema) -> ValidationReport {
    let mut errors = Vec::new();
    for (column, rule) in &schema.columns {
        if rule.required && table.column_index(column).is_none() {
            errors.push(missing(column));
        }
    }
    for (column, rule) in &schema.columns {
        let (Some(kind), Some(cells)) = (rule.kind, table.column(column)) else {
            continue;
        };
        if !cells_match(&cells, kind) {
            errors.push(mismatch(column, kind));
        }
    }
    ValidationReport::from_errors(errors)
}

fn value_matches(value: &MetadataValue, kind: ExpectedKind) -> bool {
    match (value, kind) {
        (MetadataValue::Null, _) => true,
        (MetadataValue::Float(_) | MetadataValue::Integer(_), ExpectedKind::Numeric) => true,
        (MetadataValue::String(_), ExpectedKind::String) => true,
        (MetadataValue::Timestamp(_), ExpectedKind::Datetime) => true,
        _ => false,
    }
}

/// Check typed metadata against `schema`. Null values satisfy any kind.
pub fn validate_metadata(metadata: &MetadataMap, schema: &ValidationSchema) -> ValidationReport {
    let mut errors = Vec::new();
    for (key, rule) in &schema.columns {
        if rule.required && !metadata.contains_key(key) {
            errors.push(missing(key));
        }
    }
    for (key, rule) in &schema.columns {
        let (Some(kind), Some(value)) = (rule.kind, metadata.get(key)) else {
            continue;
        };
        if !value_matches(value, kind) {
            errors.push(mismatch(key, kind));
        }
    }
    ValidationReport::from_errors(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn holdings() -> HoldingsTable {
        HoldingsTable::from_parts(
            strings(&["CUSIP", "TICKER", "SHARES", "AS_OF"]),
            vec![
                strings(&["123456789", "ABC", "10", "2026-02-18"]),
                strings(&["987654321", "DEF", "", "2026-02-19"]),
            ],
        )
    }

    #[test]
    fn passing_schema_is_valid() {
        let schema = ValidationSchema::new()
            .with("TICKER", ColumnRule::required(ExpectedKind::String))
            .with("SHARES", ColumnRule::required(ExpectedKind::Numeric))
            .with("AS_OF", ColumnRule::optional(ExpectedKind::Datetime))
            .with("WEIGHT", ColumnRule::optional(ExpectedKind::Numeric));
        let report = validate_holdings(&holdings(), &schema);
        assert!(report.valid, "{:?}", report.errors);
    }

    #[test]
    fn missing_and_mistyped_columns_are_reported() {
        let schema = ValidationSchema::new()
            .with("WEIGHT", ColumnRule::required(ExpectedKind::Numeric))
            .with("TICKER", ColumnRule::optional(ExpectedKind::Numeric))
            .with("CUSIP", ColumnRule::optional(ExpectedKind::String))
            .with("SHARES", ColumnRule::optional(ExpectedKind::Datetime));
        let report = validate_holdings(&holdings(), &schema);
        assert!(!report.valid);
        assert_eq!(
            report.errors,
            vec![
                "missing required column: WEIGHT",
                "column CUSIP expected string",
                "column SHARES expected datetime",
                "column TICKER expected numeric",
            ]
        );
    }

    #[test]
    fn blank_column_satisfies_every_kind() {
        let table = HoldingsTable::from_parts(
            strings(&["A", "B"]),
            vec![strings(&["1", ""]), strings(&["2", " "])],
        );
        for kind in [ExpectedKind::Numeric, ExpectedKind::String, ExpectedKind::Datetime] {
            let schema = ValidationSchema::new().with("B", ColumnRule::required(kind));
            assert!(validate_holdings(&table, &schema).valid, "{kind:?}");
        }
    }

    #[test]
    fn metadata_types_are_checked() {
        let mut metadata = MetadataMap::new();
        let date = NaiveDate::from_ymd_opt(2026, 2, 18)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        metadata.insert("TRADE_DATE".into(), MetadataValue::Timestamp(date));
        metadata.insert("NAV".into(), MetadataValue::String("ABC".into()));
        metadata.insert("TICKER".into(), MetadataValue::Null);

        let schema = ValidationSchema::new()
            .with("TRADE_DATE", ColumnRule::required(ExpectedKind::Datetime))
            .with("NAV", ColumnRule::required(ExpectedKind::Numeric))
            .with("TICKER", ColumnRule::required(ExpectedKind::String))
            .with("BASE_CURRENCY", ColumnRule::required(ExpectedKind::String));
        let report = validate_metadata(&metadata, &schema);
        assert_eq!(
            report.errors,
            vec![
                "missing required column: BASE_CURRENCY",
                "column NAV expected numeric",
            ]
        );
    }

    #[test]
    fn schema_from_toml() {
        let schema: ValidationSchema = toml::from_str(
            r#"
[columns.SHARES]
required = true
type = "numeric"

[columns.DESCRIPTION]
"#,
        )
        .unwrap();
        assert_eq!(schema.columns["SHARES"], ColumnRule::required(ExpectedKind::Numeric));
        assert_eq!(schema.columns["DESCRIPTION"], ColumnRule::default());
    }
}
