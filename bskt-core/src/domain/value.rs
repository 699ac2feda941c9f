//! Typed metadata values.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Target semantic type of a metadata key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    String,
    Float,
    Integer,
    Timestamp,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::String => "string",
            ValueType::Float => "float",
            ValueType::Integer => "integer",
            ValueType::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// A coerced metadata value. `Null` marks an absent or uncoercible value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    Float(f64),
    Integer(i64),
    Timestamp(NaiveDateTime),
    Null,
}

impl MetadataValue {
    pub fn is_null(&self) -> bool {
        matches!(self, MetadataValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(v) => Some(*v),
            MetadataValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetadataValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            MetadataValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// The value type this variant carries, `None` for null.
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            MetadataValue::String(_) => Some(ValueType::String),
            MetadataValue::Float(_) => Some(ValueType::Float),
            MetadataValue::Integer(_) => Some(ValueType::Integer),
            MetadataValue::Timestamp(_) => Some(ValueType::Timestamp),
            MetadataValue::Null => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => f.write_str(s),
            MetadataValue::Float(v) => write!(f, "{v}"),
            MetadataValue::Integer(v) => write!(f, "{v}"),
            MetadataValue::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            MetadataValue::Null => Ok(()),
        }
    }
}

/// Uppercase metadata key → typed value.
pub type MetadataMap = BTreeMap<String, MetadataValue>;
