//! Metadata type coercion.
//!
//! Total over its input: every key yields a value or null, and a failure on
//! one key never affects another. Failures are returned alongside the map
//! so callers can report them.

use crate::config::{NullSentinels, TypeRegistry};
use crate::domain::{MetadataMap, MetadataValue, ValueType};

use super::metadata::RawMetadata;
use super::normalize::strip_quote_prefix;
use super::timestamp::parse_timestamp;

/// A value that was present but did not parse as its registered type.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionFailure {
    pub key: String,
    pub raw: String,
    pub target: ValueType,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoercedMetadata {
    pub values: MetadataMap,
    pub failures: Vec<CoercionFailure>,
}

/// Drop thousands separators, currency and percent marks.
fn numeric_text(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '%'))
        .collect::<String>()
        .trim()
        .to_string()
}

fn parse_float(value: &str) -> Option<f64> {
    numeric_text(value)
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn parse_integer(value: &str) -> Option<i64> {
    let text = numeric_text(value);
    if let Ok(v) = text.parse::<i64>() {
        return Some(v);
    }
    let floored = text.parse::<f64>().ok().filter(|v| v.is_finite())?.floor();
    if floored >= i64::MIN as f64 && floored < i64::MAX as f64 {
        Some(floored as i64)
    } else {
        None
    }
}

/// Coerce one raw value to `target`. `None` means the value did not parse.
pub fn coerce_value(raw: &str, target: ValueType, nulls: &NullSentinels) -> Option<MetadataValue> {
    let cleaned = strip_quote_prefix(raw.trim());
    if nulls.is_null(cleaned) {
        return Some(MetadataValue::Null);
    }
    match target {
        ValueType::String => Some(MetadataValue::String(cleaned.to_uppercase())),
        ValueType::Float => parse_float(cleaned).map(MetadataValue::Float),
        ValueType::Integer => parse_integer(cleaned).map(MetadataValue::Integer),
        ValueType::Timestamp => parse_timestamp(cleaned).map(MetadataValue::Timestamp),
    }
}

/// Coerce every entry of `raw` through the registry.
pub fn coerce_metadata(
    raw: &RawMetadata,
    registry: &TypeRegistry,
    nulls: &NullSentinels,
) -> CoercedMetadata {
    let mut out = CoercedMetadata::default();
    for (key, value) in raw {
        let target = registry.type_of(key);
        let typed = match coerce_value(value, target, nulls) {
            Some(typed) => typed,
            None => {
                out.failures.push(CoercionFailure {
                    key: key.clone(),
                    raw: value.clone(),
                    target,
                });
                MetadataValue::Null
            }
        };
        out.values.insert(key.clone(), typed);
    }
    out
}
