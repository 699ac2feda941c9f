//! Parser configuration: type registry, null sentinels, markers.
//!
//! Stored as TOML. Every field has a default, so an empty file is a valid
//! configuration equivalent to [`ParserConfig::default`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use thiserror::Error;

use crate::domain::ValueType;
use crate::parse::header::DEFAULT_HEADER_MARKERS;
use crate::parse::split::DEFAULT_START_MARKER;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Metadata key → target type. Unregistered keys coerce as strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, ValueType>", into = "BTreeMap<String, ValueType>")]
pub struct TypeRegistry {
    types: BTreeMap<String, ValueType>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `key` (upper-cased) with type `ty`.
    pub fn with(mut self, key: &str, ty: ValueType) -> Self {
        self.insert(key, ty);
        self
    }

    pub fn insert(&mut self, key: &str, ty: ValueType) {
        self.types.insert(key.trim().to_uppercase(), ty);
    }

    /// Declared type of `key`, defaulting to [`ValueType::String`].
    pub fn type_of(&self, key: &str) -> ValueType {
        self.types.get(key).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ValueType)> {
        self.types.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Registry for NAV/INAV basket files.
    pub fn nav_default() -> Self {
        use ValueType::{Float, Timestamp};
        const STR: ValueType = ValueType::String;

        const ENTRIES: &[(&str, ValueType)] = &[
            ("TRADE_DATE", Timestamp),
            ("SS_LONG_CODE", STR),
            ("FULL_NAME", STR),
            ("TICKER", STR),
            ("BASE_CURRENCY", STR),
            ("CREATION_UNIT_SIZE", Float),
            ("DOMICILE", STR),
            ("ESTIMATED_DIVIDENDS", Float),
            ("PRODUCT_STRUCTURE", STR),
            ("EST_INC", Float),
            ("SETTLEMENT_CYCLE", STR),
            ("ASSET_CLASS", STR),
            ("ESTIMATED_EXPENSE", Float),
            ("CREATE_FEE", Float),
            ("ESTIMATED_CASH_COMPONENT", Float),
            ("NAV", Float),
            ("UNDISTRIBUTED_NET_INCOME_PER_SHARE", Float),
            ("BASKET_MARKET_VALUE", Float),
            ("REDEEM_FEE", Float),
            ("ACTUAL_CASH_COMPONENT", Float),
            ("NAV_PER_CREATION_UNIT", Float),
            ("UNDISTRIBUTED_NET_INCOME_PER_CREATION_UNIT", Float),
            ("BASKET_SHARES", Float),
            ("CREATE_VARIABLE_FEE", Float),
            ("NAV_LESS_UNDISTRIBUTED_NET_INCOME", Float),
            ("ACTUAL_CASH_IN_LIEU", Float),
            ("ESTIMATED_CASH_IN_LIEU", Float),
            ("REDEEM_VARIABLE_FEE", Float),
            ("ETF_SHARES_OUTSTANDING", Float),
            ("ACTUAL_INTEREST", Float),
            ("ESTIMATED_INTEREST", Float),
            ("EXPENSE_RATIO", Float),
            ("TOTAL_NET_ASSETS", Float),
            ("ACTUAL_TOTAL_CASH", Float),
            ("ESTIMATED_TOTAL_CASH", Float),
            ("THRESHOLD", STR),
        ];

        let mut registry = Self::new();
        for (key, ty) in ENTRIES {
            registry.insert(key, *ty);
        }
        registry
    }
}

impl From<BTreeMap<String, ValueType>> for TypeRegistry {
    fn from(types: BTreeMap<String, ValueType>) -> Self {
        let mut registry = Self::new();
        for (key, ty) in types {
            registry.insert(&key, ty);
        }
        registry
    }
}

impl From<TypeRegistry> for BTreeMap<String, ValueType> {
    fn from(registry: TypeRegistry) -> Self {
        registry.types
    }
}

/// Raw string forms treated as "no value". Matching ignores case and
/// surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct NullSentinels {
    forms: BTreeSet<String>,
}

impl NullSentinels {
    pub fn new<I, S>(forms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            forms: forms
                .into_iter()
                .map(|s| s.as_ref().trim().to_uppercase())
                .collect(),
        }
    }

    /// True when `value` is blank or matches a sentinel.
    pub fn is_null(&self, value: &str) -> bool {
        let value = value.trim();
        value.is_empty() || self.forms.contains(&value.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

impl Default for NullSentinels {
    fn default() -> Self {
        Self::new(["", " ", "NA", "N/A", "NULL", "NONE", "-"])
    }
}

impl From<Vec<String>> for NullSentinels {
    fn from(forms: Vec<String>) -> Self {
        Self::new(forms)
    }
}

impl From<NullSentinels> for Vec<String> {
    fn from(sentinels: NullSentinels) -> Self {
        sentinels.forms.into_iter().collect()
    }
}

/// Complete parser configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Token opening each fund block.
    pub start_marker: String,
    /// Substrings identifying the holdings header row.
    pub header_markers: Vec<String>,
    pub null_sentinels: NullSentinels,
    /// Parse blocks on the rayon thread pool.
    pub parallel: bool,
    pub types: TypeRegistry,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            start_marker: DEFAULT_START_MARKER.to_string(),
            header_markers: DEFAULT_HEADER_MARKERS.iter().map(|m| m.to_string()).collect(),
            null_sentinels: NullSentinels::default(),
            parallel: false,
            types: TypeRegistry::nav_default(),
        }
    }
}

impl ParserConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_marker.trim().is_empty() {
            return Err(ConfigError::Invalid("start_marker must not be blank".into()));
        }
        if self.header_markers.iter().all(|m| m.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "header_markers must contain at least one non-blank marker".into(),
            ));
        }
        Ok(())
    }
}
