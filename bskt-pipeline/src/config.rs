//! Pipeline configuration: parser settings plus per-stage rules, in one TOML file.
//!
//! ```toml
//! [parser]
//! start_marker = "TRADE_DATE"
//!
//! [validate.holdings.columns.SHARES]
//! required = true
//! type = "numeric"
//!
//! [fill.columns]
//! SHARES = { method = "median" }
//!
//! [transform.rename]
//! SHARES = "QTY"
//! ```

use std::path::Path;

use bskt_core::{ConfigError, ParserConfig};
use serde::{Deserialize, Serialize};

use crate::cleaning::FillStrategy;
use crate::transform::TransformRules;
use crate::validator::ValidationSchema;

/// Schemas for the two halves of a fund record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateConfig {
    pub metadata: ValidationSchema,
    pub holdings: ValidationSchema,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub parser: ParserConfig,
    pub validate: ValidateConfig,
    pub fill: FillStrategy,
    pub transform: TransformRules,
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.parser.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
