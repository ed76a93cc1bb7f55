use crate::error::{ErrorClass, ErrorOrigin, InternalError};
use serde::Deserialize;
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("invalid denorm config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Config, err.to_string())
    }
}

///
/// DenormConfig
///
/// Runtime switches for the engine, read from a flat TOML
/// document. Missing keys fall back to the defaults below.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DenormConfig {
    /// Recompute on lifecycle signals. When off, only `rebuild_all` and
    /// `rebuild_entity` refresh denormalized fields.
    pub auto_update: bool,

    /// Record `DenormEvent`s into the metrics sink.
    pub metrics: bool,
}

impl Default for DenormConfig {
    fn default() -> Self {
        Self {
            auto_update: true,
            metrics: true,
        }
    }
}

impl DenormConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, InternalError> {
        let config: Self = toml::from_str(source).map_err(ConfigError::from)?;

        Ok(config)
    }
}
