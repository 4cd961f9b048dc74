//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::BalancerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a configuration from TOML text without validating it.
pub fn parse_config(content: &str) -> Result<BalancerConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Read a TOML file without validating it, so overrides can still be applied.
pub fn read_config(path: &Path) -> Result<BalancerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<BalancerConfig, ConfigError> {
    let config = read_config(path)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
