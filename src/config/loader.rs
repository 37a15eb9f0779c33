//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::ThreatLedgerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `node.rpc_url`.
pub const RPC_URL_ENV_VAR: &str = "THREAT_LEDGER_RPC_URL";

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

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ThreatLedgerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse, apply environment overrides and validate configuration text.
pub fn parse_config(content: &str) -> Result<ThreatLedgerConfig, ConfigError> {
    let mut config: ThreatLedgerConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load configuration from `path` if given, otherwise defaults plus
/// environment overrides.
pub fn load_or_default(path: Option<&Path>) -> Result<ThreatLedgerConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let mut config = ThreatLedgerConfig::default();
            apply_env_overrides(&mut config);
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

fn apply_env_overrides(config: &mut ThreatLedgerConfig) {
    if let Ok(url) = std::env::var(RPC_URL_ENV_VAR) {
        if !url.trim().is_empty() {
            tracing::debug!(rpc_url = %url, "RPC URL overridden from environment");
            config.node.rpc_url = url;
        }
    }
}
