//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, gas budgets > 0)
//! - Check URLs parse before any connection is attempted
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ThreatLedgerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::ThreatLedgerConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ThreatLedgerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = config.node.rpc_url.parse::<url::Url>() {
        errors.push(ValidationError::new("node.rpc_url", format!("invalid URL: {}", e)));
    }
    for failover in &config.node.failover_urls {
        if failover.parse::<url::Url>().is_err() {
            errors.push(ValidationError::new(
                "node.failover_urls",
                format!("invalid URL '{}'", failover),
            ));
        }
    }
    if config.node.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("node.rpc_timeout_secs", "must be > 0"));
    }

    let tx = &config.transactions;
    if tx.call_gas_limit == 0 {
        errors.push(ValidationError::new("transactions.call_gas_limit", "must be > 0"));
    }
    if tx.deploy_gas_limit == 0 {
        errors.push(ValidationError::new("transactions.deploy_gas_limit", "must be > 0"));
    }
    if !tx.gas_price_multiplier.is_finite() || tx.gas_price_multiplier < 1.0 {
        errors.push(ValidationError::new(
            "transactions.gas_price_multiplier",
            "must be a finite value >= 1.0",
        ));
    }
    if tx.confirmation_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "transactions.confirmation_timeout_secs",
            "must be > 0",
        ));
    }
    if tx.receipt_poll_interval_ms == 0 {
        errors.push(ValidationError::new(
            "transactions.receipt_poll_interval_ms",
            "must be > 0",
        ));
    }

    if config.deployment.network.trim().is_empty() {
        errors.push(ValidationError::new("deployment.network", "must not be empty"));
    }
    if config.deployment.contract_name.trim().is_empty() {
        errors.push(ValidationError::new("deployment.contract_name", "must not be empty"));
    }

    match config.observability.log_format.as_str() {
        "pretty" | "json" => {}
        other => errors.push(ValidationError::new(
            "observability.log_format",
            format!("expected 'pretty' or 'json', got '{}'", other),
        )),
    }

    if config.retry.max_attempts == 0 {
        errors.push(ValidationError::new("retry.max_attempts", "must be >= 1"));
    }
    if config.retry.base_delay_ms > config.retry.max_delay_ms {
        errors.push(ValidationError::new(
            "retry.base_delay_ms",
            "must not exceed retry.max_delay_ms",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ThreatLedgerConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ThreatLedgerConfig::default();
        config.node.rpc_url = "not a url".to_string();
        config.transactions.call_gas_limit = 0;
        config.observability.log_format = "xml".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.field == "node.rpc_url"));
        assert!(errors.iter().any(|e| e.field == "transactions.call_gas_limit"));
        assert!(errors.iter().any(|e| e.field == "observability.log_format"));
    }

    #[test]
    fn test_gas_multiplier_below_one_rejected() {
        let mut config = ThreatLedgerConfig::default();
        config.transactions.gas_price_multiplier = 0.5;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "transactions.gas_price_multiplier");
    }
}
