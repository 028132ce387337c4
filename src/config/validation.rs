//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check session identity fields are present
//! - Validate value ranges (endpoint URL, retry interval, timeouts)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>

use url::Url;

use crate::blockchain::wallet::ADDRESS_PREFIX;
use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
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

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.namespace.trim().is_empty() {
        errors.push(ValidationError::new("namespace", "must not be empty"));
    }

    if config.mnemonic.trim().is_empty() {
        errors.push(ValidationError::new(
            "mnemonic",
            "must be set in the file or the BLUZELLE_MNEMONIC environment variable",
        ));
    }

    if config.address.trim().is_empty() {
        errors.push(ValidationError::new("address", "must not be empty"));
    } else if !config.address.starts_with(&format!("{}1", ADDRESS_PREFIX)) {
        errors.push(ValidationError::new(
            "address",
            format!("'{}' is not a {} address", config.address, ADDRESS_PREFIX),
        ));
    }

    if config.chain_id.trim().is_empty() {
        errors.push(ValidationError::new("chain_id", "must not be empty"));
    }

    match Url::parse(&config.endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            "endpoint",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(
            "endpoint",
            format!("'{}' is not a valid URL: {}", config.endpoint, e),
        )),
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.retries.interval_ms == 0 {
        errors.push(ValidationError::new("retries.interval_ms", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
