//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::blockchain::wallet::MNEMONIC_ENV_VAR;
use crate::config::schema::ClientConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
///
/// An empty `mnemonic` is taken from `BLUZELLE_MNEMONIC`.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let env_mnemonic = std::env::var(MNEMONIC_ENV_VAR).ok();
    parse_config(&content, env_mnemonic.as_deref())
}

/// Parse and validate TOML text, with an optional mnemonic fallback.
pub fn parse_config(content: &str, env_mnemonic: Option<&str>) -> Result<ClientConfig, ConfigError> {
    let mut config: ClientConfig = toml::from_str(content).map_err(ConfigError::Parse)?;

    if config.mnemonic.trim().is_empty() {
        if let Some(mnemonic) = env_mnemonic {
            config.mnemonic = mnemonic.trim().to_string();
        }
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
        namespace = "ns"
        mnemonic = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about"
        address = "bluzelle1abc"
    "#;

    #[test]
    fn test_parse_valid() {
        let config = parse_config(VALID, None).unwrap();
        assert_eq!(config.namespace, "ns");
    }

    #[test]
    fn test_env_mnemonic_fallback() {
        let content = r#"
            namespace = "ns"
            address = "bluzelle1abc"
        "#;
        let config = parse_config(content, Some(" from env ")).unwrap();
        assert_eq!(config.mnemonic, "from env");

        let err = parse_config(content, None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_file_mnemonic_wins_over_env() {
        let config = parse_config(VALID, Some("other")).unwrap();
        assert!(config.mnemonic.starts_with("abandon"));
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("namespace = [", None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("Parse error"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/bluzelle.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
