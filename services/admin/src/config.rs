//! services/admin/src/config.rs
//!
//! Configuration for the `bookbyte` tool, read from the environment. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use tracing::Level;

/// The value shipped in the sample `.env`; treated as "no key configured".
pub const PLACEHOLDER_API_KEY: &str = "YOUR_OPENAI_API_KEY_HERE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Clone, Debug)]
pub struct AdminConfig {
    pub backend_url: String,
    pub gutenberg_base_url: String,
    pub openai_api_key: Option<String>,
    pub segmentation_model: String,
    pub identity_path: Option<PathBuf>,
    pub log_level: Level,
}

impl AdminConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_url =
            lookup("BACKEND_URL").unwrap_or_else(|| "http://127.0.0.1:8000".to_string());
        let gutenberg_base_url = lookup("GUTENBERG_BASE_URL")
            .unwrap_or_else(|| "https://www.gutenberg.org".to_string());
        for (var, value) in [
            ("BACKEND_URL", &backend_url),
            ("GUTENBERG_BASE_URL", &gutenberg_base_url),
        ] {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err(ConfigError::InvalidValue(
                    var.to_string(),
                    format!("'{}' is not an http(s) URL", value),
                ));
            }
        }

        let openai_api_key = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());
        let segmentation_model = lookup("SEGMENTATION_MODEL").unwrap_or_else(|| "o1".to_string());
        let identity_path = lookup("BOOKBYTE_IDENTITY_PATH").map(PathBuf::from);

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            backend_url,
            gutenberg_base_url,
            openai_api_key,
            segmentation_model,
            identity_path,
            log_level,
        })
    }

    /// The API key needed for segmentation. The sample placeholder counts as missing.
    pub fn require_openai_key(&self) -> Result<&str, ConfigError> {
        match self.openai_api_key.as_deref() {
            Some(key) if key != PLACEHOLDER_API_KEY => Ok(key),
            _ => Err(ConfigError::MissingVar("OPENAI_API_KEY".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AdminConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AdminConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.backend_url, "http://127.0.0.1:8000");
        assert_eq!(config.gutenberg_base_url, "https://www.gutenberg.org");
        assert_eq!(config.segmentation_model, "o1");
        assert!(config.identity_path.is_none());
        assert!(config.require_openai_key().is_err());
    }

    #[test]
    fn placeholder_key_is_rejected() {
        let config = config(&[("OPENAI_API_KEY", PLACEHOLDER_API_KEY)]).unwrap();
        assert!(matches!(
            config.require_openai_key(),
            Err(ConfigError::MissingVar(var)) if var == "OPENAI_API_KEY"
        ));

        let config = self::config(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.require_openai_key().unwrap(), "sk-test");
    }

    #[test]
    fn non_http_backend_is_rejected() {
        let err = config(&[("BACKEND_URL", "localhost:8000")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "BACKEND_URL"));
    }
}
