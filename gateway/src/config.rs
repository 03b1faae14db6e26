//! Gateway configuration
//!
//! Loaded from environment variables, a TOML string, or a TOML file, then
//! validated before use.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `COURIER_ROOT_SERVER_URL` (required) | `root_server_url` |
//! | `COURIER_COMMON_URL_PARAMS` (`k=v,k2=v2`) | `common_url_params` |
//! | `COURIER_COMMON_AUTHORIZATION_HEADER` | `common_authorization_header` |
//! | `COURIER_REQUEST_TIMEOUT_SECS` | `request_timeout_secs` |
//!
//! # Example
//!
//! ```
//! use courier_gateway::config::GatewayConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::from_toml_str(r#"
//!     root_server_url = "https://api.example.com"
//!     common_authorization_header = "X-Token"
//!     common_url_params = [{ key = "locale", value = "en" }]
//! "#)?;
//!
//! assert_eq!(config.common_authorization_header.as_deref(), Some("X-Token"));
//! # Ok(())
//! # }
//! ```

use crate::defaults::UrlParam;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the root server URL.
pub const ENV_ROOT_SERVER_URL: &str = "COURIER_ROOT_SERVER_URL";
/// Environment variable holding default URL params as `k=v,k2=v2`.
pub const ENV_COMMON_URL_PARAMS: &str = "COURIER_COMMON_URL_PARAMS";
/// Environment variable naming the rotating authorization header.
pub const ENV_COMMON_AUTHORIZATION_HEADER: &str = "COURIER_COMMON_AUTHORIZATION_HEADER";
/// Environment variable holding the transport timeout in seconds.
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "COURIER_REQUEST_TIMEOUT_SECS";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is missing
    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    /// An environment variable could not be parsed
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue {
        /// Variable name
        var: String,
        /// What was wrong with it
        reason: String,
    },

    /// TOML could not be parsed
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration file could not be read
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration is well-formed but unusable
    #[error("Configuration validation failed: {0}")]
    Validation(String),

    /// The HTTP client could not be built from the configuration
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Read-only settings consulted by the gateway and its transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the application server (used by `broadcast_action`)
    pub root_server_url: String,
    /// Default URL params applied at gateway construction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_url_params: Option<Vec<UrlParam>>,
    /// Response header carrying a rotating authorization token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_authorization_header: Option<String>,
    /// Transport timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl GatewayConfig {
    /// Create a configuration with only a root server URL.
    #[must_use]
    pub fn new(root_server_url: impl Into<String>) -> Self {
        Self {
            root_server_url: root_server_url.into(),
            common_url_params: None,
            common_authorization_header: None,
            request_timeout_secs: None,
        }
    }

    /// Set the default URL params.
    #[must_use]
    pub fn with_common_url_params(mut self, params: Vec<UrlParam>) -> Self {
        self.common_url_params = Some(params);
        self
    }

    /// Set the rotating authorization header name.
    #[must_use]
    pub fn with_common_authorization_header(mut self, header: impl Into<String>) -> Self {
        self.common_authorization_header = Some(header.into());
        self
    }

    /// Set the transport timeout.
    #[must_use]
    pub const fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    /// Transport timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Load from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing, a value
    /// cannot be parsed, or the result fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`GatewayConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let root_server_url = lookup(ENV_ROOT_SERVER_URL)
            .ok_or_else(|| ConfigError::EnvVarNotSet(ENV_ROOT_SERVER_URL.to_string()))?;

        let common_url_params = lookup(ENV_COMMON_URL_PARAMS)
            .map(|raw| parse_url_params(&raw))
            .transpose()?;

        let common_authorization_header =
            lookup(ENV_COMMON_AUTHORIZATION_HEADER).filter(|h| !h.trim().is_empty());

        let request_timeout_secs = lookup(ENV_REQUEST_TIMEOUT_SECS)
            .map(|raw| {
                raw.trim().parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                    var: ENV_REQUEST_TIMEOUT_SECS.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let config = Self {
            root_server_url,
            common_url_params,
            common_authorization_header,
            request_timeout_secs,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Validation`] for invalid values.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise
    /// the errors of [`GatewayConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.root_server_url.starts_with("http://")
            && !self.root_server_url.starts_with("https://")
        {
            return Err(ConfigError::Validation(format!(
                "root_server_url must start with http:// or https://, got '{}'",
                self.root_server_url
            )));
        }
        if let Some(header) = &self.common_authorization_header {
            if header.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "common_authorization_header cannot be empty".to_string(),
                ));
            }
        }
        if let Some(params) = &self.common_url_params {
            if params.iter().any(|p| p.key.is_empty()) {
                return Err(ConfigError::Validation(
                    "common_url_params keys cannot be empty".to_string(),
                ));
            }
        }
        if self.request_timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "request_timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_url_params(raw: &str) -> Result<Vec<UrlParam>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            pair.split_once('=')
                .map(|(key, value)| UrlParam::new(key.trim(), value.trim()))
                .ok_or_else(|| ConfigError::InvalidValue {
                    var: ENV_COMMON_URL_PARAMS.to_string(),
                    reason: format!("expected key=value, got '{pair}'"),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    #[allow(clippy::expect_used)] // Panics: test fails if the valid configuration is rejected
    fn test_from_lookup_reads_all_fields() {
        let config = GatewayConfig::from_lookup(lookup(&[
            (ENV_ROOT_SERVER_URL, "https://api.example.com"),
            (ENV_COMMON_URL_PARAMS, "locale=en, tenant=acme"),
            (ENV_COMMON_AUTHORIZATION_HEADER, "X-Token"),
            (ENV_REQUEST_TIMEOUT_SECS, "15"),
        ]))
        .expect("valid configuration should load");

        assert_eq!(config.root_server_url, "https://api.example.com");
        assert_eq!(
            config.common_url_params,
            Some(vec![UrlParam::new("locale", "en"), UrlParam::new("tenant", "acme")])
        );
        assert_eq!(config.common_authorization_header.as_deref(), Some("X-Token"));
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_missing_root_url() {
        let result = GatewayConfig::from_lookup(lookup(&[]));
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(var)) if var == ENV_ROOT_SERVER_URL));
    }

    #[test]
    fn test_malformed_params() {
        let result = GatewayConfig::from_lookup(lookup(&[
            (ENV_ROOT_SERVER_URL, "http://localhost"),
            (ENV_COMMON_URL_PARAMS, "locale"),
        ]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_bad_timeout() {
        let result = GatewayConfig::from_lookup(lookup(&[
            (ENV_ROOT_SERVER_URL, "http://localhost"),
            (ENV_REQUEST_TIMEOUT_SECS, "soon"),
        ]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_validation_rejects_non_http_url() {
        let result = GatewayConfig::new("ftp://files").validate();
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let result = GatewayConfig::new("http://localhost")
            .with_request_timeout_secs(0)
            .validate();
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_toml_round_trip_of_optional_fields() {
        let config = GatewayConfig::from_toml_str(r#"root_server_url = "http://localhost:8080""#);
        assert!(matches!(
            config,
            Ok(GatewayConfig { common_url_params: None, common_authorization_header: None, .. })
        ));

        let malformed = GatewayConfig::from_toml_str("root_server_url = ");
        assert!(matches!(malformed, Err(ConfigError::Parse(_))));
    }

    #[test]
    #[allow(clippy::expect_used)] // Panics: temp file creation should succeed in tests
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("courier.toml");
        std::fs::write(
            &path,
            "root_server_url = \"https://api.example.com\"\nrequest_timeout_secs = 5\n",
        )
        .expect("write config");

        let config = GatewayConfig::load(&path).expect("config should load");
        assert_eq!(config.request_timeout_secs, Some(5));

        let missing = GatewayConfig::load(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
