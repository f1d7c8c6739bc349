//! Client configuration.
//!
//! A `ClientConfig` is built explicitly or read from the environment:
//!
//! - `QUADERNO_BASE_URL` (required): account API root, e.g.
//!   `https://myaccount.quadernoapp.com/api/`
//! - `QUADERNO_API_TOKEN` (required): private API key
//! - `QUADERNO_TIMEOUT_SECS` (optional, default 30): whole-exchange timeout

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

pub const BASE_URL_VAR: &str = "QUADERNO_BASE_URL";
pub const API_TOKEN_VAR: &str = "QUADERNO_API_TOKEN";
pub const TIMEOUT_VAR: &str = "QUADERNO_TIMEOUT_SECS";

/// Whole-exchange timeout used unless one is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub authentication_token: String,
    pub timeout: Option<Duration>,
}

// The token stays out of debug output.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("authentication_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(base_url: &str, authentication_token: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            authentication_token: authentication_token.to_string(),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup(BASE_URL_VAR).ok_or(ConfigError::Missing(BASE_URL_VAR))?;
        Url::parse(&base_url).map_err(|e| ConfigError::Invalid {
            name: BASE_URL_VAR,
            reason: e.to_string(),
        })?;

        let token = lookup(API_TOKEN_VAR)
            .filter(|token| !token.is_empty())
            .ok_or(ConfigError::Missing(API_TOKEN_VAR))?;

        let timeout = match lookup(TIMEOUT_VAR) {
            Some(raw) => Duration::from_secs(raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                name: TIMEOUT_VAR,
                reason: e.to_string(),
            })?),
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self::new(&base_url, &token).with_timeout(Some(timeout)))
    }
}
