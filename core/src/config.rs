//! Client configuration.
//!
//! Each setting resolves in the same order: explicit builder value, then
//! environment variable, then built-in default. Empty strings count as unset.

use std::time::Duration;

use crate::error::{ApiError, ErrorDetail, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.ctxmem.dev";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const API_KEY_ENV: &str = "CTXMEM_API_KEY";
pub const BASE_URL_ENV: &str = "CTXMEM_BASE_URL";
pub const TIMEOUT_ENV: &str = "CTXMEM_TIMEOUT";

/// Resolved settings for a `ContextMemory` client.
#[derive(Clone)]
pub struct ClientConfig {
    pub api_key: String,
    /// Without trailing slash.
    pub base_url: String,
    /// Applied to every request.
    pub timeout: Duration,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for `ClientConfig`.
#[derive(Debug, Default, Clone)]
pub struct ClientConfigBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl ClientConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Resolve against the process environment.
    pub fn build(self) -> Result<ClientConfig> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve against an arbitrary variable lookup.
    pub fn resolve_with<F>(self, lookup: F) -> Result<ClientConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let api_key = self
            .api_key
            .filter(|k| !k.is_empty())
            .or_else(|| env(API_KEY_ENV))
            .ok_or_else(|| {
                ApiError::Authentication(ErrorDetail::new(format!(
                    "API key required. Pass api_key or set {API_KEY_ENV} env var."
                )))
            })?;

        let base_url = self
            .base_url
            .filter(|u| !u.is_empty())
            .or_else(|| env(BASE_URL_ENV))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let timeout = match self.timeout {
            Some(timeout) => timeout,
            None => match env(TIMEOUT_ENV) {
                Some(raw) => parse_timeout(&raw)?,
                None => DEFAULT_TIMEOUT,
            },
        };

        Ok(ClientConfig {
            api_key,
            base_url,
            timeout,
        })
    }
}

/// Seconds, fractional allowed.
fn parse_timeout(raw: &str) -> Result<Duration> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .map(Duration::from_secs_f64)
        .ok_or_else(|| {
            ApiError::Validation(ErrorDetail::new(format!(
                "{TIMEOUT_ENV} must be a positive number of seconds, got {raw:?}"
            )))
        })
}
