//! Layered client configuration.
//!
//! # Design
//! Each layer (client defaults, per-call overrides) is an explicit struct
//! whose fields are all optional. `merge` resolves two layers field by field,
//! right-biased and one level deep, so precedence is a pure function that can
//! be tested on its own.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::Headers;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;
pub const DEFAULT_RETRY_DELAY_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_MAX_RETRY_DELAY_MS: u64 = 30_000;
pub const DEFAULT_RETRY_ON_STATUS: [u16; 6] = [408, 429, 500, 502, 503, 504];
pub const DEFAULT_RETRY_ON_NETWORK_ERROR: bool = true;

/// Credentials attached to a request. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Authentication {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp_token: Option<String>,
}

impl Authentication {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            otp_token: None,
        }
    }

    pub fn with_otp(mut self, otp_token: impl Into<String>) -> Self {
        self.otp_token = Some(otp_token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn otp_token(&self) -> Option<&str> {
        self.otp_token.as_deref().filter(|t| !t.is_empty())
    }

    /// `overrides` wins wherever it sets a field.
    pub fn merge(&self, overrides: &Authentication) -> Authentication {
        Authentication {
            token: overrides.token.clone().or_else(|| self.token.clone()),
            otp_token: overrides.otp_token.clone().or_else(|| self.otp_token.clone()),
        }
    }
}

/// Retry tuning. Absent fields fall back to the `DEFAULT_*` constants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay_multiplier: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retry_delay: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_on_status: Option<Vec<u16>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_on_network_error: Option<bool>,
}

impl RetryConfig {
    pub fn resolve(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            retry_delay: Duration::from_millis(self.retry_delay.unwrap_or(DEFAULT_RETRY_DELAY_MS)),
            retry_delay_multiplier: self
                .retry_delay_multiplier
                .filter(|m| m.is_finite() && *m >= 0.0)
                .unwrap_or(DEFAULT_RETRY_DELAY_MULTIPLIER),
            max_retry_delay: Duration::from_millis(
                self.max_retry_delay.unwrap_or(DEFAULT_MAX_RETRY_DELAY_MS),
            ),
            retry_on_status: self
                .retry_on_status
                .clone()
                .unwrap_or_else(|| DEFAULT_RETRY_ON_STATUS.to_vec()),
            retry_on_network_error: self
                .retry_on_network_error
                .unwrap_or(DEFAULT_RETRY_ON_NETWORK_ERROR),
        }
    }
}

/// Fully resolved retry settings used by the retry executor.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub retry_delay_multiplier: f64,
    pub max_retry_delay: Duration,
    pub retry_on_status: Vec<u16>,
    pub retry_on_network_error: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryConfig::default().resolve()
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based):
    /// `min(retry_delay * multiplier^(retry - 1), max_retry_delay)`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.retry_delay_multiplier.powi(exponent);
        let millis = self.retry_delay.as_millis() as f64 * factor;
        let ceiling = self.max_retry_delay.as_millis() as f64;
        if !millis.is_finite() || millis >= ceiling {
            return self.max_retry_delay;
        }
        Duration::from_millis(millis.max(0.0) as u64)
    }

    pub fn retries_status(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status)
    }
}

/// Per-request behaviour flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_auth: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_otp: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
}

impl RequestOptions {
    pub fn requires_auth(&self) -> bool {
        self.required_auth.unwrap_or(false)
    }

    pub fn requires_otp(&self) -> bool {
        self.required_otp.unwrap_or(false)
    }

    pub fn with_required_auth(mut self, required: bool) -> Self {
        self.required_auth = Some(required);
        self
    }

    pub fn with_required_otp(mut self, required: bool) -> Self {
        self.required_otp = Some(required);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// `overrides` wins wherever it sets a field. A call-level `retry`
    /// replaces the default one as a whole.
    pub fn merge(&self, overrides: &RequestOptions) -> RequestOptions {
        RequestOptions {
            required_auth: overrides.required_auth.or(self.required_auth),
            required_otp: overrides.required_otp.or(self.required_otp),
            retry: overrides.retry.clone().or_else(|| self.retry.clone()),
        }
    }
}

/// Construction-time settings for a client facade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    #[serde(alias = "baseURL")]
    pub base_url: String,
    pub headers: Headers,
    pub authentication: Authentication,
    pub options: RequestOptions,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_authentication(mut self, authentication: Authentication) -> Self {
        self.authentication = authentication;
        self
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}
