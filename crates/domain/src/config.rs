//! POS client settings
//!
//! Plain, serde-friendly settings. The infrastructure layer converts them
//! into validated retry and circuit breaker configurations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_FAILURE_THRESHOLD, DEFAULT_HALF_OPEN_MAX_CALLS,
    DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_DELAY_MS, DEFAULT_MAX_RETRIES, DEFAULT_POS_API_VERSION,
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_RESET_TIMEOUT_MS, DEFAULT_RETRYABLE_STATUS_CODES,
    PRODUCTION_BASE_URL, SANDBOX_BASE_URL,
};
use crate::errors::MesaError;

/// POS provider environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PosEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl PosEnvironment {
    /// Provider base URL for this environment
    pub fn base_url(self) -> &'static str {
        match self {
            Self::Sandbox => SANDBOX_BASE_URL,
            Self::Production => PRODUCTION_BASE_URL,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for PosEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PosEnvironment {
    type Err = MesaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "production" => Ok(Self::Production),
            other => Err(MesaError::Config(format!(
                "unknown environment '{other}', expected 'sandbox' or 'production'"
            ))),
        }
    }
}

/// Retry settings in wire-friendly units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub retryable_status_codes: Vec<u16>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            retryable_status_codes: DEFAULT_RETRYABLE_STATUS_CODES.to_vec(),
        }
    }
}

/// Circuit breaker settings in wire-friendly units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    pub reset_timeout_ms: u64,
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            reset_timeout_ms: DEFAULT_RESET_TIMEOUT_MS,
            half_open_max_calls: DEFAULT_HALF_OPEN_MAX_CALLS,
        }
    }
}

/// Everything needed to build a POS client apart from the credential
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PosClientSettings {
    pub environment: PosEnvironment,
    /// Replaces the environment's base URL (local mocks, proxies)
    pub base_url_override: Option<String>,
    pub api_version: String,
    pub request_timeout_ms: u64,
    pub retry: RetrySettings,
    pub circuit_breaker: CircuitBreakerSettings,
}

impl Default for PosClientSettings {
    fn default() -> Self {
        Self {
            environment: PosEnvironment::default(),
            base_url_override: None,
            api_version: DEFAULT_POS_API_VERSION.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            retry: RetrySettings::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
        }
    }
}

impl PosClientSettings {
    /// Effective base URL, honouring the override
    pub fn base_url(&self) -> &str {
        self.base_url_override.as_deref().unwrap_or_else(|| self.environment.base_url())
    }
}
