//! Configuration loading and management
//!
//! This module loads [`PosClientSettings`] from environment variables and
//! files, and turns the plain settings into validated resilience configs.

pub mod loader;

use std::time::Duration;

use mesa_common::resilience::{CircuitBreakerConfig, Jitter, RetryConfig};
use mesa_domain::{CircuitBreakerSettings, MesaError, PosClientSettings, Result, RetrySettings};

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, probe_config_paths};

/// Build a validated [`RetryConfig`] from settings
///
/// # Errors
/// Returns `MesaError::Config` when the values violate the retry invariants.
pub fn retry_config(settings: &RetrySettings) -> Result<RetryConfig> {
    let config = RetryConfig {
        max_retries: settings.max_retries,
        initial_delay: Duration::from_millis(settings.initial_delay_ms),
        max_delay: Duration::from_millis(settings.max_delay_ms),
        backoff_multiplier: settings.backoff_multiplier,
        retryable_status_codes: settings.retryable_status_codes.iter().copied().collect(),
        jitter: Jitter::None,
    };
    config.validate().map_err(|e| MesaError::Config(format!("retry settings: {e}")))?;
    Ok(config)
}

/// Build a validated [`CircuitBreakerConfig`] from settings
///
/// # Errors
/// Returns `MesaError::Config` when a threshold is zero.
pub fn circuit_breaker_config(settings: &CircuitBreakerSettings) -> Result<CircuitBreakerConfig> {
    let config = CircuitBreakerConfig {
        failure_threshold: settings.failure_threshold,
        reset_timeout: Duration::from_millis(settings.reset_timeout_ms),
        half_open_max_calls: settings.half_open_max_calls,
    };
    config.validate().map_err(|e| MesaError::Config(format!("circuit breaker settings: {e}")))?;
    Ok(config)
}

/// Validate every derived config of `settings` up front
///
/// # Errors
/// Returns the first `MesaError::Config` found.
pub fn validate(settings: &PosClientSettings) -> Result<()> {
    retry_config(&settings.retry)?;
    circuit_breaker_config(&settings.circuit_breaker)?;
    url::Url::parse(settings.base_url())
        .map_err(|e| MesaError::Config(format!("invalid POS base URL: {e}")))?;
    if settings.request_timeout_ms == 0 {
        return Err(MesaError::Config("request_timeout_ms must be greater than 0".into()));
    }
    Ok(())
}
