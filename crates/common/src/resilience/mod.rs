//! Resilience patterns for fault tolerance and error handling
//!
//! This module provides **generic, reusable** resilience patterns:
//! - **Classifier**: decides whether a failed call is worth another attempt
//! - **Retry Logic**: bounded exponential backoff that consults the classifier
//! - **Circuit Breaker**: stops calling a dependency that keeps failing and
//!   probes it again after a cooldown
//!
//! The infrastructure layer composes them as breaker-around-retry:
//!
//! ```rust,ignore
//! let breaker = CircuitBreaker::new(CircuitBreakerConfig::default())?;
//! let retry = RetryConfig::default();
//!
//! let order = breaker
//!     .execute(|| with_retry(|| api.retrieve_order(&order_id), &retry))
//!     .await?;
//! ```
//!
//! One breaker guards one logical upstream dependency. The breaker is an
//! owned value; there is no process-wide registry in this module.

use thiserror::Error;

pub mod circuit_breaker;
pub mod classifier;
pub mod clock;
pub mod retry;

// Re-export circuit breaker types
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerBuilderWithClock, CircuitBreakerConfig,
    CircuitBreakerConfigBuilder, CircuitBreakerMetrics, CircuitState, ResilienceError,
    ResilienceResult,
};
// Re-export classifier
pub use classifier::{default_retryable_status_codes, is_retryable, DEFAULT_RETRYABLE_STATUS_CODES};
// Re-export clock types
pub use clock::{Clock, MockClock, SystemClock};
// Re-export retry types
pub use retry::{
    with_retry, with_retry_cancellable, Jitter, RetryConfig, RetryConfigBuilder, RetryError,
    RetryExecutor, RetryOutcome, RetryResult,
};

/// Simple configuration error for validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid { message: message.into() }
    }
}

/// Configuration result type using simple config errors
pub type ConfigResult<T> = Result<T, ConfigError>;
