//! Modular common utilities shared across Mesa crates.
//!
//! Nothing in this crate knows about restaurants, tenants or point-of-sale
//! providers. It holds the generic resilience primitives the infrastructure
//! layer composes around remote calls.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: error classification types
//! - `observability`: tracing (implied by `runtime`)
//! - `runtime`: async resilience (clock, classifier, retry, circuit breaker)
//! - `test-utils`: scripted operations and errors for tests in other crates

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(feature = "test-utils")]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{ErrorClassification, ErrorSeverity, TransientKind};
#[cfg(feature = "runtime")]
pub use resilience::{
    is_retryable, with_retry, with_retry_cancellable, CircuitBreaker, CircuitBreakerConfig,
    CircuitBreakerConfigBuilder, CircuitBreakerMetrics, CircuitState, Clock, ConfigError, Jitter,
    MockClock, ResilienceError, ResilienceResult, RetryConfig, RetryConfigBuilder, RetryError,
    RetryExecutor, RetryOutcome, RetryResult, SystemClock,
};
