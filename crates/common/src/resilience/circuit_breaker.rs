//! Three-state circuit breaker guarding one upstream dependency
//!
//! ```text
//!            failures >= threshold                 cooldown elapsed,
//!   CLOSED ─────────────────────────► OPEN ──────── next call arrives ───┐
//!     ▲                                 ▲                                 ▼
//!     │    successes >= half_open_max   │          any failure        HALF_OPEN
//!     └─────────────────────────────────┼─────────────────────────────────┘
//!                                       └─────────────────────────────────┘
//! ```
//!
//! Transitions are evaluated lazily when a call arrives; there is no
//! background timer. All state lives behind one mutex that is never held
//! across an `.await`, so concurrent completions cannot lose updates.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::clock::{Clock, SystemClock};
use super::{ConfigError, ConfigResult};

/// Errors returned by a breaker-protected call
#[derive(Debug, Error)]
pub enum ResilienceError<E>
where
    E: std::error::Error + 'static,
{
    /// Circuit breaker is open, rejecting calls
    #[error("Circuit breaker is open, rejecting calls")]
    CircuitOpen {
        /// Time left until the breaker will admit a probe call
        retry_after: Option<Duration>,
    },

    /// The underlying operation failed
    #[error("Operation failed: {source}")]
    OperationFailed { source: E },
}

impl<E> ResilienceError<E>
where
    E: std::error::Error + 'static,
{
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// Underlying operation error, if the call was admitted
    pub fn into_source(self) -> Option<E> {
        match self {
            Self::CircuitOpen { .. } => None,
            Self::OperationFailed { source } => Some(source),
        }
    }
}

/// Result type for resilience operations
pub type ResilienceResult<T, E> = Result<T, ResilienceError<E>>;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Circuit is closed, allowing requests
    Closed,
    /// Circuit is open, rejecting requests
    Open,
    /// Circuit is half-open, admitting calls to probe recovery
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::HalfOpen => "HALF_OPEN",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures in CLOSED that open the circuit
    pub failure_threshold: u32,
    /// Cooldown after the last failure before a probe is admitted
    pub reset_timeout: Duration,
    /// Successes in HALF_OPEN that close the circuit
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(60),
            half_open_max_calls: 3,
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a configuration builder
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::invalid("failure_threshold must be greater than 0"));
        }

        if self.half_open_max_calls == 0 {
            return Err(ConfigError::invalid("half_open_max_calls must be greater than 0"));
        }

        Ok(())
    }
}

/// Builder for CircuitBreakerConfig
#[derive(Debug)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreakerConfigBuilder {
    pub fn new() -> Self {
        Self { config: CircuitBreakerConfig::default() }
    }

    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn reset_timeout(mut self, timeout: Duration) -> Self {
        self.config.reset_timeout = timeout;
        self
    }

    pub fn half_open_max_calls(mut self, max_calls: u32) -> Self {
        self.config.half_open_max_calls = max_calls;
        self
    }

    /// Set a custom clock for the circuit breaker (useful for testing)
    pub fn clock<C: Clock>(self, clock: C) -> CircuitBreakerBuilderWithClock<C> {
        CircuitBreakerBuilderWithClock { config: self.config, clock }
    }

    pub fn build(self) -> ConfigResult<CircuitBreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Builder with custom clock that builds a CircuitBreaker directly
pub struct CircuitBreakerBuilderWithClock<C: Clock> {
    config: CircuitBreakerConfig,
    clock: C,
}

impl<C: Clock> CircuitBreakerBuilderWithClock<C> {
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn reset_timeout(mut self, timeout: Duration) -> Self {
        self.config.reset_timeout = timeout;
        self
    }

    pub fn half_open_max_calls(mut self, max_calls: u32) -> Self {
        self.config.half_open_max_calls = max_calls;
        self
    }

    pub fn build(self) -> ConfigResult<CircuitBreaker<C>> {
        CircuitBreaker::with_clock(self.config, self.clock)
    }
}

/// Circuit breaker metrics for monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerMetrics {
    pub state: CircuitState,
    /// Consecutive failures counted toward the threshold
    pub failure_count: u32,
    /// Successes recorded since entering HALF_OPEN
    pub half_open_successes: u32,
    /// Calls admitted through the gate
    pub total_calls: u64,
    /// Calls rejected while OPEN
    pub rejected_calls: u64,
    pub last_failure_time: Option<Instant>,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    half_open_successes: u32,
    last_failure_time: Option<Instant>,
}

impl BreakerState {
    const fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            half_open_successes: 0,
            last_failure_time: None,
        }
    }
}

/// Generic circuit breaker implementation
///
/// Owned by exactly one client; share it by wrapping the owner in an `Arc`.
pub struct CircuitBreaker<C: Clock = SystemClock> {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
    total_calls: AtomicU64,
    rejected_calls: AtomicU64,
    clock: C,
}

impl<C: Clock> fmt::Debug for CircuitBreaker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &inner.state)
            .field("failure_count", &inner.failure_count)
            .finish_non_exhaustive()
    }
}

impl CircuitBreaker<SystemClock> {
    /// Create a new circuit breaker with the given configuration using system
    /// clock
    pub fn new(config: CircuitBreakerConfig) -> ConfigResult<Self> {
        Self::with_clock(config, SystemClock)
    }

    /// Create a circuit breaker using the builder pattern
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }
}

impl<C: Clock> CircuitBreaker<C> {
    /// Create a new circuit breaker with a custom clock (useful for testing)
    pub fn with_clock(config: CircuitBreakerConfig, clock: C) -> ConfigResult<Self> {
        config.validate()?;

        Ok(Self {
            name: "default".to_string(),
            config,
            inner: Mutex::new(BreakerState::closed()),
            total_calls: AtomicU64::new(0),
            rejected_calls: AtomicU64::new(0),
            clock,
        })
    }

    /// Label used in log events, usually the guarded dependency
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Gate a call.
    ///
    /// Returns `false` while OPEN and the cooldown has not strictly elapsed
    /// since the last failure. Once it has, the breaker moves to HALF_OPEN
    /// and admits the call.
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.inner.lock();

        let admitted = match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooled_down = inner.last_failure_time.map_or(true, |failed_at| {
                    self.clock.now().saturating_duration_since(failed_at)
                        > self.config.reset_timeout
                });

                if cooled_down {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_successes = 0;
                    debug!(breaker = %self.name, "Circuit breaker half-open, probing upstream");
                }
                cooled_down
            }
        };
        drop(inner);

        if admitted {
            self.total_calls.fetch_add(1, Ordering::Relaxed);
        } else {
            self.rejected_calls.fetch_add(1, Ordering::Relaxed);
        }
        admitted
    }

    /// Time left before an OPEN breaker admits a probe call
    pub fn retry_after(&self) -> Option<Duration> {
        let inner = self.inner.lock();
        if inner.state != CircuitState::Open {
            return None;
        }

        let elapsed = inner
            .last_failure_time
            .map_or(self.config.reset_timeout, |t| self.clock.now().saturating_duration_since(t));
        Some(self.config.reset_timeout.saturating_sub(elapsed))
    }

    /// Time since the most recent recorded failure
    pub fn since_last_failure(&self) -> Option<Duration> {
        let last = self.inner.lock().last_failure_time?;
        Some(self.clock.now().saturating_duration_since(last))
    }

    /// Execute an operation with circuit breaker protection
    ///
    /// Every error returned by `operation` counts as a failure.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
    {
        self.execute_classified(operation, |_| true).await
    }

    /// Execute an operation, letting `counts_as_failure` exempt some errors.
    ///
    /// An exempt error neither opens nor closes the circuit; it is returned
    /// to the caller unchanged. Callers use this for caller-side aborts such
    /// as cancellation.
    #[instrument(level = "debug", skip_all, fields(breaker = %self.name))]
    pub async fn execute_classified<F, Fut, T, E, P>(
        &self,
        operation: F,
        counts_as_failure: P,
    ) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
        P: FnOnce(&E) -> bool,
    {
        if !self.try_acquire() {
            debug!("Circuit breaker rejecting call");
            return Err(ResilienceError::CircuitOpen { retry_after: self.retry_after() });
        }

        match operation().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(error) => {
                if counts_as_failure(&error) {
                    self.record_failure();
                } else {
                    debug!(error = %error, "Error exempt from circuit accounting");
                }
                Err(ResilienceError::OperationFailed { source: error })
            }
        }
    }

    /// Execute a synchronous operation with circuit breaker protection
    pub fn call<F, T, E>(&self, operation: F) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: std::error::Error + 'static,
    {
        if !self.try_acquire() {
            return Err(ResilienceError::CircuitOpen { retry_after: self.retry_after() });
        }

        match operation() {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(error) => {
                self.record_failure();
                Err(ResilienceError::OperationFailed { source: error })
            }
        }
    }

    /// Record a successful operation
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();

        match inner.state {
            CircuitState::Closed => {
                inner.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.config.half_open_max_calls {
                    let successes = inner.half_open_successes;
                    *inner = BreakerState::closed();
                    drop(inner);
                    info!(breaker = %self.name, successes, "Circuit breaker closed, upstream recovered");
                }
            }
            CircuitState::Open => {
                // Admitted before the circuit opened; does not close it.
                debug!(breaker = %self.name, "Late success while circuit is open");
            }
        }
    }

    /// Record a failed operation
    pub fn record_failure(&self) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        inner.last_failure_time = Some(now);

        match inner.state {
            CircuitState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    let failures = inner.failure_count;
                    drop(inner);
                    warn!(
                        breaker = %self.name,
                        failures,
                        reset_timeout_ms = u64::try_from(self.config.reset_timeout.as_millis())
                            .unwrap_or(u64::MAX),
                        "Circuit breaker opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.half_open_successes = 0;
                drop(inner);
                warn!(breaker = %self.name, "Circuit breaker re-opened after failed probe");
            }
            CircuitState::Open => {
                // Late failure; the refreshed timestamp extends the cooldown.
                inner.failure_count = inner.failure_count.saturating_add(1);
            }
        }
    }

    /// Get the current state of the circuit breaker
    ///
    /// Reading the state never triggers a transition.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Get circuit breaker metrics
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.inner.lock();
        CircuitBreakerMetrics {
            state: inner.state,
            failure_count: inner.failure_count,
            half_open_successes: inner.half_open_successes,
            total_calls: self.total_calls.load(Ordering::Relaxed),
            rejected_calls: self.rejected_calls.load(Ordering::Relaxed),
            last_failure_time: inner.last_failure_time,
        }
    }

    /// Reset the circuit breaker to closed state
    pub fn reset(&self) {
        *self.inner.lock() = BreakerState::closed();
        info!(breaker = %self.name, "Circuit breaker manually reset to closed state");
    }
}
