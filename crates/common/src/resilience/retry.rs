//! Bounded exponential-backoff retry
//!
//! [`RetryExecutor`] runs an async operation up to `max_retries + 1` times.
//! After each failure it asks [`is_retryable`] whether the error is worth
//! another attempt; if so it sleeps for the current delay, then multiplies the
//! delay by `backoff_multiplier`, capped at `max_delay`.
//!
//! Delays are deterministic unless [`Jitter::Equal`] is selected. The sleep can
//! be aborted with a [`CancellationToken`], which surfaces
//! [`RetryError::Cancelled`] rather than an exhaustion error.

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::classifier::{default_retryable_status_codes, is_retryable};
use super::{ConfigError, ConfigResult};
use crate::error::ErrorClassification;

/// Errors that can occur during retry operations
#[derive(Debug, Error)]
pub enum RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Every allowed attempt failed with a retryable error
    #[error("All {attempts} attempts exhausted: {source}")]
    Exhausted { attempts: u32, source: E },

    /// The operation failed with an error the classifier refused to retry
    #[error("Operation failed with non-retryable error: {source}")]
    NonRetryable { attempts: u32, source: E },

    /// The caller cancelled the sequence before it finished
    #[error("Retry cancelled after {attempts} attempts")]
    Cancelled { attempts: u32, last_error: Option<E> },
}

impl<E> RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Number of attempts that actually ran
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. }
            | Self::NonRetryable { attempts, .. }
            | Self::Cancelled { attempts, .. } => *attempts,
        }
    }

    /// Whether the sequence ended because of cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The last error returned by the operation, if one was observed
    pub fn into_last_error(self) -> Option<E> {
        match self {
            Self::Exhausted { source, .. } | Self::NonRetryable { source, .. } => Some(source),
            Self::Cancelled { last_error, .. } => last_error,
        }
    }
}

/// Result type for retry operations
pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Jitter applied on top of the computed backoff delay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Jitter {
    /// Use the computed delay as-is
    #[default]
    None,
    /// Equal jitter: a uniformly random delay in `[delay / 2, delay]`
    Equal,
}

impl Jitter {
    /// Apply jitter to the calculated delay; never exceeds `delay`
    pub fn apply(self, delay: Duration) -> Duration {
        match self {
            Self::None => delay,
            Self::Equal => {
                let nanos = u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX);
                let half = nanos / 2;
                let jitter = rand::thread_rng().gen_range(0..=nanos - half);
                Duration::from_nanos(half + jitter)
            }
        }
    }
}

/// Configuration for retry behavior
///
/// Immutable once an executor has been built from it.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt; total attempts = `max_retries + 1`
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Factor applied to the delay after each retry
    pub backoff_multiplier: f64,
    /// Upstream status codes worth retrying
    pub retryable_status_codes: BTreeSet<u16>,
    /// Jitter applied to each computed delay
    pub jitter: Jitter,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            retryable_status_codes: default_retryable_status_codes(),
            jitter: Jitter::None,
        }
    }
}

impl RetryConfig {
    /// Create a configuration builder
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier <= 1.0 {
            return Err(ConfigError::invalid(format!(
                "backoff_multiplier must be a finite number greater than 1, got {}",
                self.backoff_multiplier
            )));
        }

        if self.initial_delay > self.max_delay {
            return Err(ConfigError::invalid(format!(
                "initial_delay ({:?}) must not exceed max_delay ({:?})",
                self.initial_delay, self.max_delay
            )));
        }

        Ok(())
    }

    /// Delay that follows `current` in the backoff sequence
    pub fn next_delay(&self, current: Duration) -> Duration {
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_multiplier)
            .map_or(self.max_delay, |next| next.min(self.max_delay))
    }

    /// The un-jittered delays slept between attempts, in order
    ///
    /// Yields exactly `max_retries` values.
    pub fn delay_schedule(&self) -> Vec<Duration> {
        let mut delays = Vec::with_capacity(self.max_retries.min(64) as usize);
        let mut current = self.initial_delay;
        for _ in 0..self.max_retries {
            delays.push(current);
            current = self.next_delay(current);
        }
        delays
    }
}

/// Builder for RetryConfig with fluent API
#[derive(Debug)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.config.initial_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay = delay;
        self
    }

    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.config.backoff_multiplier = multiplier;
        self
    }

    /// Replace the retryable status code set
    pub fn retryable_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.config.retryable_status_codes = codes.into_iter().collect();
        self
    }

    pub fn no_jitter(mut self) -> Self {
        self.config.jitter = Jitter::None;
        self
    }

    pub fn equal_jitter(mut self) -> Self {
        self.config.jitter = Jitter::Equal;
        self
    }

    pub fn build(self) -> ConfigResult<RetryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Outcome of a retry execution including result and summary statistics.
#[derive(Debug)]
pub struct RetryOutcome<T, E>
where
    E: std::error::Error + 'static,
{
    pub result: RetryResult<T, E>,
    /// Attempts that actually ran
    pub attempts: u32,
    /// Delays slept between attempts, in order
    pub delays: Vec<Duration>,
}

impl<T, E> RetryOutcome<T, E>
where
    E: std::error::Error + 'static,
{
    /// Consume the outcome and return only the result.
    pub fn into_result(self) -> RetryResult<T, E> {
        self.result
    }

    /// Total time spent sleeping between attempts
    pub fn total_delay(&self) -> Duration {
        self.delays.iter().sum()
    }
}

/// The main retry executor
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create a new retry executor after validating `config`
    pub fn new(config: RetryConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration this executor runs with
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute an operation with retry logic
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> RetryResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: ErrorClassification + std::error::Error + 'static,
    {
        self.execute_with_outcome(operation, None).await.into_result()
    }

    /// Execute an operation with retry logic, aborting when `cancel` fires
    pub async fn execute_cancellable<F, Fut, T, E>(
        &self,
        operation: F,
        cancel: &CancellationToken,
    ) -> RetryResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: ErrorClassification + std::error::Error + 'static,
    {
        self.execute_with_outcome(operation, Some(cancel)).await.into_result()
    }

    /// Execute an operation with retry logic and return outcome statistics.
    pub async fn execute_with_outcome<F, Fut, T, E>(
        &self,
        mut operation: F,
        cancel: Option<&CancellationToken>,
    ) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: ErrorClassification + std::error::Error + 'static,
    {
        let max_retries = self.config.max_retries;
        let mut current_delay = self.config.initial_delay;
        let mut delays = Vec::new();
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                debug!(attempts = attempt, "Retry sequence cancelled before next attempt");
                return RetryOutcome {
                    result: Err(RetryError::Cancelled { attempts: attempt, last_error: None }),
                    attempts: attempt,
                    delays,
                };
            }

            let attempts = attempt.saturating_add(1);
            debug!(
                attempt = attempts,
                max_attempts = max_retries.saturating_add(1),
                "Executing operation"
            );

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(retries = attempt, "Operation succeeded after retries");
                    }
                    return RetryOutcome { result: Ok(value), attempts, delays };
                }
                Err(error) => error,
            };

            if !is_retryable(&error, &self.config.retryable_status_codes) {
                debug!(
                    attempt = attempts,
                    status_code = ?error.status_code(),
                    error = %error,
                    "Error is not retryable, failing fast"
                );
                return RetryOutcome {
                    result: Err(RetryError::NonRetryable { attempts, source: error }),
                    attempts,
                    delays,
                };
            }

            if attempt >= max_retries {
                warn!(
                    attempts,
                    status_code = ?error.status_code(),
                    error = %error,
                    "All retry attempts exhausted"
                );
                return RetryOutcome {
                    result: Err(RetryError::Exhausted { attempts, source: error }),
                    attempts,
                    delays,
                };
            }

            let delay = self.config.jitter.apply(current_delay);
            warn!(
                attempt = attempts,
                max_retries,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                status_code = ?error.status_code(),
                transient = ?error.transient_kind(),
                error = %error,
                "Remote call failed, retrying after backoff"
            );

            if let Some(token) = cancel {
                tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        debug!(attempts, "Retry sleep cancelled");
                        return RetryOutcome {
                            result: Err(RetryError::Cancelled {
                                attempts,
                                last_error: Some(error),
                            }),
                            attempts,
                            delays,
                        };
                    }
                    () = tokio::time::sleep(delay) => {}
                }
            } else {
                tokio::time::sleep(delay).await;
            }

            delays.push(delay);
            current_delay = self.config.next_delay(current_delay);
            attempt = attempt.saturating_add(1);
        }
    }
}

/// Run `operation` under `config` without building an executor first.
///
/// An invalid `config` is not checked here; build configs through
/// [`RetryConfig::builder`] or call [`RetryConfig::validate`] up front.
pub async fn with_retry<F, Fut, T, E>(operation: F, config: &RetryConfig) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: ErrorClassification + std::error::Error + 'static,
{
    RetryExecutor { config: config.clone() }.execute(operation).await
}

/// [`with_retry`] that aborts the sleep and the next attempt on cancellation
pub async fn with_retry_cancellable<F, Fut, T, E>(
    operation: F,
    config: &RetryConfig,
    cancel: &CancellationToken,
) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: ErrorClassification + std::error::Error + 'static,
{
    RetryExecutor { config: config.clone() }.execute_cancellable(operation, cancel).await
}
