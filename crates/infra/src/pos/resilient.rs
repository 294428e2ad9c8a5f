//! Resilient POS client
//!
//! [`ResilientPosClient`] decorates a [`PosApi`] so that every call runs as
//! breaker-around-retry:
//!
//! ```text
//! breaker.execute(|| retry.execute(|| inner.method(args)))
//! ```
//!
//! The breaker sees one logical call per method invocation, however many
//! attempts the retry loop makes inside it. One breaker is shared by every
//! method of a client (and by every clone of it).

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use mesa_common::resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, Clock, ResilienceError, RetryConfig,
    RetryError, RetryExecutor, SystemClock,
};
use mesa_domain::{
    CreateOrderRequest, CreateOrderResponse, CreatePaymentLinkRequest, CreatePaymentLinkResponse,
    ListCatalogRequest, ListCatalogResponse, ListLocationsResponse, RetrieveCatalogObjectResponse,
    RetrieveLocationResponse, RetrieveOrderResponse, SearchOrdersRequest, SearchOrdersResponse,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::api::PosApi;
use super::ensure_idempotency_key;
use crate::errors::{PosError, PosResult};

/// Serializable breaker snapshot for health endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitHealth {
    pub tenant_id: Uuid,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub half_open_successes: u32,
    pub since_last_failure_ms: Option<u64>,
    pub total_calls: u64,
    pub rejected_calls: u64,
}

/// [`PosApi`] decorator adding retry and circuit breaking
pub struct ResilientPosClient<A, C: Clock = SystemClock> {
    tenant_id: Uuid,
    inner: Arc<A>,
    retry: RetryExecutor,
    breaker: Arc<CircuitBreaker<C>>,
    cancel: Option<CancellationToken>,
}

impl<A, C: Clock> Clone for ResilientPosClient<A, C> {
    fn clone(&self) -> Self {
        Self {
            tenant_id: self.tenant_id,
            inner: Arc::clone(&self.inner),
            retry: self.retry.clone(),
            breaker: Arc::clone(&self.breaker),
            cancel: self.cancel.clone(),
        }
    }
}

impl<A, C: Clock> std::fmt::Debug for ResilientPosClient<A, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientPosClient")
            .field("tenant_id", &self.tenant_id)
            .field("retry", self.retry.config())
            .field("breaker", &self.breaker)
            .finish_non_exhaustive()
    }
}

impl<A: PosApi> ResilientPosClient<A> {
    /// # Errors
    /// Returns [`PosError::Config`] if either config fails validation.
    pub fn new(
        tenant_id: Uuid,
        inner: A,
        retry: RetryConfig,
        breaker: CircuitBreakerConfig,
    ) -> PosResult<Self> {
        Self::with_clock(tenant_id, inner, retry, breaker, SystemClock)
    }
}

impl<A: PosApi, C: Clock> ResilientPosClient<A, C> {
    /// Build a client whose breaker reads time from `clock`
    ///
    /// # Errors
    /// Returns [`PosError::Config`] if either config fails validation.
    pub fn with_clock(
        tenant_id: Uuid,
        inner: A,
        retry: RetryConfig,
        breaker: CircuitBreakerConfig,
        clock: C,
    ) -> PosResult<Self> {
        let retry = RetryExecutor::new(retry)
            .map_err(|e| PosError::Config(format!("retry config: {e}")))?;
        let breaker = CircuitBreaker::with_clock(breaker, clock)
            .map_err(|e| PosError::Config(format!("circuit breaker config: {e}")))?
            .with_name(format!("pos:{tenant_id}"));

        Ok(Self {
            tenant_id,
            inner: Arc::new(inner),
            retry,
            breaker: Arc::new(breaker),
            cancel: None,
        })
    }

    /// A view of this client whose calls abort when `token` is cancelled.
    ///
    /// The view shares the breaker with `self`.
    #[must_use]
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self { cancel: Some(token), ..self.clone() }
    }

    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    /// The wrapped client
    pub fn inner(&self) -> &A {
        &self.inner
    }

    pub fn retry_config(&self) -> &RetryConfig {
        self.retry.config()
    }

    pub fn circuit_breaker_config(&self) -> &CircuitBreakerConfig {
        self.breaker.config()
    }

    /// Current breaker state; reading it never triggers a transition
    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub fn health(&self) -> CircuitHealth {
        let metrics = self.breaker.metrics();
        CircuitHealth {
            tenant_id: self.tenant_id,
            state: metrics.state,
            consecutive_failures: metrics.failure_count,
            half_open_successes: metrics.half_open_successes,
            since_last_failure_ms: self
                .breaker
                .since_last_failure()
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            total_calls: metrics.total_calls,
            rejected_calls: metrics.rejected_calls,
        }
    }

    /// Force the breaker back to closed
    pub fn reset_circuit(&self) {
        self.breaker.reset();
    }

    /// Run `operation` as breaker-around-retry.
    ///
    /// Cancellation is returned as [`PosError::Cancelled`] and is not counted
    /// as a breaker failure.
    async fn call<T, F, Fut>(&self, operation: &'static str, op: F) -> PosResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PosResult<T>>,
    {
        let retry = &self.retry;
        let cancel = self.cancel.as_ref();

        let result = self
            .breaker
            .execute_classified(
                || async move { retry.execute_with_outcome(op, cancel).await.into_result() },
                |e: &RetryError<PosError>| !e.is_cancelled(),
            )
            .await;

        match result {
            Ok(value) => Ok(value),
            Err(ResilienceError::CircuitOpen { retry_after }) => {
                warn!(
                    operation,
                    retry_after_ms =
                        retry_after.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
                    "POS call rejected, circuit open"
                );
                Err(PosError::CircuitOpen { retry_after })
            }
            Err(ResilienceError::OperationFailed { source }) => {
                let attempts = source.attempts();
                let error = match source {
                    RetryError::Exhausted { source, .. }
                    | RetryError::NonRetryable { source, .. } => source,
                    RetryError::Cancelled { .. } => PosError::Cancelled,
                };
                debug!(
                    operation,
                    attempts,
                    category = %error.category(),
                    error = %error,
                    "POS call failed"
                );
                Err(error)
            }
        }
    }
}

#[async_trait]
impl<A: PosApi, C: Clock> PosApi for ResilientPosClient<A, C> {
    #[instrument(skip_all, fields(tenant_id = %self.tenant_id, operation = "list_catalog"))]
    async fn list_catalog(&self, request: &ListCatalogRequest) -> PosResult<ListCatalogResponse> {
        self.call("list_catalog", || self.inner.list_catalog(request)).await
    }

    #[instrument(skip_all, fields(tenant_id = %self.tenant_id, operation = "retrieve_catalog_object"))]
    async fn retrieve_catalog_object(
        &self,
        object_id: &str,
    ) -> PosResult<RetrieveCatalogObjectResponse> {
        self.call("retrieve_catalog_object", || self.inner.retrieve_catalog_object(object_id))
            .await
    }

    #[instrument(skip_all, fields(tenant_id = %self.tenant_id, operation = "retrieve_order"))]
    async fn retrieve_order(&self, order_id: &str) -> PosResult<RetrieveOrderResponse> {
        self.call("retrieve_order", || self.inner.retrieve_order(order_id)).await
    }

    #[instrument(skip_all, fields(tenant_id = %self.tenant_id, operation = "create_order"))]
    async fn create_order(&self, request: &CreateOrderRequest) -> PosResult<CreateOrderResponse> {
        // Fixed before the first attempt so every retry sends the same key.
        let mut request = request.clone();
        ensure_idempotency_key(&mut request.idempotency_key);
        let request = &request;

        self.call("create_order", || self.inner.create_order(request)).await
    }

    #[instrument(skip_all, fields(tenant_id = %self.tenant_id, operation = "search_orders"))]
    async fn search_orders(
        &self,
        request: &SearchOrdersRequest,
    ) -> PosResult<SearchOrdersResponse> {
        self.call("search_orders", || self.inner.search_orders(request)).await
    }

    #[instrument(skip_all, fields(tenant_id = %self.tenant_id, operation = "retrieve_location"))]
    async fn retrieve_location(&self, location_id: &str) -> PosResult<RetrieveLocationResponse> {
        self.call("retrieve_location", || self.inner.retrieve_location(location_id)).await
    }

    #[instrument(skip_all, fields(tenant_id = %self.tenant_id, operation = "list_locations"))]
    async fn list_locations(&self) -> PosResult<ListLocationsResponse> {
        self.call("list_locations", || self.inner.list_locations()).await
    }

    #[instrument(skip_all, fields(tenant_id = %self.tenant_id, operation = "create_payment_link"))]
    async fn create_payment_link(
        &self,
        request: &CreatePaymentLinkRequest,
    ) -> PosResult<CreatePaymentLinkResponse> {
        let mut request = request.clone();
        ensure_idempotency_key(&mut request.idempotency_key);
        let request = &request;

        self.call("create_payment_link", || self.inner.create_payment_link(request)).await
    }
}
