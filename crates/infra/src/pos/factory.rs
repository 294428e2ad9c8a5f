//! Resilient client factory
//!
//! Builds a [`ResilientPosClient`] for a tenant: resolves the tenant's
//! access token, picks the base URL for the configured environment and wraps
//! the REST client in retry and a circuit breaker. A missing credential is
//! reported here, before any network call is made.

use std::time::Duration;

use mesa_common::resilience::{CircuitBreakerConfig, RetryConfig};
use mesa_domain::{PosClientSettings, PosEnvironment, Tenant};
use tracing::info;

use super::http_api::HttpPosApi;
use super::resilient::ResilientPosClient;
use crate::config;
use crate::credentials::{resolve_access_token, EnvSecretSource, SecretSource};
use crate::errors::{PosError, PosResult};
use crate::http::HttpClient;

/// Builds per-tenant resilient POS clients from shared settings
#[derive(Debug)]
pub struct ResilientClientFactory<S: SecretSource = EnvSecretSource> {
    settings: PosClientSettings,
    retry: RetryConfig,
    circuit_breaker: CircuitBreakerConfig,
    secrets: S,
    http: HttpClient,
}

impl ResilientClientFactory<EnvSecretSource> {
    /// Factory configured from `.env`, config files and the process
    /// environment, reading secrets from environment variables.
    ///
    /// # Errors
    /// Returns [`PosError::Config`] if the configuration cannot be loaded.
    pub fn from_env() -> PosResult<Self> {
        let settings = config::load().map_err(|e| PosError::Config(e.to_string()))?;
        Self::new(settings, EnvSecretSource)
    }
}

impl<S: SecretSource> ResilientClientFactory<S> {
    /// # Errors
    /// Returns [`PosError::Config`] if `settings` fail validation or the
    /// HTTP client cannot be built.
    pub fn new(settings: PosClientSettings, secrets: S) -> PosResult<Self> {
        config::validate(&settings).map_err(|e| PosError::Config(e.to_string()))?;
        let retry =
            config::retry_config(&settings.retry).map_err(|e| PosError::Config(e.to_string()))?;
        let circuit_breaker = config::circuit_breaker_config(&settings.circuit_breaker)
            .map_err(|e| PosError::Config(e.to_string()))?;

        let http = HttpClient::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .build()?;

        Ok(Self { settings, retry, circuit_breaker, secrets, http })
    }

    pub fn settings(&self) -> &PosClientSettings {
        &self.settings
    }

    pub fn environment(&self) -> PosEnvironment {
        self.settings.environment
    }

    /// Default retry config applied when `wrap` is given none
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Default breaker config applied when `wrap` is given none
    pub fn circuit_breaker_config(&self) -> &CircuitBreakerConfig {
        &self.circuit_breaker
    }

    /// Build a resilient client for `tenant`.
    ///
    /// Each call returns a client with its own, freshly closed breaker. Use
    /// [`TenantClientRegistry`](super::TenantClientRegistry) to share one
    /// breaker across requests for the same tenant.
    ///
    /// # Errors
    /// Returns [`PosError::Config`] if no access token can be resolved for
    /// the tenant or an override config is invalid.
    pub fn wrap(
        &self,
        tenant: &Tenant,
        retry: Option<RetryConfig>,
        circuit_breaker: Option<CircuitBreakerConfig>,
    ) -> PosResult<ResilientPosClient<HttpPosApi>> {
        let token = resolve_access_token(tenant, &self.secrets)?;
        let api = HttpPosApi::new(
            self.http.clone(),
            self.settings.base_url(),
            token,
            self.settings.api_version.clone(),
        )?;

        let client = ResilientPosClient::new(
            tenant.id,
            api,
            retry.unwrap_or_else(|| self.retry.clone()),
            circuit_breaker.unwrap_or_else(|| self.circuit_breaker.clone()),
        )?;

        info!(
            tenant_id = %tenant.id,
            environment = %self.settings.environment,
            base_url = self.settings.base_url(),
            max_retries = client.retry_config().max_retries,
            failure_threshold = client.circuit_breaker_config().failure_threshold,
            "Built resilient POS client"
        );
        Ok(client)
    }
}
