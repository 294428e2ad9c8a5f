//! Per-tenant client registry
//!
//! Long-lived hosts keep one [`ResilientPosClient`] per tenant so that its
//! breaker sees every request made for that tenant. The registry is an
//! owned value; create one per process (or per test) and pass it around.

use std::sync::Arc;

use dashmap::DashMap;
use mesa_domain::Tenant;
use tracing::{debug, info};
use uuid::Uuid;

use super::factory::ResilientClientFactory;
use super::http_api::HttpPosApi;
use super::resilient::{CircuitHealth, ResilientPosClient};
use crate::credentials::{EnvSecretSource, SecretSource};
use crate::errors::PosResult;

type SharedClient = Arc<ResilientPosClient<HttpPosApi>>;

/// Cache of resilient clients keyed by tenant id
#[derive(Debug)]
pub struct TenantClientRegistry<S: SecretSource = EnvSecretSource> {
    factory: ResilientClientFactory<S>,
    clients: DashMap<Uuid, SharedClient>,
}

impl<S: SecretSource> TenantClientRegistry<S> {
    pub fn new(factory: ResilientClientFactory<S>) -> Self {
        Self { factory, clients: DashMap::new() }
    }

    pub fn factory(&self) -> &ResilientClientFactory<S> {
        &self.factory
    }

    /// The tenant's shared client, building it on first use.
    ///
    /// If two callers race on a new tenant, both receive the client that was
    /// inserted first.
    ///
    /// # Errors
    /// Returns the factory's error when the client cannot be built; nothing
    /// is cached in that case.
    pub fn get_or_create(&self, tenant: &Tenant) -> PosResult<SharedClient> {
        if let Some(existing) = self.clients.get(&tenant.id) {
            return Ok(Arc::clone(existing.value()));
        }

        let client = Arc::new(self.factory.wrap(tenant, None, None)?);
        let entry = self.clients.entry(tenant.id).or_insert(client);
        debug!(tenant_id = %tenant.id, "Registered POS client");
        Ok(Arc::clone(entry.value()))
    }

    pub fn get(&self, tenant_id: Uuid) -> Option<SharedClient> {
        self.clients.get(&tenant_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Drop the tenant's client, e.g. after a credential rotation. The next
    /// `get_or_create` builds a fresh client with a closed breaker.
    pub fn evict(&self, tenant_id: Uuid) -> bool {
        let removed = self.clients.remove(&tenant_id).is_some();
        if removed {
            info!(tenant_id = %tenant_id, "Evicted POS client");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Breaker snapshots for every registered tenant
    pub fn health_snapshot(&self) -> Vec<CircuitHealth> {
        let mut snapshot: Vec<CircuitHealth> =
            self.clients.iter().map(|entry| entry.value().health()).collect();
        snapshot.sort_by_key(|health| health.tenant_id);
        snapshot
    }
}
