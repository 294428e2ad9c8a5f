//! Point-of-sale client
//!
//! - [`PosApi`]: the provider surface (catalog, orders, locations, checkout)
//! - [`HttpPosApi`]: the REST implementation, one network attempt per call
//! - [`ResilientPosClient`]: breaker-around-retry decorator over any
//!   [`PosApi`]
//! - [`ResilientClientFactory`]: resolves credentials and environment, then
//!   builds a [`ResilientPosClient`] for a tenant
//! - [`TenantClientRegistry`]: one shared client per tenant for long-lived
//!   hosts
//! - [`pagination`]: cursor walkers with a result cap

pub mod api;
pub mod factory;
pub mod http_api;
pub mod pagination;
pub mod registry;
pub mod resilient;

pub use api::PosApi;
pub use factory::ResilientClientFactory;
pub use http_api::HttpPosApi;
pub use pagination::{list_all_catalog_objects, search_all_orders, PageCollection, StopReason};
pub use registry::TenantClientRegistry;
pub use resilient::{CircuitHealth, ResilientPosClient};

/// Fill in `key` with a fresh v4 UUID when the caller left it empty
pub(crate) fn ensure_idempotency_key(key: &mut Option<String>) -> &str {
    if key.as_deref().map_or(true, str::is_empty) {
        *key = Some(uuid::Uuid::new_v4().to_string());
    }
    key.as_deref().unwrap_or_default()
}
