//! # Mesa Infrastructure
//!
//! Infrastructure implementations for talking to the point-of-sale provider.
//!
//! This crate contains:
//! - The HTTP transport and the typed [`PosError`]
//! - The [`PosApi`] port and its HTTP adapter
//! - [`ResilientPosClient`], which wraps every POS call in retry and a
//!   circuit breaker
//! - Credential resolution, the client factory and the per-tenant registry
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Generic resilience primitives come from `mesa-common`
//! - Domain types and settings come from `mesa-domain`
//! - Contains all "impure" code (network, environment, files)

pub mod config;
pub mod credentials;
pub mod errors;
pub mod http;
pub mod observability;
pub mod pos;

// Re-export commonly used items
pub use credentials::{
    resolve_access_token, AccessToken, EnvSecretSource, SecretSource, StaticSecretSource,
};
pub use errors::{PosError, PosErrorCategory, PosResult};
pub use http::HttpClient;
pub use observability::{init_tracing, LogFormat};
pub use pos::{
    list_all_catalog_objects, search_all_orders, CircuitHealth, HttpPosApi, PageCollection, PosApi,
    ResilientClientFactory, ResilientPosClient, StopReason, TenantClientRegistry,
};
