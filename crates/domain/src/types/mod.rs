//! Domain types and models
//!
//! Tenant records plus the point-of-sale payloads the POS client sends and
//! receives. Payload structs mirror the provider's JSON (snake_case) and keep
//! unrecognised fields in `extra` so a round trip through Mesa never drops
//! data the provider sent.

pub mod catalog;
pub mod checkout;
pub mod locations;
pub mod money;
pub mod orders;
pub mod tenant;

pub use catalog::{
    CatalogItem, CatalogItemVariation, CatalogObject, ListCatalogRequest, ListCatalogResponse,
    RetrieveCatalogObjectResponse,
};
pub use checkout::{
    CreatePaymentLinkRequest, CreatePaymentLinkResponse, PaymentLink, QuickPay,
};
pub use locations::{ListLocationsResponse, Location, RetrieveLocationResponse};
pub use money::Money;
pub use orders::{
    CreateOrderRequest, CreateOrderResponse, Order, OrderLineItem, RetrieveOrderResponse,
    SearchOrdersRequest, SearchOrdersResponse,
};
pub use tenant::Tenant;

/// Unrecognised provider fields, preserved verbatim
pub type ExtraFields = serde_json::Map<String, serde_json::Value>;
