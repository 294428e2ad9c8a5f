//! POS API port
//!
//! The remote-call surface the rest of Mesa talks to. [`HttpPosApi`] speaks
//! the provider's REST API; [`ResilientPosClient`] decorates any
//! implementation with retry and circuit breaking without changing request
//! or response semantics.
//!
//! [`HttpPosApi`]: super::HttpPosApi
//! [`ResilientPosClient`]: super::ResilientPosClient

use std::sync::Arc;

use async_trait::async_trait;
use mesa_domain::{
    CreateOrderRequest, CreateOrderResponse, CreatePaymentLinkRequest, CreatePaymentLinkResponse,
    ListCatalogRequest, ListCatalogResponse, ListLocationsResponse, RetrieveCatalogObjectResponse,
    RetrieveLocationResponse, RetrieveOrderResponse, SearchOrdersRequest, SearchOrdersResponse,
};

use crate::errors::PosResult;

/// Point-of-sale provider operations
#[async_trait]
pub trait PosApi: Send + Sync {
    /// One page of catalog objects
    async fn list_catalog(&self, request: &ListCatalogRequest) -> PosResult<ListCatalogResponse>;

    async fn retrieve_catalog_object(
        &self,
        object_id: &str,
    ) -> PosResult<RetrieveCatalogObjectResponse>;

    async fn retrieve_order(&self, order_id: &str) -> PosResult<RetrieveOrderResponse>;

    /// Create an order. Implementations fill in a missing idempotency key.
    async fn create_order(&self, request: &CreateOrderRequest) -> PosResult<CreateOrderResponse>;

    /// One page of orders matching `request`
    async fn search_orders(&self, request: &SearchOrdersRequest)
        -> PosResult<SearchOrdersResponse>;

    async fn retrieve_location(&self, location_id: &str) -> PosResult<RetrieveLocationResponse>;

    async fn list_locations(&self) -> PosResult<ListLocationsResponse>;

    /// Create a checkout payment link. Implementations fill in a missing
    /// idempotency key.
    async fn create_payment_link(
        &self,
        request: &CreatePaymentLinkRequest,
    ) -> PosResult<CreatePaymentLinkResponse>;
}

#[async_trait]
impl<T: PosApi + ?Sized> PosApi for Arc<T> {
    async fn list_catalog(&self, request: &ListCatalogRequest) -> PosResult<ListCatalogResponse> {
        (**self).list_catalog(request).await
    }

    async fn retrieve_catalog_object(
        &self,
        object_id: &str,
    ) -> PosResult<RetrieveCatalogObjectResponse> {
        (**self).retrieve_catalog_object(object_id).await
    }

    async fn retrieve_order(&self, order_id: &str) -> PosResult<RetrieveOrderResponse> {
        (**self).retrieve_order(order_id).await
    }

    async fn create_order(&self, request: &CreateOrderRequest) -> PosResult<CreateOrderResponse> {
        (**self).create_order(request).await
    }

    async fn search_orders(
        &self,
        request: &SearchOrdersRequest,
    ) -> PosResult<SearchOrdersResponse> {
        (**self).search_orders(request).await
    }

    async fn retrieve_location(&self, location_id: &str) -> PosResult<RetrieveLocationResponse> {
        (**self).retrieve_location(location_id).await
    }

    async fn list_locations(&self) -> PosResult<ListLocationsResponse> {
        (**self).list_locations().await
    }

    async fn create_payment_link(
        &self,
        request: &CreatePaymentLinkRequest,
    ) -> PosResult<CreatePaymentLinkResponse> {
        (**self).create_payment_link(request).await
    }
}
