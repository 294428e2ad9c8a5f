//! REST implementation of [`PosApi`]
//!
//! Every method performs exactly one HTTP exchange. Non-success responses
//! become [`PosError::Api`] carrying the status code, the provider's error
//! envelope and any `Retry-After` hint, which is what the retry classifier
//! reads one layer up.

use std::time::Duration;

use async_trait::async_trait;
use mesa_domain::constants::POS_API_VERSION_HEADER;
use mesa_domain::{
    CreateOrderRequest, CreateOrderResponse, CreatePaymentLinkRequest, CreatePaymentLinkResponse,
    ListCatalogRequest, ListCatalogResponse, ListLocationsResponse, RetrieveCatalogObjectResponse,
    RetrieveLocationResponse, RetrieveOrderResponse, SearchOrdersRequest, SearchOrdersResponse,
};
use reqwest::header::{HeaderMap, ACCEPT, RETRY_AFTER};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use super::api::PosApi;
use super::ensure_idempotency_key;
use crate::credentials::AccessToken;
use crate::errors::{PosError, PosResult};
use crate::http::HttpClient;

/// POS provider REST client
#[derive(Debug, Clone)]
pub struct HttpPosApi {
    http: HttpClient,
    base_url: Url,
    token: AccessToken,
    api_version: String,
}

impl HttpPosApi {
    /// # Errors
    /// Returns [`PosError::Config`] if `base_url` is not an absolute
    /// http(s) URL.
    pub fn new(
        http: HttpClient,
        base_url: &str,
        token: AccessToken,
        api_version: impl Into<String>,
    ) -> PosResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| PosError::Config(format!("invalid POS base URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(PosError::Config(format!("POS base URL must be http(s): {base_url}")));
        }

        Ok(Self { http, base_url, token, api_version: api_version.into() })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Join percent-encoded `segments` onto the base URL
    fn endpoint(&self, segments: &[&str]) -> PosResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                PosError::Config(format!("POS base URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(self.token.expose())
            .header(POS_API_VERSION_HEADER, &self.api_version)
            .header(ACCEPT, "application/json")
    }

    async fn get<R: DeserializeOwned>(&self, url: Url) -> PosResult<R> {
        self.execute(self.request(Method::GET, url)).await
    }

    async fn post<B, R>(&self, url: Url, body: &B) -> PosResult<R>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        self.execute(self.request(Method::POST, url).json(body)).await
    }

    async fn execute<R: DeserializeOwned>(&self, builder: RequestBuilder) -> PosResult<R> {
        let response = self.http.send(builder).await?;
        let status = response.status();

        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    debug!(status = status.as_u16(), error = %e, "Failed to read POS error body");
                    String::new()
                }
            };
            let error = PosError::from_response(status.as_u16(), &body, retry_after);
            debug!(status = status.as_u16(), category = %error.category(), "POS API error response");
            return Err(error);
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| PosError::Decode(e.to_string()))
    }
}

/// `Retry-After` in delta-seconds form; HTTP dates are ignored
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl PosApi for HttpPosApi {
    async fn list_catalog(&self, request: &ListCatalogRequest) -> PosResult<ListCatalogResponse> {
        let mut url = self.endpoint(&["v2", "catalog", "list"])?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(cursor) = request.cursor.as_deref() {
                query.append_pair("cursor", cursor);
            }
            if let Some(types) = request.types.as_deref() {
                query.append_pair("types", types);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        self.get(url).await
    }

    async fn retrieve_catalog_object(
        &self,
        object_id: &str,
    ) -> PosResult<RetrieveCatalogObjectResponse> {
        self.get(self.endpoint(&["v2", "catalog", "object", object_id])?).await
    }

    async fn retrieve_order(&self, order_id: &str) -> PosResult<RetrieveOrderResponse> {
        self.get(self.endpoint(&["v2", "orders", order_id])?).await
    }

    async fn create_order(&self, request: &CreateOrderRequest) -> PosResult<CreateOrderResponse> {
        let mut body = request.clone();
        ensure_idempotency_key(&mut body.idempotency_key);
        self.post(self.endpoint(&["v2", "orders"])?, &body).await
    }

    async fn search_orders(
        &self,
        request: &SearchOrdersRequest,
    ) -> PosResult<SearchOrdersResponse> {
        self.post(self.endpoint(&["v2", "orders", "search"])?, request).await
    }

    async fn retrieve_location(&self, location_id: &str) -> PosResult<RetrieveLocationResponse> {
        self.get(self.endpoint(&["v2", "locations", location_id])?).await
    }

    async fn list_locations(&self) -> PosResult<ListLocationsResponse> {
        self.get(self.endpoint(&["v2", "locations"])?).await
    }

    async fn create_payment_link(
        &self,
        request: &CreatePaymentLinkRequest,
    ) -> PosResult<CreatePaymentLinkResponse> {
        let mut body = request.clone();
        ensure_idempotency_key(&mut body.idempotency_key);
        self.post(self.endpoint(&["v2", "online-checkout", "payment-links"])?, &body).await
    }
}
