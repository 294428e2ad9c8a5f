//! Cursor pagination helpers
//!
//! Walk a cursor-paginated listing until the provider stops returning a
//! cursor or [`MAX_PAGINATED_RESULTS`] items have been collected.
//!
//! A failure on the first page is returned as an error. A failure on a
//! later page is logged and ends the walk early: the pages fetched so far
//! are returned with [`StopReason::Failed`].

use std::future::Future;

use mesa_domain::constants::{MAX_PAGINATED_RESULTS, PAGE_SIZE};
use mesa_domain::{CatalogObject, ListCatalogRequest, Order, SearchOrdersRequest};
use serde::Serialize;
use tracing::{debug, warn};

use super::api::PosApi;
use crate::errors::PosResult;

/// Why a paginated walk ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "message", rename_all = "snake_case")]
pub enum StopReason {
    /// The provider returned no further cursor
    Exhausted,
    /// The result cap was reached with more pages available
    SafetyCap,
    /// A page after the first failed
    Failed(String),
}

/// Items collected across pages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageCollection<T> {
    pub items: Vec<T>,
    pub pages_fetched: u32,
    pub stop: StopReason,
}

impl<T> PageCollection<T> {
    /// Whether every available item was collected
    pub fn is_complete(&self) -> bool {
        self.stop == StopReason::Exhausted
    }
}

/// Search orders across all pages, `PAGE_SIZE` per page unless the request
/// sets its own limit.
///
/// # Errors
/// Returns the first page's error if the first page fails.
pub async fn search_all_orders<A>(
    api: &A,
    request: SearchOrdersRequest,
) -> PosResult<PageCollection<Order>>
where
    A: PosApi + ?Sized,
{
    let mut request = request;
    request.limit.get_or_insert(PAGE_SIZE);

    collect_pages("search_orders", request.cursor.take(), |cursor| {
        let page_request = SearchOrdersRequest { cursor, ..request.clone() };
        async move {
            let page = api.search_orders(&page_request).await?;
            Ok((page.orders, page.cursor))
        }
    })
    .await
}

/// List catalog objects across all pages, optionally filtered by `types`
/// (comma-separated, e.g. `ITEM,CATEGORY`).
///
/// # Errors
/// Returns the first page's error if the first page fails.
pub async fn list_all_catalog_objects<A>(
    api: &A,
    types: Option<String>,
) -> PosResult<PageCollection<CatalogObject>>
where
    A: PosApi + ?Sized,
{
    collect_pages("list_catalog", None, |cursor| {
        let page_request = ListCatalogRequest { cursor, types: types.clone() };
        async move {
            let page = api.list_catalog(&page_request).await?;
            Ok((page.objects, page.cursor))
        }
    })
    .await
}

async fn collect_pages<T, F, Fut>(
    operation: &'static str,
    start: Option<String>,
    mut fetch: F,
) -> PosResult<PageCollection<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = PosResult<(Vec<T>, Option<String>)>>,
{
    let mut items = Vec::new();
    let mut pages_fetched: u32 = 0;
    let mut cursor = start;

    let stop = loop {
        let requested = cursor.clone();
        let (page, next) = match fetch(cursor.take()).await {
            Ok(page) => page,
            Err(error) if pages_fetched == 0 => return Err(error),
            Err(error) => {
                warn!(
                    operation,
                    pages_fetched,
                    items = items.len(),
                    error = %error,
                    "Pagination stopped early, returning partial results"
                );
                break StopReason::Failed(error.to_string());
            }
        };

        pages_fetched += 1;
        items.extend(page);
        let next = next.filter(|c| !c.is_empty());
        debug!(operation, page = pages_fetched, items = items.len(), "Fetched page");

        if items.len() >= MAX_PAGINATED_RESULTS {
            let truncated = items.len() > MAX_PAGINATED_RESULTS;
            items.truncate(MAX_PAGINATED_RESULTS);
            if truncated || next.is_some() {
                warn!(operation, cap = MAX_PAGINATED_RESULTS, "Pagination result cap reached");
                break StopReason::SafetyCap;
            }
            break StopReason::Exhausted;
        }

        match next {
            None => break StopReason::Exhausted,
            Some(next) if requested.as_deref() == Some(next.as_str()) => {
                warn!(operation, pages_fetched, "Provider repeated the cursor, stopping");
                break StopReason::Failed(format!("cursor did not advance: {next}"));
            }
            Some(next) => cursor = Some(next),
        }
    };

    Ok(PageCollection { items, pages_fetched, stop })
}
