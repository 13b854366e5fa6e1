//! HTTP client for the fulfillment provider's product API.

mod fetch_all;

use std::sync::Arc;
use std::time::Duration;

use bazaar_core::{AppConfig, RemoteCatalogItem};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::cache::ResponseCache;
use crate::error::ApiError;
use crate::filters::{CatalogFilters, DEFAULT_PAGE_SIZE};
use crate::normalize::normalize_item;
use crate::rate_limit::{retry_with_backoff, RetryPolicy};
use crate::types::{upstream_message, ItemEnvelope, ListEnvelope, Page, PageMeta};

/// Maximum number of pages [`FulfillmentClient::fetch_all`] will walk before
/// giving up. Guards against a provider that never reports a last page.
pub(super) const MAX_PAGES: usize = 200;

const DEFAULT_USER_AGENT: &str = "bazaar/0.1 (catalog-import)";
const PRODUCTS: &str = "products";

/// Connection settings for [`FulfillmentClient`].
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Sent as a bearer token when present.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ClientConfig {
    /// Defaults for everything except the base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.fulfillment_base_url.clone(),
            api_key: config.fulfillment_api_key.clone(),
            timeout_secs: config.fulfillment_timeout_secs,
            user_agent: config.fulfillment_user_agent.clone(),
            retry: RetryPolicy::new(
                config.fulfillment_max_attempts,
                Duration::from_secs(config.fulfillment_backoff_base_secs),
            ),
        }
    }
}

/// Client for the fulfillment provider's `products` endpoints.
///
/// Every GET goes through the shared [`ResponseCache`] first. Misses are sent
/// with retry per the configured [`RetryPolicy`], and only responses that
/// decode cleanly are cached. Non-2xx responses become typed errors: the
/// provider's own message when the body carries one, otherwise a generic
/// network error.
pub struct FulfillmentClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    retry: RetryPolicy,
    cache: Arc<ResponseCache>,
}

impl FulfillmentClient {
    /// Builds a client from `config`, sharing `cache` with any other clients
    /// that hold the same `Arc`.
    ///
    /// # Errors
    ///
    /// - [`ApiError::InvalidBaseUrl`] if `config.base_url` is not an absolute
    ///   http(s) URL.
    /// - [`ApiError::Http`] if the underlying `reqwest::Client` cannot be built.
    pub fn new(config: ClientConfig, cache: Arc<ResponseCache>) -> Result<Self, ApiError> {
        let base_url = parse_base_url(&config.base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
            retry: config.retry,
            cache,
        })
    }

    /// Shorthand for a client with default settings and a private cache.
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn with_base_url(base_url: &str) -> Result<Self, ApiError> {
        Self::new(ClientConfig::new(base_url), Arc::new(ResponseCache::default()))
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Fetches one page of the product listing.
    ///
    /// Items that fail normalization are skipped with a warning so one bad
    /// record does not sink the page.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Upstream`] when a non-2xx response carries an error message.
    /// - [`ApiError::Status`] / [`ApiError::NotFound`] for other non-2xx responses.
    /// - [`ApiError::RateLimited`] / [`ApiError::Http`] after retries are exhausted.
    /// - [`ApiError::Deserialize`] if the body is not the expected envelope.
    pub async fn fetch_page(
        &self,
        filters: &CatalogFilters,
    ) -> Result<Page<RemoteCatalogItem>, ApiError> {
        let params = filters.to_query_pairs();
        let envelope: ListEnvelope = self
            .get_json(&[PRODUCTS], &params, "product listing")
            .await?;

        let raw_count = envelope.data.len();
        let mut items = Vec::with_capacity(raw_count);
        for wire in envelope.data {
            match normalize_item(wire) {
                Ok(item) => items.push(item),
                Err(e) => tracing::warn!(error = %e, "skipping item that failed normalization"),
            }
        }

        Ok(page_from_meta(envelope.meta, filters, items, raw_count))
    }

    /// Fetches a single product by its provider id.
    ///
    /// # Errors
    ///
    /// Same as [`Self::fetch_page`], plus [`ApiError::Normalization`] if the
    /// item cannot be normalized.
    pub async fn fetch_item(&self, external_id: &str) -> Result<RemoteCatalogItem, ApiError> {
        let envelope: ItemEnvelope = self
            .get_json(
                &[PRODUCTS, external_id],
                &[],
                &format!("product {external_id}"),
            )
            .await?;
        normalize_item(envelope.data)
    }

    /// Cached, retried GET that decodes the body as `T`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        params: &[(&'static str, String)],
        context: &str,
    ) -> Result<T, ApiError> {
        let endpoint = self.endpoint_url(segments)?;
        let key = ResponseCache::key_for(endpoint.as_str(), params);

        if let Some(body) = self.cache.get(&key) {
            tracing::debug!(url = %endpoint, "fulfillment cache hit");
            return decode(&body, context);
        }

        let mut url = endpoint;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }

        let body = retry_with_backoff(self.retry, || {
            let url = url.clone();
            async move { self.send(url).await }
        })
        .await?;

        let parsed = decode(&body, context)?;
        self.cache.insert(key, body);
        Ok(parsed)
    }

    async fn send(&self, url: Url) -> Result<String, ApiError> {
        let mut request = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ApiError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            // The body is only used for its message; a read failure just means there is none.
            let body = response.text().await.unwrap_or_default();
            return Err(match upstream_message(&body) {
                Some(message) => ApiError::Upstream {
                    status: status.as_u16(),
                    message,
                },
                None if status == StatusCode::NOT_FOUND => ApiError::NotFound {
                    url: url.to_string(),
                },
                None => ApiError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                },
            });
        }

        Ok(response.text().await?)
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    fn endpoint_url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: "URL cannot be a base".to_owned(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn parse_base_url(base_url: &str) -> Result<Url, ApiError> {
    let invalid = |reason: String| ApiError::InvalidBaseUrl {
        base_url: base_url.to_owned(),
        reason,
    };
    let url = Url::parse(base_url.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme \"{}\"", url.scheme())));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("URL cannot be a base".to_owned()));
    }
    if url.query().is_some() {
        return Err(invalid("base URL must not carry a query string".to_owned()));
    }
    Ok(url)
}

fn decode<T: DeserializeOwned>(body: &str, context: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|source| ApiError::Deserialize {
        context: context.to_owned(),
        source,
    })
}

/// Fills page metadata from the response, falling back to what the request
/// asked for when the provider omits `meta` fields.
fn page_from_meta(
    meta: Option<PageMeta>,
    filters: &CatalogFilters,
    items: Vec<RemoteCatalogItem>,
    raw_count: usize,
) -> Page<RemoteCatalogItem> {
    let meta = meta.unwrap_or(PageMeta {
        page: None,
        per_page: None,
        total: None,
        total_pages: None,
    });

    let page = meta.page.unwrap_or_else(|| filters.current_page()).max(1);
    let per_page = meta
        .per_page
        .or(filters.limit)
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .max(1);
    let total = meta
        .total
        .unwrap_or_else(|| u64::try_from(raw_count).unwrap_or(u64::MAX));
    let total_pages = meta.total_pages.unwrap_or_else(|| {
        if meta.total.is_some() {
            u32::try_from(total.div_ceil(u64::from(per_page))).unwrap_or(u32::MAX)
        } else {
            // Without a total there is no way to know about later pages.
            page
        }
    });

    Page {
        items,
        page,
        per_page,
        total,
        total_pages,
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
