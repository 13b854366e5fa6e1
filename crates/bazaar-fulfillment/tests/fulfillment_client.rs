//! Integration tests for `FulfillmentClient`.
//!
//! Each test stands up a `wiremock` server so no real network traffic is
//! made. Retrying clients use a zero backoff base so tests stay fast; the
//! backoff arithmetic itself is covered by the unit tests in `rate_limit`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bazaar_fulfillment::{
    ApiError, CatalogFilters, ClientConfig, FulfillmentClient, ManualClock, ResponseCache,
    RetryPolicy,
};

fn config(server: &MockServer, retry: RetryPolicy) -> ClientConfig {
    ClientConfig {
        timeout_secs: 5,
        user_agent: "bazaar-test/0.1".to_owned(),
        retry,
        ..ClientConfig::new(server.uri())
    }
}

/// Client with no retries and a private cache.
fn test_client(server: &MockServer) -> FulfillmentClient {
    FulfillmentClient::new(
        config(server, RetryPolicy::no_retry()),
        Arc::new(ResponseCache::default()),
    )
    .expect("failed to build test FulfillmentClient")
}

fn item_json(id: i64, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "sku": format!("SKU-{id}"),
        "price": "12.50",
        "currency": "usd",
        "inventory_count": 3,
        "images": ["https://cdn.test/a.jpg"],
        "variants": []
    })
}

fn page_json(items: Vec<serde_json::Value>, page: u32, total_pages: u32) -> serde_json::Value {
    json!({
        "data": items,
        "meta": {"page": page, "per_page": 2, "total": 2 * total_pages, "total_pages": total_pages}
    })
}

fn paused_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap(),
    ))
}

// ---------------------------------------------------------------------------
// Test 1: filters are serialized into the query string
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_page_sends_only_non_empty_filters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "2"))
        .and(query_param("search", "tote"))
        .and(query_param("in_stock", "true"))
        .and(query_param_is_missing("category"))
        .and(query_param_is_missing("tag"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(&page_json(vec![item_json(1, "Canvas Tote")], 2, 3)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let filters = CatalogFilters {
        page: Some(2),
        limit: Some(2),
        search: Some("tote".to_owned()),
        category: Some("  ".to_owned()),
        in_stock: Some(true),
        ..CatalogFilters::default()
    };
    let page = test_client(&server).fetch_page(&filters).await.unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].external_id, "1");
    assert_eq!(page.items[0].price, Decimal::new(1250, 2));
    assert_eq!(page.page, 2);
    assert_eq!(page.total_pages, 3);
    assert!(page.has_next_page());
}

// ---------------------------------------------------------------------------
// Test 2: bearer token
// ---------------------------------------------------------------------------

#[tokio::test]
async fn api_key_is_sent_as_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = FulfillmentClient::new(
        ClientConfig {
            api_key: Some("test-key".to_owned()),
            ..config(&server, RetryPolicy::no_retry())
        },
        Arc::new(ResponseCache::default()),
    )
    .unwrap();

    let page = client.fetch_page(&CatalogFilters::default()).await.unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total_pages, 1);
}

// ---------------------------------------------------------------------------
// Test 3: cache hit within TTL, miss after it
// ---------------------------------------------------------------------------

#[tokio::test]
async fn identical_fetches_within_ttl_hit_the_network_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .and(query_param("search", "mug"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(&page_json(vec![item_json(7, "Mug")], 1, 1)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let clock = paused_clock();
    let cache = Arc::new(ResponseCache::with_clock(
        Duration::from_secs(300),
        clock.clone(),
    ));
    let client =
        FulfillmentClient::new(config(&server, RetryPolicy::no_retry()), cache.clone()).unwrap();
    let filters = CatalogFilters {
        search: Some("mug".to_owned()),
        ..CatalogFilters::default()
    };

    let first = client.fetch_page(&filters).await.unwrap();
    clock.advance(Duration::from_secs(4 * 60));
    let second = client.fetch_page(&filters).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    assert_eq!(cache.len(), 1);

    clock.advance(Duration::from_secs(60));
    client.fetch_page(&filters).await.unwrap();
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn failed_responses_are_not_cached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({"data": []})))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let filters = CatalogFilters::default();

    assert!(client.fetch_page(&filters).await.is_err());
    assert!(client.cache().is_empty());
    assert!(client.fetch_page(&filters).await.is_ok());
    assert_eq!(client.cache().len(), 1);

    client.clear_cache();
    assert!(client.cache().is_empty());
}

// ---------------------------------------------------------------------------
// Test 4: retry on transient failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fails_twice_with_5xx_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(&page_json(vec![item_json(1, "Tee")], 1, 1)),
        )
        .mount(&server)
        .await;

    let client = FulfillmentClient::new(
        config(&server, RetryPolicy::new(3, Duration::ZERO)),
        Arc::new(ResponseCache::default()),
    )
    .unwrap();

    let page = client.fetch_page(&CatalogFilters::default()).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn rate_limit_is_retried_and_surfaces_when_exhausted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .expect(3)
        .mount(&server)
        .await;

    let client = FulfillmentClient::new(
        config(&server, RetryPolicy::new(3, Duration::ZERO)),
        Arc::new(ResponseCache::default()),
    )
    .unwrap();

    let err = client
        .fetch_page(&CatalogFilters::default())
        .await
        .unwrap_err();
    assert!(
        matches!(err, ApiError::RateLimited { retry_after_secs: 7 }),
        "expected RateLimited, got: {err:?}"
    );
}

// ---------------------------------------------------------------------------
// Test 5: client errors and their messages
// ---------------------------------------------------------------------------

#[tokio::test]
async fn client_error_keeps_upstream_message_and_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(&json!({"error": {"message": "Invalid API key"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = FulfillmentClient::new(
        config(&server, RetryPolicy::new(3, Duration::ZERO)),
        Arc::new(ResponseCache::default()),
    )
    .unwrap();

    let err = client
        .fetch_page(&CatalogFilters::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid API key");
    assert_eq!(err.status(), Some(401));
    assert!(err.is_client_error());
}

#[tokio::test]
async fn unreadable_error_body_yields_generic_network_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(400).set_body_string("<html>Bad Request</html>"))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .fetch_page(&CatalogFilters::default())
        .await
        .unwrap_err();
    assert!(
        matches!(err, ApiError::Status { status: 400, .. }),
        "expected Status, got: {err:?}"
    );
    assert!(err.to_string().starts_with("network error"));
}

#[tokio::test]
async fn unreadable_client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(400).set_body_string("<html>Bad Request</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = FulfillmentClient::new(
        config(&server, RetryPolicy::new(3, Duration::ZERO)),
        Arc::new(ResponseCache::default()),
    )
    .unwrap();

    let err = client
        .fetch_page(&CatalogFilters::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 400, .. }), "got: {err:?}");
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn missing_item_without_body_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products/nope"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = FulfillmentClient::new(
        config(&server, RetryPolicy::new(3, Duration::ZERO)),
        Arc::new(ResponseCache::default()),
    )
    .unwrap();

    let err = client.fetch_item("nope").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound { .. }), "got: {err:?}");
    assert!(err.is_client_error());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn unreadable_server_error_is_retried_until_exhausted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let client = FulfillmentClient::new(
        config(&server, RetryPolicy::new(3, Duration::ZERO)),
        Arc::new(ResponseCache::default()),
    )
    .unwrap();

    let err = client
        .fetch_page(&CatalogFilters::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 503, .. }), "got: {err:?}");
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn malformed_success_body_is_a_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .fetch_page(&CatalogFilters::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Deserialize { .. }), "got: {err:?}");
    assert!(client.cache().is_empty());
}

// ---------------------------------------------------------------------------
// Test 6: normalization failures skip the item, not the page
// ---------------------------------------------------------------------------

#[tokio::test]
async fn item_with_bad_price_is_skipped() {
    let server = MockServer::start().await;

    let mut bad = item_json(2, "Broken");
    bad["price"] = json!("free");
    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(&page_json(vec![item_json(1, "Good"), bad], 1, 1)),
        )
        .mount(&server)
        .await;

    let page = test_client(&server)
        .fetch_page(&CatalogFilters::default())
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].title, "Good");
}

// ---------------------------------------------------------------------------
// Test 7: single item
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_item_returns_normalized_item() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products/42"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(&json!({"data": item_json(42, "Lamp")})),
        )
        .mount(&server)
        .await;

    let item = test_client(&server).fetch_item("42").await.unwrap();
    assert_eq!(item.external_id, "42");
    assert_eq!(item.title, "Lamp");
    assert_eq!(item.currency_code, "USD");
    assert_eq!(item.images, vec!["https://cdn.test/a.jpg"]);
}

#[tokio::test]
async fn fetch_item_not_found_without_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = test_client(&server).fetch_item("missing").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound { .. }), "got: {err:?}");
}

#[tokio::test]
async fn fetch_item_not_found_with_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(&json!({"error": "Product not found"})))
        .mount(&server)
        .await;

    let err = test_client(&server).fetch_item("missing").await.unwrap_err();
    assert_eq!(err.to_string(), "Product not found");
}

// ---------------------------------------------------------------------------
// Test 8: walking every page
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_all_walks_until_last_page() {
    let server = MockServer::start().await;

    for page in 1..=3u32 {
        let first_id = i64::from(page) * 10;
        Mock::given(method("GET"))
            .and(path("/products"))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(&page_json(
                vec![item_json(first_id, "A"), item_json(first_id + 1, "B")],
                page,
                3,
            )))
            .expect(1)
            .mount(&server)
            .await;
    }

    let items = test_client(&server)
        .fetch_all(&CatalogFilters::default(), 0)
        .await
        .unwrap();
    let ids: Vec<&str> = items.iter().map(|i| i.external_id.as_str()).collect();
    assert_eq!(ids, vec!["10", "11", "20", "21", "30", "31"]);
}

#[tokio::test]
async fn fetch_all_discards_partial_results_on_page_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(&page_json(vec![item_json(1, "A")], 1, 2)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(&json!({"message": "page out of range"})),
        )
        .mount(&server)
        .await;

    let err = test_client(&server)
        .fetch_all(&CatalogFilters::default(), 0)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "page out of range");
}

#[tokio::test]
async fn fetch_all_stops_at_pagination_limit() {
    let server = MockServer::start().await;

    // A provider that always claims there is another page.
    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "data": [],
            "meta": {"page": 1, "per_page": 1, "total": 1_000_000, "total_pages": 1_000_000}
        })))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .fetch_all(&CatalogFilters::default(), 0)
        .await
        .unwrap_err();
    assert!(
        matches!(err, ApiError::PaginationLimit { max_pages: 200 }),
        "got: {err:?}"
    );
}
