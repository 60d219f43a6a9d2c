//! Integration tests for the exchange gateway's signed HTTP layer against
//! a mock server: rate-limit retry and pagination behavior.

use std::time::Instant;

use kalshi_signal_suite::gateway::{ExchangeGateway, GatewayAuth};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_auth() -> GatewayAuth {
    GatewayAuth::from_seed_bytes("TEST-KEY", &[9u8; 32]).unwrap()
}

/// Scenario 6: a 429 with `Retry-After: 1` followed by a 200 should take
/// at least one second of wall time and return the eventual success body.
#[tokio::test]
async fn rate_limit_retry_waits_and_recovers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/markets/TICK-1"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/markets/TICK-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "market": {"ticker": "TICK-1", "title": "Test market", "yes_bid": 42}
        })))
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;

    let gateway = ExchangeGateway::new(server.uri(), test_auth()).unwrap();

    let start = Instant::now();
    let market = gateway.get_market("TICK-1").await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(market.ticker, "TICK-1");
    assert!(elapsed.as_secs_f64() >= 1.0, "expected at least one second of retry sleep, got {elapsed:?}");
}

/// Scenario 7: two consecutive `/markets` pages under the same filter
/// never share a ticker.
#[tokio::test]
async fn pagination_pages_do_not_overlap() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/markets"))
        .and(query_param("status", "open"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "markets": [
                {"ticker": "A", "title": "Market A"},
                {"ticker": "B", "title": "Market B"}
            ],
            "cursor": "page2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/markets"))
        .and(query_param("status", "open"))
        .and(query_param("limit", "2"))
        .and(query_param("cursor", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "markets": [
                {"ticker": "C", "title": "Market C"},
                {"ticker": "D", "title": "Market D"}
            ],
            "cursor": ""
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = ExchangeGateway::new(server.uri(), test_auth()).unwrap();

    let page1 = gateway.get_markets(Some("open"), 2, None).await.unwrap();
    let page2 = gateway
        .get_markets(Some("open"), 2, page1.cursor.as_deref())
        .await
        .unwrap();

    let tickers1: std::collections::HashSet<_> = page1.markets.iter().map(|m| m.ticker.clone()).collect();
    let tickers2: std::collections::HashSet<_> = page2.markets.iter().map(|m| m.ticker.clone()).collect();

    assert!(tickers1.is_disjoint(&tickers2));
    assert!(page2.cursor.is_none(), "empty cursor string should be treated as terminal");
}

/// Exhausting retries surfaces as `RateLimited`.
#[tokio::test]
async fn rate_limit_exhaustion_surfaces_as_rate_limited_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/markets/TICK-1"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .mount(&server)
        .await;

    let gateway = ExchangeGateway::new(server.uri(), test_auth()).unwrap();
    let err = gateway.get_market("TICK-1").await.unwrap_err();
    assert!(matches!(err, kalshi_signal_suite::error::GatewayError::RateLimited { .. }));
}
