//! Integration tests for MarketDataService over a real HTTP transport.

use coinscope_client::{FetchError, MarketDataService};
use coinscope_core::{AppConfig, Provenance};
use mockito::{Matcher, Server};
use rust_decimal_macros::dec;

fn test_config(base_url: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.api.base_url = base_url.to_string();
    config.api.api_key = Some("test-api-key".to_string());
    config.api.request_timeout_ms = 2_000;
    config.api.bulk_timeout_ms = 2_000;
    config.retry.base_delay_ms = 10;
    config.retry.max_delay_ms = 20;
    config
}

const MARKETS_BODY: &str = r#"[
    {"id":"bitcoin","symbol":"btc","name":"Bitcoin","current_price":50000,"market_cap_rank":1,
     "price_change_percentage_24h":1.5,"last_updated":"2024-01-01T00:00:00.000Z"},
    {"id":"ethereum","symbol":"eth","name":"Ethereum","current_price":3000,"market_cap_rank":2,
     "price_change_percentage_24h":-0.5,"last_updated":"2024-01-01T00:00:00.000Z"}
]"#;

#[tokio::test]
async fn test_popular_cryptos_sends_api_key_and_query() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/coins/markets")
        .match_header("x-cg-demo-api-key", "test-api-key")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("vs_currency".into(), "usd".into()),
            Matcher::UrlEncoded("per_page".into(), "10".into()),
            Matcher::UrlEncoded("order".into(), "market_cap_desc".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(MARKETS_BODY)
        .expect(1)
        .create_async()
        .await;

    let service = MarketDataService::new(&test_config(&server.url())).unwrap();

    let first = service.get_popular_cryptos(2).await.unwrap();
    assert_eq!(first.provenance, Provenance::Fresh);
    assert_eq!(first.data.len(), 2);
    assert_eq!(first.data[0].current_price, Some(dec!(50000)));
    assert_eq!(first.data[1].is_up_24h(), Some(false));

    // 두 번째 호출은 캐시
    let second = service.get_popular_cryptos(1).await.unwrap();
    assert_eq!(second.data.len(), 1);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/simple/price")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("internal error")
        .expect(1)
        .create_async()
        .await;

    let service = MarketDataService::new(&test_config(&server.url())).unwrap();
    let result = service.get_current_price("bitcoin").await;

    assert!(matches!(result, Err(FetchError::Http { status: 500, .. })));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rate_limited_response_is_retried_until_budget_exhausted() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/simple/price")
        .match_query(Matcher::Any)
        .with_status(429)
        .expect(3)
        .create_async()
        .await;

    let service = MarketDataService::new(&test_config(&server.url())).unwrap();
    let result = service.get_current_price("bitcoin").await;

    assert_eq!(result, Err(FetchError::RateLimited));
    mock.assert_async().await;

    let stats = service.get_api_stats();
    assert_eq!(stats.rate_limiter.requests_in_window, 3);
    assert!(stats.rate_limiter.backoff_multiplier > 1.0);
}

#[tokio::test]
async fn test_connection_failure_is_transport_error() {
    // 아무도 듣지 않는 포트
    let service = MarketDataService::new(&test_config("http://127.0.0.1:1")).unwrap();
    let result = service.get_current_price("bitcoin").await;

    assert!(matches!(result, Err(FetchError::Transport(_))));
    assert_eq!(service.get_api_stats().rate_limiter.requests_in_window, 0);
}

#[tokio::test]
async fn test_price_history_falls_back_to_synthetic_series() {
    let mut server = Server::new_async().await;
    let chart = server
        .mock("GET", "/coins/bitcoin/market_chart")
        .match_query(Matcher::Any)
        .with_status(503)
        .expect_at_least(1)
        .create_async()
        .await;
    let price = server
        .mock("GET", "/simple/price")
        .match_query(Matcher::UrlEncoded("ids".into(), "bitcoin".into()))
        .with_status(200)
        .with_body(r#"{"bitcoin":{"usd":50000}}"#)
        .expect(1)
        .create_async()
        .await;

    let service = MarketDataService::new(&test_config(&server.url())).unwrap();
    let history = service.get_crypto_price_history("bitcoin").await.unwrap();

    assert_eq!(history.provenance, Provenance::Synthetic);
    assert_eq!(history.data.hourly.len(), 24);
    assert!(history
        .data
        .yearly
        .iter()
        .all(|p| p.price >= dec!(49500) && p.price <= dec!(50500)));

    chart.assert_async().await;
    price.assert_async().await;
}

#[tokio::test]
async fn test_search_with_unreachable_provider_returns_empty() {
    let service = MarketDataService::new(&test_config("http://127.0.0.1:1")).unwrap();
    let result = service.search_cryptos("bitcoin").await;

    assert!(result.data.is_empty());
    assert!(result.provenance.is_degraded());
}
