//! 시장 데이터 서비스 (프레젠테이션 계층이 호출하는 진입점).
//!
//! 모든 요청은 [`ResilientFetcher`]를 거치며, 결과에는 출처가 붙습니다.
//! 복구 순서는 다음과 같습니다:
//!
//! 1. 유효한 캐시 또는 새 응답 → `Fresh`
//! 2. 갱신 실패 시 만료 캐시 → `Stale`
//! 3. 가격 히스토리 전체 실패 시 마지막 현재가 기반 합성 시계열 → `Synthetic`
//! 4. 위가 모두 불가능하면 에러 (검색은 빈 목록)

use crate::cache::TtlCache;
use crate::error::{FetchError, FetchResult};
use crate::fetch::{CacheClass, FetchOptions, FetchRequest, ResilientFetcher};
use crate::provider::endpoints::{self, MAX_SEARCH_IDS, MIN_SEARCH_LEN};
use crate::provider::shaping;
use crate::provider::synthetic::{synthetic_history, SYNTHETIC_POINTS};
use crate::rate_limiter::RateLimiter;
use crate::stats::ApiStats;
use crate::transport::{HttpTransport, ReqwestTransport};
use chrono::Utc;
use coinscope_core::{
    trailing_window, validate_coin_id, AppConfig, Cryptocurrency, PriceDataPoint, PriceHistory,
    Provenance, Sourced,
};
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

static GLOBAL_SERVICE: OnceLock<MarketDataService> = OnceLock::new();

/// 가격 히스토리 구성에 쓰는 기간(일).
const WEEK_DAYS: u32 = 7;
const MONTH_DAYS: u32 = 30;
const YEAR_DAYS: u32 = 365;

/// 시장 데이터 서비스.
pub struct MarketDataService {
    fetcher: ResilientFetcher,
    bulk_timeout: Duration,
}

impl MarketDataService {
    /// 설정으로 독립된 인스턴스를 생성합니다.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `FetchError::Transport`를 반환합니다.
    pub fn new(config: &AppConfig) -> FetchResult<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config.api)?);
        Ok(Self::with_components(
            transport,
            Arc::new(TtlCache::new(config.cache.max_size)),
            Arc::new(RateLimiter::from_config(&config.rate_limit)),
            config,
        ))
    }

    /// 구성 요소를 직접 주입해 생성합니다.
    pub fn with_components(
        transport: Arc<dyn HttpTransport>,
        cache: Arc<TtlCache<Value>>,
        limiter: Arc<RateLimiter>,
        config: &AppConfig,
    ) -> Self {
        Self {
            fetcher: ResilientFetcher::new(transport, cache, limiter, FetchOptions::from(config)),
            bulk_timeout: config.api.bulk_timeout(),
        }
    }

    /// 프로세스 전역 기본 인스턴스.
    ///
    /// 처음 호출될 때 기본 경로의 설정 파일(없으면 기본값)로 생성됩니다.
    pub fn global() -> FetchResult<&'static MarketDataService> {
        if let Some(service) = GLOBAL_SERVICE.get() {
            return Ok(service);
        }

        let config = AppConfig::load_default().unwrap_or_else(|e| {
            warn!(error = %e, "설정 로드 실패, 기본값 사용");
            AppConfig::default()
        });
        let service = Self::new(&config)?;

        Ok(GLOBAL_SERVICE.get_or_init(|| service))
    }

    pub fn fetcher(&self) -> &ResilientFetcher {
        &self.fetcher
    }

    /// 시가총액 상위 코인 목록.
    ///
    /// 요청 크기는 10/50/100으로 맞춰 캐시를 공유하고, 결과는 `limit`개로 자릅니다.
    #[instrument(skip(self))]
    pub async fn get_popular_cryptos(
        &self,
        limit: usize,
    ) -> FetchResult<Sourced<Vec<Cryptocurrency>>> {
        if limit == 0 {
            return Ok(Sourced::fresh(Vec::new()));
        }

        let bucket = endpoints::bucket_limit(limit);
        let request = FetchRequest::new(endpoints::markets_path(bucket), CacheClass::MarketList)
            .cache_key(endpoints::markets_key(bucket))
            .timeout(self.bulk_timeout)
            .validate(shaping::is_market_list);

        let sourced = self.fetch_with_fallback(request).await?;
        let mut coins = shaping::parse_markets(&sourced.data)?;
        coins.truncate(limit);

        debug!(count = coins.len(), provenance = %sourced.provenance, "시세 목록 조회 완료");
        Ok(Sourced::new(coins, sourced.provenance))
    }

    /// 코인 검색.
    ///
    /// 실패하지 않습니다. 검색 요청 자체가 실패하고 캐시도 없으면
    /// `Synthetic` 출처의 빈 목록을 반환합니다.
    #[instrument(skip(self))]
    pub async fn search_cryptos(&self, query: &str) -> Sourced<Vec<Cryptocurrency>> {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_LEN {
            return Sourced::fresh(Vec::new());
        }

        let normalized = query.to_lowercase();
        let request = FetchRequest::new(endpoints::search_path(query), CacheClass::Search)
            .cache_key(endpoints::search_key(&normalized))
            .validate(shaping::is_search_result);

        let hits = match self
            .fetch_with_fallback(request)
            .await
            .and_then(|sourced| {
                let hits = shaping::parse_search_hits(&sourced.data)?;
                Ok(Sourced::new(hits, sourced.provenance))
            }) {
            Ok(hits) => hits,
            Err(e) => {
                warn!(query = %normalized, kind = %e.kind(), error = %e, "검색 실패, 빈 결과 반환");
                return Sourced::synthetic(Vec::new());
            }
        };

        if hits.data.is_empty() {
            return Sourced::new(Vec::new(), hits.provenance);
        }

        let ids: Vec<String> = hits
            .data
            .iter()
            .take(MAX_SEARCH_IDS)
            .map(|hit| hit.id.clone())
            .collect();

        let request = FetchRequest::new(endpoints::markets_by_ids_path(&ids), CacheClass::Search)
            .cache_key(endpoints::search_markets_key(&ids))
            .validate(shaping::is_market_list);

        let markets = self
            .fetch_with_fallback(request)
            .await
            .and_then(|sourced| {
                let coins = shaping::parse_markets(&sourced.data)?;
                Ok(Sourced::new(coins, sourced.provenance))
            });

        match markets {
            Ok(markets) if !markets.data.is_empty() => {
                Sourced::new(markets.data, hits.provenance.combine(markets.provenance))
            }
            Ok(_) => Sourced::new(Self::records_from_hits(hits.data), hits.provenance),
            Err(e) => {
                warn!(query = %normalized, kind = %e.kind(), "검색 결과 시세 조회 실패, 검색 정보만 반환");
                Sourced::new(Self::records_from_hits(hits.data), hits.provenance)
            }
        }
    }

    fn records_from_hits(hits: Vec<shaping::SearchHit>) -> Vec<Cryptocurrency> {
        hits.into_iter()
            .take(MAX_SEARCH_IDS)
            .map(Cryptocurrency::from)
            .collect()
    }

    /// `days`일 가격 시계열.
    ///
    /// 간격은 1일 이하 시간별, 90일 이하 일별, 그 이상 주별입니다.
    #[instrument(skip(self))]
    pub async fn get_historical_data(
        &self,
        coin_id: &str,
        days: u32,
    ) -> FetchResult<Sourced<Vec<PriceDataPoint>>> {
        validate_coin_id(coin_id)?;
        let days = days.max(1);

        let request = FetchRequest::new(endpoints::market_chart_path(coin_id, days), CacheClass::History)
            .cache_key(endpoints::history_key(coin_id, days))
            .validate(shaping::is_market_chart);

        let sourced = self.fetch_with_fallback(request).await?;
        let points = shaping::parse_market_chart(&sourced.data)?;

        Ok(Sourced::new(points, sourced.provenance))
    }

    /// 현재가 (USD).
    #[instrument(skip(self))]
    pub async fn get_current_price(&self, coin_id: &str) -> FetchResult<Sourced<Decimal>> {
        validate_coin_id(coin_id)?;

        let request = FetchRequest::new(endpoints::simple_price_path(coin_id), CacheClass::SpotPrice)
            .cache_key(endpoints::price_key(coin_id))
            .validate(shaping::is_simple_price);

        let sourced = self.fetch_with_fallback(request).await?;
        let price = shaping::parse_simple_price(&sourced.data, coin_id)?;

        Ok(Sourced::new(price, sourced.provenance))
    }

    /// 차트 탭용 가격 히스토리 (24시간/7일/30일/365일).
    ///
    /// 7/30/365일 시계열을 동시에 조회하고, 24시간 구간은 7일 시계열에서 추려냅니다.
    /// 하나라도 실패하면 마지막 현재가로 합성 시계열을 만듭니다.
    #[instrument(skip(self))]
    pub async fn get_crypto_price_history(&self, coin_id: &str) -> FetchResult<Sourced<PriceHistory>> {
        validate_coin_id(coin_id)?;

        let ranges = futures::future::try_join3(
            self.get_historical_data(coin_id, WEEK_DAYS),
            self.get_historical_data(coin_id, MONTH_DAYS),
            self.get_historical_data(coin_id, YEAR_DAYS),
        )
        .await;

        match ranges {
            Ok((weekly, monthly, yearly)) => {
                let provenance = weekly
                    .provenance
                    .combine(monthly.provenance)
                    .combine(yearly.provenance);
                let hourly = trailing_window(
                    &weekly.data,
                    Utc::now(),
                    chrono::Duration::hours(24),
                    SYNTHETIC_POINTS,
                );

                Ok(Sourced::new(
                    PriceHistory {
                        hourly,
                        weekly: weekly.data,
                        monthly: monthly.data,
                        yearly: yearly.data,
                    },
                    provenance,
                ))
            }
            Err(e) => {
                warn!(coin_id, kind = %e.kind(), error = %e, "가격 히스토리 조회 실패, 합성 데이터 생성 시도");
                self.synthesize_history(coin_id, e).await
            }
        }
    }

    async fn synthesize_history(
        &self,
        coin_id: &str,
        cause: FetchError,
    ) -> FetchResult<Sourced<PriceHistory>> {
        let cached = self
            .fetcher
            .cached_stale(&endpoints::price_key(coin_id))
            .and_then(|value| shaping::parse_simple_price(&value, coin_id).ok());

        let anchor = match cached {
            Some(price) => price,
            None => match self.get_current_price(coin_id).await {
                Ok(price) => price.data,
                Err(e) => {
                    warn!(coin_id, error = %e, "현재가도 없어 합성 데이터 생성 불가");
                    return Err(cause);
                }
            },
        };

        info!(coin_id, anchor = %anchor, "합성 가격 히스토리 생성");
        Ok(Sourced::synthetic(synthetic_history(anchor, Utc::now())))
    }

    /// 캐시 및 요청 한도 통계.
    pub fn get_api_stats(&self) -> ApiStats {
        ApiStats {
            cache: self.fetcher.cache().stats(),
            rate_limiter: self.fetcher.limiter().stats(),
        }
    }

    /// 오케스트레이터 결과에 호출 지점 stale 폴백을 적용합니다.
    async fn fetch_with_fallback(&self, request: FetchRequest) -> FetchResult<Sourced<Value>> {
        let key = request.key().to_string();

        match self.fetcher.fetch(request).await {
            Ok(fetched) => Ok(fetched.into_sourced()),
            Err(e) if e.allows_stale_fallback() => match self.fetcher.cached_stale(&key) {
                Some(value) => {
                    warn!(cache_key = %key, kind = %e.kind(), "요청 실패, 만료 캐시 사용");
                    Ok(Sourced::new(value, Provenance::Stale))
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for MarketDataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataService")
            .field("fetcher", &self.fetcher)
            .field("bulk_timeout", &self.bulk_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockTransport, Scripted};
    use crate::transport::TransportResponse;
    use chrono::{DateTime, Duration as ChronoDuration};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn setup() -> (Arc<MockTransport>, MarketDataService) {
        let transport = Arc::new(MockTransport::new());
        let config = AppConfig::default();
        let service = MarketDataService::with_components(
            transport.clone(),
            Arc::new(TtlCache::new(config.cache.max_size)),
            Arc::new(RateLimiter::from_config(&config.rate_limit)),
            &config,
        );
        (transport, service)
    }

    fn market_json(ids: &[&str]) -> String {
        let entries: Vec<Value> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                json!({
                    "id": id,
                    "symbol": &id[..3],
                    "name": id,
                    "current_price": 100.0 + i as f64,
                    "market_cap_rank": i + 1
                })
            })
            .collect();
        Value::Array(entries).to_string()
    }

    fn chart_json(points: &[(DateTime<Utc>, f64)]) -> String {
        let prices: Vec<Value> = points
            .iter()
            .map(|(ts, price)| json!([ts.timestamp_millis(), price]))
            .collect();
        json!({ "prices": prices }).to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn test_popular_cryptos_bucketed_and_truncated() {
        let (transport, service) = setup();
        let ids = ["bitcoin", "ethereum", "tether", "binancecoin", "solana", "ripple", "usd-coin", "cardano"];
        transport.respond("/coins/markets", 200, &market_json(&ids));

        let seven = service.get_popular_cryptos(7).await.unwrap();
        assert_eq!(seven.data.len(), 7);
        assert_eq!(seven.provenance, Provenance::Fresh);
        assert!(transport.calls()[0].contains("per_page=10"));

        // 같은 버킷은 캐시 공유
        let three = service.get_popular_cryptos(3).await.unwrap();
        assert_eq!(three.data.len(), 3);
        assert_eq!(three.data[0].id, "bitcoin");
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_popular_cryptos_zero_limit() {
        let (transport, service) = setup();
        let result = service.get_popular_cryptos(0).await.unwrap();

        assert!(result.data.is_empty());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_short_query_skips_network() {
        let (transport, service) = setup();

        assert!(service.search_cryptos(" b ").await.data.is_empty());
        assert!(service.search_cryptos("").await.data.is_empty());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_enriches_hits_with_markets() {
        let (transport, service) = setup();
        transport
            .respond(
                "/search",
                200,
                r#"{"coins":[{"id":"bitcoin","name":"Bitcoin","symbol":"BTC","market_cap_rank":1}]}"#,
            )
            .respond("/coins/markets", 200, &market_json(&["bitcoin"]));

        let result = service.search_cryptos("Bit").await;
        assert_eq!(result.provenance, Provenance::Fresh);
        assert_eq!(result.data.len(), 1);
        assert!(result.data[0].has_price());
        assert!(transport.calls()[1].contains("ids=bitcoin"));

        // 대소문자만 다른 검색어는 캐시 공유
        service.search_cryptos("BIT").await;
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_market_failure_returns_hits_only() {
        let (transport, service) = setup();
        transport
            .respond(
                "/search",
                200,
                r#"{"coins":[{"id":"dogecoin","name":"Dogecoin","symbol":"DOGE","thumb":"d.png"}]}"#,
            )
            .respond("/coins/markets", 404, "not found");

        let result = service.search_cryptos("doge").await;
        assert_eq!(result.data.len(), 1);
        assert_eq!(result.data[0].id, "dogecoin");
        assert_eq!(result.data[0].symbol, "doge");
        assert!(!result.data[0].has_price());
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_failure_returns_empty_list() {
        let (transport, service) = setup();
        transport.respond("/search", 500, "boom");

        let result = service.search_cryptos("solana").await;
        assert!(result.data.is_empty());
        assert!(result.provenance.is_degraded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_historical_data_uses_interval_rule() {
        let (transport, service) = setup();
        let now = Utc::now();
        transport.respond(
            "/coins/bitcoin/market_chart",
            200,
            &chart_json(&[(now - ChronoDuration::hours(1), 100.0), (now, 101.0)]),
        );

        let result = service.get_historical_data("bitcoin", 1).await.unwrap();
        assert_eq!(result.data.len(), 2);
        assert!(transport.calls()[0].ends_with("days=1&interval=hourly"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_historical_empty_prices_is_no_data() {
        let (transport, service) = setup();
        transport.respond("/coins/bitcoin/market_chart", 200, r#"{"prices":[]}"#);

        let result = service.get_historical_data("bitcoin", 30).await;
        assert!(matches!(result, Err(FetchError::NoData(_))));
        assert!(service.fetcher().cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_historical_http_error_falls_back_to_stale() {
        let (transport, service) = setup();
        let now = Utc::now();
        let chart: Value = serde_json::from_str(&chart_json(&[(now, 42.0)])).unwrap();
        service
            .fetcher()
            .cache()
            .set(endpoints::history_key("ethereum", 30), chart, Duration::from_secs(1));
        tokio::time::advance(Duration::from_secs(2)).await;
        transport.respond("/coins/ethereum/market_chart", 502, "bad gateway");

        let result = service.get_historical_data("ethereum", 30).await.unwrap();
        assert_eq!(result.provenance, Provenance::Stale);
        assert_eq!(result.data[0].price, dec!(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_current_price() {
        let (transport, service) = setup();
        transport.respond("/simple/price", 200, r#"{"bitcoin":{"usd":50000}}"#);

        let price = service.get_current_price("bitcoin").await.unwrap();
        assert_eq!(price, Sourced::fresh(dec!(50000)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_current_price_missing_usd_is_no_data() {
        let (transport, service) = setup();
        transport.respond("/simple/price", 200, r#"{"bitcoin":{}}"#);

        let result = service.get_current_price("bitcoin").await;
        assert!(matches!(result, Err(FetchError::NoData(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_coin_id_rejected_without_network() {
        let (transport, service) = setup();

        let result = service.get_current_price("../admin").await;
        assert!(matches!(result, Err(FetchError::InvalidInput(_))));
        assert!(service.get_crypto_price_history("").await.is_err());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_price_history_combines_ranges() {
        let (transport, service) = setup();
        let now = Utc::now();
        let weekly: Vec<(DateTime<Utc>, f64)> = (0..7 * 24)
            .rev()
            .map(|h| (now - ChronoDuration::hours(h) - ChronoDuration::minutes(30), 100.0))
            .collect();

        transport
            .respond(&endpoints::market_chart_path("bitcoin", 7), 200, &chart_json(&weekly))
            .respond(&endpoints::market_chart_path("bitcoin", 30), 200, &chart_json(&[(now, 1.0)]))
            .respond(&endpoints::market_chart_path("bitcoin", 365), 200, &chart_json(&[(now, 2.0)]));

        let history = service.get_crypto_price_history("bitcoin").await.unwrap();
        assert_eq!(history.provenance, Provenance::Fresh);
        assert_eq!(history.data.weekly.len(), 7 * 24);
        assert_eq!(history.data.hourly.len(), 24);
        assert_eq!(history.data.monthly.len(), 1);
        assert_eq!(history.data.yearly[0].price, dec!(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_price_history_partial_failure_leaves_no_stranded_fetches() {
        let (transport, service) = setup();
        let now = Utc::now();
        let monthly_path = endpoints::market_chart_path("bitcoin", 30);
        let yearly_path = endpoints::market_chart_path("bitcoin", 365);

        transport
            .respond(&endpoints::market_chart_path("bitcoin", 7), 404, "not found")
            .push(
                &monthly_path,
                Scripted::Delay(
                    Duration::from_secs(1),
                    TransportResponse::ok(chart_json(&[(now, 1.0)])),
                ),
            )
            .push(
                &yearly_path,
                Scripted::Delay(
                    Duration::from_secs(1),
                    TransportResponse::ok(chart_json(&[(now, 2.0)])),
                ),
            );

        // 7일 구간이 먼저 실패하면 나머지 구간은 기다리지 않음
        let result = service.get_crypto_price_history("bitcoin").await;
        assert!(matches!(result, Err(FetchError::Http { status: 404, .. })));

        // 남은 조회는 백그라운드에서 끝나고 캐시는 그사이 만료됨
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(transport.calls_matching(&monthly_path), 1);
        assert_eq!(transport.calls_matching(&yearly_path), 1);

        transport.respond(&monthly_path, 200, &chart_json(&[(Utc::now(), 3.0)]));
        let monthly = service.get_historical_data("bitcoin", 30).await.unwrap();

        assert_eq!(transport.calls_matching(&monthly_path), 2);
        assert_eq!(monthly.provenance, Provenance::Fresh);
        assert_eq!(monthly.data[0].price, dec!(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_price_history_synthesized_from_cached_price() {
        let (transport, service) = setup();
        service.fetcher().cache().set(
            endpoints::price_key("bitcoin"),
            json!({"bitcoin": {"usd": 50000}}),
            Duration::from_secs(30),
        );
        // 시계열 경로에는 응답이 없으므로 503

        let history = service.get_crypto_price_history("bitcoin").await.unwrap();

        assert!(history.is_synthetic());
        assert_eq!(history.data.hourly.len(), 24);
        for bucket in [&history.data.hourly, &history.data.weekly, &history.data.monthly, &history.data.yearly] {
            assert_eq!(bucket.len(), 24);
            assert!(bucket
                .iter()
                .all(|p| p.price >= dec!(49500) && p.price <= dec!(50500)));
        }
        assert_eq!(transport.calls_matching("/simple/price"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_price_history_synthesized_from_live_price() {
        let (transport, service) = setup();
        transport.respond("/simple/price", 200, r#"{"solana":{"usd":150}}"#);

        let history = service.get_crypto_price_history("solana").await.unwrap();
        assert!(history.is_synthetic());
        assert_eq!(transport.calls_matching("/simple/price"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_price_history_error_when_nothing_available() {
        let (_transport, service) = setup();

        let result = service.get_crypto_price_history("cardano").await;
        assert!(matches!(result, Err(FetchError::Http { status: 503, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_stats() {
        let (transport, service) = setup();
        transport.respond("/simple/price", 200, r#"{"bitcoin":{"usd":1}}"#);
        service.get_current_price("bitcoin").await.unwrap();

        let stats = service.get_api_stats();
        assert_eq!(stats.cache.size, 1);
        assert_eq!(stats.cache.max_size, 100);
        assert_eq!(stats.rate_limiter.requests_in_window, 1);
        assert_eq!(stats.rate_limiter.max_requests, 30);
        assert_eq!(stats.rate_limiter.backoff_multiplier, 1.0);
    }
}
