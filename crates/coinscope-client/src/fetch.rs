//! 복원력 있는 요청 오케스트레이터.
//!
//! 하나의 논리적 요청은 다음 단계를 거칩니다:
//!
//! ```text
//! CHECK_CACHE ──hit──> RETURN
//!      │ miss
//!      ▼
//! DEDUPLICATE ──> RATE_GATE ──> ATTEMPT ──success──> CACHE_AND_RETURN
//!                    ▲             │ retryable
//!                    └─ BACKOFF ◄──┘ (최대 retries + 1회)
//!                                  │ exhausted
//!                                  ▼
//!                       FALLBACK_STALE_CACHE ──> RETURN | RAISE
//! ```
//!
//! 429, 타임아웃, 전송 에러만 재시도합니다. 그 밖의 HTTP 에러와 빈 페이로드는
//! 즉시 반환하며, 만료 캐시 폴백은 호출 지점이 [`ResilientFetcher::cached_stale`]로
//! 결정합니다.

use crate::cache::{Lookup, TtlCache};
use crate::dedup::RequestDeduplicator;
use crate::error::{FetchError, FetchResult};
use crate::rate_limiter::RateLimiter;
use crate::retry::RetryPolicy;
use crate::transport::HttpTransport;
use coinscope_core::{AppConfig, CacheConfig, Provenance, Sourced};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// 캐시 TTL 분류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheClass {
    /// 시세 목록
    MarketList,
    /// 검색 결과
    Search,
    /// 가격 히스토리
    History,
    /// 현재가
    SpotPrice,
}

/// 분류별 TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub market_list: Duration,
    pub search: Duration,
    pub history: Duration,
    pub spot_price: Duration,
}

impl TtlPolicy {
    pub fn ttl_for(&self, class: CacheClass) -> Duration {
        match class {
            CacheClass::MarketList => self.market_list,
            CacheClass::Search => self.search,
            CacheClass::History => self.history,
            CacheClass::SpotPrice => self.spot_price,
        }
    }
}

impl From<&CacheConfig> for TtlPolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            market_list: Duration::from_secs(config.market_list_ttl_secs),
            search: Duration::from_secs(config.search_ttl_secs),
            history: Duration::from_secs(config.history_ttl_secs),
            spot_price: Duration::from_secs(config.spot_price_ttl_secs),
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

/// 2xx 응답 페이로드 검증 함수. `false`면 `NoData`로 처리합니다.
pub type PayloadValidator = fn(&Value) -> bool;

/// 단일 요청 명세.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    path: String,
    cache_key: Option<String>,
    class: CacheClass,
    timeout: Option<Duration>,
    retries: Option<u32>,
    validator: Option<PayloadValidator>,
}

impl FetchRequest {
    /// `path`는 기본 URL 뒤에 붙는 경로와 쿼리입니다.
    pub fn new(path: impl Into<String>, class: CacheClass) -> Self {
        Self {
            path: path.into(),
            cache_key: None,
            class,
            timeout: None,
            retries: None,
            validator: None,
        }
    }

    /// 캐시/중복 제거 키. 지정하지 않으면 경로를 사용합니다.
    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn validate(mut self, validator: PayloadValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn key(&self) -> &str {
        self.cache_key.as_deref().unwrap_or(&self.path)
    }

    pub fn class(&self) -> CacheClass {
        self.class
    }
}

/// 오케스트레이터 결과. 출처는 `Fresh` 또는 `Stale`입니다.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub value: Value,
    pub provenance: Provenance,
}

impl Fetched {
    pub fn fresh(value: Value) -> Self {
        Self {
            value,
            provenance: Provenance::Fresh,
        }
    }

    pub fn stale(value: Value) -> Self {
        Self {
            value,
            provenance: Provenance::Stale,
        }
    }

    pub fn into_sourced(self) -> Sourced<Value> {
        Sourced::new(self.value, self.provenance)
    }
}

/// 요청별로 바꾸지 않은 항목에 쓰이는 기본값.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub retries: u32,
    pub retry: RetryPolicy,
    pub ttl: TtlPolicy,
}

impl From<&AppConfig> for FetchOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            timeout: config.api.request_timeout(),
            retries: config.api.retries,
            retry: RetryPolicy::from(&config.retry),
            ttl: TtlPolicy::from(&config.cache),
        }
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

struct FetcherInner {
    transport: Arc<dyn HttpTransport>,
    cache: Arc<TtlCache<Value>>,
    limiter: Arc<RateLimiter>,
    dedup: RequestDeduplicator<FetchResult<Fetched>>,
    options: FetchOptions,
}

/// 캐시, Rate Limiter, 중복 제거기를 조합한 요청 오케스트레이터.
///
/// 복제해도 같은 상태를 공유합니다.
#[derive(Clone)]
pub struct ResilientFetcher {
    inner: Arc<FetcherInner>,
}

impl ResilientFetcher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        cache: Arc<TtlCache<Value>>,
        limiter: Arc<RateLimiter>,
        options: FetchOptions,
    ) -> Self {
        Self {
            inner: Arc::new(FetcherInner {
                transport,
                cache,
                limiter,
                dedup: RequestDeduplicator::new(),
                options,
            }),
        }
    }

    pub fn cache(&self) -> &TtlCache<Value> {
        &self.inner.cache
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.inner.limiter
    }

    pub fn options(&self) -> &FetchOptions {
        &self.inner.options
    }

    /// 만료 여부와 관계없이 캐시된 값을 읽습니다 (호출 지점 stale 폴백용).
    pub fn cached_stale(&self, key: &str) -> Option<Value> {
        self.inner.cache.get_stale(key)
    }

    /// 요청 실행.
    pub async fn fetch(&self, request: FetchRequest) -> FetchResult<Fetched> {
        let key = request.key().to_string();

        if let Lookup::Fresh(value) = self.inner.cache.peek(&key) {
            debug!(cache_key = %key, "Cache hit");
            return Ok(Fetched::fresh(value));
        }

        let this = self.clone();
        self.inner
            .dedup
            .deduplicate(&key, move || async move { this.fetch_uncached(request).await })
            .await
    }

    async fn fetch_uncached(&self, request: FetchRequest) -> FetchResult<Fetched> {
        let inner = &self.inner;
        let key = request.key();
        let timeout = request.timeout.unwrap_or(inner.options.timeout);
        let attempts = request.retries.unwrap_or(inner.options.retries) + 1;

        let mut last_error = FetchError::Transport("no attempt made".to_string());

        for attempt in 0..attempts {
            if !inner.limiter.can_make_request() {
                inner.limiter.wait_for_next_slot().await;
            }

            match self.attempt(&request, timeout).await {
                Ok(value) => {
                    inner.limiter.record_success();
                    let ttl = inner.options.ttl.ttl_for(request.class);
                    inner.cache.set(key, value.clone(), ttl);
                    debug!(cache_key = %key, attempt, "Fetched and cached");
                    return Ok(Fetched::fresh(value));
                }
                Err(err) if err.is_retryable() => {
                    warn!(
                        url = %request.path,
                        attempt,
                        kind = %err.kind(),
                        error = %err,
                        "Request failed, will retry if budget remains"
                    );
                    last_error = err;

                    if attempt + 1 < attempts {
                        let delay = inner.options.retry.delay_for(attempt);
                        debug!(delay_ms = delay.as_millis() as u64, attempt, "Backing off");
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) => {
                    debug!(url = %request.path, kind = %err.kind(), "Non-retryable failure");
                    return Err(err);
                }
            }
        }

        inner.limiter.record_failure();

        if let Some(value) = inner.cache.get_stale(key) {
            warn!(
                cache_key = %key,
                kind = %last_error.kind(),
                "Retries exhausted, serving stale cache"
            );
            return Ok(Fetched::stale(value));
        }

        warn!(cache_key = %key, kind = %last_error.kind(), "Retries exhausted, no cache available");
        Err(last_error)
    }

    async fn attempt(&self, request: &FetchRequest, timeout: Duration) -> FetchResult<Value> {
        let inner = &self.inner;

        let response = match tokio::time::timeout(timeout, inner.transport.get(&request.path)).await {
            Err(_) => {
                inner.limiter.record_request();
                return Err(FetchError::Timeout(format!(
                    "no response within {}ms",
                    timeout.as_millis()
                )));
            }
            Ok(Err(err)) => {
                // 연결 단계 실패는 전송되지 않은 요청이므로 기록하지 않음
                if matches!(err, FetchError::Timeout(_)) {
                    inner.limiter.record_request();
                }
                return Err(err);
            }
            Ok(Ok(response)) => {
                inner.limiter.record_request();
                response
            }
        };

        if response.status == 429 {
            inner.limiter.record_failure();
            return Err(FetchError::RateLimited);
        }

        if !response.is_success() {
            return Err(FetchError::from_status(response.status, &response.body));
        }

        let value: Value = serde_json::from_str(&response.body)?;

        if let Some(validator) = request.validator {
            if !validator(&value) {
                return Err(FetchError::NoData(format!(
                    "payload rejected for {}",
                    request.path
                )));
            }
        }

        Ok(value)
    }
}

impl std::fmt::Debug for ResilientFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientFetcher")
            .field("options", &self.inner.options)
            .field("cache", &self.inner.cache.stats())
            .field("limiter", &self.inner.limiter.stats())
            .finish()
    }
}
