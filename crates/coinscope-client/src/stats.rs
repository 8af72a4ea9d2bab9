//! 캐시 및 요청 한도 통계.

use crate::cache::CacheStats;
use crate::rate_limiter::RateLimiterStats;
use serde::Serialize;

/// `MarketDataService::get_api_stats` 결과.
///
/// 직렬화 형식: `{"cache":{"size","maxSize"},"rateLimiter":{"requestsInWindow","maxRequests","backoffMultiplier"}}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStats {
    pub cache: CacheStats,
    pub rate_limiter: RateLimiterStats,
}

impl ApiStats {
    /// 캐시 사용률 (%)
    pub fn cache_usage(&self) -> f64 {
        if self.cache.max_size == 0 {
            0.0
        } else {
            (self.cache.size as f64 / self.cache.max_size as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self) {
        tracing::info!(
            cache_size = self.cache.size,
            cache_max_size = self.cache.max_size,
            cache_usage = format!("{:.1}%", self.cache_usage()),
            requests_in_window = self.rate_limiter.requests_in_window,
            max_requests = self.rate_limiter.max_requests,
            backoff_multiplier = self.rate_limiter.backoff_multiplier,
            "API 사용 현황"
        );
    }
}
