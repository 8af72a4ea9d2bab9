//! 가격 시계열 타입.
//!
//! - `PriceDataPoint` - 단일 (시각, 가격) 샘플
//! - `PriceHistory` - 차트 탭별로 묶인 다중 구간 시계열

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 단일 가격 샘플.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceDataPoint {
    /// 샘플 시각
    pub timestamp: DateTime<Utc>,
    /// 가격 (USD)
    pub price: Decimal,
}

impl PriceDataPoint {
    /// 새 샘플을 생성합니다.
    pub fn new(timestamp: DateTime<Utc>, price: Decimal) -> Self {
        Self { timestamp, price }
    }
}

/// 차트 구간별 가격 히스토리.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    /// 최근 24시간
    pub hourly: Vec<PriceDataPoint>,
    /// 최근 7일
    pub weekly: Vec<PriceDataPoint>,
    /// 최근 30일
    pub monthly: Vec<PriceDataPoint>,
    /// 최근 365일
    pub yearly: Vec<PriceDataPoint>,
}

impl PriceHistory {
    /// 모든 구간이 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.hourly.is_empty()
            && self.weekly.is_empty()
            && self.monthly.is_empty()
            && self.yearly.is_empty()
    }

    /// 가장 최근 샘플 (7일 구간 우선, 없으면 24시간 구간).
    pub fn latest(&self) -> Option<&PriceDataPoint> {
        self.weekly.last().or_else(|| self.hourly.last())
    }
}

/// 시계열에서 `now` 기준 최근 `window` 구간의 샘플만 추려냅니다.
///
/// 구간 안에 샘플이 하나도 없으면 마지막 `fallback_len`개 샘플을 반환합니다.
/// 제공자 데이터가 몇 시간 지연된 경우에도 차트가 비지 않도록 하기 위함입니다.
pub fn trailing_window(
    points: &[PriceDataPoint],
    now: DateTime<Utc>,
    window: Duration,
    fallback_len: usize,
) -> Vec<PriceDataPoint> {
    let cutoff = now - window;
    let recent: Vec<PriceDataPoint> = points
        .iter()
        .filter(|p| p.timestamp >= cutoff)
        .copied()
        .collect();

    if !recent.is_empty() {
        return recent;
    }

    let start = points.len().saturating_sub(fallback_len);
    points[start..].to_vec()
}
