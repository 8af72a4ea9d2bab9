//! 자리표시용 합성 가격 시계열.
//!
//! 모든 시계열 요청이 실패했을 때 마지막으로 알려진 현재가를 기준으로
//! 24시간 분량의 시간별 샘플을 만듭니다. 결과는 반드시 `Synthetic` 출처로
//! 표시되어야 합니다.

use chrono::{DateTime, Duration, Utc};
use coinscope_core::{PriceDataPoint, PriceHistory};
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// 합성 샘플 수 (시간당 1개).
pub const SYNTHETIC_POINTS: usize = 24;

/// 기준가 대비 최대 변동 비율.
pub const JITTER_RATIO: f64 = 0.01;

/// `anchor` 가격 주변으로 `now`에 끝나는 24개 시간별 샘플을 만듭니다.
pub fn synthetic_series<R: Rng + ?Sized>(
    anchor: Decimal,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<PriceDataPoint> {
    (0..SYNTHETIC_POINTS)
        .map(|i| {
            let hours_ago = (SYNTHETIC_POINTS - 1 - i) as i64;
            let jitter = rng.gen_range(-JITTER_RATIO..=JITTER_RATIO);
            let factor = Decimal::from_f64(1.0 + jitter).unwrap_or(Decimal::ONE);

            PriceDataPoint::new(now - Duration::hours(hours_ago), (anchor * factor).round_dp(8))
        })
        .collect()
}

/// 네 구간 모두 같은 합성 시계열을 가진 히스토리.
pub fn synthetic_history(anchor: Decimal, now: DateTime<Utc>) -> PriceHistory {
    let series = synthetic_series(anchor, now, &mut rand::thread_rng());

    PriceHistory {
        hourly: series.clone(),
        weekly: series.clone(),
        monthly: series.clone(),
        yearly: series,
    }
}
