//! 슬라이딩 윈도우 요청 한도 관리.
//!
//! 최근 `window` 동안 실제로 전송된 요청 시각을 기록하고, 윈도우 안의 요청 수가
//! `max_requests`에 도달하면 가장 오래된 요청이 윈도우를 벗어날 때까지 대기합니다.
//! 오래된 시각은 검사할 때마다 정리되며 백그라운드 타이머는 없습니다.
//!
//! # 백오프 정책
//!
//! ```text
//! record_failure ──> multiplier × 2 (최대 MAX_BACKOFF_MULTIPLIER), consecutive_failures + 1
//! record_success ──> multiplier = 1, consecutive_failures = 0
//! ```
//!
//! 대기 시간 = (슬롯이 비기까지 남은 시간) × multiplier, 단 `max_wait`로 제한.
//!
//! `can_make_request`와 `record_request` 사이에는 await 지점이 있을 수 있으므로
//! 동시 요청이 잠시 한도를 (동시 호출자 수 - 1)만큼 넘을 수 있습니다.

use coinscope_core::RateLimitConfig;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// 슬롯이 비는 시점을 윈도우 경계 바로 다음으로 맞추기 위한 여유.
const SLOT_EPSILON: Duration = Duration::from_millis(1);

/// 백오프 배수 상한. 이후의 실패는 배수를 더 늘리지 않습니다.
pub const MAX_BACKOFF_MULTIPLIER: f64 = 1024.0;

/// Rate Limiter 내부 상태.
struct LimiterState {
    request_timestamps: VecDeque<Instant>,
    consecutive_failures: u32,
    backoff_multiplier: f64,
}

impl LimiterState {
    fn new() -> Self {
        Self {
            request_timestamps: VecDeque::new(),
            consecutive_failures: 0,
            backoff_multiplier: 1.0,
        }
    }

    /// 윈도우를 벗어난 시각 제거.
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(oldest) = self.request_timestamps.front() {
            if now.saturating_duration_since(*oldest) > window {
                self.request_timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// 윈도우 안의 요청 수 (상태 변경 없음).
    fn count_in_window(&self, now: Instant, window: Duration) -> usize {
        self.request_timestamps
            .iter()
            .filter(|ts| now.saturating_duration_since(**ts) <= window)
            .count()
    }
}

/// Rate Limiter 통계 스냅샷.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimiterStats {
    /// 현재 윈도우 안의 요청 수
    pub requests_in_window: usize,
    /// 윈도우당 최대 요청 수
    pub max_requests: usize,
    /// 현재 백오프 배수 (≥ 1)
    pub backoff_multiplier: f64,
}

/// 슬라이딩 윈도우 Rate Limiter.
///
/// # Example
///
/// ```ignore
/// let limiter = RateLimiter::new(30, Duration::from_secs(60));
///
/// if !limiter.can_make_request() {
///     limiter.wait_for_next_slot().await;
/// }
/// let response = send().await;
/// limiter.record_request();
/// ```
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    max_wait: Duration,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// 새 Rate Limiter 생성. `max_requests`는 최소 1입니다.
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            max_wait: Duration::from_secs(30),
            state: Mutex::new(LimiterState::new()),
        }
    }

    /// 설정에서 생성.
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, config.window()).with_max_wait(config.max_wait())
    }

    /// 슬롯 대기 최대 시간 설정.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// 오래된 기록을 정리한 뒤 요청 가능 여부를 반환합니다.
    pub fn can_make_request(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        state.prune(Instant::now(), self.window);
        state.request_timestamps.len() < self.max_requests
    }

    /// 실제로 전송된 요청을 기록합니다.
    pub fn record_request(&self) {
        let mut state = self.state.lock().unwrap();
        let now = Instant::now();
        state.prune(now, self.window);
        state.request_timestamps.push_back(now);
    }

    /// 실패를 기록하고 백오프 배수를 두 배로 늘립니다 (`MAX_BACKOFF_MULTIPLIER`에서 포화).
    pub fn record_failure(&self) {
        let mut state = self.state.lock().unwrap();
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.backoff_multiplier = (state.backoff_multiplier * 2.0).min(MAX_BACKOFF_MULTIPLIER);

        tracing::warn!(
            consecutive_failures = state.consecutive_failures,
            backoff_multiplier = state.backoff_multiplier,
            "Rate limiter backoff increased"
        );
    }

    /// 성공을 기록하고 백오프를 초기화합니다.
    pub fn record_success(&self) {
        let mut state = self.state.lock().unwrap();
        if state.consecutive_failures > 0 {
            tracing::info!(
                previous_failures = state.consecutive_failures,
                "Rate limiter backoff reset"
            );
        }
        state.consecutive_failures = 0;
        state.backoff_multiplier = 1.0;
    }

    /// 현재 백오프 배수.
    pub fn backoff_multiplier(&self) -> f64 {
        self.state.lock().unwrap().backoff_multiplier
    }

    /// 연속 실패 횟수.
    pub fn consecutive_failures(&self) -> u32 {
        self.state.lock().unwrap().consecutive_failures
    }

    /// 다음 슬롯까지 대기해야 할 시간. 여유가 있으면 `None`.
    pub fn time_until_next_slot(&self) -> Option<Duration> {
        let mut state = self.state.lock().unwrap();
        let now = Instant::now();
        state.prune(now, self.window);

        if state.request_timestamps.len() < self.max_requests {
            return None;
        }

        let oldest = *state.request_timestamps.front()?;
        let remaining = (oldest + self.window + SLOT_EPSILON).saturating_duration_since(now);
        let scaled = Duration::try_from_secs_f64(remaining.as_secs_f64() * state.backoff_multiplier)
            .unwrap_or(self.max_wait);

        Some(scaled.min(self.max_wait))
    }

    /// 슬롯이 빌 때까지 대기합니다 (바쁜 대기 없음).
    ///
    /// 윈도우에 여유가 있으면 즉시 반환합니다.
    pub async fn wait_for_next_slot(&self) {
        if let Some(wait) = self.time_until_next_slot() {
            tracing::debug!(
                wait_ms = wait.as_millis() as u64,
                max_requests = self.max_requests,
                "Rate limit reached, waiting for next slot"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// 통계 스냅샷 (상태를 변경하지 않음).
    pub fn stats(&self) -> RateLimiterStats {
        let state = self.state.lock().unwrap();
        RateLimiterStats {
            requests_in_window: state.count_in_window(Instant::now(), self.window),
            max_requests: self.max_requests,
            backoff_multiplier: state.backoff_multiplier,
        }
    }

    /// 모든 기록 초기화.
    pub fn reset(&self) {
        *self.state.lock().unwrap() = LimiterState::new();
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("max_requests", &self.max_requests)
            .field("window", &self.window)
            .field("max_wait", &self.max_wait)
            .finish()
    }
}
