//! 재시도 백오프 정책.

use coinscope_core::RetryConfig;
use std::time::Duration;

/// 지수 백오프 정책.
///
/// `attempt`번째 시도 실패 후 대기 시간은 `base_delay * 2^attempt`이며
/// `max_delay`를 넘지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
        }
    }

    /// `attempt`(0부터) 실패 후 다음 시도까지의 대기 시간.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(5000));
        assert_eq!(policy.delay_for(40), Duration::from_millis(5000));
    }

    proptest! {
        #[test]
        fn prop_delays_non_decreasing_and_capped(
            base_ms in 1u64..10_000,
            max_ms in 1u64..60_000,
            attempt in 0u32..64,
        ) {
            let policy = RetryPolicy::new(Duration::from_millis(base_ms), Duration::from_millis(max_ms));
            let current = policy.delay_for(attempt);
            let next = policy.delay_for(attempt + 1);

            prop_assert!(next >= current);
            prop_assert!(current <= policy.max_delay);
        }
    }
}
