//! 시장 데이터 요청 에러 타입.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 시장 데이터 요청 에러.
///
/// 중복 제거된 요청의 결과를 여러 호출자가 함께 받으므로 `Clone`입니다.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// 요청 한도 초과 (HTTP 429)
    #[error("Rate limit exceeded")]
    RateLimited,

    /// 클라이언트 측 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 네트워크/연결 에러
    #[error("Transport error: {0}")]
    Transport(String),

    /// 429 이외의 비정상 HTTP 상태
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    /// 200 응답이지만 비어 있거나 해석할 수 없는 페이로드
    #[error("No data: {0}")]
    NoData(String),

    /// 잘못된 호출 인자
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// 에러 분류.
///
/// 로그 필드와 재시도 판단에 사용합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    RateLimited,
    Timeout,
    Transport,
    Http,
    NoData,
    InvalidInput,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::RateLimited => write!(f, "rate_limited"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Transport => write!(f, "transport"),
            FailureKind::Http => write!(f, "http"),
            FailureKind::NoData => write!(f, "no_data"),
            FailureKind::InvalidInput => write!(f, "invalid_input"),
        }
    }
}

impl FetchError {
    /// 에러 분류 반환.
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::RateLimited => FailureKind::RateLimited,
            FetchError::Timeout(_) => FailureKind::Timeout,
            FetchError::Transport(_) => FailureKind::Transport,
            FetchError::Http { .. } => FailureKind::Http,
            FetchError::NoData(_) => FailureKind::NoData,
            FetchError::InvalidInput(_) => FailureKind::InvalidInput,
        }
    }

    /// 재시도 가능한 에러인지 확인.
    ///
    /// 429, 타임아웃, 네트워크 에러만 재시도합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::RateLimited | FetchError::Timeout(_) | FetchError::Transport(_)
        )
    }

    /// 호출 지점에서 만료 캐시로 대체할 수 있는 에러인지 확인.
    pub fn allows_stale_fallback(&self) -> bool {
        matches!(self, FetchError::Http { .. } | FetchError::NoData(_))
    }

    /// HTTP 상태 코드로부터 에러 생성.
    pub fn from_status(status: u16, body: &str) -> Self {
        if status == 429 {
            FetchError::RateLimited
        } else {
            let message: String = body.chars().take(200).collect();
            FetchError::Http { status, message }
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::from_status(status.as_u16(), &err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::NoData(format!("invalid payload: {}", err))
    }
}

impl From<coinscope_core::CoreError> for FetchError {
    fn from(err: coinscope_core::CoreError) -> Self {
        FetchError::InvalidInput(err.to_string())
    }
}

/// 시장 데이터 요청 Result 타입.
pub type FetchResult<T> = Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(FetchError::RateLimited.is_retryable());
        assert!(FetchError::Timeout("10s".to_string()).is_retryable());
        assert!(FetchError::Transport("reset".to_string()).is_retryable());

        assert!(!FetchError::Http { status: 500, message: String::new() }.is_retryable());
        assert!(!FetchError::Http { status: 404, message: String::new() }.is_retryable());
        assert!(!FetchError::NoData("empty".to_string()).is_retryable());
        assert!(!FetchError::InvalidInput("id".to_string()).is_retryable());
    }

    #[test]
    fn test_from_status() {
        assert_eq!(FetchError::from_status(429, "slow down"), FetchError::RateLimited);
        assert_eq!(
            FetchError::from_status(503, "unavailable"),
            FetchError::Http {
                status: 503,
                message: "unavailable".to_string()
            }
        );
    }

    #[test]
    fn test_stale_fallback_kinds() {
        assert!(FetchError::NoData("empty".to_string()).allows_stale_fallback());
        assert!(FetchError::Http { status: 500, message: String::new() }.allows_stale_fallback());
        assert!(!FetchError::RateLimited.allows_stale_fallback());
        assert!(!FetchError::InvalidInput("x".to_string()).allows_stale_fallback());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(FetchError::RateLimited.kind().to_string(), "rate_limited");
        assert_eq!(FetchError::NoData(String::new()).kind().to_string(), "no_data");
    }
}
