//! 핵심 에러 타입.
//!
//! 설정 로딩과 입력 검증 등 네트워크와 무관한 에러를 정의합니다.

use thiserror::Error;

/// 핵심 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),
}

/// 핵심 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::Config(err.to_string())
    }
}

/// 코인 ID가 제공자 API 경로에 안전하게 쓰일 수 있는지 검증합니다.
///
/// 허용 문자: 소문자 알파벳, 숫자, `-`, `_`, `.`.
/// ID는 경로의 한 세그먼트가 되므로 점으로만 이루어진 값(`.`, `..`)은 거부합니다.
pub fn validate_coin_id(coin_id: &str) -> CoreResult<()> {
    if coin_id.is_empty() {
        return Err(CoreError::InvalidInput("코인 ID가 비어 있습니다".to_string()));
    }

    let valid = coin_id.chars().all(|c| {
        c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.')
    }) && !coin_id.chars().all(|c| c == '.');

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidInput(format!(
            "허용되지 않는 코인 ID: {}",
            coin_id
        )))
    }
}
