//! 설정 관리.
//!
//! 이 모듈은 시장 데이터 클라이언트 설정을 정의하고 관리합니다.
//! 모든 항목은 기본값을 가지므로 설정 파일 없이도 동작합니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// 기본 설정 파일 경로.
pub const DEFAULT_CONFIG_PATH: &str = "config/coinscope.toml";

/// 환경 변수 오버라이드 접두사 (`COINSCOPE__API__BASE_URL` 형식).
pub const ENV_PREFIX: &str = "COINSCOPE";

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// 시장 데이터 API 설정
    pub api: ApiConfig,
    /// 캐시 설정
    pub cache: CacheConfig,
    /// 요청 한도 설정
    pub rate_limit: RateLimitConfig,
    /// 재시도 설정
    pub retry: RetryConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
}

/// 시장 데이터 API 설정.
///
/// # 보안
/// - `Debug` 구현은 `api_key`를 마스킹합니다.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// REST API 기본 URL
    pub base_url: String,
    /// API 키 (선택)
    pub api_key: Option<String>,
    /// API 키를 실어 보낼 헤더 이름
    pub api_key_header: String,
    /// 일반 요청 타임아웃 (밀리초)
    pub request_timeout_ms: u64,
    /// 대량 시세 목록 요청 타임아웃 (밀리초)
    pub bulk_timeout_ms: u64,
    /// 재시도 횟수 (총 시도 = retries + 1)
    pub retries: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            api_key: None,
            api_key_header: "x-cg-demo-api-key".to_string(),
            request_timeout_ms: 10_000,
            bulk_timeout_ms: 15_000,
            retries: 2,
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked_key = self.api_key.as_ref().map(|key| {
            if key.chars().count() > 8 {
                let head: String = key.chars().take(4).collect();
                let mut tail: Vec<char> = key.chars().rev().take(4).collect();
                tail.reverse();
                format!("{}...{}", head, tail.into_iter().collect::<String>())
            } else {
                "***REDACTED***".to_string()
            }
        });

        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &masked_key)
            .field("api_key_header", &self.api_key_header)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("bulk_timeout_ms", &self.bulk_timeout_ms)
            .field("retries", &self.retries)
            .finish()
    }
}

impl ApiConfig {
    /// 일반 요청 타임아웃.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// 대량 시세 목록 요청 타임아웃.
    pub fn bulk_timeout(&self) -> Duration {
        Duration::from_millis(self.bulk_timeout_ms)
    }
}

/// 캐시 설정.
///
/// TTL은 요청 분류별로 다르게 적용됩니다:
/// - 시세 목록/검색: 짧게 (자주 변함)
/// - 가격 히스토리: 길게 (천천히 변함)
/// - 현재가: 가장 짧게
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// 최대 엔트리 수
    pub max_size: usize,
    /// 시세 목록 TTL (초)
    pub market_list_ttl_secs: u64,
    /// 검색 결과 TTL (초)
    pub search_ttl_secs: u64,
    /// 가격 히스토리 TTL (초)
    pub history_ttl_secs: u64,
    /// 현재가 TTL (초)
    pub spot_price_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            market_list_ttl_secs: 60,
            search_ttl_secs: 120,
            history_ttl_secs: 600,
            spot_price_ttl_secs: 30,
        }
    }
}

/// 요청 한도 설정 (슬라이딩 윈도우).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// 윈도우 내 최대 요청 수
    pub max_requests: usize,
    /// 윈도우 길이 (밀리초)
    pub window_ms: u64,
    /// 슬롯 대기 최대 시간 (밀리초)
    pub max_wait_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 30,
            window_ms: 60_000,
            max_wait_ms: 30_000,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }
}

/// 재시도 백오프 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// 첫 재시도 대기 시간 (밀리초), 시도마다 2배
    pub base_delay_ms: u64,
    /// 최대 대기 시간 (밀리초)
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 5_000,
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        Self::build(Some(path.as_ref()), true)
    }

    /// 기본 경로에서 설정을 로드합니다.
    ///
    /// 파일이 없으면 기본값과 환경 변수만 사용합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::build(Some(Path::new(DEFAULT_CONFIG_PATH)), false)
    }

    fn build(path: Option<&Path>, required: bool) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(required));
        }

        // 환경 변수로 오버라이드
        let builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
