//! # Coinscope Client
//!
//! 외부 시장 데이터 API 호출을 중재하는 복원력 계층입니다.
//!
//! ## 구성 요소
//!
//! - [`cache`] - 엔트리별 TTL을 가진 인메모리 캐시
//! - [`rate_limiter`] - 슬라이딩 윈도우 요청 한도와 실패 기반 백오프
//! - [`dedup`] - 같은 키의 동시 요청을 하나로 합치는 중복 제거기
//! - [`fetch`] - 위 세 가지와 재시도/stale 폴백을 조합한 오케스트레이터
//! - [`service`] - 도메인 요청(시세 목록, 검색, 가격 히스토리, 현재가) 진입점
//!
//! ## 사용 예시
//!
//! ```no_run
//! use coinscope_client::MarketDataService;
//! use coinscope_core::AppConfig;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let service = MarketDataService::new(&AppConfig::default())?;
//! let top = service.get_popular_cryptos(10).await?;
//!
//! if top.provenance.is_degraded() {
//!     println!("제한된 데이터");
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod dedup;
pub mod error;
pub mod fetch;
pub mod provider;
pub mod rate_limiter;
pub mod retry;
pub mod service;
pub mod stats;
pub mod transport;

pub use cache::{CacheStats, Lookup, TtlCache};
pub use dedup::RequestDeduplicator;
pub use error::{FailureKind, FetchError, FetchResult};
pub use fetch::{CacheClass, FetchOptions, FetchRequest, Fetched, ResilientFetcher, TtlPolicy};
pub use rate_limiter::{RateLimiter, RateLimiterStats};
pub use retry::RetryPolicy;
pub use service::MarketDataService;
pub use stats::ApiStats;
pub use transport::{HttpTransport, ReqwestTransport, TransportResponse};
