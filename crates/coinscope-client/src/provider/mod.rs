//! 시장 데이터 제공자 (CoinGecko v3 형식).
//!
//! - `endpoints` - 요청 경로와 캐시 키
//! - `shaping` - 응답 JSON → 도메인 레코드
//! - `synthetic` - 모든 요청이 실패했을 때의 자리표시 시계열

pub mod endpoints;
pub mod shaping;
pub mod synthetic;

pub use shaping::SearchHit;
