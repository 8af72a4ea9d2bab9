//! # Coinscope Core
//!
//! 암호화폐 대시보드의 핵심 도메인 모델 및 공통 인프라를 제공합니다.
//!
//! 이 크레이트는 시장 데이터 클라이언트와 CLI가 공유하는 기본 타입을 제공합니다:
//! - 코인 시세 및 가격 히스토리 레코드
//! - 데이터 출처 태깅 (실시간 / 만료 캐시 / 합성 데이터)
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use self::config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
