//! CLI 도구 모음.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 시세 목록, 검색, 가격 히스토리, 현재가 조회
//! - 캐시/요청 한도 통계 출력
//! - 테이블 및 JSON 출력 형식

pub mod commands;

pub use commands::*;
