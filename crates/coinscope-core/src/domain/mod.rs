//! 시장 데이터 도메인 모델.

mod market;
mod price;
mod provenance;

pub use market::*;
pub use price::*;
pub use provenance::*;
