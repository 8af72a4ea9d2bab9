//! 코인 시세 레코드.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 시가총액 순위 목록과 검색 결과에 쓰이는 코인 시세 레코드.
///
/// 제공자가 값을 내려주지 않는 필드(신규 상장 코인 등)는 `None`입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cryptocurrency {
    /// 제공자 코인 ID (예: "bitcoin")
    pub id: String,
    /// 티커 심볼 (예: "btc")
    pub symbol: String,
    /// 표시 이름
    pub name: String,
    /// 로고 이미지 URL
    #[serde(default)]
    pub image: Option<String>,
    /// 현재가 (USD)
    #[serde(default)]
    pub current_price: Option<Decimal>,
    /// 시가총액 (USD)
    #[serde(default)]
    pub market_cap: Option<Decimal>,
    /// 시가총액 순위
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    /// 24시간 거래량 (USD)
    #[serde(default)]
    pub total_volume: Option<Decimal>,
    /// 24시간 최고가
    #[serde(default)]
    pub high_24h: Option<Decimal>,
    /// 24시간 최저가
    #[serde(default)]
    pub low_24h: Option<Decimal>,
    /// 24시간 등락률 (%)
    #[serde(default)]
    pub price_change_percentage_24h: Option<Decimal>,
    /// 제공자 측 마지막 갱신 시각
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Cryptocurrency {
    /// 시세 없이 식별 정보만 가진 레코드를 생성합니다.
    pub fn new(id: impl Into<String>, symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            name: name.into(),
            image: None,
            current_price: None,
            market_cap: None,
            market_cap_rank: None,
            total_volume: None,
            high_24h: None,
            low_24h: None,
            price_change_percentage_24h: None,
            last_updated: None,
        }
    }

    /// 시세 정보가 포함되어 있는지 확인합니다.
    pub fn has_price(&self) -> bool {
        self.current_price.is_some()
    }

    /// 24시간 상승 여부.
    pub fn is_up_24h(&self) -> Option<bool> {
        self.price_change_percentage_24h
            .map(|pct| pct.is_sign_positive() && !pct.is_zero())
    }
}
