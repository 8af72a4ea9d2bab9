//! 제공자 JSON을 도메인 레코드로 변환.
//!
//! `is_*` 함수는 오케스트레이터의 페이로드 검증기로 쓰여, 통과하지 못한
//! 응답은 캐시되지 않습니다.

use crate::error::{FetchError, FetchResult};
use chrono::{DateTime, Utc};
use coinscope_core::{Cryptocurrency, PriceDataPoint};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// `/search` 응답의 코인 항목.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
}

impl From<SearchHit> for Cryptocurrency {
    fn from(hit: SearchHit) -> Self {
        let mut coin = Cryptocurrency::new(hit.id, hit.symbol.to_lowercase(), hit.name);
        coin.image = hit.large.or(hit.thumb);
        coin.market_cap_rank = hit.market_cap_rank;
        coin
    }
}

pub fn is_market_list(value: &Value) -> bool {
    value.is_array()
}

pub fn is_search_result(value: &Value) -> bool {
    value.get("coins").is_some_and(Value::is_array)
}

pub fn is_market_chart(value: &Value) -> bool {
    value
        .get("prices")
        .and_then(Value::as_array)
        .is_some_and(|prices| !prices.is_empty())
}

pub fn is_simple_price(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|coins| coins.values().any(|quote| quote.get("usd").is_some()))
}

/// 시세 목록. 해석할 수 없는 항목은 건너뜁니다.
pub fn parse_markets(value: &Value) -> FetchResult<Vec<Cryptocurrency>> {
    let entries = value
        .as_array()
        .ok_or_else(|| FetchError::NoData("market list is not an array".to_string()))?;

    Ok(entries
        .iter()
        .filter_map(|entry| match Cryptocurrency::deserialize(entry) {
            Ok(coin) => Some(coin),
            Err(e) => {
                debug!(error = %e, "Skipping malformed market entry");
                None
            }
        })
        .collect())
}

pub fn parse_search_hits(value: &Value) -> FetchResult<Vec<SearchHit>> {
    let coins = value
        .get("coins")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::NoData("search result has no coins".to_string()))?;

    Ok(coins
        .iter()
        .filter_map(|coin| SearchHit::deserialize(coin).ok())
        .collect())
}

/// `market_chart` 응답의 `prices` 배열 (`[[ms, price], ...]`).
pub fn parse_market_chart(value: &Value) -> FetchResult<Vec<PriceDataPoint>> {
    let prices = value
        .get("prices")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::NoData("market chart has no prices".to_string()))?;

    let points: Vec<PriceDataPoint> = prices.iter().filter_map(parse_price_pair).collect();

    if points.is_empty() {
        return Err(FetchError::NoData("market chart prices are empty".to_string()));
    }
    Ok(points)
}

fn parse_price_pair(pair: &Value) -> Option<PriceDataPoint> {
    let pair = pair.as_array()?;
    let millis = pair.first()?.as_f64()? as i64;
    let price = Decimal::from_f64(pair.get(1)?.as_f64()?)?;
    let timestamp = DateTime::<Utc>::from_timestamp_millis(millis)?;
    Some(PriceDataPoint::new(timestamp, price))
}

/// `simple/price` 응답에서 해당 코인의 USD 가격.
pub fn parse_simple_price(value: &Value, coin_id: &str) -> FetchResult<Decimal> {
    value
        .get(coin_id)
        .and_then(|quote| quote.get("usd"))
        .and_then(Value::as_f64)
        .and_then(Decimal::from_f64)
        .ok_or_else(|| FetchError::NoData(format!("no usd price for {}", coin_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parse_markets_skips_malformed() {
        let value = json!([
            {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin", "current_price": 50000.5, "market_cap_rank": 1},
            {"symbol": "broken"},
            {"id": "ethereum", "symbol": "eth", "name": "Ethereum", "current_price": null}
        ]);

        let coins = parse_markets(&value).unwrap();
        assert_eq!(coins.len(), 2);
        assert_eq!(coins[0].current_price, Some(dec!(50000.5)));
        assert_eq!(coins[1].current_price, None);
    }

    #[test]
    fn test_search_hits_to_records() {
        let value = json!({
            "coins": [
                {"id": "bitcoin", "name": "Bitcoin", "symbol": "BTC", "market_cap_rank": 1,
                 "thumb": "t.png", "large": "l.png"}
            ],
            "exchanges": []
        });

        let hits = parse_search_hits(&value).unwrap();
        let coin: Cryptocurrency = hits[0].clone().into();
        assert_eq!(coin.symbol, "btc");
        assert_eq!(coin.image.as_deref(), Some("l.png"));
        assert_eq!(coin.market_cap_rank, Some(1));
        assert!(!coin.has_price());
    }

    #[test]
    fn test_parse_market_chart() {
        let value = json!({"prices": [[1700000000000i64, 35000.0], [1700003600000i64, 35100.25]]});
        let points = parse_market_chart(&value).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[1].price, dec!(35100.25));
        assert_eq!(points[0].timestamp.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_empty_market_chart_is_no_data() {
        assert!(matches!(
            parse_market_chart(&json!({"prices": []})),
            Err(FetchError::NoData(_))
        ));
        assert!(!is_market_chart(&json!({"prices": []})));
        assert!(!is_market_chart(&json!({})));
    }

    #[test]
    fn test_parse_simple_price() {
        let value = json!({"bitcoin": {"usd": 50000}});
        assert_eq!(parse_simple_price(&value, "bitcoin").unwrap(), dec!(50000));
        assert!(is_simple_price(&value));

        assert!(matches!(
            parse_simple_price(&value, "ethereum"),
            Err(FetchError::NoData(_))
        ));
        assert!(!is_simple_price(&json!({})));
        assert!(!is_simple_price(&json!({"bitcoin": {}})));
    }
}
