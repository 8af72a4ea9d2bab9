//! CoinGecko v3 형식의 요청 경로와 캐시 키.

/// 시세 기준 통화.
pub const VS_CURRENCY: &str = "usd";

/// 검색 최소 글자 수.
pub const MIN_SEARCH_LEN: usize = 2;

/// 검색 후 시세를 함께 조회할 최대 코인 수.
pub const MAX_SEARCH_IDS: usize = 10;

/// 시세 목록 요청 크기를 10/50/100 중 하나로 맞춥니다.
///
/// 비슷한 크기의 요청이 같은 캐시 엔트리를 공유하도록 하기 위함입니다.
pub fn bucket_limit(limit: usize) -> usize {
    match limit {
        0..=10 => 10,
        11..=50 => 50,
        _ => 100,
    }
}

/// 조회 기간(일)에 맞는 시계열 간격.
pub fn interval_for_days(days: u32) -> &'static str {
    match days {
        0..=1 => "hourly",
        2..=90 => "daily",
        _ => "weekly",
    }
}

pub fn markets_path(per_page: usize) -> String {
    format!(
        "/coins/markets?vs_currency={}&order=market_cap_desc&per_page={}&page=1&sparkline=false&price_change_percentage=24h",
        VS_CURRENCY, per_page
    )
}

pub fn markets_by_ids_path(ids: &[String]) -> String {
    format!(
        "/coins/markets?vs_currency={}&ids={}&order=market_cap_desc&sparkline=false&price_change_percentage=24h",
        VS_CURRENCY,
        urlencoding::encode(&ids.join(","))
    )
}

pub fn search_path(query: &str) -> String {
    format!("/search?query={}", urlencoding::encode(query))
}

pub fn market_chart_path(coin_id: &str, days: u32) -> String {
    format!(
        "/coins/{}/market_chart?vs_currency={}&days={}&interval={}",
        coin_id,
        VS_CURRENCY,
        days,
        interval_for_days(days)
    )
}

pub fn simple_price_path(coin_id: &str) -> String {
    format!("/simple/price?ids={}&vs_currencies={}", coin_id, VS_CURRENCY)
}

pub fn markets_key(bucket: usize) -> String {
    format!("markets_{}", bucket)
}

pub fn search_key(normalized_query: &str) -> String {
    format!("search_{}", normalized_query)
}

pub fn search_markets_key(ids: &[String]) -> String {
    format!("search_markets_{}", ids.join(","))
}

pub fn history_key(coin_id: &str, days: u32) -> String {
    format!("history_{}_{}", coin_id, days)
}

pub fn price_key(coin_id: &str) -> String {
    format!("price_{}", coin_id)
}
