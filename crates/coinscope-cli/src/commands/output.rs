//! 결과 출력 형식.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use coinscope_client::ApiStats;
use coinscope_core::{Cryptocurrency, PriceDataPoint, PriceHistory, Provenance, Sourced};
use rust_decimal::Decimal;
use serde::Serialize;

/// 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(anyhow::anyhow!("Invalid format: {}. Use: table, json", s)),
        }
    }
}

/// 열화된 데이터 안내 문구. 실시간 데이터면 `None`.
pub fn degraded_notice(provenance: Provenance) -> Option<&'static str> {
    match provenance {
        Provenance::Fresh => None,
        Provenance::Stale => Some("⚠️  제한된 데이터: 최신 정보를 가져오지 못해 캐시된 값을 표시합니다"),
        Provenance::Synthetic => Some("⚠️  오프라인 데이터: 실제 시세가 아닌 추정 시계열입니다"),
    }
}

/// JSON 형식 출력.
pub fn format_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize to JSON")
}

fn with_notice(mut output: String, provenance: Provenance) -> String {
    if let Some(notice) = degraded_notice(provenance) {
        output.push('\n');
        output.push_str(notice);
    }
    output
}

fn price_cell(price: Option<Decimal>) -> String {
    price
        .map(|p| format!("${}", p.round_dp(if p < Decimal::ONE { 6 } else { 2 })))
        .unwrap_or_else(|| "-".to_string())
}

/// 코인 목록 테이블.
pub fn format_coins_table(coins: &Sourced<Vec<Cryptocurrency>>) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{:<6} {:<24} {:<8} {:>16} {:>10}\n",
        "RANK", "NAME", "SYMBOL", "PRICE", "24H"
    ));
    output.push_str(&"-".repeat(68));
    output.push('\n');

    for coin in &coins.data {
        output.push_str(&format!(
            "{:<6} {:<24} {:<8} {:>16} {:>10}\n",
            coin.market_cap_rank
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string()),
            truncate(&coin.name, 24),
            coin.symbol.to_uppercase(),
            price_cell(coin.current_price),
            coin.price_change_percentage_24h
                .map(|pct| format!("{:+.2}%", pct.round_dp(2)))
                .unwrap_or_else(|| "-".to_string()),
        ));
    }

    output.push('\n');
    output.push_str(&format!("Total: {} coins", coins.data.len()));

    with_notice(output, coins.provenance)
}

fn push_series(output: &mut String, label: &str, points: &[PriceDataPoint]) {
    let first = points.first();
    let last = points.last();
    let change = match (first, last) {
        (Some(first), Some(last)) if !first.price.is_zero() => {
            let pct = (last.price - first.price) / first.price * Decimal::ONE_HUNDRED;
            format!("{:+.2}%", pct.round_dp(2))
        }
        _ => "-".to_string(),
    };

    output.push_str(&format!(
        "{:<8} {:>6} {:>18} {:>18} {:>10}\n",
        label,
        points.len(),
        first.map(|p| format_time(p.timestamp)).unwrap_or_else(|| "-".to_string()),
        price_cell(last.map(|p| p.price)),
        change,
    ));
}

/// 가격 히스토리 요약 테이블.
pub fn format_history_table(coin_id: &str, history: &Sourced<PriceHistory>) -> String {
    let mut output = format!("{} price history\n", coin_id);
    output.push_str(&format!(
        "{:<8} {:>6} {:>18} {:>18} {:>10}\n",
        "RANGE", "POINTS", "FROM", "LAST", "CHANGE"
    ));
    output.push_str(&"-".repeat(64));
    output.push('\n');

    push_series(&mut output, "24h", &history.data.hourly);
    push_series(&mut output, "7d", &history.data.weekly);
    push_series(&mut output, "30d", &history.data.monthly);
    push_series(&mut output, "365d", &history.data.yearly);

    with_notice(output, history.provenance)
}

/// 단일 시계열 테이블.
pub fn format_points_table(points: &Sourced<Vec<PriceDataPoint>>) -> String {
    let mut output = String::new();
    output.push_str(&format!("{:<18} {:>18}\n", "TIME (UTC)", "PRICE"));
    output.push_str(&"-".repeat(37));
    output.push('\n');

    for point in &points.data {
        output.push_str(&format!(
            "{:<18} {:>18}\n",
            format_time(point.timestamp),
            price_cell(Some(point.price))
        ));
    }

    with_notice(output, points.provenance)
}

pub fn format_price(coin_id: &str, price: &Sourced<Decimal>) -> String {
    with_notice(
        format!("{}: {}", coin_id, price_cell(Some(price.data))),
        price.provenance,
    )
}

pub fn format_stats_table(stats: &ApiStats) -> String {
    let mut output = String::new();
    output.push_str("Cache\n");
    output.push_str(&format!(
        "  entries: {} / {} ({:.1}%)\n",
        stats.cache.size,
        stats.cache.max_size,
        stats.cache_usage()
    ));
    output.push_str("Rate limiter\n");
    output.push_str(&format!(
        "  requests in window: {} / {}\n",
        stats.rate_limiter.requests_in_window, stats.rate_limiter.max_requests
    ));
    output.push_str(&format!(
        "  backoff multiplier: {}",
        stats.rate_limiter.backoff_multiplier
    ));
    output
}

fn format_time(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

/// 문자열 자르기.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
