//! 시장 데이터 조회 명령.

use super::output::{
    format_coins_table, format_history_table, format_json, format_points_table, format_price,
    format_stats_table, OutputFormat,
};
use anyhow::{Context, Result};
use coinscope_client::MarketDataService;
use tracing::info;

/// 시가총액 상위 코인.
pub async fn popular(service: &MarketDataService, limit: usize, format: OutputFormat) -> Result<String> {
    let coins = service
        .get_popular_cryptos(limit)
        .await
        .context("Failed to fetch market list")?;

    info!(count = coins.data.len(), provenance = %coins.provenance, "Market list loaded");

    match format {
        OutputFormat::Table => Ok(format_coins_table(&coins)),
        OutputFormat::Json => format_json(&coins),
    }
}

/// 코인 검색.
pub async fn search(service: &MarketDataService, query: &str, format: OutputFormat) -> Result<String> {
    let coins = service.search_cryptos(query).await;

    match format {
        OutputFormat::Table => Ok(format_coins_table(&coins)),
        OutputFormat::Json => format_json(&coins),
    }
}

/// 가격 히스토리. `days`가 없으면 네 구간을 모두 조회합니다.
pub async fn history(
    service: &MarketDataService,
    coin_id: &str,
    days: Option<u32>,
    format: OutputFormat,
) -> Result<String> {
    match days {
        Some(days) => {
            let points = service
                .get_historical_data(coin_id, days)
                .await
                .with_context(|| format!("Failed to fetch {}-day history for {}", days, coin_id))?;

            match format {
                OutputFormat::Table => Ok(format_points_table(&points)),
                OutputFormat::Json => format_json(&points),
            }
        }
        None => {
            let history = service
                .get_crypto_price_history(coin_id)
                .await
                .with_context(|| format!("Failed to fetch price history for {}", coin_id))?;

            match format {
                OutputFormat::Table => Ok(format_history_table(coin_id, &history)),
                OutputFormat::Json => format_json(&history),
            }
        }
    }
}

/// 현재가.
pub async fn price(service: &MarketDataService, coin_id: &str, format: OutputFormat) -> Result<String> {
    let price = service
        .get_current_price(coin_id)
        .await
        .with_context(|| format!("Failed to fetch price for {}", coin_id))?;

    match format {
        OutputFormat::Table => Ok(format_price(coin_id, &price)),
        OutputFormat::Json => format_json(&price),
    }
}

/// 캐시 및 요청 한도 통계.
pub fn stats(service: &MarketDataService, format: OutputFormat) -> Result<String> {
    let stats = service.get_api_stats();
    stats.log_summary();

    match format {
        OutputFormat::Table => Ok(format_stats_table(&stats)),
        OutputFormat::Json => format_json(&stats),
    }
}
