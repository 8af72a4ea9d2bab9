//! 암호화폐 시장 데이터 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 시가총액 상위 20개 코인
//! coinscope popular -l 20
//!
//! # 코인 검색
//! coinscope search ethereum
//!
//! # 비트코인 가격 히스토리 (24시간/7일/30일/365일)
//! coinscope history bitcoin
//!
//! # 90일 시계열을 JSON으로
//! coinscope --format json history bitcoin -d 90
//!
//! # 현재가
//! coinscope price solana
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use coinscope_cli::commands::market;
use coinscope_cli::commands::output::OutputFormat;
use coinscope_client::MarketDataService;
use coinscope_core::{init_logging, AppConfig};
use std::path::PathBuf;
use tracing::{debug, error};

#[derive(Parser)]
#[command(name = "coinscope")]
#[command(about = "Crypto market data CLI - 캐시와 요청 한도를 갖춘 시세 조회 도구", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일 경로 (기본: config/coinscope.toml, 없으면 기본값)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 출력 형식 (table, json)
    #[arg(long, global = true, default_value = "table")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 시가총액 상위 코인 목록
    Popular {
        /// 표시할 코인 수 (요청은 10/50/100 단위)
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// 코인 검색 (2글자 이상)
    Search {
        /// 검색어 (이름 또는 심볼)
        query: String,
    },

    /// 가격 히스토리
    History {
        /// 코인 ID (예: bitcoin)
        coin_id: String,

        /// 조회 기간(일). 생략하면 24시간/7일/30일/365일 요약
        #[arg(short, long)]
        days: Option<u32>,
    },

    /// 현재가 (USD)
    Price {
        /// 코인 ID (예: bitcoin)
        coin_id: String,
    },

    /// 캐시 및 요청 한도 통계
    Stats,
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_default()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env 파일 로드 (선택)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("로깅 초기화 실패: {}", e);
    }
    debug!(?config, "Configuration loaded");

    let format = OutputFormat::parse(&cli.format)?;
    let service = MarketDataService::new(&config)?;

    let result = match cli.command {
        Commands::Popular { limit } => market::popular(&service, limit, format).await,
        Commands::Search { query } => market::search(&service, &query, format).await,
        Commands::History { coin_id, days } => {
            market::history(&service, &coin_id, days, format).await
        }
        Commands::Price { coin_id } => market::price(&service, &coin_id, format).await,
        Commands::Stats => market::stats(&service, format),
    };

    match result {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            Err(e)
        }
    }
}
