//! tracing 기반 로깅 초기화.
//!
//! 로그는 stderr로 출력되므로 CLI의 stdout(표/JSON 결과)과 섞이지 않습니다.
//! `RUST_LOG`가 설정되어 있으면 설정 파일의 레벨보다 우선합니다.

use crate::config::LoggingConfig;
use crate::error::{CoreError, CoreResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// 별도 지정이 없으면 `warn`으로 낮추는 HTTP 스택 대상.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "h2", "rustls"];

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 여러 줄, 색상 포함 (개발용)
    #[default]
    Pretty,
    /// 한 줄 JSON. 현재 span(예: `coin_id`) 필드 포함
    Json,
    /// 한 줄 텍스트, 대상 생략
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// 설정 레벨에 HTTP 스택 억제 지시자를 덧붙입니다.
///
/// 사용자가 이미 지정한 대상은 건드리지 않습니다.
fn filter_directives(level: &str) -> String {
    let level = level.trim();
    let mut directives = if level.is_empty() { "info".to_string() } else { level.to_string() };

    let mentioned: Vec<&str> = level
        .split(',')
        .filter_map(|d| d.split('=').next())
        .map(str::trim)
        .collect();

    for target in QUIET_TARGETS {
        if !mentioned.contains(target) {
            directives.push_str(&format!(",{}=warn", target));
        }
    }
    directives
}

fn build_filter(level: &str) -> CoreResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(filter_directives(level))
        .map_err(|e| CoreError::Config(format!("잘못된 로그 레벨 '{}': {}", level, e)))
}

/// 설정에 따라 전역 subscriber를 설치합니다.
///
/// 알 수 없는 형식은 pretty로 대체하고 경고를 남깁니다. 이미 설치된 경우 에러를 반환합니다.
pub fn init_logging(config: &LoggingConfig) -> CoreResult<()> {
    let parsed = config.format.parse::<LogFormat>();
    let format = parsed.clone().unwrap_or_default();
    let filter = build_filter(&config.level)?;

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Pretty => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()
        .map_err(|e| CoreError::Config(format!("로깅 초기화 실패: {}", e)))?;

    if let Err(reason) = parsed {
        tracing::warn!(%reason, "pretty 형식으로 대체");
    }
    tracing::debug!(?format, level = %config.level, "Logging initialized");

    Ok(())
}
