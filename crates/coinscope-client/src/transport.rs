//! HTTP 전송 계층.
//!
//! 오케스트레이터는 [`HttpTransport`] 트레이트에만 의존하므로 테스트에서는
//! 스크립트된 가짜 전송으로 교체할 수 있습니다.

use crate::error::{FetchError, FetchResult};
use async_trait::async_trait;
use coinscope_core::ApiConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

/// 상태 코드와 본문만 담은 원시 응답.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 200 응답 생성.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 단일 GET 요청을 보내는 전송 계층.
///
/// 상태 코드 해석은 호출자의 몫입니다. 응답을 받았다면 상태와 관계없이 `Ok`,
/// 요청 자체가 전송되지 못했을 때만 `Err`를 반환합니다.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// `path_and_query`(예: `/simple/price?ids=bitcoin&vs_currencies=usd`)로 GET 요청.
    async fn get(&self, path_and_query: &str) -> FetchResult<TransportResponse>;
}

/// reqwest 기반 전송 계층.
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
    api_key_header: String,
}

impl ReqwestTransport {
    /// 새 전송 계층 생성.
    ///
    /// 타임아웃은 요청별로 오케스트레이터가 적용하므로 클라이언트에는 설정하지 않습니다.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `FetchError::Transport`를 반환합니다.
    pub fn new(config: &ApiConfig) -> FetchResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("coinscope/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Transport(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config
                .api_key
                .as_ref()
                .filter(|key| !key.is_empty())
                .map(|key| SecretString::new(key.clone().into())),
            api_key_header: config.api_key_header.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, path_and_query: &str) -> FetchResult<TransportResponse> {
        let url = format!("{}{}", self.base_url, path_and_query);
        debug!("GET {}", url);

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header(self.api_key_header.as_str(), key.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(TransportResponse { status, body })
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***REDACTED***"))
            .field("api_key_header", &self.api_key_header)
            .finish()
    }
}
