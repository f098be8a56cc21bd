//! reqwest 传输实现
//!
//! POST JSON 到配置的对话端点，带 `Accept: application/json`；
//! 无论状态码如何都先完整读取响应文本，状态与内容的判断留给分类函数。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;

use crate::api::{ChatApi, ChatRequest, RawResponse};
use crate::config::ApiSection;
use crate::core::ChatError;

/// HTTP 对话客户端：持有 reqwest Client 与端点地址
pub struct HttpChatApi {
    client: Client,
    endpoint: String,
}

impl HttpChatApi {
    /// timeout 为 None 时不设置超时，沿用传输层默认行为
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self, ChatError> {
        let endpoint = reqwest::Url::parse(endpoint)
            .map_err(|e| ChatError::Config(format!("Invalid chat endpoint '{}': {}", endpoint, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder().default_headers(headers);
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder
            .build()
            .map_err(|e| ChatError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn from_config(api: &ApiSection) -> Result<Self, ChatError> {
        Self::new(
            &api.endpoint,
            api.request_timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// 传输异常描述：区分超时 / 连接失败，其余沿用 reqwest 自身的文本
fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("Request timed out: {}", e)
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        e.to_string()
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn post_chat(&self, request: &ChatRequest) -> Result<RawResponse, ChatError> {
        // .json() 同时设置 Content-Type: application/json
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ChatError::transport(describe_transport_error(&e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ChatError::transport(describe_transport_error(&e)))?;

        tracing::debug!(status, bytes = body.len(), "chat endpoint responded");
        Ok(RawResponse { status, body })
    }
}
