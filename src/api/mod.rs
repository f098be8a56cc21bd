//! 对话接口层：传输抽象、请求/响应结构、响应分类
//!
//! 所有传输实现（reqwest HTTP / Mock）实现 ChatApi：发送一次请求并返回状态码与完整原始文本，
//! 解析与分类统一交给 classify_response。

pub mod classify;
pub mod http;
pub mod mock;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AppConfig;
use crate::core::ChatError;

pub use classify::classify_response;
pub use http::HttpChatApi;
pub use mock::MockChatApi;
pub use types::{ChatRequest, ChatResponse, ErrorBody, RawResponse, TokenUsage};

/// 对话接口传输 trait：单次 POST，不重试；Err 只表示传输层异常
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn post_chat(&self, request: &ChatRequest) -> Result<RawResponse, ChatError>;
}

/// 根据配置选择传输实现（http / mock）
pub fn create_api_from_config(cfg: &AppConfig) -> Result<Arc<dyn ChatApi>, ChatError> {
    match cfg.api.provider.to_lowercase().as_str() {
        "http" => {
            tracing::info!("Using HTTP chat endpoint ({})", cfg.api.endpoint);
            Ok(Arc::new(HttpChatApi::from_config(&cfg.api)?))
        }
        "mock" => {
            tracing::warn!("Using mock chat transport, replies are echoed locally");
            Ok(Arc::new(MockChatApi::new()))
        }
        other => Err(ChatError::Config(format!(
            "Unsupported api provider: {}",
            other
        ))),
    }
}
