//! Mock 对话传输（用于测试与离线运行，无需服务端）
//!
//! 按顺序回放预置的响应；脚本用完后回显用户消息，并沿用同一个会话标识。
//! 每次请求都会被记录，便于断言请求载荷。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::{ChatApi, ChatRequest, RawResponse};
use crate::core::ChatError;
use crate::memory::now_timestamp;

/// Mock 传输：脚本化响应 + 请求记录
#[derive(Debug)]
pub struct MockChatApi {
    script: Mutex<VecDeque<Result<RawResponse, ChatError>>>,
    requests: Mutex<Vec<ChatRequest>>,
    echo_conversation_id: String,
}

impl MockChatApi {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            echo_conversation_id: format!("mock-{}", uuid::Uuid::new_v4()),
        }
    }

    /// 追加一条原始响应
    pub fn push_response(&self, status: u16, body: impl Into<String>) -> &Self {
        self.push(Ok(RawResponse::new(status, body)))
    }

    /// 追加一条成功响应（按约定结构拼装）
    pub fn push_success(
        &self,
        response: &str,
        conversation_id: &str,
        created_at: &str,
        total_tokens: u64,
    ) -> &Self {
        let body = serde_json::json!({
            "response": response,
            "conversation_id": conversation_id,
            "created_at": created_at,
            "token_usage": { "total_tokens": total_tokens },
        });
        self.push_response(200, body.to_string())
    }

    /// 追加一次传输层异常
    pub fn push_transport_error(&self, detail: &str) -> &Self {
        self.push(Err(ChatError::transport(detail)))
    }

    fn push(&self, item: Result<RawResponse, ChatError>) -> &Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(item);
        }
        self
    }

    /// 已收到的请求（按发送顺序）
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn echo(&self, request: &ChatRequest) -> RawResponse {
        let conversation_id = request
            .conversation_id
            .clone()
            .unwrap_or_else(|| self.echo_conversation_id.clone());
        let body = serde_json::json!({
            "response": format!("Echo from Mock: {}", request.message),
            "conversation_id": conversation_id,
            "created_at": now_timestamp(),
            "token_usage": { "total_tokens": request.message.split_whitespace().count() },
        });
        RawResponse::new(200, body.to_string())
    }
}

impl Default for MockChatApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatApi for MockChatApi {
    async fn post_chat(&self, request: &ChatRequest) -> Result<RawResponse, ChatError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(item) => item,
            None => Ok(self.echo(request)),
        }
    }
}
