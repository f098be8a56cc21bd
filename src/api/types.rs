//! 对话接口的请求 / 响应结构

use serde::{Deserialize, Serialize};

/// 发往对话接口的请求体；conversation_id 未持有时整个字段省略（不是 null）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, conversation_id: Option<&str>) -> Self {
        Self {
            message: message.into(),
            conversation_id: conversation_id.map(String::from),
        }
    }
}

/// Token 用量（只做累计展示）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub total_tokens: u64,
}

/// 成功响应（HTTP 2xx）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub conversation_id: String,
    pub created_at: String,
    #[serde(default)]
    pub token_usage: TokenUsage,
}

/// 错误响应（非 2xx），尽力解析；detail 可能不是字符串（如校验错误列表）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<serde_json::Value>,
}

/// 传输层返回的原始响应：状态码 + 完整的原始文本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
