//! 响应分类
//!
//! 先拿到完整原始文本，再按 HTTP 状态分支分别尝试解析：
//! 失败状态可能带结构化错误体，成功状态也可能带不可用的文本。
//! 纯函数，不依赖网络层。

use crate::api::types::{ChatResponse, ErrorBody};
use crate::core::error::{ChatError, GENERIC_SERVER_ERROR};

/// 按 (状态是否成功, 原始响应体) 分类为成功载荷或错误
pub fn classify_response(status_ok: bool, raw_body: &str) -> Result<ChatResponse, ChatError> {
    if !status_ok {
        return Err(ChatError::Server {
            message: extract_error_message(raw_body),
        });
    }

    let parsed: ChatResponse = serde_json::from_str(raw_body)
        .map_err(|e| ChatError::MalformedSuccess(e.to_string()))?;

    // 没有可用的会话标识就无法延续上下文，按响应体损坏处理
    if parsed.conversation_id.trim().is_empty() {
        return Err(ChatError::MalformedSuccess(
            "conversation_id is empty".to_string(),
        ));
    }

    Ok(parsed)
}

/// 从错误体中取可读文本：detail 优先，其次 message，都没有则用通用提示
fn extract_error_message(raw_body: &str) -> String {
    let Ok(body) = serde_json::from_str::<ErrorBody>(raw_body) else {
        return GENERIC_SERVER_ERROR.to_string();
    };
    [body.detail, body.message]
        .into_iter()
        .flatten()
        .find_map(|v| match v {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
            _ => None,
        })
        .unwrap_or_else(|| GENERIC_SERVER_ERROR.to_string())
}
