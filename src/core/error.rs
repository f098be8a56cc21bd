//! 对话错误类型
//!
//! 每一种失败都只属于当前这一轮：不重试、不致命，用户可以立即重新提交。
//! `Display` 即用户看到的提示文本。

use thiserror::Error;

/// 服务端返回失败状态且错误体不可用时的提示
pub const GENERIC_SERVER_ERROR: &str = "Failed to get response";
/// 传输层异常没有可用描述时的提示
pub const GENERIC_TRANSPORT_ERROR: &str = "Failed to send message. Please try again.";
/// 成功状态但响应体无法解析时的提示
pub const MALFORMED_SUCCESS_ERROR: &str = "Received an invalid response from the server";

/// 一轮对话可能出现的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// 请求未能完成（网络不可达、DNS、超时、读取响应体失败）
    #[error("{0}")]
    Transport(String),

    /// HTTP 失败状态；message 为错误体中可读的文本或通用提示
    #[error("{message}")]
    Server { message: String },

    /// HTTP 成功状态但响应体不符合约定
    #[error("{}", MALFORMED_SUCCESS_ERROR)]
    MalformedSuccess(String),

    #[error("Message content must not be empty")]
    EmptyMessage,

    #[error("Config error: {0}")]
    Config(String),
}

impl ChatError {
    /// 由底层异常描述构造传输错误；描述为空时使用通用提示
    pub fn transport(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        if detail.trim().is_empty() {
            ChatError::Transport(GENERIC_TRANSPORT_ERROR.to_string())
        } else {
            ChatError::Transport(detail)
        }
    }

    /// 用户可见的提示文本
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// 提交被静默忽略的原因（不通知用户）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyInput,
    TurnInFlight,
}
