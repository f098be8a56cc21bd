//! 会话状态：消息日志、会话标识与「进行中」标志
//!
//! 渲染所用对话记录与上下文延续标识的唯一来源。只由请求生命周期管理与用户输入修改；
//! 每次修改都会向观察者推送一份 UiState 快照，触发重绘并滚动到最新一条。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::core::{ChatError, TurnPhase, UiState};
use crate::memory::{Message, Role, Transcript};

/// 单个对话会话；多个会话互不影响
#[derive(Debug, Default)]
pub struct ChatSession {
    transcript: Transcript,
    conversation_id: Option<String>,
    in_flight: Arc<AtomicBool>,
    total_tokens: u64,
    observer: Option<watch::Sender<UiState>>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// 挂接状态观察者（通常是 UI 的 watch 通道）
    pub fn with_observer(mut self, observer: watch::Sender<UiState>) -> Self {
        self.observer = Some(observer);
        self.publish();
        self
    }

    pub fn messages(&self) -> &[Message] {
        self.transcript.messages()
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    /// 追加一条消息；用户消息不允许为空，其余不做校验
    pub fn append_message(
        &mut self,
        role: Role,
        content: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Result<(), ChatError> {
        let content = content.into();
        if role == Role::User && content.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.transcript.push(Message {
            role,
            content,
            timestamp: timestamp.into(),
        });
        self.publish();
        Ok(())
    }

    /// 无条件替换为最近一次成功响应中的标识
    pub fn set_conversation_id(&mut self, id: impl Into<String>) {
        self.conversation_id = Some(id.into());
        self.publish();
    }

    pub fn record_usage(&mut self, total_tokens: u64) {
        self.total_tokens = self.total_tokens.saturating_add(total_tokens);
    }

    /// 尝试开始一轮：已有请求在途时返回 None。
    /// 返回的守卫在 Drop 时清除标志，覆盖所有退出路径（包括 panic）。
    pub fn try_begin_turn(&self) -> Option<InFlightGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlightGuard {
                flag: self.in_flight.clone(),
            })
    }

    /// 当前状态的 UI 投影
    pub fn snapshot(&self) -> UiState {
        let in_flight = self.is_in_flight();
        UiState {
            phase: if in_flight {
                TurnPhase::Submitting
            } else {
                TurnPhase::Idle
            },
            history: self.transcript.messages().to_vec(),
            conversation_id: self.conversation_id.clone(),
            input_locked: in_flight,
            total_tokens: self.total_tokens,
        }
    }

    /// 向观察者推送快照；没有接收端时也更新通道中的值
    pub fn publish(&self) {
        if let Some(observer) = &self.observer {
            observer.send_replace(self.snapshot());
        }
    }
}

/// 「进行中」标志的作用域守卫
#[derive(Debug)]
pub struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
