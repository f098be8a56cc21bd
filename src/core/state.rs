//! 状态定义：UiState 投影与 Notice
//!
//! UI 只持有轻量的 UiState（阶段、历史、锁、会话标识）；完整状态由 ChatSession 维护并投影到 UiState。

use crate::memory::Message;

/// UI 看到的「投影」状态，轻量且易于渲染
#[derive(Clone, Debug, Default)]
pub struct UiState {
    pub phase: TurnPhase,
    pub history: Vec<Message>,
    pub conversation_id: Option<String>,
    pub input_locked: bool,
    /// 本会话累计消耗的 token
    pub total_tokens: u64,
}

/// 单轮阶段：Idle → Submitting → (成功 / 已报告失败) → Idle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TurnPhase {
    #[default]
    Idle,
    Submitting,
}

/// 一次性提示（每个失败的轮次恰好一条）；id 单调递增，相同文本的重复失败也能区分
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub text: String,
}
