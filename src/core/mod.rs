//! 核心层：错误类型、会话状态、请求生命周期、状态投影、主控循环

pub mod error;
pub mod lifecycle;
pub mod orchestrator;
pub mod session;
pub mod state;

pub use error::{ChatError, SkipReason};
pub use lifecycle::{submit_turn, TurnOutcome};
pub use orchestrator::{create_chat, spawn_chat, ChatHandles, Command};
pub use session::{ChatSession, InFlightGuard};
pub use state::{Notice, TurnPhase, UiState};
