//! Bee Chat - 终端对话客户端
//!
//! 模块划分：
//! - **api**: 对话接口传输抽象（reqwest HTTP / Mock）、请求/响应结构、响应分类
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、会话状态、请求生命周期、状态投影、主控循环
//! - **memory**: 只追加的对话记录
//! - **observability**: tracing 初始化
//! - **ui**: Ratatui TUI 界面

pub mod api;
pub mod config;
pub mod core;
pub mod memory;
pub mod observability;
pub mod ui;

pub use crate::core::{submit_turn, ChatSession, TurnOutcome};
