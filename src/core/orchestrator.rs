//! 对话编排器：主控循环
//!
//! 负责：按配置创建传输、建立 cmd/state/notice 三通道，
//! 并在后台任务中消费用户命令（Submit/Quit），驱动请求生命周期并把失败转成一次性提示。

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{broadcast, mpsc, watch};

use crate::api::{create_api_from_config, ChatApi};
use crate::config::AppConfig;
use crate::core::{submit_turn, ChatSession, Notice, TurnOutcome, UiState};

/// 从 UI 发往编排器的用户命令
#[derive(Debug, Clone)]
pub enum Command {
    /// 提交用户输入，触发一轮请求
    Submit(String),
    /// 退出应用
    Quit,
}

/// 编排器对外的三个通道端点
pub struct ChatHandles {
    pub cmd_tx: mpsc::UnboundedSender<Command>,
    pub state_rx: watch::Receiver<UiState>,
    pub notice_rx: broadcast::Receiver<Notice>,
    pub task: tokio::task::JoinHandle<()>,
}

/// 按已加载的配置创建对话运行时（需在 tokio 运行时内调用）
pub fn create_chat(cfg: &AppConfig) -> anyhow::Result<ChatHandles> {
    let api = create_api_from_config(cfg).context("Failed to create chat transport")?;
    tracing::info!(provider = %cfg.api.provider, "Chat transport ready");
    Ok(spawn_chat(api))
}

/// 在后台任务中运行一个对话会话。
/// 一轮进行中收到的 Submit 会被拒绝（不排队），Quit 会放弃当前请求并退出。
pub fn spawn_chat(api: Arc<dyn ChatApi>) -> ChatHandles {
    // 三通道：UI -> Core 命令；Core -> UI 状态快照；Core -> UI 一次性提示
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
    let (state_tx, state_rx) = watch::channel(UiState::default());
    let (notice_tx, notice_rx) = broadcast::channel::<Notice>(16);

    let task = tokio::spawn(async move {
        let mut session = ChatSession::new().with_observer(state_tx);
        let mut next_notice_id = 0u64;

        while let Some(cmd) = cmd_rx.recv().await {
            let input = match cmd {
                Command::Submit(input) => input,
                Command::Quit => break,
            };

            let turn = submit_turn(&mut session, api.as_ref(), &input);
            tokio::pin!(turn);
            let outcome = loop {
                tokio::select! {
                    outcome = &mut turn => break Some(outcome),
                    cmd = cmd_rx.recv() => match cmd {
                        Some(Command::Submit(_)) => {
                            tracing::debug!("Turn in flight, submission refused");
                        }
                        Some(Command::Quit) | None => break None,
                    },
                }
            };

            let Some(outcome) = outcome else { break };
            if let TurnOutcome::Failed(e) = &outcome {
                next_notice_id += 1;
                let _ = notice_tx.send(Notice {
                    id: next_notice_id,
                    text: e.user_message(),
                });
            }
        }
        tracing::info!("Chat session closed");
    });

    ChatHandles {
        cmd_tx,
        state_rx,
        notice_rx,
        task,
    }
}
