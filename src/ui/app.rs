//! TUI 应用主循环
//!
//! 进入全屏/原始模式，轮询 state_rx、notice_rx 与键盘事件，将用户输入转为 Command 发送给编排器，
//! 每帧用 draw 渲染 UiState、输入缓冲与当前提示。请求在途时输入框锁定，只能滚动与退出。

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{broadcast, mpsc, watch};

use crate::core::{Command, Notice, UiState};
use crate::ui::event::{AppEvent, EventHandler};
use crate::ui::render::draw;

/// 输入非空白时取出并清空缓冲；全空白时保持原样（与提交按钮禁用一致）
fn take_submission(input_buffer: &mut String) -> Option<String> {
    if input_buffer.trim().is_empty() {
        return None;
    }
    Some(std::mem::take(input_buffer))
}

/// 一次性提示：显示 ttl 后自动消失
struct ActiveNotice {
    text: String,
    shown_at: Instant,
}

/// 运行 TUI：启用原始模式与全屏，循环 poll 事件 + 渲染，退出时恢复终端
pub async fn run_app(
    mut state_rx: watch::Receiver<UiState>,
    mut notice_rx: broadcast::Receiver<Notice>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    notice_ttl: Duration,
) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let event_handler = EventHandler::new(cmd_tx);
    let mut input_buffer = String::new();
    let mut conversation_scroll = 0usize;
    let mut active_notice: Option<ActiveNotice> = None;

    loop {
        // 对话记录或锁状态变化时滚动到最新一条
        if state_rx.has_changed().unwrap_or(false) {
            conversation_scroll = usize::MAX;
        }
        let state = state_rx.borrow_and_update().clone();

        loop {
            match notice_rx.try_recv() {
                Ok(notice) => {
                    tracing::debug!(id = notice.id, "Showing notice");
                    active_notice = Some(ActiveNotice {
                        text: notice.text,
                        shown_at: Instant::now(),
                    });
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!("Dropped {} notices", n);
                }
                Err(_) => break,
            }
        }
        if active_notice
            .as_ref()
            .is_some_and(|n| n.shown_at.elapsed() >= notice_ttl)
        {
            active_notice = None;
        }

        if let Ok(Some(ev)) = event_handler.poll() {
            match ev {
                AppEvent::Command(Command::Quit) => break,
                AppEvent::Command(_) => {}
                AppEvent::ClearInput => input_buffer.clear(),
                AppEvent::Key(key) => match key.code {
                    KeyCode::Enter if !state.input_locked => {
                        if let Some(input) = take_submission(&mut input_buffer) {
                            if matches!(
                                input.trim().to_lowercase().as_str(),
                                "/exit" | "/quit"
                            ) {
                                break;
                            }
                            active_notice = None;
                            event_handler.send_submit(input);
                        }
                    }
                    KeyCode::Backspace if !state.input_locked => {
                        input_buffer.pop();
                    }
                    KeyCode::Char(c) if !state.input_locked => {
                        input_buffer.push(c);
                    }
                    KeyCode::Up => {
                        conversation_scroll = conversation_scroll.saturating_sub(1);
                    }
                    KeyCode::Down => {
                        conversation_scroll = conversation_scroll.saturating_add(1);
                    }
                    KeyCode::PageUp => {
                        conversation_scroll = conversation_scroll.saturating_sub(10);
                    }
                    KeyCode::PageDown => {
                        conversation_scroll = conversation_scroll.saturating_add(10);
                    }
                    KeyCode::Home => {
                        conversation_scroll = 0;
                    }
                    KeyCode::End => {
                        conversation_scroll = usize::MAX;
                    }
                    _ => {}
                },
            }
        }

        let mut scroll_info = (0usize, 0usize);
        let notice_text = active_notice.as_ref().map(|n| n.text.as_str());
        terminal.draw(|f| {
            draw(
                f,
                &state,
                &input_buffer,
                notice_text,
                conversation_scroll,
                &mut scroll_info,
            );
        })?;
        let (total_lines, viewport_height) = scroll_info;
        let max_scroll = total_lines.saturating_sub(viewport_height);
        conversation_scroll = conversation_scroll.min(max_scroll);

        tokio::task::yield_now().await;
    }

    restore_terminal(&mut terminal)?;
    Ok(())
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}
