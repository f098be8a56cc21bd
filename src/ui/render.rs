//! 界面渲染
//!
//! 根据 UiState（phase、history、锁）、输入缓冲与当前提示绘制：标题栏显示阶段/会话/用量，
//! 主体为对话记录（按角色着色、附本地时间、按宽度换行），请求在途时显示等待指示，底部为输入框与快捷键提示。

use chrono::{DateTime, Local};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};

use unicode_width::UnicodeWidthChar;

use crate::core::{TurnPhase, UiState};
use crate::memory::Role;

/// 提示区最多占用的正文行数（超出部分仍写入日志）
const MAX_NOTICE_LINES: usize = 4;

/// 将内容按显示宽度换行（CJK 等宽字符占两列），不会在字符中间截断
pub fn wrap_text(s: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    for para in s.split('\n') {
        let mut line = String::new();
        let mut line_width = 0usize;
        for ch in para.chars() {
            let w = UnicodeWidthChar::width(ch).unwrap_or(0);
            if line_width + w > width && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                line_width = 0;
            }
            line.push(ch);
            line_width += w;
        }
        // 保留空行（用户输入中的连续换行）
        lines.push(line);
    }
    lines
}

/// Paragraph 的滚动行号是 u16，超长对话停在最大值而不是回绕
fn scroll_row(offset: usize) -> u16 {
    u16::try_from(offset).unwrap_or(u16::MAX)
}

/// ISO-8601 时间戳转本地时间 HH:MM:SS；无法解析时原样显示
pub fn format_timestamp(ts: &str) -> String {
    DateTime::parse_from_rfc3339(ts)
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|_| ts.to_string())
}

/// 绘制一帧：上方对话区（标题 + 历史 + 滚动条），下方输入区；将 (总行数, 可视高度) 写入 out 供外部 clamp 滚动
pub fn draw(
    f: &mut Frame,
    state: &UiState,
    input_buffer: &str,
    notice: Option<&str>,
    conversation_scroll: usize,
    out: &mut (usize, usize),
) {
    let area = f.area();
    // 提示单独占一块，按终端宽度换行，完整展示失败原因
    let notice_lines = notice
        .map(|text| {
            let mut lines = wrap_text(text, area.width.saturating_sub(2) as usize);
            lines.truncate(MAX_NOTICE_LINES);
            lines
        })
        .unwrap_or_default();
    let notice_height = if notice_lines.is_empty() {
        0
    } else {
        notice_lines.len() as u16 + 2
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(notice_height),
            Constraint::Length(5),
        ])
        .split(area);

    let conv_area = chunks[0];
    let content_width = conv_area.width.saturating_sub(2).saturating_sub(1) as usize; // 边框 + 滚动条

    let phase_str = match state.phase {
        TurnPhase::Idle => "空闲",
        TurnPhase::Submitting => "等待回复…",
    };
    let conversation = state.conversation_id.as_deref().unwrap_or("新会话");
    let title = format!(
        " Bee Chat │ {} │ {} │ tokens {} ",
        phase_str, conversation, state.total_tokens
    );
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    // 每条消息：角色 + 本地时间一行，正文按宽度换行并缩进；消息之间加空行分隔
    let mut text_lines: Vec<Line> = Vec::new();
    for (idx, m) in state.history.iter().enumerate() {
        if idx > 0 {
            text_lines.push(Line::from(Span::raw("")));
        }
        let (label, color) = match m.role {
            Role::User => ("You ", Color::Cyan),
            Role::Assistant => ("AI  ", Color::Green),
        };
        text_lines.push(Line::from(vec![
            Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::styled(
                format_timestamp(&m.timestamp),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
        for line in wrap_text(&m.content, content_width.saturating_sub(4).max(20)) {
            text_lines.push(Line::from(vec![Span::raw("    "), Span::raw(line)]));
        }
    }
    if state.input_locked {
        if !text_lines.is_empty() {
            text_lines.push(Line::from(Span::raw("")));
        }
        text_lines.push(Line::from(vec![
            Span::styled("AI  ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::styled("· · ·", Style::default().fg(Color::DarkGray)),
        ]));
    }

    let content_height = conv_area.height.saturating_sub(2) as usize; // 边框
    let total_lines = text_lines.len();
    let max_scroll = total_lines.saturating_sub(content_height);
    let scroll_offset = conversation_scroll.min(max_scroll);

    let inner = block.inner(conv_area);
    let paragraph = Paragraph::new(Text::from(text_lines))
        .block(block)
        .scroll((scroll_row(scroll_offset), 0));
    f.render_widget(paragraph, conv_area);

    if total_lines > content_height {
        let mut scrollbar_state = ScrollbarState::new(total_lines)
            .position(scroll_offset)
            .viewport_content_length(content_height);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .thumb_symbol("█")
            .track_symbol(Some("░"));
        f.render_stateful_widget(scrollbar, inner, &mut scrollbar_state);
    }

    if !notice_lines.is_empty() {
        let notice_block = Block::default()
            .title(" 错误 ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red));
        let lines: Vec<Line> = notice_lines
            .into_iter()
            .map(|l| Line::from(Span::styled(l, Style::default().fg(Color::Red))))
            .collect();
        f.render_widget(Paragraph::new(Text::from(lines)).block(notice_block), chunks[1]);
    }

    let input_prompt = if state.input_locked {
        " 等待回复… "
    } else {
        " 输入 "
    };

    let hint = " Enter 发送 │ ↑↓ PgUp/PgDn 滚动 │ Esc 清空输入 │ Ctrl+C 退出 ";
    let input_block = Block::default()
        .title(input_prompt)
        .title_bottom(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    let input = Paragraph::new(input_buffer)
        .block(input_block)
        .wrap(Wrap { trim: false })
        .style(if state.input_locked {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        });

    f.render_widget(input, chunks[2]);

    out.0 = total_lines;
    out.1 = content_height;
}
