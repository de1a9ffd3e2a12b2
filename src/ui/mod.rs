pub mod dialogs;
pub mod help;
mod kanban;
mod statusbar;
pub mod text_input;

use crate::app::{App, Mode, Notification, NotificationLevel};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// 主渲染函数
pub fn render(f: &mut Frame, app: &mut App) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // 看板
            Constraint::Length(1), // 状态栏
        ])
        .split(f.area());

    kanban::render(f, main_chunks[0], app);
    statusbar::render(f, main_chunks[1], app);

    // 渲染任务表单（如果打开）
    if let Some(modal) = app.modal.as_mut() {
        dialogs::render_task_modal(f, main_chunks[0], modal);
        if modal.confirm_delete {
            dialogs::render_confirm(f, f.area(), "Delete task", "Delete this task? This cannot be undone.");
        }
    }

    // 渲染帮助面板（如果处于帮助模式）
    if app.mode() == Mode::Help {
        help::render(f, f.area());
    }

    // 渲染通知栏（如果有通知）
    if let Some(ref notification) = app.notification {
        render_notification(f, f.area(), notification);
    }
}

/// 渲染通知栏
fn render_notification(f: &mut Frame, area: Rect, notification: &Notification) {
    // 通知栏占据底部状态栏上方 3 行
    let height = 3.min(area.height);
    let notification_area = Rect {
        x: area.x,
        y: area.y + area.height.saturating_sub(height + 1),
        width: area.width,
        height,
    };

    // 根据级别选择颜色
    let (bg_color, fg_color, prefix) = match notification.level {
        NotificationLevel::Success => (Color::Green, Color::White, "✓"),
        NotificationLevel::Error => (Color::Red, Color::White, "✗"),
    };

    let content = Line::from(vec![
        Span::styled(
            format!(" {} ", prefix),
            Style::default().fg(fg_color).bg(bg_color).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(notification.message.as_str(), Style::default().fg(fg_color)),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(bg_color))
        .style(Style::default().bg(bg_color));

    f.render_widget(ratatui::widgets::Clear, notification_area);
    f.render_widget(Paragraph::new(content).block(block), notification_area);
}

/// 创建一个居中的矩形区域
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// 渲染半透明背景遮罩
pub(crate) fn render_backdrop(f: &mut Frame, area: Rect) {
    let block = Block::default().style(Style::default().bg(Color::Rgb(0, 0, 0)));
    f.render_widget(block, area);
}
