use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use super::{centered_rect, render_backdrop};
use crate::app::{FormField, ModalKind, TaskModal};
use crate::models::Priority;

// Nord 配色
const NORD_BG: Color = Color::Rgb(46, 52, 64);
const NORD_BORDER: Color = Color::Rgb(76, 86, 106);
const NORD_FROST: Color = Color::Rgb(129, 161, 193);
const NORD_CYAN: Color = Color::Rgb(136, 192, 208);
const NORD_SNOW: Color = Color::Rgb(216, 222, 233);
const NORD_RED: Color = Color::Rgb(191, 97, 106);
const NORD_GREEN: Color = Color::Rgb(163, 190, 140);
const NORD_YELLOW: Color = Color::Rgb(235, 203, 139);

/// 渲染任务表单（从右侧滑入的面板）
pub fn render_task_modal(f: &mut Frame, area: Rect, modal: &mut TaskModal) {
    let width = (area.width / 2).max(50).min(area.width);
    let panel = Rect {
        x: area.x + area.width - width,
        y: area.y,
        width,
        height: area.height,
    };

    // 清空面板区域
    f.render_widget(Clear, panel);

    let title = match modal.kind {
        ModalKind::Creating => "  New Task  ",
        ModalKind::Editing(_) => "  Edit Task  ",
    };
    let block = Block::default()
        .title(title)
        .title_alignment(Alignment::Left)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(NORD_BORDER))
        .border_type(BorderType::Rounded)
        .style(Style::default().bg(NORD_BG));

    let inner = block.inner(panel);
    f.render_widget(block, panel);

    let editing = modal.is_editing();
    let mut constraints = vec![
        Constraint::Length(3), // 标题
        Constraint::Min(4),    // 描述
        Constraint::Length(3), // 优先级
        Constraint::Length(3), // 截止日期
        Constraint::Length(3), // 图片路径
        Constraint::Length(1), // 图片状态
    ];
    if editing {
        constraints.push(Constraint::Length(6)); // 评论列表
        constraints.push(Constraint::Length(3)); // 评论输入
    }
    constraints.push(Constraint::Length(2)); // 错误/提示

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    let focus = modal.focus;
    modal
        .title
        .render(f, chunks[0], "Title *", focus == FormField::Title);
    modal
        .description
        .render(f, chunks[1], "Description", focus == FormField::Description);
    render_priority(f, chunks[2], modal.priority, focus == FormField::Priority);
    modal
        .due_date
        .render(f, chunks[3], "Due date * (YYYY-MM-DD)", focus == FormField::DueDate);
    modal
        .image_path
        .render(f, chunks[4], "Image path (Enter/Ctrl+A attach)", focus == FormField::Image);
    render_image_status(f, chunks[5], modal);

    let mut next = 6;
    if editing {
        render_comments(f, chunks[6], modal);
        modal
            .comment_input
            .render(f, chunks[7], "Add comment (Enter)", focus == FormField::Comment);
        next = 8;
    }

    render_footer(f, chunks[next], modal);
}

/// 优先级选择器
fn render_priority(f: &mut Frame, area: Rect, selected: Priority, focused: bool) {
    let border_color = if focused { NORD_CYAN } else { NORD_BORDER };

    let mut spans = Vec::new();
    for priority in [Priority::High, Priority::Medium, Priority::Low] {
        let style = if priority == selected {
            Style::default()
                .bg(NORD_CYAN)
                .fg(NORD_BG)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(NORD_SNOW)
        };
        spans.push(Span::styled(format!(" {} ", priority.label()), style));
        spans.push(Span::raw(" "));
    }

    let paragraph = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .title(" Priority (←/→) ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border_color)),
    );
    f.render_widget(paragraph, area);
}

fn render_image_status(f: &mut Frame, area: Rect, modal: &TaskModal) {
    let line = if modal.image_pending() {
        Line::from(Span::styled(" ⏳ Processing image...", Style::default().fg(NORD_YELLOW)))
    } else if let Some(image) = &modal.image {
        Line::from(vec![
            Span::styled(" 📎 ", Style::default().fg(NORD_GREEN)),
            Span::styled(image.summary.clone(), Style::default().fg(NORD_SNOW)),
            Span::styled("  (Ctrl+X remove)", Style::default().fg(NORD_FROST)),
        ])
    } else {
        Line::from(Span::styled(" No image", Style::default().fg(NORD_BORDER)))
    };
    f.render_widget(Paragraph::new(line), area);
}

/// 评论列表（最新的在下面）
fn render_comments(f: &mut Frame, area: Rect, modal: &TaskModal) {
    let items: Vec<ListItem> = modal
        .comments
        .iter()
        .map(|comment| {
            let stamp = comment
                .timestamp
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string();
            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", stamp), Style::default().fg(NORD_FROST)),
                Span::styled(comment.text.clone(), Style::default().fg(NORD_SNOW)),
            ]))
        })
        .collect();

    let title = format!(" Comments ({}) ", modal.comments.len());
    let list = List::new(items).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(NORD_BORDER)),
    );
    f.render_widget(list, area);
}

/// 错误信息或快捷键提示
fn render_footer(f: &mut Frame, area: Rect, modal: &TaskModal) {
    let paragraph = match &modal.error {
        Some(error) => Paragraph::new(format!(" ✗ {}", error))
            .style(Style::default().fg(NORD_RED).add_modifier(Modifier::BOLD)),
        None => {
            let hint = if modal.is_editing() {
                " Tab next field · Ctrl+S save · Ctrl+D delete · Esc cancel"
            } else {
                " Tab next field · Ctrl+S create · Esc cancel"
            };
            Paragraph::new(hint).style(Style::default().fg(NORD_FROST))
        }
    };
    f.render_widget(paragraph.wrap(Wrap { trim: true }), area);
}

/// 渲染确认对话框
pub fn render_confirm(f: &mut Frame, area: Rect, title: &str, message: &str) {
    render_backdrop(f, area);

    let area = centered_rect(40, 25, area);
    f.render_widget(Clear, area);

    let block = Block::default()
        .title(format!("  {}  ", title))
        .title_alignment(Alignment::Left)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(NORD_YELLOW)) // Nord yellow for warnings
        .border_type(BorderType::Rounded)
        .style(Style::default().bg(NORD_BG));

    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // 消息
            Constraint::Length(1), // 按钮
        ])
        .split(inner);

    // 消息文本
    let message_text = Paragraph::new(message)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center)
        .style(Style::default().fg(NORD_SNOW));
    f.render_widget(message_text, chunks[0]);

    // 按钮区域
    let button_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(chunks[1]);

    let no_button = Paragraph::new("[ n ] No")
        .style(Style::default().fg(NORD_RED).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(no_button, button_chunks[1]);

    let yes_button = Paragraph::new("[ y ] Yes")
        .style(Style::default().fg(NORD_GREEN).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(yes_button, button_chunks[2]);
}
