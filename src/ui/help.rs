use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::{centered_rect, render_backdrop};

/// 帮助分组：(标题, [(按键, 说明)])
const SECTIONS: [(&str, &[(&str, &str)]); 3] = [
    (
        "Navigation",
        &[
            ("j, ↓", "next task"),
            ("k, ↑", "previous task"),
            ("h, ←", "left column"),
            ("l, →", "right column"),
            ("gg", "first task"),
            ("G, ge", "last task"),
            ("?", "toggle help"),
            ("q", "quit"),
        ],
    ),
    (
        "Tasks",
        &[
            ("n", "new task"),
            ("Enter, e", "edit task"),
            ("d", "delete task"),
            ("m", "pick up card"),
            ("h / l", "choose drop column"),
            ("Enter", "drop card"),
            ("Esc", "cancel drag"),
            ("H / L", "move card left/right"),
        ],
    ),
    (
        "Task form",
        &[
            ("Tab", "next field"),
            ("Shift+Tab", "previous field"),
            ("← / →", "change priority"),
            ("Ctrl+S", "save"),
            ("Ctrl+A", "attach image"),
            ("Ctrl+X", "remove image"),
            ("Ctrl+D", "delete task"),
            ("Ctrl+U", "clear field"),
            ("Esc", "discard changes"),
        ],
    ),
];

/// 渲染帮助面板
pub fn render(f: &mut Frame, area: Rect) {
    // 渲染半透明背景遮罩
    render_backdrop(f, area);

    // 创建居中的弹窗区域
    let popup_area = centered_rect(80, 70, area);

    // 清空弹窗区域
    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(" Keyboard shortcuts (Esc or ? to close) ")
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .border_type(BorderType::Rounded)
        .style(Style::default().bg(Color::Black));

    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    // 分成三列
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(33),
            Constraint::Percentage(33),
            Constraint::Percentage(34),
        ])
        .split(inner);

    for (i, (title, keys)) in SECTIONS.iter().enumerate() {
        let widget = Paragraph::new(section_lines(title, keys)).wrap(Wrap { trim: false });
        f.render_widget(widget, columns[i]);
    }
}

fn section_lines(title: &str, keys: &[(&str, &str)]) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            title.to_string(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    for (key, description) in keys {
        lines.push(Line::from(vec![
            Span::styled(format!("{:<11}", key), Style::default().fg(Color::Cyan)),
            Span::raw(description.to_string()),
        ]));
    }
    lines
}
