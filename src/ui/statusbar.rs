use crate::app::{App, Mode};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// 渲染状态栏（Helix 风格）
pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let mode_text = match app.mode() {
        Mode::Normal => ("NORMAL", Color::Green),
        Mode::Drag => ("DRAG", Color::Yellow),
        Mode::Modal => ("FORM", Color::Magenta),
        Mode::Help => ("HELP", Color::Blue),
    };

    // 显示键序列
    let key_sequence = if !app.key_buffer.is_empty() {
        format!(" [{}]", app.key_buffer.iter().collect::<String>())
    } else {
        String::new()
    };

    // 拖拽目标
    let drag_display = match app.drag {
        Some(drag) => format!(" {} → {}", drag.origin.label(), drag.target.label()),
        None => String::new(),
    };

    let board = &app.board;
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", mode_text.0),
            Style::default()
                .fg(Color::Black)
                .bg(mode_text.1)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(key_sequence),
        Span::raw(drag_display),
        Span::raw(format!(
            " | {} tasks | {} overdue | ? help ",
            board.total(),
            board
                .columns
                .iter()
                .flat_map(|c| c.cards.iter())
                .filter(|card| card.overdue)
                .count()
        )),
    ]);

    let paragraph = Paragraph::new(line).style(Style::default().bg(Color::Black));

    f.render_widget(paragraph, area);
}
