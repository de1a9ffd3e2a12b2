use crate::app::App;
use crate::core::{CardView, ColumnView};
use crate::models::{Priority, Status};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, ListState},
    Frame,
};

/// 渲染看板视图
pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let board = &app.board;
    let done_count = board.count(Status::Done);
    let title = format!(" taskdeck ({}/{}) ", done_count, board.total());

    let block = Block::default()
        .title(title)
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .border_type(BorderType::Rounded);

    let inner = block.inner(area);
    f.render_widget(block, area);

    // 三列布局：待办 | 进行中 | 已完成
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(33),
            Constraint::Percentage(33),
            Constraint::Percentage(34),
        ])
        .split(inner);

    for (idx, column) in board.columns.iter().enumerate() {
        render_column(f, columns[idx], column, idx, app);
    }
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Blue,
    }
}

/// 渲染单个列
fn render_column(f: &mut Frame, area: Rect, column: &ColumnView, column_idx: usize, app: &App) {
    let is_column_focused = app.drag.is_none() && app.selected_column == column_idx;
    let is_drop_target = app
        .drag
        .is_some_and(|drag| drag.target == column.status);

    // 简洁配色：聚焦=白色，拖放目标=黄色，其他=灰色
    let (border_color, title_style) = if is_drop_target {
        (Color::Yellow, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    } else if is_column_focused {
        (Color::White, Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
    } else {
        (Color::DarkGray, Style::default().fg(Color::Gray))
    };

    let items: Vec<ListItem> = column
        .cards
        .iter()
        .enumerate()
        .map(|(i, card)| {
            let is_selected = is_column_focused && i == app.selected_task_index;
            let is_dragged = app.drag.is_some_and(|drag| drag.task_id == card.id);
            card_item(card, is_selected, is_dragged)
        })
        .collect();

    // 列标题
    let title_with_count = format!(" {} ({}) ", column.status.label(), column.count());

    let list = List::new(items).block(
        Block::default()
            .title(title_with_count)
            .title_alignment(Alignment::Center)
            .title_style(title_style)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .border_type(BorderType::Rounded),
    );

    // 选中的卡片始终滚动到可见区域
    let selected = is_column_focused.then_some(app.selected_task_index);
    let mut state = ListState::default().with_selected(selected);
    f.render_stateful_widget(list, area, &mut state);
}

/// 单张卡片：标题行 + 日期/附件/评论行
fn card_item(card: &CardView, is_selected: bool, is_dragged: bool) -> ListItem<'static> {
    // 只有选中的任务高亮，其他使用默认样式
    let style = if is_selected {
        Style::default()
            .bg(Color::Rgb(41, 98, 218))
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    } else if is_dragged {
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC)
    } else {
        Style::default()
    };

    // 选中指示器
    let selection_indicator = if is_dragged {
        Span::styled("✥ ", Style::default().fg(Color::Yellow))
    } else if is_selected {
        Span::styled("▶ ", Style::default().fg(Color::White))
    } else {
        Span::raw("  ")
    };

    let title_line = Line::from(vec![
        Span::raw(" "),
        selection_indicator,
        Span::styled("● ", Style::default().fg(priority_color(card.priority))),
        Span::raw(card.title.clone()),
    ]);

    let mut lines = vec![title_line];
    // 描述只显示第一行
    if let Some(first) = card.description.lines().find(|l| !l.trim().is_empty()) {
        lines.push(Line::from(vec![
            Span::raw("     "),
            Span::styled(first.trim().to_string(), Style::default().fg(Color::DarkGray)),
        ]));
    }

    let mut meta = vec![Span::raw("     ")];
    let due = card.due_date.format("%Y-%m-%d").to_string();
    if card.overdue {
        meta.push(Span::styled(
            format!("{} overdue", due),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    } else {
        meta.push(Span::styled(due, Style::default().fg(Color::Gray)));
    }
    if card.has_image {
        meta.push(Span::raw("  📎"));
    }
    if card.comment_count > 0 {
        meta.push(Span::styled(
            format!("  💬 {}", card.comment_count),
            Style::default().fg(Color::Cyan),
        ));
    }

    lines.push(Line::from(meta));
    ListItem::new(lines).style(style)
}
