use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, BorderType, Borders},
    Frame,
};
use tui_textarea::{CursorMove, TextArea};

/// 表单输入框（基于 tui-textarea，只有插入模式）
pub struct FormInput {
    /// 底层 TextArea 组件
    textarea: TextArea<'static>,
    /// 是否允许多行
    multiline: bool,
}

impl FormInput {
    /// 单行输入框
    pub fn single_line(initial_value: &str) -> Self {
        Self::build(initial_value, false)
    }

    /// 多行输入框（描述）
    pub fn multi_line(initial_value: &str) -> Self {
        Self::build(initial_value, true)
    }

    fn build(initial_value: &str, multiline: bool) -> Self {
        let mut textarea = if initial_value.is_empty() {
            TextArea::default()
        } else {
            TextArea::from(initial_value.split('\n').map(|s| s.to_string()))
        };
        textarea.move_cursor(CursorMove::Bottom);
        textarea.move_cursor(CursorMove::End);

        // Nord 主题
        textarea.set_style(Style::default().fg(Color::Rgb(236, 239, 244)));
        textarea.set_cursor_line_style(Style::default());

        Self { textarea, multiline }
    }

    /// 获取内容
    pub fn text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    pub fn is_blank(&self) -> bool {
        self.text().trim().is_empty()
    }

    pub fn set_text(&mut self, value: &str) {
        *self = Self::build(value, self.multiline);
    }

    pub fn clear(&mut self) {
        self.set_text("");
    }

    /// 处理按键，返回 true 表示已消费
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                // Ctrl+U 清空
                KeyCode::Char('u') => {
                    self.clear();
                    true
                }
                _ => false,
            };
        }

        match key.code {
            KeyCode::Char(c) => {
                self.textarea.insert_char(c);
                true
            }
            KeyCode::Enter if self.multiline => {
                self.textarea.insert_newline();
                true
            }
            KeyCode::Backspace => {
                self.textarea.delete_char();
                true
            }
            KeyCode::Delete => {
                self.textarea.delete_next_char();
                true
            }
            KeyCode::Left => {
                self.textarea.move_cursor(CursorMove::Back);
                true
            }
            KeyCode::Right => {
                self.textarea.move_cursor(CursorMove::Forward);
                true
            }
            KeyCode::Up if self.multiline => {
                self.textarea.move_cursor(CursorMove::Up);
                true
            }
            KeyCode::Down if self.multiline => {
                self.textarea.move_cursor(CursorMove::Down);
                true
            }
            KeyCode::Home => {
                self.textarea.move_cursor(CursorMove::Head);
                true
            }
            KeyCode::End => {
                self.textarea.move_cursor(CursorMove::End);
                true
            }
            _ => false,
        }
    }

    /// 渲染输入框，聚焦时显示光标和高亮边框
    pub fn render(&mut self, f: &mut Frame, area: Rect, label: &str, focused: bool) {
        let border_color = if focused {
            Color::Rgb(136, 192, 208) // Nord cyan
        } else {
            Color::Rgb(76, 86, 106)
        };

        self.textarea.set_block(
            Block::default()
                .title(format!(" {} ", label))
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(border_color)),
        );

        let cursor_style = if focused {
            Style::default().bg(Color::Rgb(136, 192, 208)).fg(Color::Rgb(46, 52, 64))
        } else {
            Style::default()
        };
        self.textarea.set_cursor_style(cursor_style);

        f.render_widget(&self.textarea, area);
    }
}
