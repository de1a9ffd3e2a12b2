use crate::app::{App, FormField, Mode};
use crate::input::Command;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// 处理键盘输入
/// 返回 false 表示应该退出应用
pub fn handle_key_input(app: &mut App, key: KeyEvent) -> bool {
    match app.mode() {
        Mode::Normal => handle_normal_mode(app, key),
        Mode::Drag => handle_drag_mode(app, key),
        Mode::Modal => handle_modal_mode(app, key),
        Mode::Help => handle_help_mode(app, key),
    }
}

/// 处理正常模式的按键
fn handle_normal_mode(app: &mut App, key: KeyEvent) -> bool {
    // 尝试匹配命令（使用当前缓冲区和新按键）
    if let Some(cmd) = match_key_sequence(&app.key_buffer, key) {
        app.key_buffer.clear();

        if cmd == Command::Quit {
            return false;
        }

        execute_command(app, cmd);
        return true;
    }

    // 只有 g 是序列前缀，其它未匹配的按键清空缓冲区
    match key.code {
        KeyCode::Char('g') if app.key_buffer.is_empty() => app.key_buffer.push('g'),
        _ => app.key_buffer.clear(),
    }

    true
}

/// 按键序列到命令的映射
pub fn match_key_sequence(buffer: &[char], key: KeyEvent) -> Option<Command> {
    match (buffer, key.code, key.modifiers) {
        // ===== 单键命令（空缓冲区）=====
        ([], KeyCode::Char('q'), KeyModifiers::NONE) => Some(Command::Quit),
        ([], KeyCode::Char('j'), KeyModifiers::NONE) => Some(Command::TaskDown),
        ([], KeyCode::Char('k'), KeyModifiers::NONE) => Some(Command::TaskUp),
        ([], KeyCode::Char('h'), KeyModifiers::NONE) => Some(Command::ColumnLeft),
        ([], KeyCode::Char('l'), KeyModifiers::NONE) => Some(Command::ColumnRight),
        ([], KeyCode::Char('H'), KeyModifiers::SHIFT) => Some(Command::MoveTaskLeft),
        ([], KeyCode::Char('L'), KeyModifiers::SHIFT) => Some(Command::MoveTaskRight),
        ([], KeyCode::Char('G'), KeyModifiers::SHIFT) => Some(Command::TaskLast),
        ([], KeyCode::Char('n'), KeyModifiers::NONE) => Some(Command::NewTask),
        ([], KeyCode::Char('e'), KeyModifiers::NONE) => Some(Command::EditTask),
        ([], KeyCode::Enter, _) => Some(Command::EditTask),
        ([], KeyCode::Char('d'), KeyModifiers::NONE) => Some(Command::DeleteTask),
        ([], KeyCode::Char('m'), KeyModifiers::NONE) => Some(Command::PickUpTask),
        ([], KeyCode::Char('?'), _) => Some(Command::ShowHelp),

        ([], KeyCode::Down, _) => Some(Command::TaskDown),
        ([], KeyCode::Up, _) => Some(Command::TaskUp),
        ([], KeyCode::Left, _) => Some(Command::ColumnLeft),
        ([], KeyCode::Right, _) => Some(Command::ColumnRight),

        // ===== g 序列 =====
        (['g'], KeyCode::Char('g'), _) => Some(Command::TaskFirst),
        (['g'], KeyCode::Char('e'), _) => Some(Command::TaskLast),

        _ => None,
    }
}

/// 执行命令
fn execute_command(app: &mut App, cmd: Command) {
    match cmd {
        Command::Quit => {}
        Command::TaskUp => app.select_task_offset(-1),
        Command::TaskDown => app.select_task_offset(1),
        Command::TaskFirst => app.select_first_task(),
        Command::TaskLast => app.select_last_task(),
        Command::ColumnLeft => app.select_column(-1),
        Command::ColumnRight => app.select_column(1),
        Command::NewTask => app.open_create(),
        Command::EditTask => {
            app.open_selected();
        }
        Command::DeleteTask => {
            if app.open_selected() {
                app.request_delete();
            }
        }
        Command::PickUpTask => {
            app.begin_drag();
        }
        Command::MoveTaskLeft => {
            app.move_selected(-1);
        }
        Command::MoveTaskRight => {
            app.move_selected(1);
        }
        Command::ShowHelp => app.show_help = true,
    }
}

/// 拖拽模式：选择目标列后放下
fn handle_drag_mode(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('h') | KeyCode::Left => app.move_drag_target(-1),
        KeyCode::Char('l') | KeyCode::Right => app.move_drag_target(1),
        KeyCode::Enter | KeyCode::Char('m') => {
            app.drop_dragged();
        }
        KeyCode::Esc => app.cancel_drag(),
        _ => {}
    }
    true
}

/// 处理表单的按键
fn handle_modal_mode(app: &mut App, key: KeyEvent) -> bool {
    let Some(modal) = app.modal.as_mut() else {
        return true;
    };

    // 删除确认
    if modal.confirm_delete {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_delete(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.confirm_delete(false),
            _ => {}
        }
        return true;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('s') => {
                app.submit_modal();
                return true;
            }
            KeyCode::Char('a') => {
                app.attach_image();
                return true;
            }
            KeyCode::Char('x') => {
                app.remove_image();
                return true;
            }
            KeyCode::Char('d') => {
                app.request_delete();
                return true;
            }
            _ => {}
        }
    }

    match key.code {
        KeyCode::Esc => {
            app.close_modal();
            return true;
        }
        KeyCode::Tab => {
            modal.focus_next();
            return true;
        }
        KeyCode::BackTab => {
            modal.focus_prev();
            return true;
        }
        _ => {}
    }

    let focus = modal.focus;
    match focus {
        FormField::Priority => match key.code {
            KeyCode::Left | KeyCode::Char('h') => modal.priority = modal.priority.prev(),
            KeyCode::Right | KeyCode::Char('l') => modal.priority = modal.priority.next(),
            KeyCode::Enter => {
                app.submit_modal();
            }
            _ => {}
        },
        FormField::Comment if key.code == KeyCode::Enter => {
            app.submit_comment();
        }
        FormField::Image if key.code == KeyCode::Enter => {
            app.attach_image();
        }
        _ => {
            let consumed = modal
                .focused_input()
                .is_some_and(|input| input.handle_key(key));
            // 单行字段中 Enter 提交表单
            if !consumed && key.code == KeyCode::Enter {
                app.submit_modal();
            }
        }
    }

    true
}

/// 处理帮助模式的按键
fn handle_help_mode(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => {
            app.show_help = false;
        }
        _ => {}
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::core::TaskStore;
    use crate::fs::storage::MemoryStorage;
    use crate::models::{Priority, Status};
    use tokio::runtime::Runtime;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn shift(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::SHIFT)
    }

    fn press_all(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_key_input(app, key(KeyCode::Char(c)));
        }
    }

    fn new_app(runtime: &Runtime) -> App {
        let store = TaskStore::open(MemoryStorage::new());
        App::new(store, Config::default(), runtime.handle().clone())
    }

    #[test]
    fn test_match_key_sequence() {
        assert_eq!(match_key_sequence(&[], key(KeyCode::Char('n'))), Some(Command::NewTask));
        assert_eq!(match_key_sequence(&[], shift('L')), Some(Command::MoveTaskRight));
        assert_eq!(match_key_sequence(&['g'], key(KeyCode::Char('g'))), Some(Command::TaskFirst));
        assert_eq!(match_key_sequence(&[], key(KeyCode::Char('g'))), None);
        assert_eq!(match_key_sequence(&['x'], key(KeyCode::Char('n'))), None);
    }

    #[test]
    fn test_quit() {
        let runtime = Runtime::new().unwrap();
        let mut app = new_app(&runtime);
        assert!(!handle_key_input(&mut app, key(KeyCode::Char('q'))));
    }

    #[test]
    fn test_create_through_keys() {
        let runtime = Runtime::new().unwrap();
        let mut app = new_app(&runtime);

        handle_key_input(&mut app, key(KeyCode::Char('n')));
        assert_eq!(app.mode(), Mode::Modal);
        // 'q' 在表单里是普通字符
        press_all(&mut app, "quarterly report");
        handle_key_input(&mut app, key(KeyCode::Tab));
        handle_key_input(&mut app, key(KeyCode::Tab));
        handle_key_input(&mut app, key(KeyCode::Left));
        assert!(handle_key_input(&mut app, ctrl('s')));

        assert_eq!(app.mode(), Mode::Normal);
        let task = &app.store.all()[0];
        assert_eq!(task.title, "quarterly report");
        assert_eq!(task.priority, Priority::High);
    }

    #[test]
    fn test_escape_discards_form() {
        let runtime = Runtime::new().unwrap();
        let mut app = new_app(&runtime);

        handle_key_input(&mut app, key(KeyCode::Char('n')));
        press_all(&mut app, "never saved");
        handle_key_input(&mut app, key(KeyCode::Esc));

        assert_eq!(app.mode(), Mode::Normal);
        assert!(app.store.all().is_empty());
    }

    #[test]
    fn test_pick_up_and_drop() {
        let runtime = Runtime::new().unwrap();
        let mut app = new_app(&runtime);
        handle_key_input(&mut app, key(KeyCode::Char('n')));
        press_all(&mut app, "card");
        handle_key_input(&mut app, key(KeyCode::Enter));
        let id = app.store.all()[0].id;

        handle_key_input(&mut app, key(KeyCode::Char('m')));
        assert_eq!(app.mode(), Mode::Drag);
        handle_key_input(&mut app, key(KeyCode::Char('l')));
        handle_key_input(&mut app, key(KeyCode::Enter));

        assert_eq!(app.mode(), Mode::Normal);
        assert_eq!(app.store.get(id).unwrap().status, Status::InProgress);

        handle_key_input(&mut app, shift('L'));
        assert_eq!(app.store.get(id).unwrap().status, Status::Done);
    }

    #[test]
    fn test_delete_with_confirmation() {
        let runtime = Runtime::new().unwrap();
        let mut app = new_app(&runtime);
        handle_key_input(&mut app, key(KeyCode::Char('n')));
        press_all(&mut app, "doomed");
        handle_key_input(&mut app, ctrl('s'));

        handle_key_input(&mut app, key(KeyCode::Char('d')));
        assert!(app.modal.as_ref().unwrap().confirm_delete);
        handle_key_input(&mut app, key(KeyCode::Char('n')));
        assert!(app.store.all().len() == 1);
        assert!(!app.modal.as_ref().unwrap().confirm_delete);

        handle_key_input(&mut app, ctrl('d'));
        handle_key_input(&mut app, key(KeyCode::Char('y')));
        assert!(app.store.all().is_empty());
        assert_eq!(app.mode(), Mode::Normal);
    }

    #[test]
    fn test_comment_on_enter() {
        let runtime = Runtime::new().unwrap();
        let mut app = new_app(&runtime);
        handle_key_input(&mut app, key(KeyCode::Char('n')));
        press_all(&mut app, "discuss");
        handle_key_input(&mut app, ctrl('s'));

        handle_key_input(&mut app, key(KeyCode::Char('e')));
        handle_key_input(&mut app, key(KeyCode::BackTab));
        assert_eq!(app.modal.as_ref().unwrap().focus, FormField::Comment);
        press_all(&mut app, "looks good");
        handle_key_input(&mut app, key(KeyCode::Enter));

        assert_eq!(app.store.all()[0].comments[0].text, "looks good");
        assert_eq!(app.mode(), Mode::Modal);
    }

    #[test]
    fn test_help_toggle() {
        let runtime = Runtime::new().unwrap();
        let mut app = new_app(&runtime);
        handle_key_input(&mut app, key(KeyCode::Char('?')));
        assert_eq!(app.mode(), Mode::Help);
        assert!(handle_key_input(&mut app, key(KeyCode::Char('q'))));
        assert_eq!(app.mode(), Mode::Normal);
    }
}
