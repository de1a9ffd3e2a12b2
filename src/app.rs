use crate::attachment::{EncodedImage, ImageJob};
use crate::config::Config;
use crate::core::{BoardView, CardView, StoreError, TaskStore};
use crate::models::{Comment, Priority, Status, TaskDraft, TaskId};
use crate::ui::text_input::FormInput;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// 通知消息
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
    pub created_at: Instant,
    pub duration: Duration,
}

impl Notification {
    /// 检查通知是否已过期（默认 3 秒后自动消失）
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.duration
    }
}

/// 应用模式（由当前状态推导）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// 正常模式 - 导航和查看
    Normal,
    /// 拖拽模式 - 选择目标列
    Drag,
    /// 任务表单
    Modal,
    /// 帮助模式 - 显示快捷键
    Help,
}

/// 表单用途
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalKind {
    Creating,
    Editing(TaskId),
}

/// 表单字段（Tab 切换焦点的顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Description,
    Priority,
    DueDate,
    Image,
    Comment,
}

impl FormField {
    fn order(kind: ModalKind) -> &'static [FormField] {
        use FormField::*;
        match kind {
            ModalKind::Creating => &[Title, Description, Priority, DueDate, Image],
            ModalKind::Editing(_) => &[Title, Description, Priority, DueDate, Image, Comment],
        }
    }
}

/// 图片附件状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePreview {
    pub data_uri: String,
    /// 例如 "800x600, 45 KB"
    pub summary: String,
}

impl ImagePreview {
    fn from_data_uri(data_uri: String) -> Self {
        let summary = match crate::attachment::parse_data_uri(&data_uri) {
            Some((mime, bytes)) => format!("{}, {} KB", mime, bytes.len().div_ceil(1024)),
            None => "attached".to_string(),
        };
        Self { data_uri, summary }
    }

    fn from_encoded(encoded: EncodedImage) -> Self {
        Self {
            summary: format!(
                "{}x{}, {} KB",
                encoded.width,
                encoded.height,
                encoded.bytes.div_ceil(1024)
            ),
            data_uri: encoded.data_uri,
        }
    }
}

/// 创建/编辑任务的表单状态
pub struct TaskModal {
    pub kind: ModalKind,
    pub title: FormInput,
    pub description: FormInput,
    pub priority: Priority,
    pub due_date: FormInput,
    pub image_path: FormInput,
    pub image: Option<ImagePreview>,
    /// 正在后台压缩的图片
    pub pending_image: Option<ImageJob>,
    pub comment_input: FormInput,
    pub comments: Vec<Comment>,
    pub focus: FormField,
    /// 表单内联错误
    pub error: Option<String>,
    /// 是否正在确认删除
    pub confirm_delete: bool,
}

impl TaskModal {
    fn blank(today: NaiveDate) -> Self {
        Self {
            kind: ModalKind::Creating,
            title: FormInput::single_line(""),
            description: FormInput::multi_line(""),
            priority: Priority::Medium,
            due_date: FormInput::single_line(&today.format("%Y-%m-%d").to_string()),
            image_path: FormInput::single_line(""),
            image: None,
            pending_image: None,
            comment_input: FormInput::single_line(""),
            comments: Vec::new(),
            focus: FormField::Title,
            error: None,
            confirm_delete: false,
        }
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.kind, ModalKind::Editing(_))
    }

    pub fn image_pending(&self) -> bool {
        self.pending_image.is_some()
    }

    pub fn focus_next(&mut self) {
        let order = FormField::order(self.kind);
        let pos = order.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = order[(pos + 1) % order.len()];
    }

    pub fn focus_prev(&mut self) {
        let order = FormField::order(self.kind);
        let pos = order.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = order[(pos + order.len() - 1) % order.len()];
    }

    /// 当前获得焦点的文本输入框（优先级选择器不是文本框）
    pub fn focused_input(&mut self) -> Option<&mut FormInput> {
        match self.focus {
            FormField::Title => Some(&mut self.title),
            FormField::Description => Some(&mut self.description),
            FormField::DueDate => Some(&mut self.due_date),
            FormField::Image => Some(&mut self.image_path),
            FormField::Comment => Some(&mut self.comment_input),
            FormField::Priority => None,
        }
    }

    /// 从表单内容构造草稿
    pub fn draft(&self) -> Result<TaskDraft, String> {
        let due_text = self.due_date.text();
        let due_date = if due_text.trim().is_empty() {
            None
        } else {
            Some(
                NaiveDate::parse_from_str(due_text.trim(), "%Y-%m-%d")
                    .map_err(|_| "Due date must be YYYY-MM-DD".to_string())?,
            )
        };

        Ok(TaskDraft {
            title: self.title.text(),
            description: self.description.text(),
            priority: Some(self.priority),
            due_date,
            image: self.image.as_ref().map(|i| i.data_uri.clone()),
        })
    }

    /// 取消正在进行的图片处理
    fn cancel_pending_image(&mut self) {
        if let Some(job) = self.pending_image.take() {
            job.cancel();
        }
    }
}

/// 拖拽状态：被拖动的任务和当前目标列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragState {
    pub task_id: TaskId,
    pub origin: Status,
    pub target: Status,
}

/// 应用状态
pub struct App {
    pub store: TaskStore,
    /// 当前看板视图（每次修改后重新投影）
    pub board: BoardView,
    pub config: Config,
    /// 选中的列 (0=todo, 1=in-progress, 2=done)
    pub selected_column: usize,
    /// 选中列中的任务索引
    pub selected_task_index: usize,
    /// 按键缓冲区（用于键序列匹配）
    pub key_buffer: Vec<char>,
    pub modal: Option<TaskModal>,
    pub drag: Option<DragState>,
    pub show_help: bool,
    /// 通知消息
    pub notification: Option<Notification>,
    /// 看板重新投影的次数
    pub renders: u64,
    runtime: Handle,
}

/// 本地日期（零点之前的截止日期视为逾期）
fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

impl App {
    /// 创建新的应用实例，并完成首次投影
    pub fn new(store: TaskStore, config: Config, runtime: Handle) -> Self {
        let board = BoardView::project(store.all(), today());
        Self {
            store,
            board,
            config,
            selected_column: 0,
            selected_task_index: 0,
            key_buffer: Vec::new(),
            modal: None,
            drag: None,
            show_help: false,
            notification: None,
            renders: 1,
            runtime,
        }
    }

    pub fn mode(&self) -> Mode {
        if self.show_help {
            Mode::Help
        } else if self.modal.is_some() {
            Mode::Modal
        } else if self.drag.is_some() {
            Mode::Drag
        } else {
            Mode::Normal
        }
    }

    /// 从 store 重新投影整个看板
    pub fn refresh_board(&mut self) {
        self.board = BoardView::project(self.store.all(), today());
        self.renders += 1;
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        self.selected_column = self.selected_column.min(Status::ALL.len() - 1);
        let count = self.board.columns[self.selected_column].count();
        self.selected_task_index = self.selected_task_index.min(count.saturating_sub(1));
    }

    /// 选中某个任务（用于移动后光标跟随）
    fn select_task(&mut self, id: TaskId) {
        for (col, column) in self.board.columns.iter().enumerate() {
            if let Some(idx) = column.cards.iter().position(|c| c.id == id) {
                self.selected_column = col;
                self.selected_task_index = idx;
                return;
            }
        }
    }

    pub fn selected_card(&self) -> Option<&CardView> {
        self.board.columns[self.selected_column]
            .cards
            .get(self.selected_task_index)
    }

    // ===== 导航 =====

    pub fn select_column(&mut self, delta: isize) {
        let max = Status::ALL.len() as isize - 1;
        self.selected_column = (self.selected_column as isize + delta).clamp(0, max) as usize;
        self.clamp_selection();
    }

    pub fn select_task_offset(&mut self, delta: isize) {
        let count = self.board.columns[self.selected_column].count();
        if count == 0 {
            return;
        }
        let max = count as isize - 1;
        self.selected_task_index = (self.selected_task_index as isize + delta).clamp(0, max) as usize;
    }

    pub fn select_first_task(&mut self) {
        self.selected_task_index = 0;
    }

    pub fn select_last_task(&mut self) {
        let count = self.board.columns[self.selected_column].count();
        self.selected_task_index = count.saturating_sub(1);
    }

    // ===== 通知 =====

    /// 显示通知消息
    pub fn show_notification(&mut self, message: impl Into<String>, level: NotificationLevel) {
        self.notification = Some(Notification {
            message: message.into(),
            level,
            created_at: Instant::now(),
            duration: self.config.notification_duration(),
        });
    }

    /// 清除已过期的通知
    pub fn clear_expired_notification(&mut self) {
        if let Some(ref notification) = self.notification {
            if notification.is_expired() {
                self.notification = None;
            }
        }
    }

    fn report_store_error(&mut self, err: StoreError) {
        tracing::error!("store operation failed: {}", err);
        self.show_notification(err.to_string(), NotificationLevel::Error);
    }

    // ===== 表单 =====

    /// 打开空白的新建任务表单
    pub fn open_create(&mut self) {
        self.close_modal();
        self.modal = Some(TaskModal::blank(today()));
    }

    /// 打开编辑表单，任务不存在时返回 false
    pub fn open_edit(&mut self, id: TaskId) -> bool {
        let Some(task) = self.store.get(id) else {
            return false;
        };

        let mut modal = TaskModal::blank(today());
        modal.kind = ModalKind::Editing(id);
        modal.title.set_text(&task.title);
        modal.description.set_text(&task.description);
        modal.priority = task.priority;
        modal.due_date.set_text(&task.due_date.format("%Y-%m-%d").to_string());
        modal.image = task.image.clone().map(ImagePreview::from_data_uri);
        modal.comments = task.comments.clone();

        self.close_modal();
        self.modal = Some(modal);
        true
    }

    /// 编辑当前选中的任务
    pub fn open_selected(&mut self) -> bool {
        match self.selected_card().map(|c| c.id) {
            Some(id) => self.open_edit(id),
            None => false,
        }
    }

    /// 提交表单，成功后关闭并刷新看板
    pub fn submit_modal(&mut self) -> bool {
        let Some(modal) = self.modal.as_mut() else {
            return false;
        };

        if modal.image_pending() {
            modal.error = Some("Image still processing".to_string());
            return false;
        }

        let draft = match modal.draft() {
            Ok(draft) => draft,
            Err(msg) => {
                modal.error = Some(msg);
                return false;
            }
        };

        let kind = modal.kind;
        let result = match kind {
            ModalKind::Creating => self.store.create(draft),
            ModalKind::Editing(id) => self.store.update(id, draft).map(|_| id),
        };

        match result {
            Ok(id) => {
                self.modal = None;
                self.refresh_board();
                self.select_task(id);
                let message = match kind {
                    ModalKind::Creating => "Task created",
                    ModalKind::Editing(_) => "Task updated",
                };
                self.show_notification(message, NotificationLevel::Success);
                true
            }
            Err(StoreError::Validation(e)) => {
                if let Some(modal) = self.modal.as_mut() {
                    modal.error = Some(e.to_string());
                }
                false
            }
            Err(StoreError::NotFound(_)) => {
                // 任务已不存在，静默关闭
                self.modal = None;
                false
            }
            Err(e) => {
                if let Some(modal) = self.modal.as_mut() {
                    modal.error = Some(e.to_string());
                }
                self.report_store_error(e);
                false
            }
        }
    }

    /// 关闭表单，丢弃未提交的修改
    pub fn close_modal(&mut self) {
        if let Some(mut modal) = self.modal.take() {
            modal.cancel_pending_image();
        }
    }

    /// 请求删除（需要确认）
    pub fn request_delete(&mut self) {
        if let Some(modal) = self.modal.as_mut() {
            if modal.is_editing() {
                modal.confirm_delete = true;
            }
        }
    }

    /// 确认或取消删除
    pub fn confirm_delete(&mut self, confirmed: bool) {
        let Some(modal) = self.modal.as_mut() else {
            return;
        };
        let ModalKind::Editing(id) = modal.kind else {
            return;
        };
        if !modal.confirm_delete {
            return;
        }
        modal.confirm_delete = false;
        if !confirmed {
            return;
        }

        match self.store.remove(id) {
            Ok(removed) => {
                self.close_modal();
                self.refresh_board();
                if removed {
                    self.show_notification("Task deleted", NotificationLevel::Success);
                }
            }
            Err(e) => self.report_store_error(e),
        }
    }

    /// 添加评论（仅编辑模式）
    pub fn submit_comment(&mut self) -> bool {
        let Some(modal) = self.modal.as_mut() else {
            return false;
        };
        let ModalKind::Editing(id) = modal.kind else {
            return false;
        };
        if modal.comment_input.is_blank() {
            return false;
        }
        let text = modal.comment_input.text();

        match self.store.add_comment(id, &text) {
            Ok(_) => {
                let comments = self
                    .store
                    .get(id)
                    .map(|t| t.comments.clone())
                    .unwrap_or_default();
                if let Some(modal) = self.modal.as_mut() {
                    modal.comment_input.clear();
                    modal.comments = comments;
                }
                // 刷新卡片上的评论数
                self.refresh_board();
                true
            }
            Err(e) => {
                self.report_store_error(e);
                false
            }
        }
    }

    // ===== 图片 =====

    /// 读取表单中填写的路径，开始后台压缩
    pub fn attach_image(&mut self) -> bool {
        let options = self.config.codec_options();
        let Some(modal) = self.modal.as_mut() else {
            return false;
        };

        let raw = modal.image_path.text();
        let path = raw.trim();
        if path.is_empty() {
            modal.error = Some("Enter an image path first".to_string());
            return false;
        }

        let path = expand_home(path);
        match ImageJob::from_file(&self.runtime, &path, options) {
            Ok(job) => {
                modal.cancel_pending_image();
                modal.pending_image = Some(job);
                modal.error = None;
                true
            }
            Err(e) => {
                modal.error = Some(e.to_string());
                false
            }
        }
    }

    /// 移除图片（同时取消正在处理的图片）
    pub fn remove_image(&mut self) {
        if let Some(modal) = self.modal.as_mut() {
            modal.cancel_pending_image();
            modal.image = None;
            modal.image_path.clear();
        }
    }

    /// 后台任务：图片处理结果、通知过期、跨日刷新
    pub fn poll_background(&mut self) {
        let finished = self
            .modal
            .as_mut()
            .and_then(|m| m.pending_image.as_mut())
            .and_then(ImageJob::poll);

        if let Some(result) = finished {
            let mut failure = None;
            if let Some(modal) = self.modal.as_mut() {
                modal.pending_image = None;
                match result {
                    Ok(encoded) => {
                        tracing::debug!("image ready: {}x{}", encoded.width, encoded.height);
                        modal.image = Some(ImagePreview::from_encoded(encoded));
                        modal.image_path.clear();
                    }
                    Err(e) => {
                        tracing::warn!("image processing failed: {}", e);
                        failure = Some(e.to_string());
                    }
                }
            }
            if let Some(message) = failure {
                self.show_notification(message, NotificationLevel::Error);
            }
        }

        self.clear_expired_notification();

        if self.board.today != today() {
            self.refresh_board();
        }
    }

    // ===== 拖放 =====

    /// 拿起当前选中的任务
    pub fn begin_drag(&mut self) -> bool {
        let Some((task_id, status)) = self.selected_card().map(|c| (c.id, c.status)) else {
            return false;
        };
        self.drag = Some(DragState {
            task_id,
            origin: status,
            target: status,
        });
        true
    }

    /// 拖拽时切换目标列
    pub fn move_drag_target(&mut self, delta: isize) {
        if let Some(drag) = self.drag.as_mut() {
            let max = Status::ALL.len() as isize - 1;
            let column = (drag.target.column_index() as isize + delta).clamp(0, max) as usize;
            if let Some(status) = Status::from_column(column) {
                drag.target = status;
            }
        }
    }

    /// 放到目标列
    pub fn drop_dragged(&mut self) -> bool {
        match self.drag {
            Some(drag) => self.drop_on(drag.task_id, drag.target),
            None => false,
        }
    }

    pub fn cancel_drag(&mut self) {
        self.drag = None;
    }

    /// 把任务放到某列；状态未改变时只清除拖拽状态
    pub fn drop_on(&mut self, id: TaskId, status: Status) -> bool {
        self.drag = None;

        match self.store.set_status(id, status) {
            Ok(true) => {
                self.refresh_board();
                self.select_task(id);
                self.show_notification("Status updated", NotificationLevel::Success);
                true
            }
            Ok(false) => false,
            Err(e) => {
                self.report_store_error(e);
                false
            }
        }
    }

    /// 把选中任务移到相邻列
    pub fn move_selected(&mut self, delta: isize) -> bool {
        let Some(card) = self.selected_card() else {
            return false;
        };
        let (id, current) = (card.id, card.status);
        let max = Status::ALL.len() as isize - 1;
        let column = (current.column_index() as isize + delta).clamp(0, max) as usize;
        match Status::from_column(column) {
            Some(target) => self.drop_on(id, target),
            None => false,
        }
    }
}

/// 展开路径开头的 ~
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(dirs) = directories::BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::storage::MemoryStorage;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use tokio::runtime::Runtime;

    struct Harness {
        app: App,
        storage: MemoryStorage,
        // 保持运行时存活
        _runtime: Runtime,
    }

    fn harness() -> Harness {
        let runtime = Runtime::new().unwrap();
        let storage = MemoryStorage::new();
        let store = TaskStore::open(storage.clone());
        let app = App::new(store, Config::default(), runtime.handle().clone());
        Harness {
            app,
            storage,
            _runtime: runtime,
        }
    }

    fn type_text(input: &mut FormInput, text: &str) {
        for c in text.chars() {
            input.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
    }

    fn create_task(app: &mut App, title: &str) -> TaskId {
        app.open_create();
        type_text(&mut app.modal.as_mut().unwrap().title, title);
        assert!(app.submit_modal());
        app.store.all().last().unwrap().id
    }

    fn wait_for_image(app: &mut App) {
        for _ in 0..500 {
            app.poll_background();
            if !app.modal.as_ref().unwrap().image_pending() {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("image job did not finish");
    }

    #[test]
    fn test_open_create_is_blank() {
        let mut h = harness();
        h.app.open_create();

        let modal = h.app.modal.as_ref().unwrap();
        assert_eq!(modal.kind, ModalKind::Creating);
        assert!(modal.title.is_blank());
        assert_eq!(modal.due_date.text(), today().format("%Y-%m-%d").to_string());
        assert!(modal.image.is_none());
        assert!(!modal.is_editing());
        assert_eq!(h.app.mode(), Mode::Modal);
    }

    #[test]
    fn test_submit_empty_title_stays_open() {
        let mut h = harness();
        h.app.open_create();

        assert!(!h.app.submit_modal());
        let modal = h.app.modal.as_ref().unwrap();
        assert_eq!(modal.error.as_deref(), Some("Title is required"));
        assert!(h.app.store.all().is_empty());
        assert_eq!(h.storage.writes(), 0);
    }

    #[test]
    fn test_submit_invalid_date_stays_open() {
        let mut h = harness();
        h.app.open_create();
        let modal = h.app.modal.as_mut().unwrap();
        type_text(&mut modal.title, "a");
        modal.due_date.set_text("tomorrow");

        assert!(!h.app.submit_modal());
        assert!(h.app.modal.as_ref().unwrap().error.is_some());

        h.app.modal.as_mut().unwrap().due_date.clear();
        assert!(!h.app.submit_modal());
        assert_eq!(
            h.app.modal.as_ref().unwrap().error.as_deref(),
            Some("Due date is required")
        );
    }

    #[test]
    fn test_full_scenario() {
        let mut h = harness();
        let done_before = h.app.board.count(Status::Done);

        // 创建
        h.app.open_create();
        let modal = h.app.modal.as_mut().unwrap();
        type_text(&mut modal.title, "Write report");
        modal.priority = Priority::High;
        assert!(h.app.submit_modal());
        assert!(h.app.modal.is_none());
        let id = h.app.store.all()[0].id;
        assert_eq!(h.app.board.count(Status::Todo), 1);
        assert_eq!(h.app.board.count(Status::Done), done_before);
        assert_eq!(h.app.notification.as_ref().unwrap().message, "Task created");

        // 移动到 done
        assert!(h.app.drop_on(id, Status::Done));
        assert_eq!(h.app.board.count(Status::Todo), 0);
        assert_eq!(h.app.board.count(Status::Done), done_before + 1);
        assert_eq!(h.app.store.get(id).unwrap().status, Status::Done);

        // 评论
        assert!(h.app.open_edit(id));
        type_text(&mut h.app.modal.as_mut().unwrap().comment_input, "draft ready");
        assert!(h.app.submit_comment());
        assert_eq!(h.app.modal.as_ref().unwrap().comments.len(), 1);
        assert!(h.app.modal.as_ref().unwrap().comment_input.is_blank());
        assert_eq!(h.app.board.find(id).unwrap().comment_count, 1);

        // 删除
        h.app.request_delete();
        h.app.confirm_delete(true);
        assert!(h.app.modal.is_none());
        assert_eq!(h.app.board.total(), 0);
        assert!(!h.storage.blob().unwrap().contains(&id.to_string()));
        assert_eq!(h.app.notification.as_ref().unwrap().message, "Task deleted");
    }

    #[test]
    fn test_drop_on_same_column_is_noop() {
        let mut h = harness();
        let id = create_task(&mut h.app, "a");
        h.app.notification = None;
        let (writes, renders) = (h.storage.writes(), h.app.renders);

        assert!(h.app.begin_drag());
        assert!(!h.app.drop_dragged());

        assert!(h.app.drag.is_none());
        assert_eq!(h.storage.writes(), writes);
        assert_eq!(h.app.renders, renders);
        assert!(h.app.notification.is_none());
        assert_eq!(h.app.store.get(id).unwrap().status, Status::Todo);
    }

    #[test]
    fn test_repeated_drop_writes_and_renders_once() {
        let mut h = harness();
        let id = create_task(&mut h.app, "a");
        let (writes, renders) = (h.storage.writes(), h.app.renders);

        assert!(h.app.drop_on(id, Status::InProgress));
        assert!(!h.app.drop_on(id, Status::InProgress));

        assert_eq!(h.storage.writes(), writes + 1);
        assert_eq!(h.app.renders, renders + 1);
    }

    #[test]
    fn test_drag_to_other_column() {
        let mut h = harness();
        let id = create_task(&mut h.app, "a");

        assert!(h.app.begin_drag());
        h.app.move_drag_target(1);
        h.app.move_drag_target(1);
        h.app.move_drag_target(1);
        assert_eq!(h.app.drag.unwrap().target, Status::Done);
        assert!(h.app.drop_dragged());

        assert_eq!(h.app.store.get(id).unwrap().status, Status::Done);
        assert_eq!(h.app.selected_column, Status::Done.column_index());
        assert_eq!(h.app.notification.as_ref().unwrap().message, "Status updated");
    }

    #[test]
    fn test_cancel_discards_edits() {
        let mut h = harness();
        let id = create_task(&mut h.app, "original");
        let writes = h.storage.writes();

        assert!(h.app.open_edit(id));
        h.app.modal.as_mut().unwrap().title.set_text("changed");
        h.app.close_modal();

        assert_eq!(h.app.store.get(id).unwrap().title, "original");
        assert_eq!(h.storage.writes(), writes);
    }

    #[test]
    fn test_edit_updates_task() {
        let mut h = harness();
        let id = create_task(&mut h.app, "original");

        assert!(h.app.open_edit(id));
        let modal = h.app.modal.as_mut().unwrap();
        assert!(modal.is_editing());
        modal.title.set_text("renamed");
        modal.priority = Priority::Low;
        assert!(h.app.submit_modal());

        let task = h.app.store.get(id).unwrap();
        assert_eq!(task.title, "renamed");
        assert_eq!(task.priority, Priority::Low);
        assert_eq!(h.app.notification.as_ref().unwrap().message, "Task updated");
    }

    #[test]
    fn test_open_edit_unknown_id() {
        let mut h = harness();
        assert!(!h.app.open_edit(12345));
        assert!(h.app.modal.is_none());
    }

    #[test]
    fn test_refused_delete_stays_editing() {
        let mut h = harness();
        let id = create_task(&mut h.app, "keep me");

        assert!(h.app.open_edit(id));
        h.app.request_delete();
        assert!(h.app.modal.as_ref().unwrap().confirm_delete);
        h.app.confirm_delete(false);

        let modal = h.app.modal.as_ref().unwrap();
        assert_eq!(modal.kind, ModalKind::Editing(id));
        assert!(!modal.confirm_delete);
        assert!(h.app.store.get(id).is_some());
    }

    #[test]
    fn test_delete_not_offered_when_creating() {
        let mut h = harness();
        h.app.open_create();
        h.app.request_delete();
        assert!(!h.app.modal.as_ref().unwrap().confirm_delete);
    }

    #[test]
    fn test_comment_requires_text() {
        let mut h = harness();
        let id = create_task(&mut h.app, "a");
        assert!(h.app.open_edit(id));
        type_text(&mut h.app.modal.as_mut().unwrap().comment_input, "   ");

        assert!(!h.app.submit_comment());
        assert!(h.app.store.get(id).unwrap().comments.is_empty());
    }

    #[test]
    fn test_attach_image_and_submit() {
        let mut h = harness();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("wide.png");
        DynamicImage::ImageRgb8(RgbImage::from_pixel(1200, 600, Rgb([200, 10, 10])))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        h.app.open_create();
        let modal = h.app.modal.as_mut().unwrap();
        type_text(&mut modal.title, "with picture");
        modal.image_path.set_text(path.to_str().unwrap());
        assert!(h.app.attach_image());

        wait_for_image(&mut h.app);
        let modal = h.app.modal.as_ref().unwrap();
        assert!(modal.image.as_ref().unwrap().summary.starts_with("800x400"));

        assert!(h.app.submit_modal());
        let task = &h.app.store.all()[0];
        assert!(task.image.as_ref().unwrap().starts_with("data:image/jpeg;base64,"));
        assert!(h.app.board.find(task.id).unwrap().has_image);
    }

    #[test]
    fn test_submit_blocked_while_image_pending() {
        let mut h = harness();
        h.app.open_create();
        let modal = h.app.modal.as_mut().unwrap();
        type_text(&mut modal.title, "a");
        modal.pending_image = Some(ImageJob::spawn(
            &h.app.runtime,
            vec![1, 2, 3],
            h.app.config.codec_options(),
        ));

        assert!(!h.app.submit_modal());
        assert_eq!(
            h.app.modal.as_ref().unwrap().error.as_deref(),
            Some("Image still processing")
        );
        assert!(h.app.store.all().is_empty());
    }

    #[test]
    fn test_bad_image_keeps_previous_attachment() {
        let mut h = harness();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();

        h.app.open_create();
        let modal = h.app.modal.as_mut().unwrap();
        modal.image = Some(ImagePreview::from_data_uri("data:image/jpeg;base64,AAAA".to_string()));
        modal.image_path.set_text(path.to_str().unwrap());
        assert!(h.app.attach_image());

        wait_for_image(&mut h.app);
        let modal = h.app.modal.as_ref().unwrap();
        assert_eq!(modal.image.as_ref().unwrap().data_uri, "data:image/jpeg;base64,AAAA");
        assert_eq!(h.app.notification.as_ref().unwrap().level, NotificationLevel::Error);
    }

    #[test]
    fn test_attach_missing_file() {
        let mut h = harness();
        h.app.open_create();
        h.app.modal.as_mut().unwrap().image_path.set_text("/no/such/file.png");

        assert!(!h.app.attach_image());
        let modal = h.app.modal.as_ref().unwrap();
        assert!(modal.error.is_some());
        assert!(!modal.image_pending());
    }

    #[test]
    fn test_remove_image() {
        let mut h = harness();
        h.app.open_create();
        let modal = h.app.modal.as_mut().unwrap();
        modal.image = Some(ImagePreview::from_data_uri("data:image/jpeg;base64,AAAA".to_string()));
        h.app.remove_image();
        assert!(h.app.modal.as_ref().unwrap().image.is_none());
    }

    #[test]
    fn test_focus_cycles_through_fields() {
        let mut h = harness();
        h.app.open_create();
        let modal = h.app.modal.as_mut().unwrap();

        let start = modal.focus;
        for _ in 0..5 {
            modal.focus_next();
        }
        assert_eq!(modal.focus, start);
        modal.focus_prev();
        assert_eq!(modal.focus, FormField::Image);
    }

    #[test]
    fn test_persist_failure_is_reported() {
        let mut h = harness();
        let id = create_task(&mut h.app, "a");
        h.storage.set_fail_writes(true);

        assert!(!h.app.drop_on(id, Status::Done));
        assert_eq!(h.app.store.get(id).unwrap().status, Status::Todo);
        assert_eq!(h.app.notification.as_ref().unwrap().level, NotificationLevel::Error);
    }

    #[test]
    fn test_delete_of_vanished_task_is_silent() {
        let mut h = harness();
        let id = create_task(&mut h.app, "gone");
        h.app.notification = None;

        assert!(h.app.open_edit(id));
        assert!(h.app.store.remove(id).unwrap());
        h.app.request_delete();
        h.app.confirm_delete(true);

        assert!(h.app.modal.is_none());
        assert!(h.app.notification.is_none());
        assert_eq!(h.app.board.total(), 0);
    }

    #[test]
    fn test_closing_modal_cancels_image_job() {
        // 单线程运行时在 block_on 之前不会执行任务
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let storage = MemoryStorage::new();
        let store = TaskStore::open(storage.clone());
        let mut app = App::new(store, Config::default(), runtime.handle().clone());

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("photo.png");
        // 足够大，未取消的任务不可能在几次 yield 内完成
        DynamicImage::ImageRgb8(RgbImage::from_pixel(3000, 2000, Rgb([10, 200, 10])))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        app.open_create();
        app.modal.as_mut().unwrap().image_path.set_text(path.to_str().unwrap());
        assert!(app.attach_image());
        let abort = app
            .modal
            .as_ref()
            .and_then(|m| m.pending_image.as_ref())
            .unwrap()
            .abort_handle();

        app.close_modal();
        for _ in 0..100 {
            if abort.is_finished() {
                break;
            }
            runtime.block_on(tokio::task::yield_now());
        }
        assert!(abort.is_finished());

        app.open_create();
        app.poll_background();
        assert!(app.modal.as_ref().unwrap().image.is_none());
        assert!(app.notification.is_none());
        assert_eq!(storage.writes(), 0);
    }

    #[test]
    fn test_date_change_reprojects_board() {
        let mut h = harness();
        let id = create_task(&mut h.app, "due today");
        h.app.board.today = today().pred_opt().unwrap();
        let renders = h.app.renders;

        h.app.poll_background();
        assert_eq!(h.app.renders, renders + 1);
        assert_eq!(h.app.board.today, today());
        assert!(!h.app.board.find(id).unwrap().overdue);

        h.app.poll_background();
        assert_eq!(h.app.renders, renders + 1);
    }

    #[test]
    fn test_description_newlines_survive_edit() {
        let mut h = harness();
        h.app.open_create();
        let modal = h.app.modal.as_mut().unwrap();
        type_text(&mut modal.title, "notes");
        modal.description.set_text("first\n\nlast\n");
        assert!(h.app.submit_modal());
        let id = h.app.store.all()[0].id;

        assert!(h.app.open_edit(id));
        assert!(h.app.submit_modal());
        assert_eq!(h.app.store.get(id).unwrap().description, "first\n\nlast\n");
    }

    #[test]
    fn test_navigation_clamps() {
        let mut h = harness();
        create_task(&mut h.app, "a");
        create_task(&mut h.app, "b");

        h.app.select_column(-5);
        assert_eq!(h.app.selected_column, 0);
        h.app.select_task_offset(10);
        assert_eq!(h.app.selected_task_index, 1);
        h.app.select_first_task();
        assert_eq!(h.app.selected_card().unwrap().title, "a");

        h.app.select_column(1);
        assert!(h.app.selected_card().is_none());
        assert!(!h.app.begin_drag());
    }
}
