/// 应用命令枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    // ===== 退出 =====
    Quit,

    // ===== 导航 =====
    /// 选择上一个任务
    TaskUp,
    /// 选择下一个任务
    TaskDown,
    /// 跳到列首
    TaskFirst,
    /// 跳到列尾
    TaskLast,
    /// 切换到左边的列
    ColumnLeft,
    /// 切换到右边的列
    ColumnRight,

    // ===== 任务操作 =====
    /// 创建新任务
    NewTask,
    /// 编辑当前任务
    EditTask,
    /// 删除当前任务（打开编辑表单并请求确认）
    DeleteTask,
    /// 拿起当前任务（拖拽）
    PickUpTask,
    /// 将任务移到左边的状态列
    MoveTaskLeft,
    /// 将任务移到右边的状态列
    MoveTaskRight,

    // ===== 模式切换 =====
    /// 显示帮助
    ShowHelp,
}
