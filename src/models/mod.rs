pub mod status;
pub mod task;

pub use status::{Priority, Status};
pub use task::{Comment, CommentId, Task, TaskDraft, TaskId, ValidationError};
