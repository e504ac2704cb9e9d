pub mod manager;
pub mod store;
pub mod types;

pub use manager::{TaskManager, RESULT_CANCELED, RESULT_OK};
pub use store::{TaskRepository, TaskStore, DEFAULT_SHARDS};
pub use types::{format_duration, Task, TaskListItem, TaskStatus};
