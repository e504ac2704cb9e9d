pub mod config;
pub mod error;
pub mod helpers;

#[path = "task/lib.rs"]
pub mod task;
#[path = "api/lib.rs"]
pub mod api;

pub use config::TrackerConfig;
pub use error::{ServerError, TaskError, TaskResult};
pub use task::{Task, TaskManager, TaskStatus, TaskStore};
