pub use crate::config::TrackerConfig;
pub use crate::task::{Task, TaskListItem, TaskManager, TaskStatus, TaskStore};

pub mod handlers;
pub mod server;

pub use server::{router, TrackerServer};
