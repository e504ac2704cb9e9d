use thiserror::Error;

use crate::task::TaskStatus;

/// Errors returned by the task store and the lifecycle manager.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("task not found: {id}")]
    NotFound { id: String },

    #[error("task already exists: {id}")]
    AlreadyExists { id: String },

    #[error("task {id}: invalid transition {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: TaskStatus,
        to: TaskStatus,
    },
}

impl TaskError {
    pub fn not_found(id: &str) -> Self {
        TaskError::NotFound { id: id.to_string() }
    }

    pub fn already_exists(id: &str) -> Self {
        TaskError::AlreadyExists { id: id.to_string() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TaskError::NotFound { .. })
    }
}

pub type TaskResult<T> = Result<T, TaskError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: hyper::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] hyper::Error),

    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
