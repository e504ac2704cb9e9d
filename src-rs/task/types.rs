use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{TaskError, TaskResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(TaskStatus::Pending),
            "RUNNING" => Ok(TaskStatus::Running),
            "COMPLETED" => Ok(TaskStatus::Completed),
            "FAILED" => Ok(TaskStatus::Failed),
            // both spellings show up in clients
            "CANCELLED" | "CANCELED" => Ok(TaskStatus::Cancelled),
            other => Err(format!("unknown task status: {}", other)),
        }
    }
}

/// One unit of background work.
///
/// Values of this type are always copies: the store hands out clones and takes
/// clones back, so changing a `Task` only matters once it is passed to an
/// explicit update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl Task {
    pub fn new_pending(id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            created_at: now,
            started_at: None,
            ended_at: None,
            duration: None,
            status: TaskStatus::Pending,
            result: None,
        }
    }

    /// `Pending -> Running`. Sets `started_at`.
    pub fn mark_running(&mut self, now: DateTime<Utc>) -> TaskResult<()> {
        if self.status != TaskStatus::Pending {
            return Err(self.invalid(TaskStatus::Running));
        }
        self.status = TaskStatus::Running;
        self.started_at = Some(now);
        Ok(())
    }

    /// `Running -> terminal`. Sets `ended_at`, `duration` and `result` once.
    pub fn mark_finished(
        &mut self,
        status: TaskStatus,
        result: &str,
        now: DateTime<Utc>,
    ) -> TaskResult<()> {
        if self.status != TaskStatus::Running || !status.is_terminal() {
            return Err(self.invalid(status));
        }
        let started_at = match self.started_at {
            Some(started_at) => started_at,
            None => return Err(self.invalid(status)),
        };
        self.status = status;
        self.ended_at = Some(now);
        self.duration = Some(format_duration(started_at, now));
        self.result = Some(result.to_string());
        Ok(())
    }

    pub fn to_list_item(&self) -> TaskListItem {
        TaskListItem {
            id: self.id.clone(),
            status: self.status,
            duration: if self.status.is_terminal() {
                self.duration.clone()
            } else {
                None
            },
        }
    }

    fn invalid(&self, to: TaskStatus) -> TaskError {
        TaskError::InvalidTransition {
            id: self.id.clone(),
            from: self.status,
            to,
        }
    }
}

/// Reduced shape used by the list view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskListItem {
    pub id: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

pub fn format_duration(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    // clock went backwards: report zero rather than a negative span
    let elapsed = (end - start).to_std().unwrap_or_default();
    format!("{:?}", elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn status_round_trips_through_wire_names() {
        let json = serde_json::to_string(&TaskStatus::Cancelled).unwrap();
        assert_eq!(json, "\"CANCELLED\"");
        assert_eq!("canceled".parse::<TaskStatus>(), Ok(TaskStatus::Cancelled));
        assert_eq!(" running ".parse::<TaskStatus>(), Ok(TaskStatus::Running));
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn lifecycle_sets_timestamps_once() {
        let now = Utc::now();
        let mut task = Task::new_pending("t1", now);
        assert!(task.started_at.is_none());

        task.mark_running(now + Duration::milliseconds(5)).unwrap();
        assert_eq!(task.status, TaskStatus::Running);
        assert_eq!(task.started_at, Some(now + Duration::milliseconds(5)));

        let end = now + Duration::milliseconds(205);
        task.mark_finished(TaskStatus::Completed, "OK", end).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.ended_at, Some(end));
        assert_eq!(task.duration.as_deref(), Some("200ms"));
        assert_eq!(task.result.as_deref(), Some("OK"));
    }

    #[test]
    fn terminal_state_is_final() {
        let now = Utc::now();
        let mut task = Task::new_pending("t2", now);
        task.mark_running(now).unwrap();
        task.mark_finished(TaskStatus::Cancelled, "Canceled", now).unwrap();

        let err = task
            .mark_finished(TaskStatus::Completed, "OK", now)
            .unwrap_err();
        assert_eq!(
            err,
            TaskError::InvalidTransition {
                id: "t2".to_string(),
                from: TaskStatus::Cancelled,
                to: TaskStatus::Completed,
            }
        );
        assert!(task.mark_running(now).is_err());
        assert_eq!(task.result.as_deref(), Some("Canceled"));
    }

    #[test]
    fn cannot_finish_a_pending_task() {
        let mut task = Task::new_pending("t3", Utc::now());
        assert!(task
            .mark_finished(TaskStatus::Completed, "OK", Utc::now())
            .is_err());
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn pending_task_omits_unset_fields() {
        let task = Task::new_pending("t4", Utc::now());
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["status"], "PENDING");
        assert!(value.get("started_at").is_none());
        assert!(value.get("ended_at").is_none());
        assert!(value.get("duration").is_none());
        assert!(value.get("result").is_none());
    }

    #[test]
    fn list_item_only_carries_duration_when_terminal() {
        let now = Utc::now();
        let mut task = Task::new_pending("t5", now);
        task.mark_running(now).unwrap();
        assert_eq!(task.to_list_item().duration, None);

        task.mark_finished(TaskStatus::Completed, "OK", now + Duration::seconds(1))
            .unwrap();
        let item = task.to_list_item();
        assert_eq!(item.status, TaskStatus::Completed);
        assert_eq!(item.duration.as_deref(), Some("1s"));
    }
}
