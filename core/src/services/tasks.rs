//! Server-side tasks tracking long-running operations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::client::{Client, RequestOptions};
use crate::context::Context;
use crate::error::ApiError;
use crate::filter::TaskFilter;
use crate::pagination::Page;

/// Lifecycle of a task: `pending`/`queued` → `running` → one of the
/// terminal states. Statuses this client does not know are kept as
/// `Unknown` and treated as not finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Queued,
    Running,
    Done,
    DoneWithErrors,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Done | TaskStatus::DoneWithErrors | TaskStatus::Failed | TaskStatus::Canceled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Done => "done",
            TaskStatus::DoneWithErrors => "done_with_errors",
            TaskStatus::Failed => "failed",
            TaskStatus::Canceled => "canceled",
            TaskStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of operation a task performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskAction {
    #[serde(rename = "vm-create")]
    ServerCreate,
    #[serde(rename = "vm-reinstall")]
    ServerReinstall,
    #[serde(rename = "vm-delete")]
    ServerDelete,
    #[serde(rename = "vm-update")]
    ServerUpdate,
    #[serde(rename = "vm-password-change")]
    ServerPasswordChange,
    #[serde(rename = "vm-start")]
    ServerStart,
    #[serde(rename = "vm-stop")]
    ServerStop,
    #[serde(rename = "vm-restart")]
    ServerRestart,
    #[serde(rename = "vm-suspend")]
    ServerSuspend,
    #[serde(rename = "vm-resume")]
    ServerResume,
    #[serde(rename = "vm-resize")]
    ServerResize,
    #[serde(rename = "vms-migrate")]
    ServersMigrate,
    #[serde(rename = "vm-migrate")]
    ServerMigrate,
    #[serde(rename = "snapshot-create")]
    SnapshotCreate,
    #[serde(rename = "snapshot-delete")]
    SnapshotDelete,
    #[serde(rename = "snapshot-revert")]
    SnapshotRevert,
    #[serde(rename = "backup-create")]
    BackupCreate,
    #[serde(rename = "backup-restore")]
    BackupRestore,
    #[serde(rename = "backup-delete")]
    BackupDelete,
    #[serde(rename = "change hostname")]
    ChangeHostname,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    pub id: u64,
    pub compute_resource_id: u64,
    pub queue: String,
    pub action: TaskAction,
    pub status: TaskStatus,
    pub output: String,
    pub progress: u32,
    pub duration: u64,
}

impl Task {
    /// True once the task reached a terminal status, successful or not.
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_successful(&self) -> bool {
        self.status == TaskStatus::Done
    }
}

pub struct TasksService<'c> {
    client: &'c Client,
}

impl<'c> TasksService<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    pub fn get(&self, ctx: &Context, id: u64) -> Result<Task, ApiError> {
        self.client.get(ctx, &format!("tasks/{id}"))
    }

    pub fn list(&self, ctx: &Context, filter: TaskFilter) -> Result<Page<'c, Task>, ApiError> {
        self.client
            .list(ctx, "tasks", &RequestOptions::new().with_filter(filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(status: TaskStatus) -> Task {
        Task {
            id: 1,
            status,
            ..Task::default()
        }
    }

    #[test]
    fn terminal_statuses_are_finished() {
        for status in [
            TaskStatus::Done,
            TaskStatus::DoneWithErrors,
            TaskStatus::Failed,
            TaskStatus::Canceled,
        ] {
            assert!(task(status).is_finished(), "{status}");
        }
    }

    #[test]
    fn active_statuses_are_not_finished() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::Queued,
            TaskStatus::Running,
            TaskStatus::Unknown,
        ] {
            assert!(!task(status).is_finished(), "{status}");
        }
    }

    #[test]
    fn decodes_task_json() {
        let t: Task = serde_json::from_str(
            r#"{"id":42,"compute_resource_id":3,"queue":"vm","action":"vm-delete","status":"done_with_errors","output":"disk busy","progress":100,"duration":12}"#,
        )
        .unwrap();
        assert_eq!(t.id, 42);
        assert_eq!(t.action, TaskAction::ServerDelete);
        assert_eq!(t.status, TaskStatus::DoneWithErrors);
        assert!(t.is_finished());
        assert!(!t.is_successful());
    }

    #[test]
    fn unknown_values_do_not_fail_decoding() {
        let t: Task = serde_json::from_str(r#"{"id":5,"action":"configure network","status":"paused"}"#).unwrap();
        assert_eq!(t.action, TaskAction::Other);
        assert_eq!(t.status, TaskStatus::Unknown);
    }
}
