//! Runtime record of one action within one transaction.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use tcc_db::models::{TaskRunStatus, TaskStateSnapshot};

use crate::component::Component;

/// Mutable, in-memory state for one action's execution within one
/// transaction.
///
/// Owned exclusively by the orchestrator driving its transaction;
/// created when the task list is built and dropped once the transaction
/// terminates, after the durable record has been flushed.
pub struct TaskInstance {
    pub task_id: Uuid,
    pub action_id: String,
    pub component: Box<dyn Component>,
    pub input: Value,
    pub output: Option<Value>,
    pub try_times: u32,
    pub status: TaskRunStatus,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub error_msg: Option<String>,
}

impl TaskInstance {
    pub fn new(action_id: impl Into<String>, component: Box<dyn Component>, input: Value) -> Self {
        Self {
            task_id: crate::id::new_id(),
            action_id: action_id.into(),
            component,
            input,
            output: None,
            try_times: 0,
            status: TaskRunStatus::Pending,
            next_retry_at: None,
            error_msg: None,
        }
    }

    /// Project this task's durable-relevant fields into the snapshot
    /// shape written to the transaction record.
    pub fn snapshot(&self) -> TaskStateSnapshot {
        TaskStateSnapshot {
            action_id: self.action_id.clone(),
            status: self.status,
            try_times: self.try_times as i32,
            error_msg: self.error_msg.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{TryRequest, TryResponse};
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct StubComponent;

    #[async_trait]
    impl Component for StubComponent {
        fn id(&self) -> &str {
            "stub"
        }
        async fn prepare(&mut self, _cfg: &HashMap<String, Value>) -> anyhow::Result<()> {
            Ok(())
        }
        async fn validate(&self) -> anyhow::Result<()> {
            Ok(())
        }
        async fn try_action(&self, _req: &TryRequest) -> anyhow::Result<TryResponse> {
            Ok(TryResponse::ok(Value::Null))
        }
        async fn confirm(&self, _tx_id: Uuid) -> anyhow::Result<()> {
            Ok(())
        }
        async fn cancel(&self, _tx_id: Uuid) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn new_task_starts_pending() {
        let task = TaskInstance::new("a1", Box::new(StubComponent), Value::Null);
        assert_eq!(task.status, TaskRunStatus::Pending);
        assert_eq!(task.try_times, 0);
        assert!(task.output.is_none());
    }

    #[test]
    fn snapshot_reflects_current_state() {
        let mut task = TaskInstance::new("a1", Box::new(StubComponent), Value::Null);
        task.try_times = 2;
        task.status = TaskRunStatus::Retrying;
        task.error_msg = Some("timeout".into());

        let snap = task.snapshot();
        assert_eq!(snap.action_id, "a1");
        assert_eq!(snap.try_times, 2);
        assert_eq!(snap.status, TaskRunStatus::Retrying);
        assert_eq!(snap.error_msg.as_deref(), Some("timeout"));
    }
}
