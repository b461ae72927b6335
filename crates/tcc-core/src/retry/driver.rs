//! Wraps a task's `Try` call in an attempt loop with backoff and
//! cancellation.
//!
//! Retry is per-task and per-Try only: this driver is never used for
//! Confirm or Cancel, which the phase orchestrator retries (at most once
//! each) across its own compensation pass.

use anyhow::anyhow;
use chrono::Utc;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use tcc_db::models::TaskRunStatus;

use crate::component::TryRequest;
use crate::error::TccError;
use crate::flow::RetryPolicy;
use crate::retry::backoff::calculate_delay;
use crate::task::TaskInstance;

/// Drive `task`'s Try call to success or exhaustion.
///
/// `policy` is the resolved retry policy for this task's action, or
/// `None` when the action named no policy (treated as `max_attempts = 1`,
/// no backoff).
pub async fn try_with_retry(
    task: &mut TaskInstance,
    policy: Option<&RetryPolicy>,
    tx_id: Uuid,
    payload: &Value,
    cancel: &CancellationToken,
) -> Result<(), TccError> {
    let max_attempts = policy.map(|p| p.max_attempts).unwrap_or(1).max(1);

    for attempt in 0..max_attempts {
        task.try_times = attempt + 1;
        task.status = TaskRunStatus::Executing;

        tracing::debug!(
            task_id = %task.task_id,
            action_id = %task.action_id,
            attempt = task.try_times,
            "calling try"
        );

        let req = TryRequest {
            tx_id,
            payload: payload.clone(),
        };

        let outcome = task.component.try_action(&req).await;

        let error_message = match outcome {
            Ok(resp) if resp.success => {
                task.output = resp.result;
                task.status = TaskRunStatus::Success;
                task.error_msg = None;
                return Ok(());
            }
            Ok(resp) => resp
                .error
                .unwrap_or_else(|| "try returned success=false".to_string()),
            Err(e) => e.to_string(),
        };

        task.error_msg = Some(error_message.clone());

        let is_last_attempt = attempt + 1 == max_attempts;
        if is_last_attempt {
            task.status = TaskRunStatus::Failed;
            return Err(TccError::PermanentTry {
                action_id: task.action_id.clone(),
                attempts: task.try_times,
                source: anyhow!(error_message),
            });
        }

        tracing::warn!(
            task_id = %task.task_id,
            action_id = %task.action_id,
            attempt = task.try_times,
            error = %error_message,
            "try failed, retrying"
        );

        task.status = TaskRunStatus::Retrying;
        let delay = match policy {
            Some(p) => calculate_delay(p, attempt),
            None => std::time::Duration::ZERO,
        };
        task.next_retry_at = chrono::Duration::from_std(delay)
            .ok()
            .map(|d| Utc::now() + d);

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => {
                return Err(TccError::ContextCancelled);
            }
        }
    }

    unreachable!("max_attempts is at least 1, so the loop above always returns")
}
