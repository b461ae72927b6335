//! The phase orchestrator: drives Try-all -> Confirm-all, and on any
//! failure, Cancel-reverse-prefix.

use std::sync::Arc;

use serde_json::{json, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use tcc_db::models::Phase;

use crate::component::ComponentRegistry;
use crate::error::TccError;
use crate::flow::Flow;
use crate::retry::try_with_retry;
use crate::store::RecordStore;
use crate::task::TaskInstance;

/// Terminal outcome of a transaction that completed without error.
///
/// An aborted or failed transaction is never returned as `Ok` -- it
/// still reached a terminal durable phase, but `ExecuteTransaction`
/// surfaces it as an [`OrchestratorError`] since the caller's intended
/// effect did not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    Committed,
}

/// A failed or interrupted transaction, carrying the id so the caller can
/// still look it up even though execution did not reach a clean outcome.
#[derive(Debug, Error)]
#[error("transaction {tx_id} failed: {source}")]
pub struct OrchestratorError {
    pub tx_id: Uuid,
    #[source]
    pub source: TccError,
}

/// Drives one transaction from task construction through Try, Confirm (or
/// Cancel), to a terminal phase.
///
/// Each call to [`Self::execute_transaction`] runs on its own task and may
/// run concurrently with other transactions; within one call, phases and
/// the actions within a phase are strictly sequential.
pub struct PhaseOrchestrator {
    registry: Arc<ComponentRegistry>,
    store: Arc<dyn RecordStore>,
}

impl PhaseOrchestrator {
    pub fn new(registry: Arc<ComponentRegistry>, store: Arc<dyn RecordStore>) -> Self {
        Self { registry, store }
    }

    /// Build, Try, and either Confirm or Cancel every action of `flow`.
    ///
    /// Returns the generated transaction id together with either its
    /// terminal outcome or the error that aborted or failed it -- the id
    /// is always available so the caller can inspect the durable record
    /// even when execution did not succeed.
    pub async fn execute_transaction(
        &self,
        flow: &Flow,
        params: Value,
        cancel: CancellationToken,
    ) -> (Uuid, Result<TransactionOutcome, OrchestratorError>) {
        let tx_id = crate::id::new_id();
        let payload = if params.is_null() { json!({}) } else { params };

        tracing::info!(tx_id = %tx_id, flow = %flow.name, "starting transaction");

        let result = self.run(tx_id, flow, &payload, &cancel).await;
        (tx_id, result)
    }

    async fn run(
        &self,
        tx_id: Uuid,
        flow: &Flow,
        payload: &Value,
        cancel: &CancellationToken,
    ) -> Result<TransactionOutcome, OrchestratorError> {
        // 4. Build phase: factory -> Prepare -> Validate for every action.
        // A build failure is pre-transactional: no durable record exists yet.
        let mut tasks = Vec::with_capacity(flow.actions.len());
        for action in &flow.actions {
            let component = self
                .registry
                .build(&action.component, &action.config)
                .await
                .map_err(|e| OrchestratorError {
                    tx_id,
                    source: TccError::Build {
                        action_id: action.id.clone(),
                        source: e.into(),
                    },
                })?;

            component.validate().await.map_err(|e| OrchestratorError {
                tx_id,
                source: TccError::Build {
                    action_id: action.id.clone(),
                    source: e,
                },
            })?;

            tasks.push(TaskInstance::new(action.id.clone(), component, payload.clone()));
        }

        // 5. Write the initial record, all tasks pending.
        let snapshots: Vec<_> = tasks.iter().map(TaskInstance::snapshot).collect();
        if let Err(e) = self.store.create(tx_id, &flow.name, &snapshots).await {
            tracing::warn!(tx_id = %tx_id, error = %e, "failed to write initial transaction record");
        }

        // 6. Try phase.
        let mut tried = Vec::with_capacity(tasks.len());
        let mut try_error = None;
        for (idx, task) in tasks.iter_mut().enumerate() {
            let action = &flow.actions[idx];
            let policy = flow.resolve_retry_policy(action);

            match try_with_retry(task, policy, tx_id, payload, cancel).await {
                Ok(()) => tried.push(idx),
                Err(e) => {
                    try_error = Some(e);
                }
            }
            self.persist_task_state(tx_id, task).await;
            if try_error.is_some() {
                break;
            }
        }

        if let Some(source) = try_error {
            tracing::warn!(tx_id = %tx_id, error = %source, "try phase failed, compensating");
            self.transition(tx_id, Phase::Cancelling).await;
            let reverse_tried: Vec<usize> = tried.into_iter().rev().collect();
            self.compensate(tx_id, &mut tasks, &reverse_tried).await;
            self.transition(tx_id, Phase::Aborted).await;
            return Err(OrchestratorError { tx_id, source });
        }

        // 7. Confirm phase.
        self.transition(tx_id, Phase::Confirming).await;
        let mut confirm_error = None;
        for task in tasks.iter_mut() {
            match task.component.confirm(tx_id).await {
                Ok(()) => {
                    task.status = tcc_db::models::TaskRunStatus::Confirmed;
                }
                Err(e) => {
                    confirm_error = Some(TccError::Confirm {
                        action_id: task.action_id.clone(),
                        source: e,
                    });
                }
            }
            self.persist_task_state(tx_id, task).await;
            if confirm_error.is_some() {
                break;
            }
        }

        if let Some(source) = confirm_error {
            tracing::error!(tx_id = %tx_id, error = %source, "confirm failed, compensating full task set");
            self.transition(tx_id, Phase::Cancelling).await;
            let all_reversed: Vec<usize> = (0..tasks.len()).rev().collect();
            self.compensate(tx_id, &mut tasks, &all_reversed).await;
            self.transition(tx_id, Phase::Failed).await;
            return Err(OrchestratorError { tx_id, source });
        }

        self.transition(tx_id, Phase::Committed).await;

        // The context may have been cancelled during Confirm; Confirm
        // itself is never aborted mid-iteration (to avoid split state),
        // but the cancellation is still surfaced to the caller once the
        // phase completes.
        if cancel.is_cancelled() {
            tracing::warn!(tx_id = %tx_id, "transaction committed but caller context was cancelled during confirm");
            return Err(OrchestratorError {
                tx_id,
                source: TccError::ContextCancelled,
            });
        }

        tracing::info!(tx_id = %tx_id, "transaction committed");
        Ok(TransactionOutcome::Committed)
    }


    /// Cancel the tasks named by `order` (already in the order they
    /// should be cancelled). Non-compensable components raise an alert
    /// instead of being cancelled; cancel failures are logged and do not
    /// stop iteration over the remaining tasks.
    async fn compensate(&self, tx_id: Uuid, tasks: &mut [TaskInstance], order: &[usize]) {
        for &idx in order {
            let task = &mut tasks[idx];

            if !task.component.supports_compensation() {
                let alert = TccError::UnsupportedCompensation {
                    action_id: task.action_id.clone(),
                };
                tracing::error!(tx_id = %tx_id, error = %alert, "manual intervention required");
                task.error_msg = Some(alert.to_string());
                continue;
            }

            match task.component.cancel(tx_id).await {
                Ok(()) => {
                    task.status = tcc_db::models::TaskRunStatus::Cancelled;
                    task.error_msg = None;
                }
                Err(source) => {
                    let alert = TccError::Cancel {
                        action_id: task.action_id.clone(),
                        source,
                    };
                    tracing::error!(tx_id = %tx_id, error = %alert, "alert");
                    task.error_msg = Some(alert.to_string());
                }
            }

            self.persist_task_state(tx_id, task).await;
        }
    }

    async fn transition(&self, tx_id: Uuid, phase: Phase) {
        if let Err(e) = self.store.update_phase(tx_id, phase).await {
            tracing::warn!(tx_id = %tx_id, %phase, error = %e, "failed to persist phase transition");
        }
    }

    async fn persist_task_state(&self, tx_id: Uuid, task: &TaskInstance) {
        if let Err(e) = self.store.update_task_state(tx_id, task.snapshot()).await {
            tracing::warn!(
                tx_id = %tx_id,
                action_id = %task.action_id,
                error = %e,
                "failed to persist task state"
            );
        }
    }
}
