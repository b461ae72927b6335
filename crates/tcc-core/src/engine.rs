//! The engine facade: composes a flow loader, component registry, and
//! record store behind a single `execute_transaction` entry point.
//!
//! This is the seam a binary (`tcc-cli`) or an embedding application
//! wires up once at startup and then calls repeatedly; the phase
//! orchestrator it delegates to is stateless between calls.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::component::ComponentRegistry;
use crate::loader::{FlowLoader, LoaderError};
use crate::orchestrator::{OrchestratorError, PhaseOrchestrator, TransactionOutcome};
use crate::store::RecordStore;

/// Everything that can go wrong calling [`Engine::execute_transaction`],
/// distinguishing a pre-transactional load failure (no `tx_id` exists
/// yet) from an orchestrator failure (a `tx_id` was generated and a
/// durable record may exist).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The flow could not be resolved; no transaction was ever started.
    #[error("failed to load flow {flow_id:?}: {source}")]
    Load {
        flow_id: String,
        #[source]
        source: LoaderError,
    },

    /// The flow failed `Flow::validate` at load time (an action's retry
    /// policy reference must resolve).
    #[error("flow {flow_id:?} is invalid: {source}")]
    Invalid {
        flow_id: String,
        #[source]
        source: crate::flow::FlowValidationError,
    },

    /// The orchestrator ran and did not reach a committed outcome.
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

/// Composes a [`FlowLoader`], [`ComponentRegistry`], and [`RecordStore`]
/// into the engine's single public operation:
/// `ExecuteTransaction(flowID, params) -> (txID, error)`.
pub struct Engine {
    loader: Arc<dyn FlowLoader>,
    registry: Arc<ComponentRegistry>,
    store: Arc<dyn RecordStore>,
}

impl Engine {
    pub fn new(
        loader: Arc<dyn FlowLoader>,
        registry: Arc<ComponentRegistry>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            loader,
            registry,
            store,
        }
    }

    /// Resolve `flow_id` through the loader, validate it, then drive it
    /// to completion through the phase orchestrator.
    ///
    /// Returns `Err` without a `tx_id` only when the flow itself could
    /// not be loaded or failed validation -- no durable record is written
    /// for a load failure. Once a `tx_id` has
    /// been generated (inside the orchestrator), every error variant
    /// carries it so the caller can still inspect the durable record.
    pub async fn execute_transaction(
        &self,
        flow_id: &str,
        params: Value,
        cancel: CancellationToken,
    ) -> Result<Uuid, EngineError> {
        let flow = self
            .loader
            .load(flow_id)
            .await
            .map_err(|source| EngineError::Load {
                flow_id: flow_id.to_string(),
                source,
            })?;

        flow.validate().map_err(|source| EngineError::Invalid {
            flow_id: flow_id.to_string(),
            source,
        })?;

        let orchestrator = PhaseOrchestrator::new(self.registry.clone(), self.store.clone());
        let (tx_id, result) = orchestrator.execute_transaction(&flow, params, cancel).await;

        match result {
            Ok(TransactionOutcome::Committed) => Ok(tx_id),
            Err(e) => Err(EngineError::Orchestrator(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Component, TryRequest, TryResponse};
    use crate::flow::{Action, Flow};
    use crate::store::RecordStore;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tcc_db::models::{Phase, TaskStateSnapshot};

    struct StaticLoader(Flow);

    #[async_trait]
    impl FlowLoader for StaticLoader {
        async fn load(&self, _flow_id: &str) -> Result<Flow, LoaderError> {
            Ok(self.0.clone())
        }
    }

    struct NoopComponent;

    #[async_trait]
    impl Component for NoopComponent {
        fn id(&self) -> &str {
            "noop"
        }
        async fn prepare(&mut self, _cfg: &HashMap<String, Value>) -> Result<()> {
            Ok(())
        }
        async fn validate(&self) -> Result<()> {
            Ok(())
        }
        async fn try_action(&self, _req: &TryRequest) -> Result<TryResponse> {
            Ok(TryResponse::ok(Value::Null))
        }
        async fn confirm(&self, _tx_id: Uuid) -> Result<()> {
            Ok(())
        }
        async fn cancel(&self, _tx_id: Uuid) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct InMemoryStore {
        phases: Mutex<HashMap<Uuid, Phase>>,
    }

    #[async_trait]
    impl RecordStore for InMemoryStore {
        async fn create(&self, tx_id: Uuid, _flow_id: &str, _task_states: &[TaskStateSnapshot]) -> Result<()> {
            self.phases.lock().unwrap().insert(tx_id, Phase::Trying);
            Ok(())
        }

        async fn update_phase(&self, tx_id: Uuid, phase: Phase) -> Result<()> {
            self.phases.lock().unwrap().insert(tx_id, phase);
            Ok(())
        }

        async fn update_task_state(&self, _tx_id: Uuid, _state: TaskStateSnapshot) -> Result<()> {
            Ok(())
        }
    }

    fn flow_with_one_action() -> Flow {
        Flow {
            name: "f1".into(),
            actions: vec![Action {
                id: "a1".into(),
                name: "a1".into(),
                kind: String::new(),
                component: "noop".into(),
                config: HashMap::new(),
                retry_policy_name: None,
                request_template: None,
            }],
            retry_policies: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn execute_transaction_commits_happy_path() {
        let registry = Arc::new(ComponentRegistry::new());
        registry
            .register("noop", Arc::new(|| Box::new(NoopComponent)))
            .unwrap();

        let store = Arc::new(InMemoryStore::default());
        let loader = Arc::new(StaticLoader(flow_with_one_action()));
        let engine = Engine::new(loader, registry, store.clone());

        let tx_id = engine
            .execute_transaction("f1", Value::Null, CancellationToken::new())
            .await
            .expect("should commit");

        assert_eq!(store.phases.lock().unwrap().get(&tx_id), Some(&Phase::Committed));
    }

    #[tokio::test]
    async fn execute_transaction_rejects_invalid_flow_without_a_tx_id() {
        let registry = Arc::new(ComponentRegistry::new());
        let store = Arc::new(InMemoryStore::default());
        let mut flow = flow_with_one_action();
        flow.actions[0].retry_policy_name = Some("missing".into());
        let loader = Arc::new(StaticLoader(flow));
        let engine = Engine::new(loader, registry, store);

        let err = engine
            .execute_transaction("f1", Value::Null, CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Invalid { .. }));
    }

    #[tokio::test]
    async fn execute_transaction_surfaces_build_error_for_unknown_component() {
        let registry = Arc::new(ComponentRegistry::new());
        let store = Arc::new(InMemoryStore::default());
        let loader = Arc::new(StaticLoader(flow_with_one_action()));
        let engine = Engine::new(loader, registry, store);

        let err = engine
            .execute_transaction("f1", Value::Null, CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Orchestrator(_)));
    }
}
