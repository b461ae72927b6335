//! `tcc execute <flow-id>`: runs `ExecuteTransaction` to completion and
//! reports the outcome. The CLI surface over the engine's single public
//! operation.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tcc_core::component::ComponentRegistry;
use tcc_core::engine::{Engine, EngineError};
use tcc_core::loader::{create_flow_loader, FlowSource};
use tcc_core::store::PgRecordStore;
use tokio_util::sync::CancellationToken;

use crate::components::build_registry;

/// Runs a transaction for `flow_id` and prints its terminal outcome.
///
/// Returns `Ok(())` regardless of whether the transaction committed or
/// was compensated -- runtime transaction failures do not exit the
/// process; the process exit code set by the caller reflects only
/// whether the *command itself* (not the transaction) failed to run.
pub async fn run_execute(pool: &PgPool, flow_id: &str, params_json: Option<&str>) -> Result<bool> {
    let params = match params_json {
        Some(text) => serde_json::from_str(text).context("--params is not valid JSON")?,
        None => serde_json::Value::Null,
    };

    let registry: Arc<ComponentRegistry> = Arc::new(build_registry(pool.clone()));
    let loader = create_flow_loader(FlowSource::Database(pool.clone()));
    let store = Arc::new(PgRecordStore::new(pool.clone()));
    let engine = Engine::new(loader, registry, store);

    match engine
        .execute_transaction(flow_id, params, CancellationToken::new())
        .await
    {
        Ok(tx_id) => {
            println!("transaction {tx_id} committed");
            Ok(true)
        }
        Err(err @ (EngineError::Load { .. } | EngineError::Invalid { .. })) => {
            Err(anyhow::Error::new(err).context(format!("failed to resolve flow {flow_id:?}")))
        }
        Err(EngineError::Orchestrator(e)) => {
            println!("transaction {} did not commit: {}", e.tx_id, e.source);
            Ok(false)
        }
    }
}
