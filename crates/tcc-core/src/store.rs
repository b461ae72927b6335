//! Transaction record store: the durable side of a transaction's phase
//! and per-task state.
//!
//! The orchestrator calls [`RecordStore::create`] once per transaction and
//! [`RecordStore::update_phase`] / [`RecordStore::update_task_state`] at
//! each transition. In the reference implementation a store-write failure
//! is logged but does not block phase progression -- durability here is
//! best-effort. An implementation targeting strict recoverability should
//! make these writes a hard gate instead.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use tcc_db::models::{Phase, TaskStateSnapshot};
use tcc_db::queries::tx_records;

/// Durable record of transaction phase and per-task state.
///
/// Object-safe so it can be held as `Arc<dyn RecordStore>` by the engine
/// and swapped for a test double.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create(&self, tx_id: Uuid, flow_id: &str, task_states: &[TaskStateSnapshot]) -> Result<()>;

    async fn update_phase(&self, tx_id: Uuid, phase: Phase) -> Result<()>;

    /// Overwrite the state snapshot for one action within `tx_id`'s
    /// record. Implementations that store task states as a single JSON
    /// column (as [`PgRecordStore`] does) read-modify-write the whole
    /// array under the per-transaction advisory lock to avoid losing
    /// concurrent updates from other actions of the same transaction --
    /// though since one orchestrator instance drives a transaction's
    /// tasks sequentially, this is not expected to race.
    async fn update_task_state(&self, tx_id: Uuid, state: TaskStateSnapshot) -> Result<()>;
}

/// PostgreSQL-backed [`RecordStore`], the reference implementation.
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Take a per-transaction advisory lock, run `f`, then release it.
    /// Used by the recovery sketch to serialize a resumed transaction
    /// against any other worker that might pick up the same row. Not
    /// part of the [`RecordStore`] trait: a generic closure parameter
    /// would make the trait object-unsafe, and this operation is only
    /// ever invoked against a concrete pool-backed store.
    pub async fn lock_and_do<F, Fut, T>(&self, tx_id: Uuid, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        tx_records::lock_and_do(&self.pool, tx_id, f).await
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn create(&self, tx_id: Uuid, flow_id: &str, task_states: &[TaskStateSnapshot]) -> Result<()> {
        tx_records::create(&self.pool, tx_id, flow_id, task_states).await?;
        Ok(())
    }

    async fn update_phase(&self, tx_id: Uuid, phase: Phase) -> Result<()> {
        tx_records::update_phase(&self.pool, tx_id, phase).await
    }

    async fn update_task_state(&self, tx_id: Uuid, state: TaskStateSnapshot) -> Result<()> {
        let record = tx_records::get(&self.pool, tx_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("transaction record {tx_id} not found"))?;

        let mut states = record.task_states.0;
        match states.iter_mut().find(|s| s.action_id == state.action_id) {
            Some(existing) => *existing = state,
            None => states.push(state),
        }

        tx_records::update_task_states(&self.pool, tx_id, &states).await
    }
}

const _: () = {
    fn _assert_object_safe(_: &dyn RecordStore) {}
};
