//! Database query functions for the `tcc_records` table: the durable
//! [`crate::models::TxRecordRow`] written by the phase orchestrator at
//! each phase transition.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Phase, TaskStateSnapshot, TxRecordRow};

/// Insert the initial record for a transaction (`Phase::Trying`, every
/// task `pending`). Called once per transaction, before the Try phase.
pub async fn create(
    pool: &PgPool,
    id: Uuid,
    flow_id: &str,
    task_states: &[TaskStateSnapshot],
) -> Result<TxRecordRow> {
    let record = sqlx::query_as::<_, TxRecordRow>(
        "INSERT INTO tcc_records (id, flow_id, phase, task_states) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(id)
    .bind(flow_id)
    .bind(Phase::Trying)
    .bind(sqlx::types::Json(task_states))
    .fetch_one(pool)
    .await
    .context("failed to insert transaction record")?;

    Ok(record)
}

/// Fetch a single transaction record by id.
pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<TxRecordRow>> {
    let record = sqlx::query_as::<_, TxRecordRow>("SELECT * FROM tcc_records WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch transaction record")?;

    Ok(record)
}

/// List the most recent transaction records, newest first.
pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<TxRecordRow>> {
    let records = sqlx::query_as::<_, TxRecordRow>(
        "SELECT * FROM tcc_records ORDER BY started_at DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("failed to list transaction records")?;

    Ok(records)
}

/// List transaction records whose `phase` is not one of the three
/// terminal states. Used by the recovery sketch to report transactions
/// that were in flight when the coordinator last stopped.
pub async fn list_non_terminal(pool: &PgPool) -> Result<Vec<TxRecordRow>> {
    let records = sqlx::query_as::<_, TxRecordRow>(
        "SELECT * FROM tcc_records \
         WHERE phase NOT IN ('committed', 'aborted', 'failed') \
         ORDER BY started_at ASC",
    )
    .fetch_all(pool)
    .await
    .context("failed to list non-terminal transaction records")?;

    Ok(records)
}

/// Transition a transaction record to a new phase.
///
/// Sets `completed_at` when `phase` is one of the terminal states.
/// Failure of this write is logged by the caller but does not block
/// phase progression; durability here is best-effort.
pub async fn update_phase(pool: &PgPool, id: Uuid, phase: Phase) -> Result<()> {
    let completed_at = if phase.is_terminal() {
        Some(Utc::now())
    } else {
        None
    };

    let result = sqlx::query(
        "UPDATE tcc_records SET phase = $1, updated_at = now(), completed_at = COALESCE($2, completed_at) \
         WHERE id = $3",
    )
    .bind(phase)
    .bind(completed_at)
    .bind(id)
    .execute(pool)
    .await
    .context("failed to update transaction phase")?;

    if result.rows_affected() == 0 {
        anyhow::bail!("transaction record {id} not found");
    }

    Ok(())
}

/// Overwrite the full `task_states` snapshot for a transaction.
///
/// The orchestrator calls this after every Try/Confirm/Cancel so the
/// durable record always reflects the in-memory task list.
pub async fn update_task_states(
    pool: &PgPool,
    id: Uuid,
    task_states: &[TaskStateSnapshot],
) -> Result<()> {
    let result = sqlx::query("UPDATE tcc_records SET task_states = $1, updated_at = now() WHERE id = $2")
        .bind(sqlx::types::Json(task_states))
        .bind(id)
        .execute(pool)
        .await
        .context("failed to update task states")?;

    if result.rows_affected() == 0 {
        anyhow::bail!("transaction record {id} not found");
    }

    Ok(())
}

/// Take a Postgres advisory lock scoped to this transaction id, run `f`,
/// then release it. Backs the `LockAndDo` contract used to serialize
/// concurrent recovery/dispatch against the same transaction.
///
/// Advisory locks are keyed on a single `bigint`; we fold the UUID down
/// to its low 64 bits, which is adequate for avoiding concurrent
/// recovery/dispatch races on the same transaction and is not used for
/// anything requiring cryptographic uniqueness.
pub async fn lock_and_do<F, Fut, T>(pool: &PgPool, id: Uuid, f: F) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let key = uuid_low_bits(id);
    let mut conn = pool.acquire().await.context("failed to acquire connection for advisory lock")?;

    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(key)
        .execute(&mut *conn)
        .await
        .context("failed to acquire advisory lock")?;

    let result = f().await;

    sqlx::query("SELECT pg_advisory_unlock($1)")
        .bind(key)
        .execute(&mut *conn)
        .await
        .context("failed to release advisory lock")?;

    result
}

fn uuid_low_bits(id: Uuid) -> i64 {
    let bytes = id.as_bytes();
    let low = &bytes[8..16];
    i64::from_be_bytes(low.try_into().expect("slice is exactly 8 bytes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_low_bits_is_deterministic() {
        let id = Uuid::nil();
        assert_eq!(uuid_low_bits(id), 0);
    }
}
