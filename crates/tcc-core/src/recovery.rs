//! Recovery sketch: a read-only interface, not a working resumption path.
//!
//! A complete design would require the record store to expose pending
//! transactions and the engine to re-bind components and resume from the
//! last durable phase. This module supplies exactly the first half -- a
//! read-only view of which transactions were in flight -- and stops
//! there. See `DESIGN.md` for why automatic resumption is out of scope
//! here.

use async_trait::async_trait;
use tcc_db::models::TxRecordRow;

/// A source of transactions left in a non-terminal phase by a
/// coordinator that stopped (crashed or was redeployed) mid-flight.
///
/// Implementations only need to *report* these; nothing in this crate
/// re-binds components or resumes them. A caller (e.g. an operator
/// running `tcc recover`) is expected to inspect the list and decide
/// whether manual intervention is needed -- cross-coordinator recovery
/// is explicitly out of scope here.
#[async_trait]
pub trait RecoverySource: Send + Sync {
    /// List every transaction record whose phase is not one of the
    /// three terminal states, oldest first.
    async fn list_pending(&self) -> anyhow::Result<Vec<TxRecordRow>>;
}

/// Postgres-backed [`RecoverySource`], reading directly from the
/// `tcc_records` table the orchestrator writes to.
pub struct PgRecoverySource {
    pool: sqlx::PgPool,
}

impl PgRecoverySource {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecoverySource for PgRecoverySource {
    async fn list_pending(&self) -> anyhow::Result<Vec<TxRecordRow>> {
        tcc_db::queries::tx_records::list_non_terminal(&self.pool).await
    }
}
