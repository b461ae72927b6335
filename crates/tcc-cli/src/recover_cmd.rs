//! `tcc recover`: reports transactions left in a non-terminal phase by a
//! coordinator that stopped mid-flight. This is read-only -- nothing
//! here re-binds components or resumes a transaction.

use anyhow::Result;
use sqlx::PgPool;

use tcc_core::recovery::{PgRecoverySource, RecoverySource};

pub async fn run_recover(pool: &PgPool) -> Result<()> {
    let source = PgRecoverySource::new(pool.clone());
    let pending = source.list_pending().await?;

    if pending.is_empty() {
        println!("No transactions pending recovery.");
        return Ok(());
    }

    println!(
        "{} transaction(s) left in a non-terminal phase:",
        pending.len()
    );
    println!("{:<38} {:<24} {:<12} {:<20}", "ID", "FLOW", "PHASE", "STARTED");
    println!("{}", "-".repeat(96));
    for record in &pending {
        println!(
            "{:<38} {:<24} {:<12} {:<20}",
            record.id,
            record.flow_id,
            record.phase,
            record.started_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    println!();
    println!(
        "tcc does not auto-resume these; inspect each transaction with \
         `tcc status <id>` and decide whether manual compensation is needed."
    );

    Ok(())
}
