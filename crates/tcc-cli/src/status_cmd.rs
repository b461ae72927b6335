//! `tcc status [tx-id]` command: show a transaction's durable record, or
//! list recent transactions.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use tcc_db::queries::tx_records;

const RECENT_LIMIT: i64 = 50;

/// Run the status command.
///
/// When `tx_id_str` is `Some`, shows the full record (phase, per-task
/// state) for that transaction. When `None`, lists the most recent
/// transactions with a one-line summary each.
pub async fn run_status(pool: &PgPool, tx_id_str: Option<&str>) -> Result<()> {
    match tx_id_str {
        Some(id_str) => run_transaction_detail(pool, id_str).await,
        None => run_recent_list(pool).await,
    }
}

/// Show detailed status for a single transaction.
async fn run_transaction_detail(pool: &PgPool, tx_id_str: &str) -> Result<()> {
    let tx_id = Uuid::parse_str(tx_id_str).with_context(|| format!("invalid transaction id: {tx_id_str}"))?;

    let record = tx_records::get(pool, tx_id)
        .await?
        .with_context(|| format!("transaction {tx_id} not found"))?;

    println!("Transaction: {}", record.id);
    println!("Flow: {}", record.flow_id);
    println!("Phase: {}", record.phase);
    println!("Started: {}", record.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if let Some(completed_at) = record.completed_at {
        println!("Completed: {}", completed_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!();

    println!("Tasks:");
    for task in &record.task_states.0 {
        let status_icon = match task.status.to_string().as_str() {
            "pending" => ".",
            "executing" => "*",
            "retrying" => "~",
            "success" => "+",
            "failed" => "!",
            "confirmed" => "#",
            "cancelled" => "x",
            _ => " ",
        };
        print!(
            "  [{}] {} (attempt {}, {})",
            status_icon, task.action_id, task.try_times, task.status
        );
        if let Some(err) = &task.error_msg {
            print!(" -- {err}");
        }
        println!();
    }

    Ok(())
}

/// List the most recent transactions, newest first.
async fn run_recent_list(pool: &PgPool) -> Result<()> {
    let records = tx_records::list_recent(pool, RECENT_LIMIT).await?;

    if records.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    println!("{:<38} {:<24} {:<12} {:>8}", "ID", "FLOW", "PHASE", "TASKS");
    println!("{}", "-".repeat(84));

    for record in &records {
        let flow_display = if record.flow_id.len() > 22 {
            format!("{}...", &record.flow_id[..19])
        } else {
            record.flow_id.clone()
        };
        println!(
            "{:<38} {:<24} {:<12} {:>8}",
            record.id,
            flow_display,
            record.phase,
            record.task_states.0.len(),
        );
    }

    Ok(())
}
