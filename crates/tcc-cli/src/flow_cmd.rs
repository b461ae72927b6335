//! `tcc flow` subcommands: author flow definitions into the flow store.

use anyhow::{Context, Result};
use sqlx::PgPool;
use tcc_core::flow::parse_flow;
use tcc_db::queries::flows;

/// `tcc flow create <file>`: read a JSON/YAML flow definition from disk,
/// validate it, and upsert it into `tcc_flows` under its own `name`.
pub async fn run_create(pool: &PgPool, file: &str) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read flow definition file {file}"))?;

    let flow = parse_flow(&text).with_context(|| format!("flow definition in {file} is invalid"))?;

    flows::upsert(pool, &flow.name, &text).await?;

    println!("Flow {:?} stored ({} action(s)).", flow.name, flow.actions.len());
    Ok(())
}

/// `tcc flow show [id]`: print one flow's raw definition, or list every
/// stored flow id when `id` is omitted.
pub async fn run_show(pool: &PgPool, id: Option<&str>) -> Result<()> {
    match id {
        Some(id) => {
            let definition = flows::get_definition(pool, id)
                .await?
                .with_context(|| format!("flow {id:?} not found"))?;
            println!("{definition}");
        }
        None => {
            let rows = flows::list(pool).await?;
            if rows.is_empty() {
                println!("No flows stored.");
                return Ok(());
            }
            println!("{:<30} {:<22} {:<22}", "ID", "CREATED", "UPDATED");
            println!("{}", "-".repeat(76));
            for row in &rows {
                println!(
                    "{:<30} {:<22} {:<22}",
                    row.id,
                    row.created_at.format("%Y-%m-%d %H:%M:%S"),
                    row.updated_at.format("%Y-%m-%d %H:%M:%S"),
                );
            }
        }
    }
    Ok(())
}
