//! Database query functions for the `tcc_flows` table: raw flow
//! definitions (JSON or YAML text), addressed by an opaque string id.

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::FlowRow;

/// Insert or replace a flow definition.
pub async fn upsert(pool: &PgPool, id: &str, definition: &str) -> Result<FlowRow> {
    let row = sqlx::query_as::<_, FlowRow>(
        "INSERT INTO tcc_flows (id, definition) VALUES ($1, $2) \
         ON CONFLICT (id) DO UPDATE SET definition = EXCLUDED.definition, updated_at = now() \
         RETURNING *",
    )
    .bind(id)
    .bind(definition)
    .fetch_one(pool)
    .await
    .context("failed to upsert flow definition")?;

    Ok(row)
}

/// Fetch the raw `definition` text for a flow id.
pub async fn get_definition(pool: &PgPool, id: &str) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT definition FROM tcc_flows WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch flow definition")?;

    Ok(row.map(|(definition,)| definition))
}

/// List all stored flows (id + timestamps only, not the full definition).
pub async fn list(pool: &PgPool) -> Result<Vec<FlowRow>> {
    let rows = sqlx::query_as::<_, FlowRow>("SELECT * FROM tcc_flows ORDER BY id")
        .fetch_all(pool)
        .await
        .context("failed to list flows")?;

    Ok(rows)
}
