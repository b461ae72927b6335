//! Database-backed outbox for the reference [`MqComponent`] plugin. A
//! thin staging table standing in for a real broker publish.
//!
//! [`MqComponent`]: ../../tcc_core/component/mq/struct.MqComponent.html

use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

/// Stage a message for a `(tx_id, queue)` pair. Idempotent: calling this
/// twice for the same pair overwrites the body rather than erroring,
/// matching a Try that is safe to invoke repeatedly.
pub async fn stage(pool: &PgPool, tx_id: Uuid, queue: &str, body: &Value) -> Result<()> {
    sqlx::query(
        "INSERT INTO tcc_mq_outbox (tx_id, queue, body, status) \
         VALUES ($1, $2, $3, 'staged') \
         ON CONFLICT (tx_id, queue) DO UPDATE SET body = EXCLUDED.body",
    )
    .bind(tx_id)
    .bind(queue)
    .bind(body)
    .execute(pool)
    .await
    .context("failed to stage outbox message")?;

    Ok(())
}

/// Mark a staged message as sent. No-op (and not an error) if no row
/// was ever staged for this `(tx_id, queue)` — Confirm must be
/// idempotent across repeated calls for the same pair.
pub async fn mark_sent(pool: &PgPool, tx_id: Uuid, queue: &str) -> Result<()> {
    sqlx::query("UPDATE tcc_mq_outbox SET status = 'sent' WHERE tx_id = $1 AND queue = $2")
        .bind(tx_id)
        .bind(queue)
        .execute(pool)
        .await
        .context("failed to mark outbox message sent")?;

    Ok(())
}

/// Discard a staged message. No-op for a transaction whose Try never
/// occurred.
pub async fn discard(pool: &PgPool, tx_id: Uuid, queue: &str) -> Result<()> {
    sqlx::query("UPDATE tcc_mq_outbox SET status = 'discarded' WHERE tx_id = $1 AND queue = $2")
        .bind(tx_id)
        .bind(queue)
        .execute(pool)
        .await
        .context("failed to discard outbox message")?;

    Ok(())
}

/// Current status of a staged message, if any.
pub async fn status(pool: &PgPool, tx_id: Uuid, queue: &str) -> Result<Option<String>> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT status FROM tcc_mq_outbox WHERE tx_id = $1 AND queue = $2")
            .bind(tx_id)
            .bind(queue)
            .fetch_optional(pool)
            .await
            .context("failed to read outbox status")?;

    Ok(row.map(|(status,)| status))
}
