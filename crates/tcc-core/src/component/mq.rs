//! Reference [`Component`] plugin for participants reached through a
//! message queue.
//!
//! Try stages a message in the durable outbox rather than publishing it
//! immediately; Confirm marks it sent (a real deployment's outbox sweeper
//! would do the actual publish at that point); Cancel discards it. This
//! keeps the plugin idempotent per `tx_id` without needing a broker
//! connection to prove out the contract.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use tcc_db::queries::mq_outbox;

use super::{Component, TryRequest, TryResponse};

#[derive(Debug)]
pub struct MqComponent {
    pool: PgPool,
    queue: Option<String>,
}

impl MqComponent {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, queue: None }
    }
}

#[async_trait]
impl Component for MqComponent {
    fn id(&self) -> &str {
        "mq"
    }

    async fn prepare(&mut self, cfg: &HashMap<String, Value>) -> Result<()> {
        let queue = cfg
            .get("queue")
            .and_then(Value::as_str)
            .context("mq component requires a queue name")?;
        self.queue = Some(queue.to_string());
        Ok(())
    }

    async fn validate(&self) -> Result<()> {
        if self.queue.as_deref().is_none_or(str::is_empty) {
            bail!("mq component not prepared");
        }
        Ok(())
    }

    async fn try_action(&self, req: &TryRequest) -> Result<TryResponse> {
        let queue = self.queue.as_deref().context("mq component not prepared")?;
        match mq_outbox::stage(&self.pool, req.tx_id, queue, &req.payload).await {
            Ok(()) => Ok(TryResponse::ok(Value::Null)),
            Err(e) => Ok(TryResponse::failed(e.to_string())),
        }
    }

    async fn confirm(&self, tx_id: Uuid) -> Result<()> {
        let queue = self.queue.as_deref().context("mq component not prepared")?;
        mq_outbox::mark_sent(&self.pool, tx_id, queue).await
    }

    async fn cancel(&self, tx_id: Uuid) -> Result<()> {
        let queue = self.queue.as_deref().context("mq component not prepared")?;
        mq_outbox::discard(&self.pool, tx_id, queue).await
    }
}
