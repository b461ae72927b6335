//! Reference [`Component`] plugin for participants reachable through a
//! shared PostgreSQL connection pool.
//!
//! Try/Confirm/Cancel are each one parameterized SQL statement, bound
//! against `(tx_id, payload)`. A real deployment's actual reservation
//! logic lives in that SQL; this component is just the plumbing.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Component, TryRequest, TryResponse};

#[derive(Debug)]
pub struct DbComponent {
    pool: PgPool,
    try_sql: Option<String>,
    confirm_sql: Option<String>,
    cancel_sql: Option<String>,
}

impl DbComponent {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            try_sql: None,
            confirm_sql: None,
            cancel_sql: None,
        }
    }

    fn config_str<'a>(cfg: &'a HashMap<String, Value>, keys: &[&str]) -> Option<&'a str> {
        keys.iter().find_map(|k| cfg.get(*k)).and_then(Value::as_str)
    }
}

#[async_trait]
impl Component for DbComponent {
    fn id(&self) -> &str {
        "db"
    }

    async fn prepare(&mut self, cfg: &HashMap<String, Value>) -> Result<()> {
        let try_sql = Self::config_str(cfg, &["try_sql", "trySql"])
            .context("db component requires try_sql")?;
        self.try_sql = Some(try_sql.to_string());
        self.confirm_sql = Self::config_str(cfg, &["confirm_sql", "confirmSql"]).map(str::to_string);
        self.cancel_sql = Self::config_str(cfg, &["cancel_sql", "cancelSql"]).map(str::to_string);
        Ok(())
    }

    async fn validate(&self) -> Result<()> {
        if self.try_sql.is_none() {
            bail!("db component not prepared");
        }
        Ok(())
    }

    async fn try_action(&self, req: &TryRequest) -> Result<TryResponse> {
        let sql = self.try_sql.as_ref().context("db component not prepared")?;

        let result = sqlx::query(sql)
            .bind(req.tx_id)
            .bind(sqlx::types::Json(&req.payload))
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(TryResponse::ok(Value::Null)),
            Err(e) => Ok(TryResponse::failed(e.to_string())),
        }
    }

    async fn confirm(&self, tx_id: Uuid) -> Result<()> {
        let Some(sql) = &self.confirm_sql else {
            return Ok(());
        };
        sqlx::query(sql)
            .bind(tx_id)
            .execute(&self.pool)
            .await
            .context("confirm statement failed")?;
        Ok(())
    }

    async fn cancel(&self, tx_id: Uuid) -> Result<()> {
        let Some(sql) = &self.cancel_sql else {
            return Ok(());
        };
        sqlx::query(sql)
            .bind(tx_id)
            .execute(&self.pool)
            .await
            .context("cancel statement failed")?;
        Ok(())
    }
}
