//! Reference [`Component`] plugin for participants reachable over HTTP.
//!
//! Not part of the core engine's contract surface -- a concrete example of
//! a component that satisfies it, the way a real deployment would plug in
//! "charge the card" or "reserve the flight seat" against a REST service.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{Component, TryRequest, TryResponse};

/// Talks to a remote HTTP endpoint for Try/Confirm/Cancel.
///
/// `config` keys (all optional except `try_url`):
/// - `try_url` / `tryUrl`: endpoint called on Try.
/// - `confirm_url` / `confirmUrl`: endpoint called on Confirm; defaults to
///   `{try_url}/confirm`.
/// - `cancel_url` / `cancelUrl`: endpoint called on Cancel; defaults to
///   `{try_url}/cancel`.
/// - `timeout_ms`: per-request timeout, default 10 000 ms.
#[derive(Debug, Default)]
pub struct HttpComponent {
    client: reqwest::Client,
    try_url: Option<Url>,
    confirm_url: Option<Url>,
    cancel_url: Option<Url>,
}

impl HttpComponent {
    pub fn new() -> Self {
        Self::default()
    }

    fn config_str<'a>(cfg: &'a HashMap<String, Value>, keys: &[&str]) -> Option<&'a str> {
        keys.iter().find_map(|k| cfg.get(*k)).and_then(Value::as_str)
    }
}

#[async_trait]
impl Component for HttpComponent {
    fn id(&self) -> &str {
        "http"
    }

    async fn prepare(&mut self, cfg: &HashMap<String, Value>) -> Result<()> {
        let try_url = Self::config_str(cfg, &["try_url", "tryUrl"])
            .context("http component requires a try_url")?;
        let try_url = Url::parse(try_url).context("try_url is not a valid URL")?;

        let confirm_url = match Self::config_str(cfg, &["confirm_url", "confirmUrl"]) {
            Some(url) => Url::parse(url).context("confirm_url is not a valid URL")?,
            None => try_url.join("confirm").context("failed to derive confirm_url")?,
        };

        let cancel_url = match Self::config_str(cfg, &["cancel_url", "cancelUrl"]) {
            Some(url) => Url::parse(url).context("cancel_url is not a valid URL")?,
            None => try_url.join("cancel").context("failed to derive cancel_url")?,
        };

        let timeout_ms = cfg
            .get("timeout_ms")
            .or_else(|| cfg.get("timeoutMs"))
            .and_then(Value::as_u64)
            .unwrap_or(10_000);

        self.client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .context("failed to build HTTP client")?;
        self.try_url = Some(try_url);
        self.confirm_url = Some(confirm_url);
        self.cancel_url = Some(cancel_url);

        Ok(())
    }

    async fn validate(&self) -> Result<()> {
        let try_url = self.try_url.as_ref().context("http component not prepared")?;
        if !matches!(try_url.scheme(), "http" | "https") {
            bail!("try_url must use http or https, got {:?}", try_url.scheme());
        }
        Ok(())
    }

    async fn try_action(&self, req: &TryRequest) -> Result<TryResponse> {
        let url = self.try_url.as_ref().context("http component not prepared")?;
        let body = json!({ "tx_id": req.tx_id, "payload": req.payload });

        let resp = self.client.post(url.clone()).json(&body).send().await;
        match resp {
            Ok(resp) if resp.status().is_success() => {
                let result: Value = resp.json().await.unwrap_or(Value::Null);
                Ok(TryResponse::ok(result))
            }
            Ok(resp) => Ok(TryResponse::failed(format!(
                "try endpoint returned status {}",
                resp.status()
            ))),
            Err(e) => Ok(TryResponse::failed(e.to_string())),
        }
    }

    async fn confirm(&self, tx_id: Uuid) -> Result<()> {
        let url = self.confirm_url.as_ref().context("http component not prepared")?;
        self.client
            .post(url.clone())
            .json(&json!({ "tx_id": tx_id }))
            .send()
            .await
            .context("confirm request failed")?
            .error_for_status()
            .context("confirm endpoint returned an error status")?;
        Ok(())
    }

    async fn cancel(&self, tx_id: Uuid) -> Result<()> {
        let url = self.cancel_url.as_ref().context("http component not prepared")?;
        self.client
            .post(url.clone())
            .json(&json!({ "tx_id": tx_id }))
            .send()
            .await
            .context("cancel request failed")?
            .error_for_status()
            .context("cancel endpoint returned an error status")?;
        Ok(())
    }
}
