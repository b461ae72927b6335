//! The [`Component`] trait -- the capability set every TCC participant
//! satisfies -- plus the process-wide [`registry`].

pub mod db;
pub mod http;
pub mod mq;
pub mod registry;

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

pub use db::DbComponent;
pub use http::HttpComponent;
pub use mq::MqComponent;
pub use registry::{ComponentFactory, ComponentRegistry, RegistryError};

/// Arguments passed to [`Component::try_action`].
#[derive(Debug, Clone)]
pub struct TryRequest {
    pub tx_id: Uuid,
    pub payload: Value,
}

/// Outcome of a `Try` call. A `success: false` is equivalent to an error
/// for retry purposes -- the retry driver treats both the same way.
#[derive(Debug, Clone, Default)]
pub struct TryResponse {
    pub success: bool,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl TryResponse {
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// The adapter interface for one action's remote effect.
///
/// Implementors wrap a specific kind of participant (an HTTP service, a
/// database, a message queue) and translate the TCC verbs into whatever
/// that participant actually understands.
///
/// # Object safety
///
/// This trait is object-safe: every method returns a concrete, owned
/// type (via `async_trait`'s boxed-future desugaring), so it can be
/// stored as `Box<dyn Component>` in a [`crate::task::TaskInstance`] and
/// in the [`ComponentRegistry`].
#[async_trait]
pub trait Component: Send + Sync {
    /// Constant string identifying this component's type; the registry key
    /// it was built under.
    fn id(&self) -> &str;

    /// Parse the action's opaque configuration. Idempotent: calling this
    /// twice with the same `cfg` must yield the same component state.
    /// Errors here are fatal for the owning task -- no Try is attempted.
    async fn prepare(&mut self, cfg: &HashMap<String, Value>) -> Result<()>;

    /// Post-`prepare` semantic checks (e.g. a required endpoint is
    /// present, a URL scheme is reachable in principle). Errors here are
    /// fatal for the owning task.
    async fn validate(&self) -> Result<()>;

    /// Reserve or lock remote state for `req.tx_id`. Must be safe to call
    /// repeatedly with the same `tx_id` (idempotent per transaction).
    async fn try_action(&self, req: &TryRequest) -> Result<TryResponse>;

    /// Commit the reservation made by a prior successful `try_action` for
    /// `tx_id`. Must succeed whenever the matching Try succeeded, must be
    /// idempotent, and must not make effects visible before it returns.
    async fn confirm(&self, tx_id: Uuid) -> Result<()>;

    /// Release any reservation held for `tx_id`. Must be idempotent, and
    /// safe to call for a `tx_id` whose Try never happened (a no-op).
    async fn cancel(&self, tx_id: Uuid) -> Result<()>;

    /// `false` means `cancel` is never called for this component; a
    /// Try-phase failure instead raises a manual-intervention alert.
    fn supports_compensation(&self) -> bool {
        true
    }

    /// Hint for participants that want to rely on it for dedup; the
    /// engine itself does not branch on this.
    fn is_idempotent(&self) -> bool {
        true
    }
}

const _: () = {
    fn _assert_object_safe(_: &dyn Component) {}
};
