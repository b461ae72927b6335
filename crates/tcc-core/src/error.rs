//! Error taxonomy for the engine.
//!
//! Every operation that can fail inside a transaction returns one of
//! these kinds, so the orchestrator can decide whether to retry, compensate,
//! or fail fast without re-inspecting opaque [`anyhow::Error`] strings.

use thiserror::Error;

/// The coordinator's error taxonomy.
///
/// Construction and build errors never leave a durable record behind; the
/// rest occur after a [`crate::task::TaskInstance`] list exists and are
/// handled by the phase orchestrator.
#[derive(Debug, Error)]
pub enum TccError {
    /// Flow definition malformed, or an action's component/retry key did
    /// not resolve. Fail-fast before any Try; no record is written.
    #[error("config error: {0}")]
    Config(String),

    /// Component factory lookup, `Prepare`, or `Validate` failed.
    /// Fail-fast before any Try; no record is written.
    #[error("build error for action {action_id:?}: {source}")]
    Build {
        action_id: String,
        #[source]
        source: anyhow::Error,
    },

    /// Retry budget exhausted for a task. Triggers compensation.
    #[error("permanent try error for action {action_id:?} after {attempts} attempts: {source}")]
    PermanentTry {
        action_id: String,
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },

    /// `Confirm` failed on some task after every `Try` succeeded.
    /// Triggers full-task compensation; terminal state is `failed`.
    #[error("confirm error for action {action_id:?}: {source}")]
    Confirm {
        action_id: String,
        #[source]
        source: anyhow::Error,
    },

    /// `Cancel` failed. Logged; iteration over the remaining tasks
    /// continues; an alert is emitted.
    #[error("cancel error for action {action_id:?}: {source}")]
    Cancel {
        action_id: String,
        #[source]
        source: anyhow::Error,
    },

    /// Cancel was needed but the component does not support compensation.
    /// An alert is emitted for manual intervention; iteration continues.
    #[error("action {action_id:?} needs compensation but does not support it")]
    UnsupportedCompensation { action_id: String },

    /// The caller's context was cancelled. Propagated; triggers
    /// compensation if cancellation happened within the Try phase.
    #[error("context cancelled")]
    ContextCancelled,
}

impl TccError {
    /// Short, stable tag for the error kind, used in log fields and the
    /// admin API's JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::Build { .. } => "build_error",
            Self::PermanentTry { .. } => "permanent_try_error",
            Self::Confirm { .. } => "confirm_error",
            Self::Cancel { .. } => "cancel_error",
            Self::UnsupportedCompensation { .. } => "unsupported_compensation",
            Self::ContextCancelled => "context_cancelled",
        }
    }
}
