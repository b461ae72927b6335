//! In-memory representation of a flow definition.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An ordered list of actions forming one logical transaction template.
///
/// Immutable once loaded; shared (via `Arc`) across every transaction that
/// executes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub name: String,
    pub actions: Vec<Action>,
    #[serde(default, rename = "retryPolicies", alias = "retry_policies")]
    pub retry_policies: HashMap<String, RetryPolicy>,
}

/// A declarative unit in a flow, naming a component type and its
/// configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub name: String,
    /// Informational only; not consulted by the engine.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Registry key used to build the bound component.
    pub component: String,
    #[serde(default)]
    pub config: HashMap<String, Value>,
    #[serde(default, rename = "retryPolicy", alias = "retry_policy")]
    pub retry_policy_name: Option<String>,
    #[serde(default, rename = "requestTemplate", alias = "request_template")]
    pub request_template: Option<String>,
}

/// Backoff strategy and its parameters for one named retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(rename = "maxAttempts", alias = "max_attempts")]
    pub max_attempts: u32,
    pub backoff: BackoffStrategy,
    #[serde(default, rename = "intervalMs", alias = "interval_ms")]
    pub interval_ms: u64,
    #[serde(default, rename = "initialIntervalMs", alias = "initial_interval_ms")]
    pub initial_interval_ms: u64,
    #[serde(default, rename = "multiplier")]
    pub multiplier: f64,
    #[serde(default, rename = "maxIntervalMs", alias = "max_interval_ms")]
    pub max_interval_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    Fixed,
    Exponential,
}

impl Flow {
    /// Resolve the retry policy named by an action, if any. Returns `None`
    /// when the action names no policy (the retry driver then falls back
    /// to a single attempt).
    pub fn resolve_retry_policy(&self, action: &Action) -> Option<&RetryPolicy> {
        let name = action.retry_policy_name.as_deref()?;
        self.retry_policies.get(name)
    }

    /// Validate that every action's `retry_policy_name`, if set, resolves
    /// against `retry_policies`. Called once at load time.
    pub fn validate(&self) -> Result<(), FlowValidationError> {
        if self.actions.is_empty() {
            return Ok(());
        }

        let mut seen_ids = std::collections::HashSet::new();
        for action in &self.actions {
            if !seen_ids.insert(action.id.as_str()) {
                return Err(FlowValidationError::DuplicateActionId(action.id.clone()));
            }

            if let Some(name) = &action.retry_policy_name {
                if !name.is_empty() && !self.retry_policies.contains_key(name) {
                    return Err(FlowValidationError::UnknownRetryPolicy {
                        action_id: action.id.clone(),
                        policy_name: name.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FlowValidationError {
    #[error("action {0:?} appears more than once in the flow")]
    DuplicateActionId(String),

    #[error("action {action_id:?} references unknown retry policy {policy_name:?}")]
    UnknownRetryPolicy {
        action_id: String,
        policy_name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_action(id: &str, retry_policy_name: Option<&str>) -> Action {
        Action {
            id: id.to_string(),
            name: id.to_string(),
            kind: String::new(),
            component: "http".to_string(),
            config: HashMap::new(),
            retry_policy_name: retry_policy_name.map(str::to_string),
            request_template: None,
        }
    }

    #[test]
    fn validate_accepts_empty_flow() {
        let flow = Flow {
            name: "empty".into(),
            actions: vec![],
            retry_policies: HashMap::new(),
        };
        assert!(flow.validate().is_ok());
    }

    #[test]
    fn validate_rejects_unresolved_retry_policy() {
        let flow = Flow {
            name: "f".into(),
            actions: vec![sample_action("a1", Some("missing"))],
            retry_policies: HashMap::new(),
        };
        let err = flow.validate().unwrap_err();
        assert!(matches!(err, FlowValidationError::UnknownRetryPolicy { .. }));
    }

    #[test]
    fn validate_rejects_duplicate_action_ids() {
        let flow = Flow {
            name: "f".into(),
            actions: vec![sample_action("a1", None), sample_action("a1", None)],
            retry_policies: HashMap::new(),
        };
        let err = flow.validate().unwrap_err();
        assert!(matches!(err, FlowValidationError::DuplicateActionId(_)));
    }

    #[test]
    fn validate_accepts_resolved_retry_policy() {
        let mut policies = HashMap::new();
        policies.insert(
            "std".to_string(),
            RetryPolicy {
                max_attempts: 3,
                backoff: BackoffStrategy::Fixed,
                interval_ms: 100,
                initial_interval_ms: 0,
                multiplier: 0.0,
                max_interval_ms: 0,
            },
        );
        let flow = Flow {
            name: "f".into(),
            actions: vec![sample_action("a1", Some("std"))],
            retry_policies: policies,
        };
        assert!(flow.validate().is_ok());
    }

    #[test]
    fn resolve_retry_policy_returns_none_for_empty_name() {
        let flow = Flow {
            name: "f".into(),
            actions: vec![],
            retry_policies: HashMap::new(),
        };
        let action = sample_action("a1", None);
        assert!(flow.resolve_retry_policy(&action).is_none());
    }
}
