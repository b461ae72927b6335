//! Parses a flow definition from raw text.
//!
//! Definitions are accepted as JSON or YAML, tried in that order: JSON is
//! the canonical wire format, YAML a human-friendly alternative for files
//! on disk.

use thiserror::Error;

use super::model::{Flow, FlowValidationError};

#[derive(Debug, Error)]
pub enum FlowParseError {
    #[error("flow is neither valid JSON nor valid YAML: json error: {json_error}; yaml error: {yaml_error}")]
    UnrecognizedFormat {
        json_error: serde_json::Error,
        yaml_error: serde_yaml::Error,
    },

    #[error(transparent)]
    Validation(#[from] FlowValidationError),
}

/// Parse and validate a flow definition, trying JSON first and falling
/// back to YAML.
pub fn parse_flow(text: &str) -> Result<Flow, FlowParseError> {
    let flow = match serde_json::from_str::<Flow>(text) {
        Ok(flow) => flow,
        Err(json_error) => match serde_yaml::from_str::<Flow>(text) {
            Ok(flow) => flow,
            Err(yaml_error) => {
                return Err(FlowParseError::UnrecognizedFormat {
                    json_error,
                    yaml_error,
                });
            }
        },
    };

    flow.validate()?;
    Ok(flow)
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON_FLOW: &str = r#"
    {
        "name": "book-trip",
        "actions": [
            { "id": "a1", "name": "reserve-flight", "component": "http", "config": {} }
        ],
        "retryPolicies": {}
    }
    "#;

    const YAML_FLOW: &str = "
name: book-trip
actions:
  - id: a1
    name: reserve-flight
    component: http
    config: {}
retryPolicies: {}
";

    const YAML_FLOW_SNAKE_CASE: &str = "
name: book-trip
actions:
  - id: a1
    name: reserve-flight
    component: http
    config: {}
    retry_policy: std
retry_policies:
  std:
    max_attempts: 3
    backoff: fixed
    interval_ms: 250
";

    #[test]
    fn parses_json_first() {
        let flow = parse_flow(JSON_FLOW).expect("should parse as json");
        assert_eq!(flow.name, "book-trip");
        assert_eq!(flow.actions.len(), 1);
    }

    #[test]
    fn falls_back_to_yaml() {
        let flow = parse_flow(YAML_FLOW).expect("should parse as yaml");
        assert_eq!(flow.name, "book-trip");
    }

    #[test]
    fn accepts_snake_case_keys() {
        let flow = parse_flow(YAML_FLOW_SNAKE_CASE).expect("should parse snake_case keys");
        assert_eq!(flow.actions[0].retry_policy_name.as_deref(), Some("std"));
        let policy = flow.retry_policies.get("std").expect("policy resolves");
        assert_eq!(policy.max_attempts, 3);
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_flow("not json, not yaml: [[[").unwrap_err();
        assert!(matches!(err, FlowParseError::UnrecognizedFormat { .. }));
    }

    #[test]
    fn rejects_unresolved_retry_policy_reference() {
        let text = r#"{"name":"f","actions":[{"id":"a1","name":"a","component":"http","retryPolicy":"missing"}]}"#;
        let err = parse_flow(text).unwrap_err();
        assert!(matches!(err, FlowParseError::Validation(_)));
    }

    #[test]
    fn json_round_trip_is_canonical() {
        let flow = parse_flow(JSON_FLOW).unwrap();
        let first = serde_json::to_value(&flow).unwrap();
        let reparsed = parse_flow(&serde_json::to_string(&flow).unwrap()).unwrap();
        let second = serde_json::to_value(&reparsed).unwrap();
        assert_eq!(first, second);
    }
}
