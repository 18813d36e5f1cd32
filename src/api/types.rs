//! HTTP request and response bodies.

use serde::{Deserialize, Serialize};

use crate::config::{HardLimits, RouteRule};
use crate::provider::CallOptions;
use crate::router::{Route, RouteContext};

/// Body of `POST /v1/calls`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallRequest {
    pub context: RouteContext,
    pub input: String,
    #[serde(default)]
    pub options: CallOptions,
}

/// Body of `GET /v1/routes`.
#[derive(Debug, Serialize)]
pub struct RoutesResponse {
    pub rules: Vec<RouteRule>,
    pub default: Route,
    pub emergency: Route,
    pub hard_limits: HardLimits,
    pub providers: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_request_options_default() {
        let body: CallRequest = serde_json::from_str(
            r#"{"context":{"topic":"healthcare.planner","tenant":"acme"},"input":"hello"}"#,
        )
        .unwrap();
        assert_eq!(body.context.tenant.as_deref(), Some("acme"));
        assert_eq!(body.options, CallOptions::default());
    }

    #[test]
    fn test_call_request_with_options() {
        let body: CallRequest = serde_json::from_str(
            r#"{
                "context": {"topic": "x", "emergency": true},
                "input": "hello",
                "options": {"temperature": 0.3, "tools": ["a", "b"], "system_prompt": "s"}
            }"#,
        )
        .unwrap();
        assert!(body.context.emergency);
        assert_eq!(body.options.tools.len(), 2);
        assert_eq!(body.options.system_prompt.as_deref(), Some("s"));
    }
}
