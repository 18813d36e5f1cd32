//! Request and response shapes exchanged with provider adapters.

use serde::{Deserialize, Serialize};

/// Caller-supplied model options.
///
/// `temperature` is overridden by the resolved route; every other field is
/// passed to the adapter unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CallOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl CallOptions {
    /// Apply a route's temperature on top of the caller's options.
    pub fn with_route_temperature(&self, temperature: Option<f32>) -> Self {
        let mut merged = self.clone();
        if temperature.is_some() {
            merged.temperature = temperature;
        }
        merged
    }
}

/// A single model invocation handed to an adapter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelRequest {
    pub model: String,
    pub input: String,
    pub options: CallOptions,
}

/// Token usage and USD cost of one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub cost: f64,
}

impl Usage {
    pub fn new(input_tokens: u64, output_tokens: u64, cost: f64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
            cost,
        }
    }
}

/// A completed model call.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModelResponse {
    pub output: String,
    pub usage: Usage,
    /// Wall-clock latency of the attempt that produced this response
    pub latency_ms: u64,
    pub model: String,
    pub provider: String,
}
