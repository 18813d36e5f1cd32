//! Adapter for OpenAI-compatible `/chat/completions` endpoints.

use async_trait::async_trait;
use reqwest::header;
use std::time::Instant;

use super::types::{ModelRequest, ModelResponse, Usage};
use super::ProviderAdapter;
use crate::config::ProviderConfig;
use crate::error::ProviderError;

/// Calls a configured provider endpoint over HTTP and prices the result
/// with the provider's per-million-token rates.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleAdapter {
    config: ProviderConfig,
    http_client: reqwest::Client,
}

impl OpenAiCompatibleAdapter {
    pub fn new(config: ProviderConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.url.trim_end_matches('/'))
    }

    fn body(&self, request: &ModelRequest) -> serde_json::Value {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.options.system_prompt {
            messages.push(serde_json::json!({ "role": "system", "content": system }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": request.input }));

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
        });
        if let Some(obj) = body.as_object_mut() {
            if let Some(temperature) = request.options.temperature {
                obj.insert("temperature".to_string(), serde_json::json!(temperature));
            }
            if let Some(max_tokens) = request.options.max_tokens {
                obj.insert("max_tokens".to_string(), serde_json::json!(max_tokens));
            }
            if !request.options.tools.is_empty() {
                let tools: Vec<serde_json::Value> = request
                    .options
                    .tools
                    .iter()
                    .map(|name| {
                        serde_json::json!({
                            "type": "function",
                            "function": {
                                "name": name,
                                "parameters": { "type": "object", "properties": {} }
                            }
                        })
                    })
                    .collect();
                obj.insert("tools".to_string(), serde_json::Value::Array(tools));
            }
        }
        body
    }

    /// USD cost of a call at this provider's configured rates.
    pub fn cost_usd(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / 1_000_000.0) * self.config.input_cost_per_1m
            + (output_tokens as f64 / 1_000_000.0) * self.config.output_cost_per_1m
    }

    fn error(&self, message: impl Into<String>) -> ProviderError {
        ProviderError::new(self.config.name.clone(), message)
    }
}

/// Extract `(prompt_tokens, completion_tokens)` from a completion body.
fn extract_usage(response: &serde_json::Value) -> Option<(u64, u64)> {
    let usage = response.get("usage")?;
    let input = usage.get("prompt_tokens")?.as_u64()?;
    let output = usage.get("completion_tokens")?.as_u64()?;
    Some((input, output))
}

/// Extract the first choice's message content.
fn extract_output(response: &serde_json::Value) -> Option<String> {
    response
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatibleAdapter {
    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse, ProviderError> {
        let start = Instant::now();

        let mut upstream = self
            .http_client
            .post(self.endpoint())
            .header(header::CONTENT_TYPE, "application/json")
            .json(&self.body(request));

        if let Some(api_key) = &self.config.api_key {
            upstream = upstream.header(
                header::AUTHORIZATION,
                format!("Bearer {}", api_key.expose_secret()),
            );
        }

        let response = upstream
            .send()
            .await
            .map_err(|e| self.error(format!("Failed to reach provider: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::debug!(
                provider = %self.config.name,
                status = %status,
                body = %error_body,
                "Provider returned error"
            );
            return Err(self
                .error(format!("Provider returned {}: {}", status, error_body))
                .with_status(status.as_u16()));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| self.error(format!("Failed to parse response: {}", e)))?;

        let output = extract_output(&body)
            .ok_or_else(|| self.error("Response contained no message content"))?;
        let (input_tokens, output_tokens) = extract_usage(&body).unwrap_or_else(|| {
            tracing::warn!(provider = %self.config.name, "Response carried no usage; cost recorded as zero");
            (0, 0)
        });

        let model = body
            .get("model")
            .and_then(|m| m.as_str())
            .unwrap_or(request.model.as_str())
            .to_string();

        Ok(ModelResponse {
            output,
            usage: Usage::new(
                input_tokens,
                output_tokens,
                self.cost_usd(input_tokens, output_tokens),
            ),
            latency_ms: start.elapsed().as_millis() as u64,
            model,
            provider: self.config.name.clone(),
        })
    }
}
