//! Shared fixtures for integration tests: configurable mock adapters and
//! router builders.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use caregate::config::{Config, HardLimits, LlmConfig, RouteRule};
use caregate::error::ProviderError;
use caregate::ledger::CostLedger;
use caregate::provider::{
    AdapterRegistry, ModelRequest, ModelResponse, ProviderAdapter, Usage,
};
use caregate::router::ModelRouter;

/// Adapter that succeeds with a fixed cost or always fails, counting calls.
pub struct MockAdapter {
    name: String,
    cost: f64,
    failure: Option<String>,
    delay: Option<Duration>,
    calls: AtomicU32,
    last_request: Mutex<Option<ModelRequest>>,
}

impl MockAdapter {
    pub fn ok(name: &str, cost: f64) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            cost,
            failure: None,
            delay: None,
            calls: AtomicU32::new(0),
            last_request: Mutex::new(None),
        })
    }

    pub fn failing(name: &str, message: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            cost: 0.0,
            failure: Some(message.to_string()),
            delay: None,
            calls: AtomicU32::new(0),
            last_request: Mutex::new(None),
        })
    }

    /// Succeeds after sleeping for `delay`.
    pub fn slow(name: &str, cost: f64, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            cost,
            failure: None,
            delay: Some(delay),
            calls: AtomicU32::new(0),
            last_request: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ModelRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderAdapter for MockAdapter {
    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = &self.failure {
            return Err(ProviderError::new(self.name.clone(), message.clone()).with_status(503));
        }

        Ok(ModelResponse {
            output: format!("{} answered {}", self.name, request.input),
            usage: Usage::new(100, 50, self.cost),
            latency_ms: 0,
            model: request.model.clone(),
            provider: self.name.clone(),
        })
    }
}

pub fn llm() -> LlmConfig {
    LlmConfig {
        default_provider: "openai".to_string(),
        default_model: "gpt-4o-mini".to_string(),
        temperature: 0.7,
    }
}

/// Parse routing rules from a TOML fragment of `[[routing.rules]]` tables.
pub fn config_with(routing_toml: &str) -> Config {
    let toml = format!(
        r#"
[llm]
default_provider = "openai"
default_model = "gpt-4o-mini"
temperature = 0.7

{routing_toml}
"#
    );
    Config::parse_str(&toml).unwrap()
}

pub fn rules(routing_toml: &str) -> Vec<RouteRule> {
    config_with(routing_toml).routing.rules
}

pub fn registry(adapters: &[(&str, Arc<MockAdapter>)]) -> AdapterRegistry {
    adapters
        .iter()
        .fold(AdapterRegistry::new(), |registry, (name, adapter)| {
            registry.with(*name, adapter.clone())
        })
}

/// Router over mock adapters with its own ledger.
pub fn router(
    routing_toml: &str,
    limits: HardLimits,
    adapters: &[(&str, Arc<MockAdapter>)],
) -> ModelRouter {
    let mut config = config_with(routing_toml);
    config.cost.hard_limits = limits;
    ModelRouter::with_ledger(&config, registry(adapters), Arc::new(CostLedger::new())).unwrap()
}
