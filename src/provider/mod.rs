//! Provider adapters.
//!
//! The router is polymorphic over anything implementing [`ProviderAdapter`],
//! keyed by provider name in an [`AdapterRegistry`] supplied at construction.

mod openai;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ProviderConfig;
use crate::error::ProviderError;

pub use openai::OpenAiCompatibleAdapter;
pub use types::{CallOptions, ModelRequest, ModelResponse, Usage};

/// A backend able to execute one model call.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Execute the request. A returned error counts as a failed attempt.
    async fn invoke(&self, request: &ModelRequest) -> Result<ModelResponse, ProviderError>;
}

/// Provider name to adapter mapping.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one OpenAI-compatible adapter per configured provider endpoint.
    pub fn from_providers(providers: &[ProviderConfig], http_client: reqwest::Client) -> Self {
        let mut registry = Self::new();
        for provider in providers {
            registry.register(
                provider.name.clone(),
                Arc::new(OpenAiCompatibleAdapter::new(
                    provider.clone(),
                    http_client.clone(),
                )),
            );
        }
        registry
    }

    /// Register (or replace) the adapter for a provider name.
    pub fn register(&mut self, name: impl Into<String>, adapter: Arc<dyn ProviderAdapter>) {
        let name = name.into();
        if self.adapters.insert(name.clone(), adapter).is_some() {
            tracing::debug!(provider = %name, "Replaced provider adapter");
        }
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with(mut self, name: impl Into<String>, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.register(name, adapter);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ProviderAdapter>> {
        self.adapters.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("providers", &self.names())
            .finish()
    }
}
