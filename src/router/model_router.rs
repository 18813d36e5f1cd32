//! Request execution: route, admit, invoke, record.

use std::sync::Arc;
use std::time::Instant;

use super::budget;
use super::fallback::{self, AttemptRecord};
use super::route::{Route, RouteContext, EMERGENCY_PROVIDER};
use super::selector::RouteSelector;
use crate::config::{Config, ConfigError, HardLimits};
use crate::error::{Error, Result};
use crate::ledger::{CallRecord, CostLedger, LedgerStats};
use crate::provider::{AdapterRegistry, CallOptions, ModelRequest, ModelResponse};

/// Result of a successful call, with the routing metadata behind it.
#[derive(Debug, Clone)]
pub struct CallOutcome {
    pub response: ModelResponse,
    pub route: Route,
    /// The ledger entry appended for this call
    pub record: CallRecord,
    /// Fallback candidates that failed before the one that answered
    pub attempts: Vec<AttemptRecord>,
}

/// Provider/model/temperature for a single attempt.
struct Target {
    provider: String,
    model: String,
    temperature: Option<f32>,
}

impl From<&Route> for Target {
    fn from(route: &Route) -> Self {
        Self {
            provider: route.provider.clone(),
            model: route.model.clone(),
            temperature: route.temperature,
        }
    }
}

/// Routes calls to provider adapters under spend ceilings.
pub struct ModelRouter {
    selector: RouteSelector,
    adapters: AdapterRegistry,
    limits: HardLimits,
    ledger: Arc<CostLedger>,
}

impl ModelRouter {
    /// Create a router with its own empty ledger.
    pub fn from_config(
        config: &Config,
        adapters: AdapterRegistry,
    ) -> std::result::Result<Self, ConfigError> {
        Self::with_ledger(config, adapters, Arc::new(CostLedger::new()))
    }

    /// Create a router recording into an existing ledger.
    pub fn with_ledger(
        config: &Config,
        adapters: AdapterRegistry,
        ledger: Arc<CostLedger>,
    ) -> std::result::Result<Self, ConfigError> {
        let selector = RouteSelector::new(config.routing.rules.clone(), config.llm.clone())?;
        Ok(Self::new(selector, adapters, config.cost.hard_limits, ledger))
    }

    pub fn new(
        selector: RouteSelector,
        adapters: AdapterRegistry,
        limits: HardLimits,
        ledger: Arc<CostLedger>,
    ) -> Self {
        let router = Self {
            selector,
            adapters,
            limits,
            ledger,
        };
        router.warn_unresolved_providers();
        router
    }

    /// Providers reachable through routing with no registered adapter, sorted.
    ///
    /// Covers the system default, every rule and candidate, and the emergency
    /// override.
    pub fn unresolved_providers(&self) -> Vec<&str> {
        let defaults = self.selector.defaults();
        let mut referenced = vec![defaults.default_provider.as_str(), EMERGENCY_PROVIDER];
        for rule in self.selector.rules() {
            referenced.push(
                rule.provider
                    .as_deref()
                    .unwrap_or(defaults.default_provider.as_str()),
            );
            referenced.extend(rule.candidates.iter().map(|c| c.provider.as_str()));
        }
        referenced.sort_unstable();
        referenced.dedup();
        referenced.retain(|provider| !self.adapters.contains(provider));
        referenced
    }

    fn warn_unresolved_providers(&self) {
        for provider in self.unresolved_providers() {
            tracing::warn!(
                provider = %provider,
                "No adapter registered for a routed provider - calls to it will fail"
            );
        }
    }

    /// Resolve the route for a context.
    pub fn select_route(&self, context: &RouteContext) -> Route {
        self.selector.select(context)
    }

    /// Fail if any spend ceiling has already been reached.
    pub fn check_budget_constraints(&self, context: &RouteContext, route: &Route) -> Result<()> {
        budget::check_budget_constraints(&self.ledger, &self.limits, context, route)
    }

    /// Route and execute a call, returning the model response.
    pub async fn call(
        &self,
        context: &RouteContext,
        input: &str,
        options: &CallOptions,
    ) -> Result<ModelResponse> {
        self.call_detailed(context, input, options)
            .await
            .map(|outcome| outcome.response)
    }

    /// Route and execute a call, returning the response with routing metadata.
    pub async fn call_detailed(
        &self,
        context: &RouteContext,
        input: &str,
        options: &CallOptions,
    ) -> Result<CallOutcome> {
        let route = self.select_route(context);
        self.check_budget_constraints(context, &route)?;

        tracing::debug!(
            route = %route.name,
            provider = %route.provider,
            model = %route.model,
            strategy = %route.strategy,
            topic = %context.topic,
            "Executing call"
        );

        let (response, attempts) = if route.is_fallback() {
            let outcome = fallback::run_chain(
                &route.candidates,
                |candidate| {
                    let target = Target {
                        provider: candidate.provider.clone(),
                        model: candidate.model.clone(),
                        temperature: candidate.temperature,
                    };
                    self.attempt(target, input, options, &route)
                },
                |attempts, last| Error::FallbackExhausted {
                    attempts,
                    last_error: last
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "no candidates configured".to_string()),
                },
            )
            .await;
            (outcome.result?, outcome.attempts)
        } else {
            let response = self
                .attempt(Target::from(&route), input, options, &route)
                .await?;
            (response, Vec::new())
        };

        let record = self.ledger.record_call(&response, context.tenant.as_deref());

        tracing::info!(
            route = %route.name,
            provider = %response.provider,
            model = %response.model,
            cost_usd = response.usage.cost,
            latency_ms = response.latency_ms,
            tenant = ?context.tenant,
            failed_candidates = attempts.len(),
            "Call completed"
        );

        Ok(CallOutcome {
            response,
            route,
            record,
            attempts,
        })
    }

    /// One adapter invocation, timed and checked against the route's soft bounds.
    async fn attempt(
        &self,
        target: Target,
        input: &str,
        options: &CallOptions,
        route: &Route,
    ) -> Result<ModelResponse> {
        let adapter = self
            .adapters
            .get(&target.provider)
            .ok_or_else(|| Error::MissingAdapter {
                provider: target.provider.clone(),
            })?;

        let mut merged = options.with_route_temperature(target.temperature);
        if merged.temperature.is_none() {
            merged.temperature = Some(self.selector.defaults().temperature);
        }

        let request = ModelRequest {
            model: target.model.clone(),
            input: input.to_string(),
            options: merged,
        };

        let start = Instant::now();
        let mut response = adapter.invoke(&request).await?;
        let latency_ms = start.elapsed().as_millis() as u64;

        // The ledger keys on the provider the route dispatched to.
        response.provider = target.provider;
        if response.model.is_empty() {
            response.model = target.model;
        }
        response.latency_ms = latency_ms;

        if let Some(bounds) = route.budget {
            if let Some(max_latency_ms) = bounds.max_latency_ms {
                if latency_ms > max_latency_ms {
                    tracing::warn!(
                        route = %route.name,
                        provider = %response.provider,
                        latency_ms,
                        max_latency_ms,
                        "Call exceeded route latency budget"
                    );
                }
            }
            if let Some(max_cost_usd) = bounds.max_cost_usd {
                if response.usage.cost > max_cost_usd {
                    tracing::warn!(
                        route = %route.name,
                        provider = %response.provider,
                        cost_usd = response.usage.cost,
                        max_cost_usd,
                        "Call exceeded route cost budget"
                    );
                }
            }
        }

        Ok(response)
    }

    /// Ledger totals and current spend windows.
    pub fn stats(&self) -> LedgerStats {
        self.ledger.stats()
    }

    pub fn ledger(&self) -> &Arc<CostLedger> {
        &self.ledger
    }

    pub fn selector(&self) -> &RouteSelector {
        &self.selector
    }

    pub fn limits(&self) -> &HardLimits {
        &self.limits
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }
}

impl std::fmt::Debug for ModelRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRouter")
            .field("selector", &self.selector)
            .field("adapters", &self.adapters)
            .field("limits", &self.limits)
            .field("recorded_calls", &self.ledger.len())
            .finish()
    }
}
