//! Routing context and resolved routes.

use serde::{Deserialize, Serialize};

use crate::config::{Candidate, LlmConfig, RouteBudget, RouteRule, RouteStrategy};

/// Name reported for the emergency override route.
pub const EMERGENCY_ROUTE: &str = "emergency_override";
/// Provider used for every emergency call.
pub const EMERGENCY_PROVIDER: &str = "anthropic";
/// Highest-quality model, used for every emergency call.
pub const EMERGENCY_MODEL: &str = "claude-3-opus-20240229";
/// Name reported when no rule matched.
pub const DEFAULT_ROUTE: &str = "default";

/// Clinical risk level attached to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

/// Per-call routing input.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RouteContext {
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub emergency: bool,
}

impl RouteContext {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Default::default()
        }
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk = Some(risk);
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn emergency(mut self) -> Self {
        self.emergency = true;
        self
    }
}

/// A fully resolved route.
///
/// `temperature` is `None` only when the matched rule left it unset, in which
/// case the caller's temperature (or the system default) applies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub name: String,
    pub provider: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub strategy: RouteStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<RouteBudget>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<Candidate>,
}

impl Route {
    /// The hard-coded route every emergency request takes.
    pub fn emergency() -> Self {
        Self {
            name: EMERGENCY_ROUTE.to_string(),
            provider: EMERGENCY_PROVIDER.to_string(),
            model: EMERGENCY_MODEL.to_string(),
            temperature: Some(0.0),
            strategy: RouteStrategy::Default,
            budget: Some(RouteBudget {
                max_cost_usd: Some(10.0),
                max_latency_ms: Some(60_000),
            }),
            candidates: Vec::new(),
        }
    }

    /// The system default route, taken when no rule matches.
    pub fn system_default(llm: &LlmConfig) -> Self {
        Self {
            name: DEFAULT_ROUTE.to_string(),
            provider: llm.default_provider.clone(),
            model: llm.default_model.clone(),
            temperature: Some(llm.temperature),
            strategy: RouteStrategy::Default,
            budget: None,
            candidates: Vec::new(),
        }
    }

    /// Resolve a rule, filling unset provider/model from the system defaults.
    pub fn from_rule(rule: &RouteRule, llm: &LlmConfig) -> Self {
        Self {
            name: rule.name.clone(),
            provider: rule
                .provider
                .clone()
                .unwrap_or_else(|| llm.default_provider.clone()),
            model: rule
                .model
                .clone()
                .unwrap_or_else(|| llm.default_model.clone()),
            temperature: rule.temperature,
            strategy: rule.strategy,
            budget: rule.budget,
            candidates: rule.candidates.clone(),
        }
    }

    /// Whether this route runs a fallback chain.
    pub fn is_fallback(&self) -> bool {
        self.strategy == RouteStrategy::Fallback && !self.candidates.is_empty()
    }
}
