//! Care-agent specialization of the model router.
//!
//! Projects an application-level urgency and agent type onto a
//! [`RouteContext`] and [`CallOptions`]; everything else is the generic router.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::provider::{CallOptions, ModelResponse};
use crate::router::{CallOutcome, ModelRouter, RiskLevel, RouteContext};

/// How quickly a request needs a clinically safe answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Routine,
    Urgent,
    Emergency,
}

impl Urgency {
    pub fn risk(self) -> RiskLevel {
        match self {
            Urgency::Routine => RiskLevel::Low,
            Urgency::Urgent => RiskLevel::High,
            Urgency::Emergency => RiskLevel::Critical,
        }
    }

    pub fn is_emergency(self) -> bool {
        self == Urgency::Emergency
    }
}

/// The care agents the platform runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Planner,
    Coordinator,
    Reviewer,
}

impl AgentType {
    pub const ALL: [AgentType; 3] = [
        AgentType::Planner,
        AgentType::Coordinator,
        AgentType::Reviewer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AgentType::Planner => "planner",
            AgentType::Coordinator => "coordinator",
            AgentType::Reviewer => "reviewer",
        }
    }

    /// Routing topic for this agent, e.g. `healthcare.planner`.
    pub fn topic(self) -> String {
        format!("healthcare.{}", self.as_str())
    }

    pub fn profile(self) -> &'static AgentProfile {
        match self {
            AgentType::Planner => &PLANNER,
            AgentType::Coordinator => &COORDINATOR,
            AgentType::Reviewer => &REVIEWER,
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "planner" => Ok(AgentType::Planner),
            "coordinator" => Ok(AgentType::Coordinator),
            "reviewer" => Ok(AgentType::Reviewer),
            _ => Err(Error::BadRequest(format!(
                "Unknown agent type '{}'. Supported: planner, coordinator, reviewer",
                s
            ))),
        }
    }
}

/// System prompt and tool list injected for an agent.
#[derive(Debug, PartialEq, Eq)]
pub struct AgentProfile {
    pub system_prompt: &'static str,
    pub tools: &'static [&'static str],
}

static PLANNER: AgentProfile = AgentProfile {
    system_prompt: "You are a care planning assistant for older adults who want to age in place. \
        From the home and health assessment provided, produce a prioritized plan of home \
        modifications and support services, safety items first. Flag anything that needs \
        review by a clinician.",
    tools: &["assess_fall_risk", "recommend_modifications", "estimate_costs"],
};

static COORDINATOR: AgentProfile = AgentProfile {
    system_prompt: "You coordinate services for an older adult aging in place: contractors, \
        home health visits and family caregivers. Turn the approved plan into a schedule, \
        name who is responsible for each step and call out every handoff.",
    tools: &["search_providers", "schedule_visit", "notify_caregiver"],
};

static REVIEWER: AgentProfile = AgentProfile {
    system_prompt: "You review home care plans for clinical safety, accessibility compliance \
        and cost. List concrete issues and the change each one requires. Do not rewrite the plan.",
    tools: &["check_guidelines", "validate_accessibility"],
};

/// A request addressed to one care agent.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HealthcareRequest {
    pub input: String,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Structured assessment data appended to the prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// [`ModelRouter`] with care-agent request shaping.
#[derive(Debug)]
pub struct HealthcareRouter {
    router: ModelRouter,
}

impl HealthcareRouter {
    pub fn new(router: ModelRouter) -> Self {
        Self { router }
    }

    /// The underlying generic router.
    pub fn router(&self) -> &ModelRouter {
        &self.router
    }

    /// Routing context for an agent request.
    pub fn route_context(agent: AgentType, request: &HealthcareRequest) -> RouteContext {
        RouteContext {
            topic: agent.topic(),
            tenant: request.tenant.clone(),
            risk: Some(request.urgency.risk()),
            user_id: request.user_id.clone(),
            emergency: request.urgency.is_emergency(),
        }
    }

    /// Model options carrying the agent's prompt and tools.
    pub fn call_options(agent: AgentType, request: &HealthcareRequest) -> CallOptions {
        let profile = agent.profile();
        CallOptions {
            temperature: None,
            max_tokens: request.max_tokens,
            tools: profile.tools.iter().map(|t| t.to_string()).collect(),
            system_prompt: Some(profile.system_prompt.to_string()),
        }
    }

    /// Prompt text: the request input, followed by any assessment context.
    pub fn render_input(request: &HealthcareRequest) -> String {
        match &request.context {
            Some(context) if !context.is_null() => {
                let rendered = serde_json::to_string_pretty(context)
                    .unwrap_or_else(|_| context.to_string());
                format!("{}\n\nContext:\n{}", request.input, rendered)
            }
            _ => request.input.clone(),
        }
    }

    /// Run a care agent and return the model response.
    pub async fn call_healthcare_agent(
        &self,
        agent: AgentType,
        request: &HealthcareRequest,
    ) -> Result<ModelResponse> {
        self.call_healthcare_agent_detailed(agent, request)
            .await
            .map(|outcome| outcome.response)
    }

    /// Run a care agent and return the response with routing metadata.
    pub async fn call_healthcare_agent_detailed(
        &self,
        agent: AgentType,
        request: &HealthcareRequest,
    ) -> Result<CallOutcome> {
        if request.input.trim().is_empty() {
            return Err(Error::BadRequest("input must not be empty".to_string()));
        }

        let context = Self::route_context(agent, request);
        let options = Self::call_options(agent, request);
        let input = Self::render_input(request);

        tracing::info!(
            agent = %agent,
            urgency = ?request.urgency,
            tenant = ?request.tenant,
            "Dispatching care agent request"
        );

        self.router.call_detailed(&context, &input, &options).await
    }
}
