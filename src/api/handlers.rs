//! HTTP request handlers.

use axum::{
    extract::{Extension, Path, State},
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};

use super::server::{AppState, RequestId};
use super::types::{CallRequest, RoutesResponse};
use crate::error::Error;
use crate::healthcare::{AgentType, HealthcareRequest};
use crate::router::{format_attempts, CallOutcome, Route, RouteContext};
use crate::storage::{spawn_log_write, CallLog};

/// Response header: correlation ID (UUID v4).
pub const CAREGATE_REQUEST_ID_HEADER: &str = "x-caregate-request-id";
/// Response header: name of the route that served the call.
pub const CAREGATE_ROUTE_HEADER: &str = "x-caregate-route";
/// Response header: provider that produced the response.
pub const CAREGATE_PROVIDER_HEADER: &str = "x-caregate-provider";
/// Response header: call cost in USD (decimal, six places).
pub const CAREGATE_COST_HEADER: &str = "x-caregate-cost-usd";
/// Response header: wall-clock latency of the answering attempt in milliseconds.
pub const CAREGATE_LATENCY_HEADER: &str = "x-caregate-latency-ms";
/// Response header: fallback candidates that failed first, e.g. `"anthropic/claude-3-5-sonnet"`.
pub const CAREGATE_FAILED_CANDIDATES_HEADER: &str = "x-caregate-failed-candidates";

fn insert_header(response: &mut Response, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(name), value);
    }
}

/// Attach routing metadata headers to a call response.
fn attach_call_headers(response: &mut Response, outcome: &CallOutcome) {
    insert_header(response, CAREGATE_ROUTE_HEADER, &outcome.route.name);
    insert_header(response, CAREGATE_PROVIDER_HEADER, &outcome.response.provider);
    insert_header(
        response,
        CAREGATE_COST_HEADER,
        &format!("{:.6}", outcome.response.usage.cost),
    );
    insert_header(
        response,
        CAREGATE_LATENCY_HEADER,
        &outcome.response.latency_ms.to_string(),
    );
    if let Some(failed) = format_attempts(&outcome.attempts) {
        insert_header(response, CAREGATE_FAILED_CANDIDATES_HEADER, &failed);
    }
}

/// Audit the call (fire-and-forget) and build the HTTP response.
fn finish_call(state: &AppState, request_id: RequestId, outcome: CallOutcome) -> Response {
    if let Some(pool) = &state.db {
        spawn_log_write(pool, CallLog::from_outcome(&request_id.0.to_string(), &outcome));
    }

    let mut response = Json(&outcome.response).into_response();
    attach_call_headers(&mut response, &outcome);
    response
}

/// Handle GET /health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "caregate"
    }))
}

/// Handle GET /v1/routes - configured rules, defaults and ceilings
pub async fn list_routes(State(state): State<AppState>) -> impl IntoResponse {
    let router = state.router.router();
    let selector = router.selector();

    Json(RoutesResponse {
        rules: selector.rules().cloned().collect(),
        default: Route::system_default(selector.defaults()),
        emergency: Route::emergency(),
        hard_limits: *router.limits(),
        providers: router
            .adapters()
            .names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

/// Handle POST /v1/routes/select - resolve a route without calling a model
pub async fn select_route(
    State(state): State<AppState>,
    Json(context): Json<RouteContext>,
) -> impl IntoResponse {
    Json(state.router.router().select_route(&context))
}

/// Handle POST /v1/calls
pub async fn create_call(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<CallRequest>,
) -> Result<Response, Error> {
    tracing::info!(
        request_id = %request_id.0,
        topic = %request.context.topic,
        tenant = ?request.context.tenant,
        emergency = request.context.emergency,
        "Received call request"
    );

    if request.input.trim().is_empty() {
        return Err(Error::BadRequest("input must not be empty".to_string()));
    }

    let outcome = state
        .router
        .router()
        .call_detailed(&request.context, &request.input, &request.options)
        .await?;

    Ok(finish_call(&state, request_id, outcome))
}

/// Handle POST /v1/agents/:agent_type
pub async fn call_agent(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(agent_type): Path<String>,
    Json(request): Json<HealthcareRequest>,
) -> Result<Response, Error> {
    let agent: AgentType = agent_type.parse()?;

    tracing::info!(
        request_id = %request_id.0,
        agent = %agent,
        urgency = ?request.urgency,
        "Received care agent request"
    );

    let outcome = state
        .router
        .call_healthcare_agent_detailed(agent, &request)
        .await?;

    Ok(finish_call(&state, request_id, outcome))
}

/// Handle GET /v1/stats
pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.router.router().stats())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Candidate, RouteStrategy};
    use crate::ledger::CallRecord;
    use crate::provider::{ModelResponse, Usage};
    use crate::router::AttemptRecord;

    fn outcome(attempts: Vec<AttemptRecord>) -> CallOutcome {
        let response = ModelResponse {
            output: "ok".to_string(),
            usage: Usage::new(10, 5, 0.0125),
            latency_ms: 321,
            model: "gpt-4o".to_string(),
            provider: "openai".to_string(),
        };
        CallOutcome {
            record: CallRecord::from_response(&response, None),
            response,
            route: Route {
                name: "care-plans".to_string(),
                provider: "anthropic".to_string(),
                model: "claude-3-5-sonnet".to_string(),
                temperature: None,
                strategy: RouteStrategy::Fallback,
                budget: None,
                candidates: vec![Candidate {
                    provider: "openai".to_string(),
                    model: "gpt-4o".to_string(),
                    temperature: None,
                }],
            },
            attempts,
        }
    }

    #[test]
    fn test_attach_call_headers() {
        let mut response = Json(serde_json::json!({})).into_response();
        attach_call_headers(&mut response, &outcome(vec![]));
        let headers = response.headers();
        assert_eq!(headers.get(CAREGATE_ROUTE_HEADER).unwrap(), "care-plans");
        assert_eq!(headers.get(CAREGATE_PROVIDER_HEADER).unwrap(), "openai");
        assert_eq!(headers.get(CAREGATE_COST_HEADER).unwrap(), "0.012500");
        assert_eq!(headers.get(CAREGATE_LATENCY_HEADER).unwrap(), "321");
        assert!(headers.get(CAREGATE_FAILED_CANDIDATES_HEADER).is_none());
    }

    #[test]
    fn test_attach_failed_candidates_header() {
        let mut response = Json(serde_json::json!({})).into_response();
        attach_call_headers(
            &mut response,
            &outcome(vec![AttemptRecord {
                provider: "anthropic".to_string(),
                model: "claude-3-5-sonnet".to_string(),
                message: "503".to_string(),
            }]),
        );
        assert_eq!(
            response
                .headers()
                .get(CAREGATE_FAILED_CANDIDATES_HEADER)
                .unwrap(),
            "anthropic/claude-3-5-sonnet"
        );
    }
}
