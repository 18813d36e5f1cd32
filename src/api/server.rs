//! HTTP server setup and configuration.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use reqwest::Client;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::handlers::{self, CAREGATE_REQUEST_ID_HEADER};
use crate::config::Config;
use crate::healthcare::HealthcareRouter;
use crate::provider::AdapterRegistry;
use crate::router::ModelRouter;
use crate::storage;

/// Correlation ID assigned to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<HealthcareRouter>,
    /// Audit database, present when `[database]` is configured
    pub db: Option<SqlitePool>,
}

/// Attach a fresh [`RequestId`] to the request and echo it on the response.
async fn assign_request_id(mut request: Request, next: Next) -> Response {
    let request_id = RequestId(Uuid::new_v4());
    request.extensions_mut().insert(request_id);

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id.0.to_string()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(CAREGATE_REQUEST_ID_HEADER), value);
    }
    response
}

/// Create the axum router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/v1/routes", get(handlers::list_routes))
        .route("/v1/routes/select", post(handlers::select_route))
        .route("/v1/calls", post(handlers::create_call))
        .route("/v1/agents/:agent_type", post(handlers::call_agent))
        .route("/v1/stats", get(handlers::stats))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(assign_request_id)),
        )
}

/// Run the HTTP server.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let listen_addr = config.server.listen.clone();

    let http_client = Client::builder()
        .timeout(Duration::from_secs(120))
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let adapters = AdapterRegistry::from_providers(&config.providers, http_client);
    let model_router = ModelRouter::from_config(&config, adapters)?;

    let db = match &config.database {
        Some(db_config) if config.logging.log_calls => {
            let pool = storage::init_pool(&db_config.path).await?;
            tracing::info!(path = %db_config.path, "Call audit log enabled");
            Some(pool)
        }
        _ => None,
    };

    let state = AppState {
        router: Arc::new(HealthcareRouter::new(model_router)),
        db,
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "Starting caregate server");

    axum::serve(listener, app).await?;

    Ok(())
}
