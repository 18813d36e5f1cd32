//! Error types for caregate.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Result type alias for caregate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Which spend ceiling rejected a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ceiling {
    Daily,
    Monthly,
    PerTenant,
}

impl std::fmt::Display for Ceiling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ceiling::Daily => write!(f, "Daily"),
            Ceiling::Monthly => write!(f, "Monthly"),
            Ceiling::PerTenant => write!(f, "Tenant"),
        }
    }
}

/// Failure reported by a provider adapter.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{provider}: {message}")]
pub struct ProviderError {
    pub provider: String,
    pub message: String,
    /// Upstream HTTP status, when the failure came from an HTTP response
    pub status_code: Option<u16>,
}

impl ProviderError {
    pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            message: message.into(),
            status_code: None,
        }
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }
}

/// Main error type for caregate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("No adapter registered for provider '{provider}'")]
    MissingAdapter { provider: String },

    #[error("{ceiling} budget exceeded: ${current:.2} spent of ${limit:.2} limit")]
    BudgetExceeded {
        ceiling: Ceiling,
        current: f64,
        limit: f64,
    },

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("All {attempts} fallback candidates failed. Last error: {last_error}")]
    FallbackExhausted { attempts: usize, last_error: String },

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Error {
    /// HTTP status used when this error reaches an API client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Config(_) | Error::MissingAdapter { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::BudgetExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::Provider(_) | Error::FallbackExhausted { .. } => StatusCode::BAD_GATEWAY,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Internal(_) | Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            Error::Config(_) | Error::MissingAdapter { .. } => "configuration_error",
            Error::BudgetExceeded { .. } => "budget_exceeded",
            Error::Provider(_) => "provider_error",
            Error::FallbackExhausted { .. } => "fallback_exhausted",
            Error::BadRequest(_) => "invalid_request",
            Error::Internal(_) | Error::Database(_) => "internal_error",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": {
                "message": self.to_string(),
                "type": self.error_type(),
                "code": status.as_u16()
            }
        });

        (status, axum::Json(body)).into_response()
    }
}
