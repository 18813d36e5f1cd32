//! Call audit rows and their database writes.

use sqlx::SqlitePool;

use crate::router::CallOutcome;

/// A recorded call ready for database insertion.
///
/// All fields are owned types to satisfy `tokio::spawn` `'static` requirement.
#[derive(Debug, Clone)]
pub struct CallLog {
    pub request_id: String,
    pub timestamp: String,
    pub route: String,
    pub provider: String,
    pub model: String,
    pub tenant: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub latency_ms: u64,
    pub failed_candidates: usize,
}

impl CallLog {
    /// Build the audit row for a completed call.
    pub fn from_outcome(request_id: &str, outcome: &CallOutcome) -> Self {
        Self {
            request_id: request_id.to_string(),
            timestamp: outcome.record.timestamp.to_rfc3339(),
            route: outcome.route.name.clone(),
            provider: outcome.record.provider.clone(),
            model: outcome.record.model.clone(),
            tenant: outcome.record.tenant.clone(),
            input_tokens: outcome.record.input_tokens,
            output_tokens: outcome.record.output_tokens,
            cost_usd: outcome.record.cost,
            latency_ms: outcome.response.latency_ms,
            failed_candidates: outcome.attempts.len(),
        }
    }

    /// Insert this row into the database.
    pub async fn insert(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO calls (
                request_id, timestamp, route, provider, model, tenant,
                input_tokens, output_tokens, cost_usd, latency_ms, failed_candidates
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&self.request_id)
        .bind(&self.timestamp)
        .bind(&self.route)
        .bind(&self.provider)
        .bind(&self.model)
        .bind(self.tenant.as_deref())
        .bind(self.input_tokens as i64)
        .bind(self.output_tokens as i64)
        .bind(self.cost_usd)
        .bind(self.latency_ms as i64)
        .bind(self.failed_candidates as i64)
        .execute(pool)
        .await?;
        Ok(())
    }
}

/// Spawn a fire-and-forget database write.
///
/// If the write fails, a warning is logged but the error is not propagated.
pub fn spawn_log_write(pool: &SqlitePool, log: CallLog) {
    let pool = pool.clone();
    tokio::spawn(async move {
        if let Err(e) = log.insert(&pool).await {
            tracing::warn!(
                request_id = %log.request_id,
                error = %e,
                "Failed to write call audit row"
            );
        }
    });
}
