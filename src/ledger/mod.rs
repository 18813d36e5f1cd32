//! In-memory cost ledger.
//!
//! Append-only record of every successful model call, owned by a router
//! instance. Aggregations are linear scans over the full ledger; spend
//! windows use local day and month boundaries.

mod stats;

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Datelike, Local, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::ModelResponse;

pub use stats::{LedgerStats, ProviderStats};

/// One completed, billed call. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CallRecord {
    pub timestamp: DateTime<Utc>,
    pub provider: String,
    pub model: String,
    pub cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl CallRecord {
    /// Build a record stamped with the current time.
    pub fn from_response(response: &ModelResponse, tenant: Option<&str>) -> Self {
        Self {
            timestamp: Utc::now(),
            provider: response.provider.clone(),
            model: response.model.clone(),
            cost: response.usage.cost,
            tenant: tenant.map(str::to_string),
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
        }
    }
}

/// Append-only cost ledger.
///
/// Appends and scans hold the same lock, so a scan never observes a
/// half-written record. Admission against budget ceilings stays best-effort:
/// calls still in flight are not visible until they are recorded.
#[derive(Debug, Default)]
pub struct CostLedger {
    records: Mutex<Vec<CallRecord>>,
}

impl CostLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<CallRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append the record for a completed call and return it.
    pub fn record_call(&self, response: &ModelResponse, tenant: Option<&str>) -> CallRecord {
        let record = CallRecord::from_response(response, tenant);
        self.append(record.clone());
        record
    }

    /// Append a pre-built record.
    pub fn append(&self, record: CallRecord) {
        tracing::debug!(
            provider = %record.provider,
            model = %record.model,
            cost = record.cost,
            tenant = ?record.tenant,
            "Recorded call"
        );
        self.entries().push(record);
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Snapshot of all records in insertion order.
    pub fn records(&self) -> Vec<CallRecord> {
        self.entries().clone()
    }

    fn spend_where(&self, keep: impl Fn(&CallRecord) -> bool) -> f64 {
        self.entries()
            .iter()
            .filter(|record| keep(record))
            .map(|record| record.cost)
            .sum()
    }

    fn spend_since(&self, since: DateTime<Utc>, tenant: Option<&str>) -> f64 {
        self.spend_where(|record| {
            record.timestamp >= since && tenant.map_or(true, |t| record.tenant.as_deref() == Some(t))
        })
    }

    /// Spend since local midnight, optionally for one tenant.
    pub fn daily_spend(&self, tenant: Option<&str>) -> f64 {
        self.daily_spend_at(&Local::now(), tenant)
    }

    /// Spend since the start of `now`'s day in `now`'s time zone.
    pub fn daily_spend_at<Tz: TimeZone>(&self, now: &DateTime<Tz>, tenant: Option<&str>) -> f64 {
        self.spend_since(day_start(now), tenant)
    }

    /// Spend since the first of the local month, optionally for one tenant.
    pub fn monthly_spend(&self, tenant: Option<&str>) -> f64 {
        self.monthly_spend_at(&Local::now(), tenant)
    }

    /// Spend since the first of `now`'s month in `now`'s time zone.
    pub fn monthly_spend_at<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
        tenant: Option<&str>,
    ) -> f64 {
        self.spend_since(month_start(now), tenant)
    }

    /// All-time spend of one tenant.
    pub fn tenant_spend(&self, tenant: &str) -> f64 {
        self.spend_where(|record| record.tenant.as_deref() == Some(tenant))
    }

    /// Totals, averages, per-provider breakdown and current spend windows.
    pub fn stats(&self) -> LedgerStats {
        self.stats_at(&Local::now())
    }

    pub fn stats_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> LedgerStats {
        let mut stats = LedgerStats::from_records(&self.entries());
        stats.daily_spend = self.daily_spend_at(now, None);
        stats.monthly_spend = self.monthly_spend_at(now, None);
        stats
    }
}

/// Midnight of `now`'s local date, as UTC.
fn day_start<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    local_to_utc(now, midnight)
}

/// Midnight of the first of `now`'s local month, as UTC.
fn month_start<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let date = now.date_naive();
    let first = date.with_day(1).unwrap_or(date);
    local_to_utc(now, first.and_time(NaiveTime::MIN))
}

fn local_to_utc<Tz: TimeZone>(now: &DateTime<Tz>, local: chrono::NaiveDateTime) -> DateTime<Utc> {
    // A boundary inside a DST gap resolves to the earliest valid instant,
    // falling back to the naive time read as UTC.
    now.timezone()
        .from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&local))
}
