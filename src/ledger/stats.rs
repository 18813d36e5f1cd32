//! Ledger aggregates.

use std::collections::BTreeMap;

use serde::Serialize;

use super::CallRecord;

/// Call count and cost for one provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProviderStats {
    pub calls: usize,
    pub cost: f64,
}

/// Snapshot of ledger totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerStats {
    pub total_calls: usize,
    pub total_cost: f64,
    /// Mean cost per call; zero for an empty ledger
    pub average_cost: f64,
    pub daily_spend: f64,
    pub monthly_spend: f64,
    pub provider_stats: BTreeMap<String, ProviderStats>,
}

impl LedgerStats {
    /// Aggregate totals and the per-provider breakdown. Spend windows are
    /// filled in by the ledger.
    pub(super) fn from_records(records: &[CallRecord]) -> Self {
        let mut provider_stats: BTreeMap<String, ProviderStats> = BTreeMap::new();
        let mut total_cost = 0.0;

        for record in records {
            total_cost += record.cost;
            let entry = provider_stats.entry(record.provider.clone()).or_default();
            entry.calls += 1;
            entry.cost += record.cost;
        }

        let total_calls = records.len();
        let average_cost = if total_calls == 0 {
            0.0
        } else {
            total_cost / total_calls as f64
        };

        Self {
            total_calls,
            total_cost,
            average_cost,
            daily_spend: 0.0,
            monthly_spend: 0.0,
            provider_stats,
        }
    }
}
