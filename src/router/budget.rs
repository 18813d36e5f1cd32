//! Spend ceiling enforcement.

use chrono::{DateTime, Local, TimeZone};

use super::route::{Route, RouteContext};
use crate::config::HardLimits;
use crate::error::{Ceiling, Error, Result};
use crate::ledger::CostLedger;

/// Reject the call if any configured ceiling is already reached.
///
/// Checks run in order daily, monthly, per-tenant; the first breach wins.
/// A spend equal to the ceiling counts as exceeded, as does a non-finite
/// (NaN) ceiling.
pub fn check_budget_constraints(
    ledger: &CostLedger,
    limits: &HardLimits,
    context: &RouteContext,
    route: &Route,
) -> Result<()> {
    check_budget_constraints_at(ledger, limits, context, route, &Local::now())
}

/// [`check_budget_constraints`] evaluated against an explicit clock.
pub fn check_budget_constraints_at<Tz: TimeZone>(
    ledger: &CostLedger,
    limits: &HardLimits,
    context: &RouteContext,
    route: &Route,
    now: &DateTime<Tz>,
) -> Result<()> {
    if let Some(limit) = limits.daily {
        let current = ledger.daily_spend_at(now, None);
        ensure_below(Ceiling::Daily, current, limit, context, route)?;
    }

    if let Some(limit) = limits.monthly {
        let current = ledger.monthly_spend_at(now, None);
        ensure_below(Ceiling::Monthly, current, limit, context, route)?;
    }

    if let (Some(limit), Some(tenant)) = (limits.per_tenant, context.tenant.as_deref()) {
        let current = ledger.tenant_spend(tenant);
        ensure_below(Ceiling::PerTenant, current, limit, context, route)?;
    }

    Ok(())
}

fn ensure_below(
    ceiling: Ceiling,
    current: f64,
    limit: f64,
    context: &RouteContext,
    route: &Route,
) -> Result<()> {
    if current >= limit || limit.is_nan() {
        tracing::warn!(
            ceiling = %ceiling,
            current,
            limit,
            tenant = ?context.tenant,
            route = %route.name,
            "Budget ceiling reached, rejecting call"
        );
        return Err(Error::BudgetExceeded {
            ceiling,
            current,
            limit,
        });
    }
    Ok(())
}
