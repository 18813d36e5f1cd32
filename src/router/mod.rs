//! Model routing.
//!
//! This module handles:
//! - Resolving a request topic to a provider/model route
//! - Enforcing spend ceilings before any provider is invoked
//! - Executing single routes and fallback chains

mod budget;
pub mod fallback;
mod model_router;
mod pattern;
mod route;
mod selector;

pub use budget::{check_budget_constraints, check_budget_constraints_at};
pub use fallback::{format_attempts, AttemptRecord};
pub use model_router::{CallOutcome, ModelRouter};
pub use pattern::TopicPattern;
pub use route::{
    RiskLevel, Route, RouteContext, DEFAULT_ROUTE, EMERGENCY_MODEL, EMERGENCY_PROVIDER,
    EMERGENCY_ROUTE,
};
pub use selector::RouteSelector;
