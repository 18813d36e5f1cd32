//! caregate - Model routing and cost governance for care agents
//!
//! This library provides the core functionality for caregate,
//! including configuration, route selection, spend ceilings,
//! fallback chains and the HTTP API in front of them.

pub mod api;
pub mod config;
pub mod error;
pub mod healthcare;
pub mod ledger;
pub mod provider;
pub mod router;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use healthcare::{AgentType, HealthcareRequest, HealthcareRouter, Urgency};
pub use ledger::{CallRecord, CostLedger, LedgerStats};
pub use provider::{AdapterRegistry, CallOptions, ModelResponse, ProviderAdapter};
pub use router::{ModelRouter, Route, RouteContext};
