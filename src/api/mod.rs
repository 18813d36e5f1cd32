//! HTTP API module.
//!
//! Exposes route selection, routed calls, care-agent calls and ledger stats
//! to external callers such as the platform's REST backend.

mod handlers;
mod server;
pub mod types;

pub use handlers::{
    CAREGATE_COST_HEADER, CAREGATE_FAILED_CANDIDATES_HEADER, CAREGATE_LATENCY_HEADER,
    CAREGATE_PROVIDER_HEADER, CAREGATE_REQUEST_ID_HEADER, CAREGATE_ROUTE_HEADER,
};
pub use server::{create_router, run_server, AppState, RequestId};
pub use types::{CallRequest, RoutesResponse};
