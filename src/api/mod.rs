//! HTTP API module for the payroll engine.
//!
//! A thin JSON adapter over [`crate::payroll::PayrollEngine`]: run
//! finalization, reversal, bulk processing and period transitions.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{BulkRequest, FinalizeRequest, ReversalRequest};
pub use response::{ApiError, ApiErrorResponse};
pub use state::AppState;
