//! Run lifecycle: persistence seam, finalizer and bulk orchestration.

mod bulk;
mod compose;
mod finalizer;
mod store;

pub use bulk::{BulkCheckpoint, BulkOptions, BulkReport, EmployeeOutcome, OutcomeStatus};
pub use compose::{RunCalculation, RunInputs, compose_run};
pub use finalizer::{ENGINE_VERSION, PayrollEngine};
pub use store::{InMemoryStore, PayrollStore, RunCommit};
