//! Request types for the payroll engine API.

use serde::{Deserialize, Serialize};

use crate::payroll::{BulkCheckpoint, BulkOptions};

/// Request body for `POST /periods/:period_id/runs/:employee_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeRequest {
    /// Jurisdiction whose compliance rules apply.
    pub jurisdiction: String,
}

/// Request body for `POST /periods/:period_id/runs/:employee_id/reversal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReversalRequest {
    /// Jurisdiction whose compliance rules apply.
    pub jurisdiction: String,
    /// Why the posted run is being replaced.
    pub reason: String,
}

/// Request body for `POST /periods/:period_id/bulk`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkRequest {
    /// Jurisdiction for employees that have none of their own.
    pub jurisdiction: String,
    /// Parallelism override.
    #[serde(default)]
    pub concurrency: Option<usize>,
    /// Recompute employees that already have a processed run.
    #[serde(default)]
    pub recompute_existing: bool,
    /// Checkpoint returned by an earlier, interrupted batch.
    #[serde(default)]
    pub checkpoint: BulkCheckpoint,
}

impl From<BulkRequest> for BulkOptions {
    fn from(req: BulkRequest) -> Self {
        BulkOptions {
            concurrency: req.concurrency,
            recompute_existing: req.recompute_existing,
            checkpoint: req.checkpoint,
            cancel: None,
        }
    }
}
