//! Bulk finalization across an organisation's employees.
//!
//! Employees are finalized in parallel, bounded by a semaphore sized to the
//! store's connection budget. Each employee's result is captured on its own;
//! one failure never aborts the batch. The returned checkpoint lets a
//! cancelled or crashed batch resume without redoing finished employees.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult, ErrorKind};
use crate::models::RunStatus;

use super::finalizer::PayrollEngine;

/// Employees already handled by an earlier attempt of the same batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkCheckpoint {
    /// Ids that were processed or skipped.
    pub completed: BTreeSet<String>,
}

/// Options for [`PayrollEngine::bulk_finalize`].
#[derive(Debug, Clone, Default)]
pub struct BulkOptions {
    /// Maximum parallel finalizations; the policy default when `None`.
    pub concurrency: Option<usize>,
    /// Recompute employees that already have a processed run.
    pub recompute_existing: bool,
    /// Resume point from a previous attempt.
    pub checkpoint: BulkCheckpoint,
    /// Set to stop starting new employees.
    pub cancel: Option<Arc<AtomicBool>>,
}

/// What happened to one employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// A run was written.
    Processed,
    /// Already done; nothing written.
    Skipped,
    /// Finalization failed; nothing written.
    Failed,
    /// Not started because the batch was cancelled.
    Cancelled,
}

/// Per-employee result of a bulk finalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeOutcome {
    /// The employee.
    pub employee_id: String,
    /// The run written or found, if any.
    pub run_id: Option<Uuid>,
    /// Outcome status.
    pub status: OutcomeStatus,
    /// Error kind when failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Error message when failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EmployeeOutcome {
    fn new(employee_id: &str, status: OutcomeStatus, run_id: Option<Uuid>) -> Self {
        Self {
            employee_id: employee_id.to_string(),
            run_id,
            status,
            error_kind: None,
            error: None,
        }
    }

    fn failed(employee_id: &str, error: &EngineError) -> Self {
        Self {
            error_kind: Some(error.kind()),
            error: Some(error.to_string()),
            ..Self::new(employee_id, OutcomeStatus::Failed, None)
        }
    }
}

/// Result of a bulk finalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkReport {
    /// The period.
    pub period_id: String,
    /// One outcome per eligible employee, ordered by employee id.
    pub outcomes: Vec<EmployeeOutcome>,
    /// Checkpoint to pass to a resumed batch.
    pub checkpoint: BulkCheckpoint,
    /// Whether the batch stopped early.
    pub cancelled: bool,
}

impl BulkReport {
    /// Counts outcomes with a given status.
    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

impl PayrollEngine {
    /// Finalizes every eligible employee of the period's organisation.
    ///
    /// Eligible employees are those employed at some point in the period
    /// month. An employee's own jurisdiction overrides `default_jurisdiction`.
    /// Fails as a whole only when the period cannot be read or is not draft.
    pub async fn bulk_finalize(
        self: Arc<Self>,
        period_id: &str,
        default_jurisdiction: &str,
        options: BulkOptions,
    ) -> EngineResult<BulkReport> {
        let period = self.store().period(period_id)?;
        if !period.is_open() {
            return Err(EngineError::precondition(format!(
                "period {} is {}; bulk finalize requires draft",
                period.id, period.status
            )));
        }
        let (first, last) = period.bounds()?;

        let employees: Vec<_> = self
            .store()
            .employees_in_organization(&period.organization_id)?
            .into_iter()
            .filter(|e| e.is_employed_during(first, last))
            .collect();

        let concurrency = options
            .concurrency
            .unwrap_or(self.reference().policy().bulk.max_concurrency)
            .max(1);
        info!(
            period_id,
            employees = employees.len(),
            concurrency,
            resumed = options.checkpoint.completed.len(),
            "Starting bulk finalize"
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let is_cancelled = || {
            options
                .cancel
                .as_ref()
                .is_some_and(|flag| flag.load(Ordering::SeqCst))
        };

        let mut outcomes = Vec::with_capacity(employees.len());
        let mut handles: Vec<(String, JoinHandle<EmployeeOutcome>)> = Vec::new();

        for employee in employees {
            if options.checkpoint.completed.contains(&employee.id) {
                outcomes.push(EmployeeOutcome::new(&employee.id, OutcomeStatus::Skipped, None));
                continue;
            }
            if is_cancelled() {
                outcomes.push(EmployeeOutcome::new(&employee.id, OutcomeStatus::Cancelled, None));
                continue;
            }

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| EngineError::CalculationError {
                    message: format!("bulk worker pool closed: {e}"),
                })?;
            if is_cancelled() {
                outcomes.push(EmployeeOutcome::new(&employee.id, OutcomeStatus::Cancelled, None));
                continue;
            }

            let engine = Arc::clone(&self);
            let period_id = period.id.clone();
            let jurisdiction = employee
                .jurisdiction
                .clone()
                .unwrap_or_else(|| default_jurisdiction.to_string());
            let recompute = options.recompute_existing;
            let employee_id = employee.id.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                engine
                    .finalize_one(&period_id, &employee_id, &jurisdiction, recompute)
                    .await
            });
            handles.push((employee.id, handle));
        }

        for (employee_id, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => EmployeeOutcome::failed(
                    &employee_id,
                    &EngineError::CalculationError {
                        message: format!("worker task failed: {e}"),
                    },
                ),
            };
            outcomes.push(outcome);
        }

        outcomes.sort_by(|a, b| a.employee_id.cmp(&b.employee_id));

        let mut checkpoint = options.checkpoint.clone();
        checkpoint.completed.extend(
            outcomes
                .iter()
                .filter(|o| matches!(o.status, OutcomeStatus::Processed | OutcomeStatus::Skipped))
                .map(|o| o.employee_id.clone()),
        );

        let report = BulkReport {
            period_id: period.id.clone(),
            cancelled: outcomes.iter().any(|o| o.status == OutcomeStatus::Cancelled),
            outcomes,
            checkpoint,
        };
        info!(
            period_id,
            processed = report.count(OutcomeStatus::Processed),
            skipped = report.count(OutcomeStatus::Skipped),
            failed = report.count(OutcomeStatus::Failed),
            cancelled = report.cancelled,
            "Bulk finalize complete"
        );
        Ok(report)
    }

    async fn finalize_one(
        &self,
        period_id: &str,
        employee_id: &str,
        jurisdiction: &str,
        recompute_existing: bool,
    ) -> EmployeeOutcome {
        if !recompute_existing {
            match self.store().current_run(period_id, employee_id) {
                Ok(Some(run)) if run.status == RunStatus::Processed => {
                    return EmployeeOutcome::new(
                        employee_id,
                        OutcomeStatus::Skipped,
                        Some(run.run_id),
                    );
                }
                Ok(_) => {}
                Err(e) => return EmployeeOutcome::failed(employee_id, &e),
            }
        }

        match self.finalize_run(period_id, employee_id, jurisdiction).await {
            Ok(run) => {
                EmployeeOutcome::new(employee_id, OutcomeStatus::Processed, Some(run.run_id))
            }
            Err(e) => {
                warn!(period_id, employee_id, error = %e, "Employee failed in bulk finalize");
                EmployeeOutcome::failed(employee_id, &e)
            }
        }
    }
}
