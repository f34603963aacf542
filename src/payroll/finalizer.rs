//! Run finalizer: the payroll run state machine.
//!
//! [`PayrollEngine`] reads inputs through a [`PayrollStore`], computes with
//! [`compose_run`], and persists through a single [`PayrollStore::commit_run`]
//! call. Work on the same (period, employee) pair is serialized by an
//! advisory lock; different pairs run in parallel.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;
use uuid::Uuid;

use crate::calculation::{
    self, AttendanceBasisResult, AttendanceInputs, ComplianceResult, CompensationResolution,
    ComponentEvaluation, RuleBasedWithholding, WithholdingPolicy,
};
use crate::config::ReferenceData;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AttendanceBasis, AttendanceOverride, AttendanceRecord, CompensationRecord, Employee,
    PayrollPeriod, PayrollRun, PeriodStatus, RunStatus, month_bounds,
};

use super::compose::{RunCalculation, RunInputs, compose_run};
use super::store::{PayrollStore, RunCommit};

/// Version of the calculation code recorded on every run.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

type LockKey = (String, String);
type LockMap = DashMap<LockKey, Arc<Mutex<()>>>;

/// Held advisory lock for one (period, employee) pair.
///
/// The map entry is dropped on release once no other task is waiting on it.
struct PairLock<'a> {
    locks: &'a LockMap,
    key: LockKey,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for PairLock<'_> {
    fn drop(&mut self) {
        // One reference in the map, one in our guard.
        self.locks.remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 2);
    }
}

/// The payroll calculation engine.
///
/// Cheap to share behind an [`Arc`]; all methods take `&self`.
pub struct PayrollEngine {
    store: Arc<dyn PayrollStore>,
    reference: Arc<ReferenceData>,
    withholding: Arc<dyn WithholdingPolicy>,
    locks: LockMap,
}

impl PayrollEngine {
    /// Creates an engine with rule-based withholding.
    pub fn new(store: Arc<dyn PayrollStore>, reference: Arc<ReferenceData>) -> Self {
        Self::with_withholding(store, reference, Arc::new(RuleBasedWithholding))
    }

    /// Creates an engine with a custom withholding policy.
    pub fn with_withholding(
        store: Arc<dyn PayrollStore>,
        reference: Arc<ReferenceData>,
        withholding: Arc<dyn WithholdingPolicy>,
    ) -> Self {
        Self {
            store,
            reference,
            withholding,
            locks: DashMap::new(),
        }
    }

    /// Returns the store.
    pub fn store(&self) -> &Arc<dyn PayrollStore> {
        &self.store
    }

    /// Returns the reference-data snapshot.
    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    async fn lock_pair(&self, period_id: &str, employee_id: &str) -> PairLock<'_> {
        let key = (period_id.to_string(), employee_id.to_string());
        let mutex = self.locks.entry(key.clone()).or_default().clone();
        PairLock {
            locks: &self.locks,
            key,
            _guard: mutex.lock_owned().await,
        }
    }

    /// Resolves an employee's attendance basis for a month.
    pub fn resolve_attendance_basis(
        &self,
        employee_id: &str,
        month: u32,
        year: i32,
    ) -> EngineResult<AttendanceBasisResult> {
        let employee = self.store.employee(employee_id)?;
        let (records, override_record) = self.attendance_inputs(&employee, month, year)?;
        calculation::resolve_attendance_basis(
            AttendanceInputs {
                employee: &employee,
                month,
                year,
                records: &records,
                override_record: override_record.as_ref(),
            },
            self.reference.policy(),
            self.reference.holidays(),
            1,
        )
    }

    /// Resolves the compensation record active for an employee on a date.
    pub fn resolve_active_compensation(
        &self,
        employee_id: &str,
        date: NaiveDate,
    ) -> EngineResult<CompensationResolution> {
        let records = self.store.compensation_records(employee_id)?;
        calculation::resolve_active_compensation(employee_id, date, &records, 1)
    }

    /// Evaluates a compensation record's components against an attendance basis.
    pub fn evaluate_components(
        &self,
        basis: &AttendanceBasis,
        compensation: &CompensationRecord,
    ) -> EngineResult<ComponentEvaluation> {
        calculation::evaluate_components(
            basis,
            compensation,
            self.reference.catalogue(),
            &self.reference.policy().overtime,
            1,
        )
    }

    /// Applies the jurisdiction's compliance rules in force on `date`.
    pub fn apply_compliance(
        &self,
        evaluation: &ComponentEvaluation,
        jurisdiction: &str,
        date: NaiveDate,
    ) -> EngineResult<ComplianceResult> {
        calculation::apply_compliance(
            evaluation,
            jurisdiction,
            date,
            self.reference.compliance(),
            self.withholding.as_ref(),
            1,
        )
    }

    /// Computes and stores an employee's run for a draft period.
    ///
    /// Creates version 1, or replaces the current processed run in place
    /// (same version, new run id). Fails with `PreconditionFailed` and writes
    /// nothing when the period is not draft.
    pub async fn finalize_run(
        &self,
        period_id: &str,
        employee_id: &str,
        jurisdiction: &str,
    ) -> EngineResult<PayrollRun> {
        self.store.period(period_id)?;
        let employee = self.store.employee(employee_id)?;
        let _lock = self.lock_pair(period_id, employee_id).await;

        let period = self.store.period(period_id)?;
        if !period.is_open() {
            return Err(EngineError::precondition(format!(
                "period {} is {}; finalize requires draft",
                period.id, period.status
            )));
        }

        let current = self.store.current_run(period_id, employee_id)?;
        let calculation = self.calculate(&employee, &period, jurisdiction)?;

        let version = current.as_ref().map_or(1, |r| r.version);
        let run = self.build_run(
            &employee,
            &period,
            jurisdiction,
            version,
            RunStatus::Processed,
            calculation,
        );

        self.store.commit_run(RunCommit {
            run: run.clone(),
            expected_current: current.as_ref().map(|r| r.run_id),
            allowed_statuses: vec![PeriodStatus::Draft],
            supersede_current: false,
        })?;

        info!(
            period_id,
            employee_id,
            run_id = %run.run_id,
            version = run.version,
            net_pay = %run.totals.net_pay,
            duration_us = run.audit_trace.duration_us,
            "Finalized payroll run"
        );
        Ok(run)
    }

    /// Recomputes a run in a locked or posted period as a new version.
    ///
    /// The prior run is marked superseded and kept in history. Fails with
    /// `PreconditionFailed` in a draft period, and with `RunNotFound` when
    /// there is no run to reverse.
    pub async fn reverse_run(
        &self,
        period_id: &str,
        employee_id: &str,
        jurisdiction: &str,
        reason: &str,
    ) -> EngineResult<PayrollRun> {
        self.store.period(period_id)?;
        let employee = self.store.employee(employee_id)?;
        let _lock = self.lock_pair(period_id, employee_id).await;

        let period = self.store.period(period_id)?;
        let status = match period.status {
            PeriodStatus::Locked => RunStatus::Processed,
            PeriodStatus::Posted => RunStatus::Posted,
            PeriodStatus::Draft => {
                return Err(EngineError::precondition(format!(
                    "period {} is draft; finalize the run instead of reversing it",
                    period.id
                )));
            }
        };
        if reason.trim().is_empty() {
            return Err(EngineError::precondition("reversal requires a reason"));
        }

        let prior =
            self.store
                .current_run(period_id, employee_id)?
                .ok_or_else(|| EngineError::RunNotFound {
                    period_id: period_id.to_string(),
                    employee_id: employee_id.to_string(),
                })?;

        let calculation = self.calculate(&employee, &period, jurisdiction)?;
        let mut run = self.build_run(
            &employee,
            &period,
            jurisdiction,
            prior.version + 1,
            status,
            calculation,
        );
        run.supersedes = Some(prior.run_id);
        run.reversal_reason = Some(reason.to_string());

        self.store.commit_run(RunCommit {
            run: run.clone(),
            expected_current: Some(prior.run_id),
            allowed_statuses: vec![period.status],
            supersede_current: true,
        })?;

        info!(
            period_id,
            employee_id,
            run_id = %run.run_id,
            supersedes = %prior.run_id,
            version = run.version,
            net_pay = %run.totals.net_pay,
            "Reversed payroll run"
        );
        Ok(run)
    }

    /// Moves a draft period to locked.
    pub fn lock_period(&self, period_id: &str) -> EngineResult<PayrollPeriod> {
        self.transition(period_id, PeriodStatus::Draft, PeriodStatus::Locked)
    }

    /// Moves a locked period back to draft.
    pub fn unlock_period(&self, period_id: &str) -> EngineResult<PayrollPeriod> {
        self.transition(period_id, PeriodStatus::Locked, PeriodStatus::Draft)
    }

    /// Moves a locked period to posted; its processed runs become posted.
    pub fn post_period(&self, period_id: &str) -> EngineResult<PayrollPeriod> {
        self.transition(period_id, PeriodStatus::Locked, PeriodStatus::Posted)
    }

    fn transition(
        &self,
        period_id: &str,
        from: PeriodStatus,
        to: PeriodStatus,
    ) -> EngineResult<PayrollPeriod> {
        let period = self.store.transition_period(period_id, from, to)?;
        info!(period_id, from = %from, to = %to, "Period transitioned");
        Ok(period)
    }

    /// Returns the current run for a period and employee.
    pub fn current_run(&self, period_id: &str, employee_id: &str) -> EngineResult<PayrollRun> {
        self.store
            .current_run(period_id, employee_id)?
            .ok_or_else(|| EngineError::RunNotFound {
                period_id: period_id.to_string(),
                employee_id: employee_id.to_string(),
            })
    }

    /// Returns every version of a run, oldest first.
    pub fn run_history(&self, period_id: &str, employee_id: &str) -> EngineResult<Vec<PayrollRun>> {
        self.store.run_history(period_id, employee_id)
    }

    fn attendance_inputs(
        &self,
        employee: &Employee,
        month: u32,
        year: i32,
    ) -> EngineResult<(Vec<AttendanceRecord>, Option<AttendanceOverride>)> {
        let (first, last) = month_bounds(month, year)?;
        // Overnight rows for the last day may be dated the next morning.
        let records = self
            .store
            .attendance_records(&employee.id, first, last + Duration::days(1))?;
        let override_record = self.store.attendance_override(&employee.id, month, year)?;
        Ok((records, override_record))
    }

    fn calculate(
        &self,
        employee: &Employee,
        period: &PayrollPeriod,
        jurisdiction: &str,
    ) -> EngineResult<RunCalculation> {
        let (first, last) = period.bounds()?;
        if employee.organization_id != period.organization_id {
            return Err(EngineError::precondition(format!(
                "employee {} does not belong to organisation {}",
                employee.id, period.organization_id
            )));
        }
        if !employee.is_employed_during(first, last) {
            return Err(EngineError::precondition(format!(
                "employee {} is not employed during period {}",
                employee.id, period.id
            )));
        }

        let (attendance, override_record) =
            self.attendance_inputs(employee, period.month, period.year)?;
        let compensation = self.store.compensation_records(&employee.id)?;

        compose_run(
            RunInputs {
                employee,
                period,
                jurisdiction,
                attendance: &attendance,
                override_record: override_record.as_ref(),
                compensation: &compensation,
            },
            &self.reference,
            self.withholding.as_ref(),
        )
    }

    fn build_run(
        &self,
        employee: &Employee,
        period: &PayrollPeriod,
        jurisdiction: &str,
        version: u32,
        status: RunStatus,
        calculation: RunCalculation,
    ) -> PayrollRun {
        PayrollRun {
            run_id: Uuid::new_v4(),
            period_id: period.id.clone(),
            employee_id: employee.id.clone(),
            organization_id: period.organization_id.clone(),
            version,
            status,
            jurisdiction: jurisdiction.to_string(),
            reference_data_version: self.reference.version().to_string(),
            engine_version: ENGINE_VERSION.to_string(),
            computed_at: Utc::now(),
            attendance_basis: calculation.attendance_basis,
            compensation_id: calculation.compensation_id,
            components: calculation.components,
            statutory: calculation.statutory,
            totals: calculation.totals,
            warnings: calculation.warnings,
            audit_trace: calculation.audit_trace,
            supersedes: None,
            reversal_reason: None,
        }
    }
}
