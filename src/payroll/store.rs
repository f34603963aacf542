//! Storage abstraction for payroll data.
//!
//! The engine reads employees, periods, attendance and compensation through
//! [`PayrollStore`] and writes runs only via [`PayrollStore::commit_run`],
//! which re-checks the period status and the current run inside the same
//! critical section as the write. A database-backed store does this in one
//! transaction; [`InMemoryStore`] does it under a write lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    AttendanceOverride, AttendanceRecord, CompensationRecord, Employee, PayrollPeriod,
    PayrollRun, PeriodStatus, RunStatus,
};

/// A run write plus the state it was computed against.
#[derive(Debug, Clone)]
pub struct RunCommit {
    /// The run to persist.
    pub run: PayrollRun,
    /// Run id the writer saw as current, or `None` if there was none.
    pub expected_current: Option<Uuid>,
    /// Period statuses under which the write is allowed.
    pub allowed_statuses: Vec<PeriodStatus>,
    /// Mark the current run superseded and append, instead of replacing it.
    pub supersede_current: bool,
}

/// Persistence operations the engine depends on.
pub trait PayrollStore: Send + Sync {
    /// Gets an employee by id.
    fn employee(&self, employee_id: &str) -> EngineResult<Employee>;

    /// Lists an organisation's employees, sorted by id.
    fn employees_in_organization(&self, organization_id: &str) -> EngineResult<Vec<Employee>>;

    /// Gets a period by id.
    fn period(&self, period_id: &str) -> EngineResult<PayrollPeriod>;

    /// Lists an employee's attendance rows dated within `[from, to]`.
    fn attendance_records(
        &self,
        employee_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<Vec<AttendanceRecord>>;

    /// Gets the HR override for an employee-month, if any.
    fn attendance_override(
        &self,
        employee_id: &str,
        month: u32,
        year: i32,
    ) -> EngineResult<Option<AttendanceOverride>>;

    /// Lists every compensation record for an employee.
    fn compensation_records(&self, employee_id: &str) -> EngineResult<Vec<CompensationRecord>>;

    /// Gets the non-superseded run for a period and employee.
    fn current_run(&self, period_id: &str, employee_id: &str) -> EngineResult<Option<PayrollRun>>;

    /// Lists every run for a period and employee, oldest first.
    fn run_history(&self, period_id: &str, employee_id: &str) -> EngineResult<Vec<PayrollRun>>;

    /// Atomically checks preconditions and writes a run.
    ///
    /// Fails with `PreconditionFailed` and writes nothing when the period's
    /// status is not allowed or the current run is not `expected_current`.
    fn commit_run(&self, commit: RunCommit) -> EngineResult<()>;

    /// Moves a period from `from` to `to`.
    ///
    /// Fails with `PreconditionFailed` if the period is not in `from`. Moving
    /// to `Posted` also marks the period's processed runs as posted.
    fn transition_period(
        &self,
        period_id: &str,
        from: PeriodStatus,
        to: PeriodStatus,
    ) -> EngineResult<PayrollPeriod>;
}

type RunKey = (String, String);

#[derive(Debug, Default)]
struct Inner {
    employees: BTreeMap<String, Employee>,
    periods: HashMap<String, PayrollPeriod>,
    attendance: Vec<AttendanceRecord>,
    overrides: HashMap<(String, u32, i32), AttendanceOverride>,
    compensation: Vec<CompensationRecord>,
    runs: HashMap<RunKey, Vec<PayrollRun>>,
}

impl Inner {
    fn current(&self, key: &RunKey) -> Option<&PayrollRun> {
        self.runs
            .get(key)
            .and_then(|runs| runs.iter().find(|r| r.status != RunStatus::Superseded))
    }
}

/// In-process store used by tests and single-node deployments.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> EngineResult<RwLockReadGuard<'_, Inner>> {
        self.inner.read().map_err(|_| EngineError::Store {
            message: "store lock poisoned".to_string(),
        })
    }

    fn write(&self) -> EngineResult<RwLockWriteGuard<'_, Inner>> {
        self.inner.write().map_err(|_| EngineError::Store {
            message: "store lock poisoned".to_string(),
        })
    }

    /// Adds or replaces an employee.
    pub fn insert_employee(&self, employee: Employee) -> EngineResult<()> {
        self.write()?.employees.insert(employee.id.clone(), employee);
        Ok(())
    }

    /// Adds or replaces a period.
    pub fn insert_period(&self, period: PayrollPeriod) -> EngineResult<()> {
        self.write()?.periods.insert(period.id.clone(), period);
        Ok(())
    }

    /// Appends attendance rows.
    pub fn insert_attendance(
        &self,
        records: impl IntoIterator<Item = AttendanceRecord>,
    ) -> EngineResult<()> {
        self.write()?.attendance.extend(records);
        Ok(())
    }

    /// Adds or replaces an attendance override.
    pub fn insert_override(&self, override_record: AttendanceOverride) -> EngineResult<()> {
        let key = (
            override_record.employee_id.clone(),
            override_record.month,
            override_record.year,
        );
        self.write()?.overrides.insert(key, override_record);
        Ok(())
    }

    /// Appends a compensation record.
    pub fn insert_compensation(&self, record: CompensationRecord) -> EngineResult<()> {
        self.write()?.compensation.push(record);
        Ok(())
    }
}

impl PayrollStore for InMemoryStore {
    fn employee(&self, employee_id: &str) -> EngineResult<Employee> {
        self.read()?
            .employees
            .get(employee_id)
            .cloned()
            .ok_or_else(|| EngineError::EmployeeNotFound {
                employee_id: employee_id.to_string(),
            })
    }

    fn employees_in_organization(&self, organization_id: &str) -> EngineResult<Vec<Employee>> {
        Ok(self
            .read()?
            .employees
            .values()
            .filter(|e| e.organization_id == organization_id)
            .cloned()
            .collect())
    }

    fn period(&self, period_id: &str) -> EngineResult<PayrollPeriod> {
        self.read()?
            .periods
            .get(period_id)
            .cloned()
            .ok_or_else(|| EngineError::PeriodNotFound {
                period_id: period_id.to_string(),
            })
    }

    fn attendance_records(
        &self,
        employee_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<Vec<AttendanceRecord>> {
        Ok(self
            .read()?
            .attendance
            .iter()
            .filter(|r| r.employee_id == employee_id && r.date >= from && r.date <= to)
            .cloned()
            .collect())
    }

    fn attendance_override(
        &self,
        employee_id: &str,
        month: u32,
        year: i32,
    ) -> EngineResult<Option<AttendanceOverride>> {
        Ok(self
            .read()?
            .overrides
            .get(&(employee_id.to_string(), month, year))
            .cloned())
    }

    fn compensation_records(&self, employee_id: &str) -> EngineResult<Vec<CompensationRecord>> {
        Ok(self
            .read()?
            .compensation
            .iter()
            .filter(|r| r.employee_id == employee_id)
            .cloned()
            .collect())
    }

    fn current_run(&self, period_id: &str, employee_id: &str) -> EngineResult<Option<PayrollRun>> {
        let key = (period_id.to_string(), employee_id.to_string());
        Ok(self.read()?.current(&key).cloned())
    }

    fn run_history(&self, period_id: &str, employee_id: &str) -> EngineResult<Vec<PayrollRun>> {
        let key = (period_id.to_string(), employee_id.to_string());
        Ok(self.read()?.runs.get(&key).cloned().unwrap_or_default())
    }

    fn commit_run(&self, commit: RunCommit) -> EngineResult<()> {
        let mut inner = self.write()?;
        let run = commit.run;

        let status = inner
            .periods
            .get(&run.period_id)
            .map(|p| p.status)
            .ok_or_else(|| EngineError::PeriodNotFound {
                period_id: run.period_id.clone(),
            })?;
        if !commit.allowed_statuses.contains(&status) {
            return Err(EngineError::precondition(format!(
                "period {} is {}",
                run.period_id, status
            )));
        }

        let key = (run.period_id.clone(), run.employee_id.clone());
        let current_id = inner.current(&key).map(|r| r.run_id);
        if current_id != commit.expected_current {
            return Err(EngineError::precondition(format!(
                "run for employee {} in period {} changed concurrently",
                run.employee_id, run.period_id
            )));
        }

        let runs = inner.runs.entry(key).or_default();
        let current_index = runs.iter().position(|r| r.status != RunStatus::Superseded);
        match (current_index, commit.supersede_current) {
            (Some(index), true) => {
                runs[index].status = RunStatus::Superseded;
                runs.push(run);
            }
            (Some(index), false) => {
                if runs[index].status != RunStatus::Processed {
                    return Err(EngineError::precondition(format!(
                        "run {} is {} and cannot be recomputed",
                        runs[index].run_id, runs[index].status
                    )));
                }
                runs[index] = run;
            }
            (None, _) => runs.push(run),
        }

        debug!(runs = runs.len(), "Committed payroll run");
        Ok(())
    }

    fn transition_period(
        &self,
        period_id: &str,
        from: PeriodStatus,
        to: PeriodStatus,
    ) -> EngineResult<PayrollPeriod> {
        let mut inner = self.write()?;
        let period = inner
            .periods
            .get_mut(period_id)
            .ok_or_else(|| EngineError::PeriodNotFound {
                period_id: period_id.to_string(),
            })?;
        if period.status != from {
            return Err(EngineError::precondition(format!(
                "period {} is {}, expected {}",
                period_id, period.status, from
            )));
        }
        period.status = to;
        let period = period.clone();

        if to == PeriodStatus::Posted {
            for ((run_period, _), runs) in inner.runs.iter_mut() {
                if run_period != period_id {
                    continue;
                }
                for run in runs.iter_mut().filter(|r| r.status == RunStatus::Processed) {
                    run.status = RunStatus::Posted;
                }
            }
        }

        Ok(period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AttendanceBasis, AuditTrace, BasisSource, RunTotals, StatutoryBreakdown,
    };
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn period(status: PeriodStatus) -> PayrollPeriod {
        PayrollPeriod {
            id: "org_001-2026-02".to_string(),
            organization_id: "org_001".to_string(),
            month: 2,
            year: 2026,
            status,
        }
    }

    fn run(version: u32) -> PayrollRun {
        PayrollRun {
            run_id: Uuid::new_v4(),
            period_id: "org_001-2026-02".to_string(),
            employee_id: "emp_001".to_string(),
            organization_id: "org_001".to_string(),
            version,
            status: RunStatus::Processed,
            jurisdiction: "MH".to_string(),
            reference_data_version: "test".to_string(),
            engine_version: "test".to_string(),
            computed_at: Utc::now(),
            attendance_basis: AttendanceBasis {
                working_days: Decimal::from(24),
                eligible_days: Decimal::from(24),
                present_days: Decimal::from(24),
                lop_days: Decimal::ZERO,
                paid_leaves: Decimal::ZERO,
                ot_hours: Decimal::ZERO,
                late_count: 0,
                payable_days: Decimal::from(24),
                source: BasisSource::DailyRecords,
            },
            compensation_id: "comp_001".to_string(),
            components: vec![],
            statutory: StatutoryBreakdown {
                jurisdiction: "MH".to_string(),
                rule_effective_from: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
                lines: vec![],
                employee_total: Decimal::ZERO,
                employer_total: Decimal::ZERO,
            },
            totals: RunTotals {
                gross_earnings: Decimal::ZERO,
                component_deductions: Decimal::ZERO,
                statutory_employee: Decimal::ZERO,
                total_deductions: Decimal::ZERO,
                net_pay: Decimal::ZERO,
                statutory_employer: Decimal::ZERO,
                employer_components: Decimal::ZERO,
                employer_cost: Decimal::ZERO,
            },
            warnings: vec![],
            audit_trace: AuditTrace {
                steps: vec![],
                warnings: vec![],
                duration_us: 0,
            },
            supersedes: None,
            reversal_reason: None,
        }
    }

    fn commit(run: PayrollRun, expected: Option<Uuid>, supersede: bool) -> RunCommit {
        RunCommit {
            run,
            expected_current: expected,
            allowed_statuses: vec![PeriodStatus::Draft],
            supersede_current: supersede,
        }
    }

    #[test]
    fn test_commit_then_read_back() {
        let store = InMemoryStore::new();
        store.insert_period(period(PeriodStatus::Draft)).unwrap();
        let r = run(1);
        store.commit_run(commit(r.clone(), None, false)).unwrap();

        let current = store.current_run("org_001-2026-02", "emp_001").unwrap().unwrap();
        assert_eq!(current.run_id, r.run_id);
        assert_eq!(store.run_history("org_001-2026-02", "emp_001").unwrap().len(), 1);
    }

    #[test]
    fn test_recompute_replaces_processed_run() {
        let store = InMemoryStore::new();
        store.insert_period(period(PeriodStatus::Draft)).unwrap();
        let first = run(1);
        store.commit_run(commit(first.clone(), None, false)).unwrap();
        let second = run(1);
        store
            .commit_run(commit(second.clone(), Some(first.run_id), false))
            .unwrap();

        let history = store.run_history("org_001-2026-02", "emp_001").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].run_id, second.run_id);
    }

    #[test]
    fn test_stale_expected_current_rejected() {
        let store = InMemoryStore::new();
        store.insert_period(period(PeriodStatus::Draft)).unwrap();
        store.commit_run(commit(run(1), None, false)).unwrap();

        let result = store.commit_run(commit(run(1), None, false));
        assert!(matches!(result, Err(EngineError::PreconditionFailed { .. })));
    }

    #[test]
    fn test_disallowed_period_status_writes_nothing() {
        let store = InMemoryStore::new();
        store.insert_period(period(PeriodStatus::Locked)).unwrap();

        let result = store.commit_run(commit(run(1), None, false));
        assert!(matches!(result, Err(EngineError::PreconditionFailed { .. })));
        assert!(store.run_history("org_001-2026-02", "emp_001").unwrap().is_empty());
    }

    #[test]
    fn test_supersede_keeps_history() {
        let store = InMemoryStore::new();
        store.insert_period(period(PeriodStatus::Draft)).unwrap();
        let first = run(1);
        store.commit_run(commit(first.clone(), None, false)).unwrap();
        let mut second = run(2);
        second.supersedes = Some(first.run_id);
        store
            .commit_run(commit(second.clone(), Some(first.run_id), true))
            .unwrap();

        let history = store.run_history("org_001-2026-02", "emp_001").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, RunStatus::Superseded);
        let current = store.current_run("org_001-2026-02", "emp_001").unwrap().unwrap();
        assert_eq!(current.run_id, second.run_id);
    }

    #[test]
    fn test_transition_requires_expected_status() {
        let store = InMemoryStore::new();
        store.insert_period(period(PeriodStatus::Draft)).unwrap();

        let result = store.transition_period(
            "org_001-2026-02",
            PeriodStatus::Locked,
            PeriodStatus::Posted,
        );
        assert!(matches!(result, Err(EngineError::PreconditionFailed { .. })));

        let locked = store
            .transition_period("org_001-2026-02", PeriodStatus::Draft, PeriodStatus::Locked)
            .unwrap();
        assert_eq!(locked.status, PeriodStatus::Locked);
    }

    #[test]
    fn test_posting_marks_processed_runs_posted() {
        let store = InMemoryStore::new();
        store.insert_period(period(PeriodStatus::Draft)).unwrap();
        store.commit_run(commit(run(1), None, false)).unwrap();
        store
            .transition_period("org_001-2026-02", PeriodStatus::Draft, PeriodStatus::Locked)
            .unwrap();
        store
            .transition_period("org_001-2026-02", PeriodStatus::Locked, PeriodStatus::Posted)
            .unwrap();

        let current = store.current_run("org_001-2026-02", "emp_001").unwrap().unwrap();
        assert_eq!(current.status, RunStatus::Posted);
    }

    #[test]
    fn test_missing_lookups() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.employee("nobody"),
            Err(EngineError::EmployeeNotFound { .. })
        ));
        assert!(matches!(
            store.period("nowhen"),
            Err(EngineError::PeriodNotFound { .. })
        ));
        assert!(store.current_run("p", "e").unwrap().is_none());
    }
}
