//! Attendance basis resolution.
//!
//! Turns a month of daily attendance rows (or an HR override) into the
//! working/payable day counts used for pro-ration. Missing data is never
//! read as presence: with no rows and no override every eligible working day
//! is loss of pay and the result carries a `PartialData` warning.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{HolidayCalendar, PayrollPolicy};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AttendanceBasis, AttendanceOverride, AttendanceRecord, AuditStep, AuditWarning, BasisSource,
    Employee, WarningKind, month_bounds,
};

use super::working_days::working_days_between;

/// Raw inputs for one employee-month.
#[derive(Debug, Clone, Copy)]
pub struct AttendanceInputs<'a> {
    /// The employee.
    pub employee: &'a Employee,
    /// Calendar month (1-12).
    pub month: u32,
    /// Calendar year.
    pub year: i32,
    /// Daily rows; rows for other employees or outside the month are ignored.
    pub records: &'a [AttendanceRecord],
    /// HR override for the month, if any.
    pub override_record: Option<&'a AttendanceOverride>,
}

/// The resolved basis with its audit step and any warnings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceBasisResult {
    /// The resolved basis.
    pub basis: AttendanceBasis,
    /// Warnings raised while resolving.
    pub warnings: Vec<AuditWarning>,
    /// The audit step recording the resolution.
    pub audit_step: AuditStep,
}

impl AttendanceBasisResult {
    /// Fails with `PartialData` when missing days had to be treated as loss of pay.
    ///
    /// For callers that must not pay out on incomplete attendance.
    pub fn require_complete(self, employee_id: &str) -> EngineResult<Self> {
        match self
            .warnings
            .iter()
            .find(|w| w.kind == WarningKind::PartialData)
        {
            Some(warning) => Err(EngineError::PartialData {
                employee_id: employee_id.to_string(),
                message: warning.message.clone(),
            }),
            None => Ok(self),
        }
    }
}

#[derive(Debug, Default)]
struct DayAggregate {
    rows: usize,
    present: bool,
    paid_leave: bool,
    late: bool,
    hours: Decimal,
    shift_code: Option<String>,
}

/// Resolves the attendance basis for one employee and month.
///
/// Working days exclude configured weekend days and holidays. The
/// employment window (join to exit) clamps which working days are eligible;
/// `working_days` stays the full-month count so pro-ration scales a
/// mid-month joiner's pay by the share of the month they could work.
///
/// # Examples
///
/// ```no_run
/// use payroll_engine::calculation::{AttendanceInputs, resolve_attendance_basis};
/// use payroll_engine::config::ConfigLoader;
/// use payroll_engine::models::Employee;
/// use chrono::NaiveDate;
///
/// let loader = ConfigLoader::load("./config/standard").unwrap();
/// let reference = loader.reference();
/// let employee = Employee {
///     id: "emp_001".to_string(),
///     organization_id: "org_001".to_string(),
///     name: "Asha Rao".to_string(),
///     join_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///     exit_date: None,
///     jurisdiction: None,
/// };
///
/// let inputs = AttendanceInputs {
///     employee: &employee,
///     month: 2,
///     year: 2026,
///     records: &[],
///     override_record: None,
/// };
/// let result =
///     resolve_attendance_basis(inputs, reference.policy(), reference.holidays(), 1).unwrap();
/// assert_eq!(result.basis.payable_days, rust_decimal::Decimal::ZERO);
/// ```
pub fn resolve_attendance_basis(
    inputs: AttendanceInputs<'_>,
    policy: &PayrollPolicy,
    holidays: &HolidayCalendar,
    step_number: u32,
) -> EngineResult<AttendanceBasisResult> {
    let employee = inputs.employee;
    let (first, last) = month_bounds(inputs.month, inputs.year)?;

    let working = working_days_between(first, last, &employee.organization_id, policy, holidays);
    let window = employee.employment_window(first, last);
    let eligible: Vec<NaiveDate> = match window {
        Some((from, to)) => working
            .iter()
            .copied()
            .filter(|d| *d >= from && *d <= to)
            .collect(),
        None => Vec::new(),
    };

    let working_days = Decimal::from(working.len());
    let eligible_days = Decimal::from(eligible.len());

    if let Some(override_record) = inputs.override_record {
        return from_override(
            employee,
            inputs.month,
            inputs.year,
            override_record,
            working_days,
            eligible_days,
            step_number,
        );
    }

    let month_rows: Vec<&AttendanceRecord> = inputs
        .records
        .iter()
        .filter(|r| r.employee_id == employee.id)
        .filter(|r| {
            let day = r.attribution_date();
            day >= first && day <= last
        })
        .collect();

    if month_rows.is_empty() {
        return Ok(fail_closed(
            employee,
            inputs.month,
            inputs.year,
            working_days,
            eligible_days,
            step_number,
        ));
    }

    // Overnight rows fold into the punch-in day.
    let mut days: BTreeMap<NaiveDate, DayAggregate> = BTreeMap::new();
    for row in month_rows {
        let day = row.attribution_date();
        if !window.is_some_and(|(from, to)| day >= from && day <= to) {
            continue;
        }
        let entry = days.entry(day).or_default();
        entry.rows += 1;
        entry.present |= row.is_present;
        entry.paid_leave |= row.on_paid_leave;
        entry.late |= row.is_late;
        entry.hours += row.effective_hours();
        if entry.shift_code.is_none() {
            entry.shift_code = row.shift_code.clone();
        }
    }

    let mut ot_hours = Decimal::ZERO;
    let mut merged_rows = 0usize;
    for (day, aggregate) in &days {
        merged_rows += aggregate.rows.saturating_sub(1);
        if !aggregate.present {
            continue;
        }
        let shift = policy
            .shift(aggregate.shift_code.as_deref())
            .ok_or_else(|| EngineError::InvalidAttendance {
                employee_id: employee.id.clone(),
                message: format!(
                    "unknown shift '{}' on {}",
                    aggregate
                        .shift_code
                        .as_deref()
                        .unwrap_or(policy.default_shift.as_str()),
                    day
                ),
            })?;
        if aggregate.hours > shift.expected_hours {
            ot_hours += aggregate.hours - shift.expected_hours;
        }
    }

    let mut present_days = 0u32;
    let mut paid_leaves = 0u32;
    let mut lop_days = 0u32;
    let mut late_count = 0u32;
    let mut missing_days = 0u32;
    for day in &eligible {
        match days.get(day) {
            Some(aggregate) if aggregate.present => {
                present_days += 1;
                if aggregate.late {
                    late_count += 1;
                }
            }
            Some(aggregate) if aggregate.paid_leave => paid_leaves += 1,
            Some(_) => lop_days += 1,
            None => {
                lop_days += 1;
                missing_days += 1;
            }
        }
    }

    let lop_days = Decimal::from(lop_days);
    let basis = AttendanceBasis {
        working_days,
        eligible_days,
        present_days: Decimal::from(present_days),
        lop_days,
        paid_leaves: Decimal::from(paid_leaves),
        ot_hours,
        late_count,
        payable_days: (eligible_days - lop_days).max(Decimal::ZERO),
        source: BasisSource::DailyRecords,
    };

    let mut warnings = Vec::new();
    if missing_days > 0 {
        let message = format!(
            "{} eligible working day(s) in {}/{} have no attendance record and were treated as loss of pay",
            missing_days, inputs.month, inputs.year
        );
        warn!(employee_id = %employee.id, missing_days, "Incomplete attendance for month");
        warnings.push(AuditWarning {
            kind: WarningKind::PartialData,
            message,
            severity: "medium".to_string(),
        });
    }

    debug!(
        employee_id = %employee.id,
        working_days = %basis.working_days,
        payable_days = %basis.payable_days,
        "Resolved attendance from daily records"
    );

    let reasoning = format!(
        "{} of {} eligible working days present, {} paid leave, {} LOP; {} OT hours over shift expectations",
        basis.present_days,
        basis.eligible_days,
        basis.paid_leaves,
        basis.lop_days,
        basis.ot_hours.normalize()
    );
    let audit_step = basis_step(
        step_number,
        &basis,
        serde_json::json!({
            "month": inputs.month,
            "year": inputs.year,
            "recorded_days": days.len(),
            "merged_rows": merged_rows,
            "missing_days": missing_days,
        }),
        reasoning,
    );

    Ok(AttendanceBasisResult {
        basis,
        warnings,
        audit_step,
    })
}

fn from_override(
    employee: &Employee,
    month: u32,
    year: i32,
    override_record: &AttendanceOverride,
    working_days: Decimal,
    eligible_days: Decimal,
    step_number: u32,
) -> EngineResult<AttendanceBasisResult> {
    let invalid = |message: String| EngineError::InvalidAttendance {
        employee_id: employee.id.clone(),
        message,
    };

    if override_record.employee_id != employee.id
        || override_record.month != month
        || override_record.year != year
    {
        return Err(invalid(format!(
            "override for {} {}/{} does not match {}/{}",
            override_record.employee_id, override_record.month, override_record.year, month, year
        )));
    }

    let counts = [
        ("present_days", override_record.present_days),
        ("lop_days", override_record.lop_days),
        ("paid_leaves", override_record.paid_leaves),
        ("ot_hours", override_record.ot_hours),
    ];
    for (name, value) in counts {
        if value < Decimal::ZERO {
            return Err(invalid(format!("override {} must not be negative", name)));
        }
    }
    if override_record.lop_days > eligible_days {
        return Err(invalid(format!(
            "override lop_days {} exceeds {} eligible working days",
            override_record.lop_days, eligible_days
        )));
    }

    // The override's declared buckets are authoritative; they are not re-derived.
    let basis = AttendanceBasis {
        working_days,
        eligible_days,
        present_days: override_record.present_days,
        lop_days: override_record.lop_days,
        paid_leaves: override_record.paid_leaves,
        ot_hours: override_record.ot_hours,
        late_count: override_record.late_count,
        payable_days: eligible_days - override_record.lop_days,
        source: BasisSource::ManualOverride,
    };

    debug!(employee_id = %employee.id, "Using attendance override");

    let reasoning = format!(
        "HR override replaces daily records: {} LOP of {} eligible days{}",
        basis.lop_days,
        basis.eligible_days,
        override_record
            .reason
            .as_deref()
            .map(|r| format!(" ({})", r))
            .unwrap_or_default()
    );
    let audit_step = basis_step(
        step_number,
        &basis,
        serde_json::json!({ "month": month, "year": year, "override": override_record }),
        reasoning,
    );

    Ok(AttendanceBasisResult {
        basis,
        warnings: Vec::new(),
        audit_step,
    })
}

fn fail_closed(
    employee: &Employee,
    month: u32,
    year: i32,
    working_days: Decimal,
    eligible_days: Decimal,
    step_number: u32,
) -> AttendanceBasisResult {
    let basis = AttendanceBasis {
        working_days,
        eligible_days,
        present_days: Decimal::ZERO,
        lop_days: eligible_days,
        paid_leaves: Decimal::ZERO,
        ot_hours: Decimal::ZERO,
        late_count: 0,
        payable_days: Decimal::ZERO,
        source: BasisSource::FailClosed,
    };

    warn!(employee_id = %employee.id, month, year, "No attendance data; failing closed");

    let message = format!(
        "no attendance records or override for {}/{}; all {} eligible working days treated as loss of pay",
        month, year, eligible_days
    );
    let audit_step = basis_step(
        step_number,
        &basis,
        serde_json::json!({ "month": month, "year": year, "recorded_days": 0 }),
        message.clone(),
    );

    AttendanceBasisResult {
        basis,
        warnings: vec![AuditWarning {
            kind: WarningKind::PartialData,
            message,
            severity: "high".to_string(),
        }],
        audit_step,
    }
}

fn basis_step(
    step_number: u32,
    basis: &AttendanceBasis,
    input: serde_json::Value,
    reasoning: String,
) -> AuditStep {
    let source = match basis.source {
        BasisSource::DailyRecords => "daily_records",
        BasisSource::ManualOverride => "manual_override",
        BasisSource::FailClosed => "fail_closed",
    };
    AuditStep {
        step_number,
        rule_id: "attendance_basis".to_string(),
        rule_name: "Attendance Basis Resolution".to_string(),
        rule_ref: format!("attendance:{}", source),
        input,
        output: serde_json::json!({
            "working_days": basis.working_days.to_string(),
            "eligible_days": basis.eligible_days.to_string(),
            "present_days": basis.present_days.to_string(),
            "lop_days": basis.lop_days.to_string(),
            "paid_leaves": basis.paid_leaves.to_string(),
            "ot_hours": basis.ot_hours.normalize().to_string(),
            "late_count": basis.late_count,
            "payable_days": basis.payable_days.to_string(),
        }),
        reasoning,
    }
}
