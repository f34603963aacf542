//! Pure composition of one employee's payroll calculation.
//!
//! [`compose_run`] chains the calculation steps over inputs already read from
//! the store. It has no side effects; the finalizer decides what to persist.

use std::time::Instant;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::calculation::{
    AttendanceInputs, WithholdingPolicy, apply_compliance, effective_date, evaluate_components,
    resolve_active_compensation, resolve_attendance_basis,
};
use crate::config::ReferenceData;
use crate::error::EngineResult;
use crate::models::{
    AttendanceBasis, AttendanceOverride, AttendanceRecord, AuditStep, AuditTrace, AuditWarning,
    CompensationRecord, ComponentAmount, Employee, PayrollPeriod, RunTotals, StatutoryBreakdown,
};

/// Everything needed to compute one run.
#[derive(Debug, Clone, Copy)]
pub struct RunInputs<'a> {
    /// The employee being paid.
    pub employee: &'a Employee,
    /// The period being paid.
    pub period: &'a PayrollPeriod,
    /// Jurisdiction whose compliance rules apply.
    pub jurisdiction: &'a str,
    /// Attendance rows around the period month.
    pub attendance: &'a [AttendanceRecord],
    /// HR override for the month, if any.
    pub override_record: Option<&'a AttendanceOverride>,
    /// Every compensation record for the employee.
    pub compensation: &'a [CompensationRecord],
}

/// The computed parts of a run, before it is given an identity.
#[derive(Debug, Clone)]
pub struct RunCalculation {
    /// Resolved attendance basis.
    pub attendance_basis: AttendanceBasis,
    /// Id of the compensation record used.
    pub compensation_id: String,
    /// Component amounts in record line order, overtime last.
    pub components: Vec<ComponentAmount>,
    /// Statutory lines and per-side totals.
    pub statutory: StatutoryBreakdown,
    /// Aggregate amounts.
    pub totals: RunTotals,
    /// Non-fatal conditions found along the way.
    pub warnings: Vec<AuditWarning>,
    /// Step-by-step trace.
    pub audit_trace: AuditTrace,
}

/// Computes a run from its inputs and a reference-data snapshot.
///
/// Fails on the first error; a failed composition produces nothing to persist.
pub fn compose_run(
    inputs: RunInputs<'_>,
    reference: &ReferenceData,
    withholding: &dyn WithholdingPolicy,
) -> EngineResult<RunCalculation> {
    let start = Instant::now();
    let period = inputs.period;
    let mut steps: Vec<AuditStep> = Vec::new();
    let mut warnings: Vec<AuditWarning> = Vec::new();

    let attendance = resolve_attendance_basis(
        AttendanceInputs {
            employee: inputs.employee,
            month: period.month,
            year: period.year,
            records: inputs.attendance,
            override_record: inputs.override_record,
        },
        reference.policy(),
        reference.holidays(),
        next_step(&steps),
    )?;
    steps.push(attendance.audit_step);
    warnings.extend(attendance.warnings);

    let date = effective_date(
        inputs.employee,
        period.month,
        period.year,
        reference.policy().reference_day,
    )?;
    let compensation = resolve_active_compensation(
        &inputs.employee.id,
        date,
        inputs.compensation,
        next_step(&steps),
    )?;
    steps.push(compensation.audit_step);
    warnings.extend(compensation.warnings);

    let evaluation = evaluate_components(
        &attendance.basis,
        &compensation.record,
        reference.catalogue(),
        &reference.policy().overtime,
        next_step(&steps),
    )?;
    debug!(
        employee_id = %inputs.employee.id,
        order = ?evaluation.evaluation_order,
        gross = %evaluation.gross_earnings,
        "Evaluated components"
    );

    let compliance = apply_compliance(
        &evaluation,
        inputs.jurisdiction,
        date,
        reference.compliance(),
        withholding,
        next_step(&steps) + evaluation.audit_steps.len() as u32,
    )?;

    let totals = totals(
        evaluation.gross_earnings,
        evaluation.component_deductions,
        evaluation.employer_components,
        &compliance.breakdown,
    );

    steps.extend(evaluation.audit_steps);
    steps.extend(compliance.audit_steps);

    for warning in &warnings {
        warn!(
            employee_id = %inputs.employee.id,
            period_id = %period.id,
            kind = ?warning.kind,
            message = %warning.message,
            "Run warning"
        );
    }

    Ok(RunCalculation {
        attendance_basis: attendance.basis,
        compensation_id: compensation.record.id,
        components: evaluation.components,
        statutory: compliance.breakdown,
        totals,
        audit_trace: AuditTrace {
            steps,
            warnings: warnings.clone(),
            duration_us: start.elapsed().as_micros() as u64,
        },
        warnings,
    })
}

fn next_step(steps: &[AuditStep]) -> u32 {
    steps.len() as u32 + 1
}

/// Sums the run totals.
///
/// Deductions and employer cost are independent sums of rounded amounts;
/// only `net_pay` is derived by subtraction.
fn totals(
    gross_earnings: Decimal,
    component_deductions: Decimal,
    employer_components: Decimal,
    statutory: &StatutoryBreakdown,
) -> RunTotals {
    let total_deductions = component_deductions + statutory.employee_total;
    RunTotals {
        gross_earnings,
        component_deductions,
        statutory_employee: statutory.employee_total,
        total_deductions,
        net_pay: gross_earnings - total_deductions,
        statutory_employer: statutory.employer_total,
        employer_components,
        employer_cost: gross_earnings + statutory.employer_total + employer_components,
    }
}
