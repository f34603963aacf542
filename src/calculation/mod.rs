//! Calculation logic for the payroll engine.
//!
//! Every function here is pure: it takes resolved inputs and reference data
//! and returns a result plus audit steps, without touching storage. The run
//! finalizer composes them in order: attendance basis, active compensation,
//! component evaluation (including overtime), then statutory compliance.

mod attendance_basis;
mod compensation;
mod compliance;
mod components;
mod dependency;
mod formula;
mod overtime;
mod rounding;
mod withholding;
mod working_days;

#[cfg(test)]
pub(crate) mod fixtures;

pub use attendance_basis::{AttendanceBasisResult, AttendanceInputs, resolve_attendance_basis};
pub use compensation::{
    CompensationResolution, effective_date, ensure_no_overlaps, find_overlaps, reference_date,
    resolve_active_compensation,
};
pub use compliance::{
    ComplianceResult, HEALTH_INSURANCE, PAYROLL_TAX, RETIREMENT_FUND, WITHHOLDING_TAX,
    apply_compliance, apply_rule,
};
pub use components::{ComponentEvaluation, evaluate_components};
pub use dependency::ComponentGraph;
pub use formula::{BinaryOp, Expr, Function, parse_formula};
pub use overtime::{OvertimeResult, calculate_overtime};
pub use rounding::{MONEY_SCALE, percent_of, round_money};
pub use withholding::{AnnualProjection, NoWithholding, RuleBasedWithholding, WithholdingPolicy};
pub use working_days::{is_working_day, working_days_between};
