//! Payroll run snapshot models.
//!
//! This module contains the [`PayrollRun`] type and its associated structures
//! that capture everything a finalized run recorded: the attendance basis used,
//! evaluated components, statutory lines, totals, warnings and an audit trace.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AttendanceBasis, ComponentAmount};

/// Which side of the payroll a statutory amount falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionSide {
    /// Deducted from the employee's pay.
    Employee,
    /// Paid by the employer on top of gross.
    Employer,
}

/// One statutory deduction or contribution.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{ContributionSide, StatutoryLine};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let line = StatutoryLine {
///     code: "RETIREMENT_FUND".to_string(),
///     side: ContributionSide::Employee,
///     wage_base: Decimal::from_str("15000").unwrap(),
///     rate: Some(Decimal::from_str("12").unwrap()),
///     amount: Decimal::from_str("1800.00").unwrap(),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatutoryLine {
    /// Statutory scheme code (e.g. "RETIREMENT_FUND").
    pub code: String,
    /// Employee or employer side.
    pub side: ContributionSide,
    /// The wage base the amount was computed on.
    pub wage_base: Decimal,
    /// Percentage rate, when the amount is rate-based.
    pub rate: Option<Decimal>,
    /// Rounded amount.
    pub amount: Decimal,
}

/// All statutory lines for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatutoryBreakdown {
    /// Jurisdiction whose rules were applied.
    pub jurisdiction: String,
    /// Effective date of the rule set used.
    pub rule_effective_from: NaiveDate,
    /// Individual statutory lines.
    pub lines: Vec<StatutoryLine>,
    /// Sum of employee-side lines.
    pub employee_total: Decimal,
    /// Sum of employer-side lines.
    pub employer_total: Decimal,
}

impl StatutoryBreakdown {
    /// Returns the amount for a scheme code and side, or zero if absent.
    pub fn amount(&self, code: &str, side: ContributionSide) -> Decimal {
        self.lines
            .iter()
            .filter(|l| l.code == code && l.side == side)
            .map(|l| l.amount)
            .sum()
    }
}

/// Aggregated totals for a payroll run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTotals {
    /// Sum of earning components.
    pub gross_earnings: Decimal,
    /// Sum of deduction components.
    pub component_deductions: Decimal,
    /// Sum of employee-side statutory lines.
    pub statutory_employee: Decimal,
    /// `component_deductions + statutory_employee`.
    pub total_deductions: Decimal,
    /// `gross_earnings - total_deductions`.
    pub net_pay: Decimal,
    /// Sum of employer-side statutory lines.
    pub statutory_employer: Decimal,
    /// Sum of employer-cost components.
    pub employer_components: Decimal,
    /// `gross_earnings + statutory_employer + employer_components`.
    pub employer_cost: Decimal,
}

/// Lifecycle status of a payroll run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Computed in a draft period; may be recomputed.
    Processed,
    /// Paid out with its period.
    Posted,
    /// Replaced by a later version; retained for audit.
    Superseded,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Processed => write!(f, "processed"),
            RunStatus::Posted => write!(f, "posted"),
            RunStatus::Superseded => write!(f, "superseded"),
        }
    }
}

/// A single step in the audit trace recording a calculation decision.
///
/// Each step captures the input, output, and reasoning for a rule application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// Reference to the reference-data entry behind this step.
    pub rule_ref: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// Kinds of non-fatal conditions attached to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningKind {
    /// Overlapping compensation records; a documented tie-break was applied.
    AmbiguousState,
    /// Attendance was incomplete; missing days were treated as loss of pay.
    PartialData,
}

/// A warning generated during calculation.
///
/// Warnings indicate potential issues that don't prevent calculation
/// but must be surfaced for human review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditWarning {
    /// The type of warning.
    pub kind: WarningKind,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level (e.g., "low", "medium", "high").
    pub severity: String,
}

/// The complete audit trace for a run.
///
/// # Example
///
/// ```
/// use payroll_engine::models::AuditTrace;
///
/// let trace = AuditTrace {
///     steps: vec![],
///     warnings: vec![],
///     duration_us: 1234,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrace {
    /// The sequence of calculation steps.
    pub steps: Vec<AuditStep>,
    /// Any warnings generated during calculation.
    pub warnings: Vec<AuditWarning>,
    /// The total calculation duration in microseconds.
    pub duration_us: u64,
}

/// The immutable snapshot of one finalized payroll run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollRun {
    /// Unique identifier for this run row.
    pub run_id: Uuid,
    /// The period the run belongs to.
    pub period_id: String,
    /// The employee the run is for.
    pub employee_id: String,
    /// The employee's organisation.
    pub organization_id: String,
    /// Version number; increments on each superseding reversal.
    pub version: u32,
    /// Lifecycle status.
    pub status: RunStatus,
    /// Jurisdiction whose statutory rules were applied.
    pub jurisdiction: String,
    /// Version of the reference data the run was computed against.
    pub reference_data_version: String,
    /// The version of the engine that performed the calculation.
    pub engine_version: String,
    /// When the calculation was performed.
    pub computed_at: DateTime<Utc>,
    /// The attendance basis used.
    pub attendance_basis: AttendanceBasis,
    /// The compensation record used.
    pub compensation_id: String,
    /// Evaluated components in evaluation order.
    pub components: Vec<ComponentAmount>,
    /// Statutory deductions and contributions.
    pub statutory: StatutoryBreakdown,
    /// Aggregated totals.
    pub totals: RunTotals,
    /// Non-fatal conditions for human review.
    pub warnings: Vec<AuditWarning>,
    /// Complete audit trace of calculation decisions.
    pub audit_trace: AuditTrace,
    /// The run this version replaced, if any.
    #[serde(default)]
    pub supersedes: Option<Uuid>,
    /// Why the prior version was reversed.
    #[serde(default)]
    pub reversal_reason: Option<String>,
}

impl PayrollRun {
    /// Returns true if a warning of the given kind is attached.
    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }

    /// Returns the evaluated amount of a component, if present.
    pub fn component_amount(&self, code: &str) -> Option<Decimal> {
        self.components
            .iter()
            .find(|c| c.code == code)
            .map(|c| c.amount)
    }
}
