//! Core data models for the payroll engine.
//!
//! This module contains all the domain models used throughout the engine.

mod attendance;
mod compensation;
mod component;
mod employee;
mod payroll_run;
mod period;

pub use attendance::{AttendanceBasis, AttendanceOverride, AttendanceRecord, BasisSource};
pub use compensation::{CompensationLine, CompensationRecord};
pub use component::{CalculationMethod, ComponentAmount, ComponentType, PayComponentDefinition};
pub use employee::Employee;
pub use payroll_run::{
    AuditStep, AuditTrace, AuditWarning, ContributionSide, PayrollRun, RunStatus, RunTotals,
    StatutoryBreakdown, StatutoryLine, WarningKind,
};
pub use period::{Holiday, PayrollPeriod, PeriodStatus, clamped_day, month_bounds};
