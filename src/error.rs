//! Error types for the payroll engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur while resolving attendance,
//! evaluating compensation, applying compliance rules and finalizing runs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The broad category an [`EngineError`] belongs to.
///
/// Callers that only care about how to react (retry, surface to HR, reject)
/// match on the kind instead of on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A required record does not exist.
    NotFound,
    /// Overlapping records make the input ambiguous.
    AmbiguousState,
    /// A formula component cannot be evaluated.
    InvalidFormula,
    /// The operation is not allowed in the current period or run state.
    PreconditionFailed,
    /// Attendance data was incomplete.
    PartialData,
    /// Caller supplied inconsistent data.
    InvalidInput,
    /// Reference data could not be loaded or is inconsistent.
    Configuration,
    /// Storage or arithmetic failure inside the engine.
    Internal,
}

/// The main error type for the payroll engine.
///
/// All operations in the engine return this error type, making it easy
/// to handle errors consistently throughout the application.
///
/// # Example
///
/// ```
/// use payroll_engine::error::{EngineError, ErrorKind};
///
/// let error = EngineError::ConfigNotFound {
///     path: "/missing/catalogue.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/catalogue.yaml");
/// assert_eq!(error.kind(), ErrorKind::Configuration);
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// Configuration parsed but is semantically invalid.
    #[error("Invalid configuration in '{source_name}': {message}")]
    InvalidConfig {
        /// The file or section holding the invalid data.
        source_name: String,
        /// What is wrong with it.
        message: String,
    },

    /// No employee with the given id exists.
    #[error("Employee not found: {employee_id}")]
    EmployeeNotFound {
        /// The employee id that was looked up.
        employee_id: String,
    },

    /// No payroll period with the given id exists.
    #[error("Payroll period not found: {period_id}")]
    PeriodNotFound {
        /// The period id that was looked up.
        period_id: String,
    },

    /// No compensation record covers the reference date.
    #[error("No compensation record for employee '{employee_id}' covers {date}")]
    CompensationNotFound {
        /// The employee whose compensation was resolved.
        employee_id: String,
        /// The reference date.
        date: NaiveDate,
    },

    /// No compliance rule set exists for the jurisdiction on the date.
    #[error("No compliance rule for jurisdiction '{jurisdiction}' on {date}")]
    ComplianceRuleNotFound {
        /// The jurisdiction code.
        jurisdiction: String,
        /// The reference date.
        date: NaiveDate,
    },

    /// A compensation line references a component missing from the catalogue.
    #[error("Pay component not found in catalogue: {code}")]
    ComponentNotFound {
        /// The component code.
        code: String,
    },

    /// No payroll run exists for the period and employee.
    #[error("No payroll run for employee '{employee_id}' in period '{period_id}'")]
    RunNotFound {
        /// The period id.
        period_id: String,
        /// The employee id.
        employee_id: String,
    },

    /// Several compensation records cover the same date.
    #[error("Overlapping compensation records for employee '{employee_id}' on {date}: {}", .record_ids.join(", "))]
    AmbiguousState {
        /// The employee with overlapping records.
        employee_id: String,
        /// A date covered by more than one record.
        date: NaiveDate,
        /// The ids of the overlapping records.
        record_ids: Vec<String>,
    },

    /// A component formula references an unknown identifier or forms a cycle.
    #[error("Invalid formula for component '{component}': {message}")]
    InvalidFormula {
        /// The component whose formula failed.
        component: String,
        /// A description of the failure.
        message: String,
    },

    /// The operation is not permitted in the current state.
    #[error("Precondition failed: {message}")]
    PreconditionFailed {
        /// Why the operation was rejected.
        message: String,
    },

    /// Attendance data is missing for the month.
    #[error("Attendance data incomplete for employee '{employee_id}': {message}")]
    PartialData {
        /// The employee with missing data.
        employee_id: String,
        /// What is missing.
        message: String,
    },

    /// Attendance input is inconsistent.
    #[error("Invalid attendance for employee '{employee_id}': {message}")]
    InvalidAttendance {
        /// The employee whose attendance is invalid.
        employee_id: String,
        /// A description of the inconsistency.
        message: String,
    },

    /// Compensation input is inconsistent.
    #[error("Invalid compensation record '{record_id}': {message}")]
    InvalidCompensation {
        /// The compensation record id.
        record_id: String,
        /// A description of the inconsistency.
        message: String,
    },

    /// The backing store failed.
    #[error("Store error: {message}")]
    Store {
        /// A description of the store failure.
        message: String,
    },

    /// A general calculation error occurred.
    #[error("Calculation error: {message}")]
    CalculationError {
        /// A description of the calculation error.
        message: String,
    },
}

impl EngineError {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::ConfigNotFound { .. }
            | EngineError::ConfigParseError { .. }
            | EngineError::InvalidConfig { .. } => ErrorKind::Configuration,
            EngineError::EmployeeNotFound { .. }
            | EngineError::PeriodNotFound { .. }
            | EngineError::CompensationNotFound { .. }
            | EngineError::ComplianceRuleNotFound { .. }
            | EngineError::ComponentNotFound { .. }
            | EngineError::RunNotFound { .. } => ErrorKind::NotFound,
            EngineError::AmbiguousState { .. } => ErrorKind::AmbiguousState,
            EngineError::InvalidFormula { .. } => ErrorKind::InvalidFormula,
            EngineError::PreconditionFailed { .. } => ErrorKind::PreconditionFailed,
            EngineError::PartialData { .. } => ErrorKind::PartialData,
            EngineError::InvalidAttendance { .. } | EngineError::InvalidCompensation { .. } => {
                ErrorKind::InvalidInput
            }
            EngineError::Store { .. } | EngineError::CalculationError { .. } => {
                ErrorKind::Internal
            }
        }
    }

    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        EngineError::PreconditionFailed {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_formula(component: &str, message: impl Into<String>) -> Self {
        EngineError::InvalidFormula {
            component: component.to_string(),
            message: message.into(),
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
