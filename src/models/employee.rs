//! Employee model.
//!
//! This module defines the [`Employee`] struct used to scope attendance
//! windows and jurisdiction defaults for payroll calculation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Represents an employee on an organisation's payroll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Unique identifier for the employee.
    pub id: String,
    /// The organisation that employs this person.
    pub organization_id: String,
    /// Display name.
    pub name: String,
    /// First day of employment.
    pub join_date: NaiveDate,
    /// Last day of employment, if the employee has left or is leaving.
    #[serde(default)]
    pub exit_date: Option<NaiveDate>,
    /// Jurisdiction code used for statutory rules (e.g. "MH").
    #[serde(default)]
    pub jurisdiction: Option<String>,
}

impl Employee {
    /// Returns the part of `[from, to]` during which the employee is employed.
    ///
    /// Returns `None` when the employment window does not intersect the range.
    ///
    /// # Examples
    ///
    /// ```
    /// use payroll_engine::models::Employee;
    /// use chrono::NaiveDate;
    ///
    /// let employee = Employee {
    ///     id: "emp_001".to_string(),
    ///     organization_id: "org_001".to_string(),
    ///     name: "Asha Rao".to_string(),
    ///     join_date: NaiveDate::from_ymd_opt(2026, 4, 15).unwrap(),
    ///     exit_date: None,
    ///     jurisdiction: Some("MH".to_string()),
    /// };
    ///
    /// let (from, to) = employee
    ///     .employment_window(
    ///         NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
    ///         NaiveDate::from_ymd_opt(2026, 4, 30).unwrap(),
    ///     )
    ///     .unwrap();
    /// assert_eq!(from, NaiveDate::from_ymd_opt(2026, 4, 15).unwrap());
    /// assert_eq!(to, NaiveDate::from_ymd_opt(2026, 4, 30).unwrap());
    /// ```
    pub fn employment_window(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Option<(NaiveDate, NaiveDate)> {
        let start = from.max(self.join_date);
        let end = match self.exit_date {
            Some(exit) => to.min(exit),
            None => to,
        };
        (start <= end).then_some((start, end))
    }

    /// Returns true if the employee is employed on at least one day in `[from, to]`.
    pub fn is_employed_during(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.employment_window(from, to).is_some()
    }
}
