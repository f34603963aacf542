//! Payroll period and holiday models.
//!
//! This module contains the [`PayrollPeriod`] type that governs whether runs
//! may be created for a month, and the [`Holiday`] entries that make up an
//! organisation's holiday calendar.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Lifecycle status of a payroll period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus {
    /// Runs may be created and freely recomputed.
    Draft,
    /// Runs are frozen; changes require an explicit reversal.
    Locked,
    /// Salaries have been paid out; changes require an explicit reversal.
    Posted,
}

impl std::fmt::Display for PeriodStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeriodStatus::Draft => write!(f, "draft"),
            PeriodStatus::Locked => write!(f, "locked"),
            PeriodStatus::Posted => write!(f, "posted"),
        }
    }
}

/// A holiday in an organisation's calendar.
///
/// A holiday without an `organization_id` applies to every organisation.
///
/// # Example
///
/// ```
/// use payroll_engine::models::Holiday;
/// use chrono::NaiveDate;
///
/// let holiday = Holiday {
///     date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
///     name: "Maharashtra Day".to_string(),
///     organization_id: None,
/// };
/// assert!(holiday.applies_to("org_001"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    /// The date of the holiday.
    pub date: NaiveDate,
    /// The name of the holiday.
    pub name: String,
    /// The organisation this holiday belongs to, or `None` for all.
    #[serde(default)]
    pub organization_id: Option<String>,
}

impl Holiday {
    /// Returns true if this holiday applies to the given organisation.
    pub fn applies_to(&self, organization_id: &str) -> bool {
        self.organization_id
            .as_deref()
            .is_none_or(|org| org == organization_id)
    }
}

/// One organisation's payroll month.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{PayrollPeriod, PeriodStatus};
/// use chrono::NaiveDate;
///
/// let period = PayrollPeriod {
///     id: "org_001-2026-02".to_string(),
///     organization_id: "org_001".to_string(),
///     month: 2,
///     year: 2026,
///     status: PeriodStatus::Draft,
/// };
///
/// let (first, last) = period.bounds().unwrap();
/// assert_eq!(first, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
/// assert_eq!(last, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollPeriod {
    /// Unique identifier for the period.
    pub id: String,
    /// The organisation this period belongs to.
    pub organization_id: String,
    /// Calendar month (1-12).
    pub month: u32,
    /// Calendar year.
    pub year: i32,
    /// Current lifecycle status.
    pub status: PeriodStatus,
}

impl PayrollPeriod {
    /// Returns the first and last calendar day of the period's month.
    pub fn bounds(&self) -> EngineResult<(NaiveDate, NaiveDate)> {
        month_bounds(self.month, self.year)
    }

    /// Returns true if new runs may be written without a reversal.
    pub fn is_open(&self) -> bool {
        self.status == PeriodStatus::Draft
    }
}

/// Returns the first and last day of a calendar month.
///
/// Fails with `CalculationError` for a month outside 1-12.
pub fn month_bounds(month: u32, year: i32) -> EngineResult<(NaiveDate, NaiveDate)> {
    let invalid = || EngineError::CalculationError {
        message: format!("invalid month {}/{}", month, year),
    };
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;
    let last = next_first.pred_opt().ok_or_else(invalid)?;
    Ok((first, last))
}

/// Returns the given day of the month, clamped to the month's last day.
pub fn clamped_day(month: u32, year: i32, day: u32) -> EngineResult<NaiveDate> {
    let (_, last) = month_bounds(month, year)?;
    let day = day.clamp(1, last.day());
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| EngineError::CalculationError {
        message: format!("invalid day {} in {}/{}", day, month, year),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_period(status: PeriodStatus) -> PayrollPeriod {
        PayrollPeriod {
            id: "org_001-2026-03".to_string(),
            organization_id: "org_001".to_string(),
            month: 3,
            year: 2026,
            status,
        }
    }

    #[test]
    fn test_bounds_for_31_day_month() {
        let (first, last) = create_period(PeriodStatus::Draft).bounds().unwrap();
        assert_eq!(first, date(2026, 3, 1));
        assert_eq!(last, date(2026, 3, 31));
    }

    #[test]
    fn test_bounds_for_december_roll_over() {
        let (first, last) = month_bounds(12, 2026).unwrap();
        assert_eq!(first, date(2026, 12, 1));
        assert_eq!(last, date(2026, 12, 31));
    }

    #[test]
    fn test_bounds_for_leap_february() {
        let (_, last) = month_bounds(2, 2028).unwrap();
        assert_eq!(last, date(2028, 2, 29));
    }

    #[test]
    fn test_invalid_month_is_error() {
        assert!(month_bounds(13, 2026).is_err());
        assert!(month_bounds(0, 2026).is_err());
    }

    #[test]
    fn test_clamped_day_uses_month_end() {
        assert_eq!(clamped_day(2, 2026, 31).unwrap(), date(2026, 2, 28));
        assert_eq!(clamped_day(3, 2026, 15).unwrap(), date(2026, 3, 15));
    }

    #[test]
    fn test_only_draft_is_open() {
        assert!(create_period(PeriodStatus::Draft).is_open());
        assert!(!create_period(PeriodStatus::Locked).is_open());
        assert!(!create_period(PeriodStatus::Posted).is_open());
    }

    #[test]
    fn test_period_status_serialization() {
        assert_eq!(
            serde_json::to_string(&PeriodStatus::Locked).unwrap(),
            "\"locked\""
        );
        let status: PeriodStatus = serde_json::from_str("\"posted\"").unwrap();
        assert_eq!(status, PeriodStatus::Posted);
    }

    #[test]
    fn test_holiday_scoped_to_organization() {
        let holiday = Holiday {
            date: date(2026, 3, 4),
            name: "Founders Day".to_string(),
            organization_id: Some("org_001".to_string()),
        };
        assert!(holiday.applies_to("org_001"));
        assert!(!holiday.applies_to("org_002"));
    }

    #[test]
    fn test_deserialize_holiday_without_organization() {
        let json = r#"{"date": "2026-01-26", "name": "Republic Day"}"#;
        let holiday: Holiday = serde_json::from_str(json).unwrap();
        assert_eq!(holiday.organization_id, None);
        assert!(holiday.applies_to("any_org"));
    }
}
