//! Attendance models.
//!
//! Daily attendance rows and monthly overrides are written by the attendance
//! capture subsystem and are read-only here. [`AttendanceBasis`] is the
//! monthly summary the engine derives from them.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One employee's attendance for one calendar day.
///
/// Geofence and punch validation happen upstream; `is_present` is trusted as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// The employee the row belongs to.
    pub employee_id: String,
    /// The calendar day recorded by the capture system.
    pub date: NaiveDate,
    /// Punch-in time, when captured.
    #[serde(default)]
    pub punch_in: Option<NaiveDateTime>,
    /// Punch-out time, when captured. May fall on the next day for overnight shifts.
    #[serde(default)]
    pub punch_out: Option<NaiveDateTime>,
    /// The employee was present.
    #[serde(default)]
    pub is_present: bool,
    /// The employee was absent.
    #[serde(default)]
    pub is_absent: bool,
    /// The day was flagged as a weekend by the capture system.
    #[serde(default)]
    pub is_weekend: bool,
    /// The day was flagged as a holiday by the capture system.
    #[serde(default)]
    pub is_holiday: bool,
    /// The absence is covered by approved paid leave.
    #[serde(default)]
    pub on_paid_leave: bool,
    /// Effective worked hours, when the capture system computed them.
    #[serde(default)]
    pub worked_hours: Option<Decimal>,
    /// The employee punched in late.
    #[serde(default)]
    pub is_late: bool,
    /// Shift code the employee was rostered on.
    #[serde(default)]
    pub shift_code: Option<String>,
}

impl AttendanceRecord {
    /// The day this row counts towards.
    ///
    /// Overnight shifts belong to the punch-in date, so a row captured against
    /// the punch-out day still lands on the day the shift started.
    pub fn attribution_date(&self) -> NaiveDate {
        self.punch_in.map(|p| p.date()).unwrap_or(self.date)
    }

    /// Effective hours worked for this row.
    pub fn effective_hours(&self) -> Decimal {
        if let Some(hours) = self.worked_hours {
            return hours;
        }
        match (self.punch_in, self.punch_out) {
            (Some(start), Some(end)) if end > start => {
                Decimal::new((end - start).num_minutes(), 0) / Decimal::new(60, 0)
            }
            _ => Decimal::ZERO,
        }
    }
}

/// HR correction for one employee and month.
///
/// When present it replaces the computed counts wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceOverride {
    /// The employee the override belongs to.
    pub employee_id: String,
    /// Calendar month (1-12).
    pub month: u32,
    /// Calendar year.
    pub year: i32,
    /// Days present.
    pub present_days: Decimal,
    /// Loss-of-pay days.
    pub lop_days: Decimal,
    /// Paid leave days.
    #[serde(default)]
    pub paid_leaves: Decimal,
    /// Overtime hours.
    #[serde(default)]
    pub ot_hours: Decimal,
    /// Number of late arrivals.
    #[serde(default)]
    pub late_count: u32,
    /// Free-text reason recorded by HR.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Where an [`AttendanceBasis`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasisSource {
    /// Aggregated from daily attendance rows.
    DailyRecords,
    /// Taken from an HR override.
    ManualOverride,
    /// No data; every eligible working day treated as loss of pay.
    FailClosed,
}

/// Monthly attendance summary used for pro-ration.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{AttendanceBasis, BasisSource};
/// use rust_decimal::Decimal;
///
/// let basis = AttendanceBasis {
///     working_days: Decimal::from(24),
///     eligible_days: Decimal::from(24),
///     present_days: Decimal::from(22),
///     lop_days: Decimal::from(2),
///     paid_leaves: Decimal::ZERO,
///     ot_hours: Decimal::ZERO,
///     late_count: 0,
///     payable_days: Decimal::from(22),
///     source: BasisSource::DailyRecords,
/// };
/// assert!(!basis.is_full_month());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceBasis {
    /// Working days in the calendar month (pro-ration denominator).
    pub working_days: Decimal,
    /// Working days inside the employment window.
    pub eligible_days: Decimal,
    /// Days present.
    pub present_days: Decimal,
    /// Loss-of-pay days.
    pub lop_days: Decimal,
    /// Paid leave days.
    pub paid_leaves: Decimal,
    /// Overtime hours.
    pub ot_hours: Decimal,
    /// Number of late arrivals.
    pub late_count: u32,
    /// Days payable after LOP adjustment.
    pub payable_days: Decimal,
    /// Where the counts came from.
    pub source: BasisSource,
}

impl AttendanceBasis {
    /// Returns true when every working day of the month is payable.
    pub fn is_full_month(&self) -> bool {
        self.payable_days == self.working_days
    }

    /// Looks up a basis field by the name formulas use.
    pub fn field(&self, name: &str) -> Option<Decimal> {
        match name {
            "working_days" => Some(self.working_days),
            "eligible_days" => Some(self.eligible_days),
            "present_days" => Some(self.present_days),
            "lop_days" => Some(self.lop_days),
            "paid_leaves" => Some(self.paid_leaves),
            "ot_hours" => Some(self.ot_hours),
            "late_count" => Some(Decimal::from(self.late_count)),
            "payable_days" => Some(self.payable_days),
            _ => None,
        }
    }
}
