//! Working-day calendar.
//!
//! A working day is any calendar day that is neither a configured weekend
//! day nor a holiday for the organisation.

use chrono::NaiveDate;

use crate::config::{HolidayCalendar, PayrollPolicy};

/// Returns true if `date` is a working day for the organisation.
pub fn is_working_day(
    date: NaiveDate,
    organization_id: &str,
    policy: &PayrollPolicy,
    holidays: &HolidayCalendar,
) -> bool {
    !policy.is_weekend(date) && !holidays.is_holiday(organization_id, date)
}

/// Lists the working days in `[from, to]`, in date order.
///
/// Returns an empty list when `from > to`.
pub fn working_days_between(
    from: NaiveDate,
    to: NaiveDate,
    organization_id: &str,
    policy: &PayrollPolicy,
    holidays: &HolidayCalendar,
) -> Vec<NaiveDate> {
    from.iter_days()
        .take_while(|d| *d <= to)
        .filter(|d| is_working_day(*d, organization_id, policy, holidays))
        .collect()
}
