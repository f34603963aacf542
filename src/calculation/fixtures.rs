//! Shared builders for calculation unit tests.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{NaiveDate, Weekday};
use rust_decimal::Decimal;

use crate::config::{
    BulkPolicy, ConfigLoader, OvertimePolicy, PayrollPolicy, ReferenceData, ShiftDefinition,
};
use crate::models::{AttendanceBasis, AttendanceRecord, BasisSource, Employee};

pub(crate) fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub(crate) fn reference_data() -> ReferenceData {
    ConfigLoader::load("./config/standard").unwrap().into_reference()
}

pub(crate) fn policy(weekend_days: Vec<Weekday>) -> PayrollPolicy {
    let mut shifts = HashMap::new();
    shifts.insert(
        "GENERAL".to_string(),
        ShiftDefinition {
            expected_hours: dec("8"),
            overnight: false,
        },
    );
    shifts.insert(
        "NIGHT".to_string(),
        ShiftDefinition {
            expected_hours: dec("8"),
            overnight: true,
        },
    );
    shifts.insert(
        "HALF".to_string(),
        ShiftDefinition {
            expected_hours: dec("4"),
            overnight: false,
        },
    );
    PayrollPolicy {
        reference_day: 15,
        weekend_days,
        overtime: OvertimePolicy {
            standard_monthly_hours: dec("208"),
            multiplier: dec("2"),
            component_code: "OVERTIME".to_string(),
        },
        shifts,
        default_shift: "GENERAL".to_string(),
        bulk: BulkPolicy::default(),
    }
}

pub(crate) fn employee(join_date: NaiveDate, exit_date: Option<NaiveDate>) -> Employee {
    Employee {
        id: "emp_001".to_string(),
        organization_id: "org_001".to_string(),
        name: "Asha Rao".to_string(),
        join_date,
        exit_date,
        jurisdiction: Some("MH".to_string()),
    }
}

pub(crate) fn present(date: NaiveDate) -> AttendanceRecord {
    AttendanceRecord {
        employee_id: "emp_001".to_string(),
        date,
        punch_in: None,
        punch_out: None,
        is_present: true,
        is_absent: false,
        is_weekend: false,
        is_holiday: false,
        on_paid_leave: false,
        worked_hours: Some(dec("8")),
        is_late: false,
        shift_code: None,
    }
}

pub(crate) fn absent(date: NaiveDate) -> AttendanceRecord {
    AttendanceRecord {
        is_present: false,
        is_absent: true,
        worked_hours: None,
        ..present(date)
    }
}

pub(crate) fn basis(working_days: &str, payable_days: &str) -> AttendanceBasis {
    let working = dec(working_days);
    let payable = dec(payable_days);
    AttendanceBasis {
        working_days: working,
        eligible_days: working,
        present_days: payable,
        lop_days: working - payable,
        paid_leaves: Decimal::ZERO,
        ot_hours: Decimal::ZERO,
        late_count: 0,
        payable_days: payable,
        source: BasisSource::DailyRecords,
    }
}

/// One row per non-Sunday day of the month; listed days absent, the rest present.
pub(crate) fn month_attendance(
    year: i32,
    month: u32,
    absent_days: &[u32],
) -> Vec<AttendanceRecord> {
    use chrono::Datelike;

    let (first, last) = crate::models::month_bounds(month, year).unwrap();
    first
        .iter_days()
        .take_while(|d| *d <= last)
        .filter(|d| d.weekday() != Weekday::Sun)
        .map(|d| {
            if absent_days.contains(&d.day()) {
                absent(d)
            } else {
                present(d)
            }
        })
        .collect()
}
