//! Shared seeding helpers for integration and property tests.

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;

use payroll_engine::config::ConfigLoader;
use payroll_engine::models::{
    AttendanceRecord, CompensationLine, CompensationRecord, Employee, PayrollPeriod, PeriodStatus,
    month_bounds,
};
use payroll_engine::payroll::{InMemoryStore, PayrollEngine};

pub const ORG: &str = "org_001";

pub fn decimal(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn period_id(year: i32, month: u32) -> String {
    format!("{ORG}-{year}-{month:02}")
}

pub fn employee(id: &str, join_date: &str) -> Employee {
    Employee {
        id: id.to_string(),
        organization_id: ORG.to_string(),
        name: format!("Employee {id}"),
        join_date: date(join_date),
        exit_date: None,
        jurisdiction: Some("MH".to_string()),
    }
}

/// Annual 600,000 split into Basic 300,000, HRA 120,000 and Special 180,000.
pub fn standard_compensation(
    id: &str,
    employee_id: &str,
    effective_from: &str,
) -> CompensationRecord {
    CompensationRecord {
        id: id.to_string(),
        employee_id: employee_id.to_string(),
        effective_from: date(effective_from),
        effective_to: None,
        annual_ctc: decimal("600000"),
        lines: vec![
            CompensationLine {
                code: "BASIC".to_string(),
                annual_amount: decimal("300000"),
            },
            CompensationLine {
                code: "HRA".to_string(),
                annual_amount: decimal("120000"),
            },
            CompensationLine {
                code: "SPECIAL".to_string(),
                annual_amount: decimal("180000"),
            },
        ],
    }
}

pub fn attendance_row(employee_id: &str, day: NaiveDate, present: bool) -> AttendanceRecord {
    AttendanceRecord {
        employee_id: employee_id.to_string(),
        date: day,
        punch_in: None,
        punch_out: None,
        is_present: present,
        is_absent: !present,
        is_weekend: false,
        is_holiday: false,
        on_paid_leave: false,
        worked_hours: present.then(|| decimal("8")),
        is_late: false,
        shift_code: None,
    }
}

/// One row per non-Sunday day from `from_day`; days in `absent` are absences.
pub fn month_rows(
    employee_id: &str,
    year: i32,
    month: u32,
    from_day: u32,
    absent: &[u32],
) -> Vec<AttendanceRecord> {
    let (first, last) = month_bounds(month, year).unwrap();
    first
        .iter_days()
        .take_while(|d| *d <= last)
        .filter(|d| d.day() >= from_day && d.weekday() != Weekday::Sun)
        .map(|d| attendance_row(employee_id, d, !absent.contains(&d.day())))
        .collect()
}

pub fn new_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::new())
}

pub fn add_period(store: &InMemoryStore, year: i32, month: u32) -> String {
    let id = period_id(year, month);
    store
        .insert_period(PayrollPeriod {
            id: id.clone(),
            organization_id: ORG.to_string(),
            month,
            year,
            status: PeriodStatus::Draft,
        })
        .unwrap();
    id
}

pub fn engine_for(store: Arc<InMemoryStore>) -> Arc<PayrollEngine> {
    let reference = ConfigLoader::load("./config/standard")
        .expect("Failed to load config")
        .into_reference();
    Arc::new(PayrollEngine::new(store, Arc::new(reference)))
}

/// February 2026 with one employee on standard pay, absent on the 10th and 11th.
pub fn scenario_a() -> (Arc<InMemoryStore>, Arc<PayrollEngine>, String) {
    let store = new_store();
    let period = add_period(&store, 2026, 2);
    store.insert_employee(employee("emp_001", "2020-01-01")).unwrap();
    store
        .insert_compensation(standard_compensation("comp_001", "emp_001", "2025-04-01"))
        .unwrap();
    store
        .insert_attendance(month_rows("emp_001", 2026, 2, 1, &[10, 11]))
        .unwrap();
    let engine = engine_for(store.clone());
    (store, engine, period)
}
