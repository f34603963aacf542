//! Performance benchmarks for the payroll engine.
//!
//! - Pure composition of one employee-month
//! - Single-employee finalize through the store
//! - Bulk finalize across 100 and 1000 employees
//! - Finalize through the HTTP adapter
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use std::str::FromStr;
use std::sync::Arc;

use axum::{body::Body, http::Request};
use chrono::{Datelike, NaiveDate, Weekday};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rust_decimal::Decimal;
use tower::ServiceExt;

use payroll_engine::api::{AppState, create_router};
use payroll_engine::calculation::RuleBasedWithholding;
use payroll_engine::config::{ConfigLoader, ReferenceData};
use payroll_engine::models::{
    AttendanceRecord, CompensationLine, CompensationRecord, Employee, PayrollPeriod, PeriodStatus,
};
use payroll_engine::payroll::{BulkOptions, InMemoryStore, PayrollEngine, RunInputs, compose_run};

const PERIOD: &str = "org_001-2026-02";

fn reference() -> ReferenceData {
    ConfigLoader::load("./config/standard")
        .expect("Failed to load config")
        .into_reference()
}

fn decimal(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn employee(id: &str) -> Employee {
    Employee {
        id: id.to_string(),
        organization_id: "org_001".to_string(),
        name: format!("Employee {}", id),
        join_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        exit_date: None,
        jurisdiction: Some("MH".to_string()),
    }
}

fn compensation(employee_id: &str) -> CompensationRecord {
    let line = |code: &str, amount: &str| CompensationLine {
        code: code.to_string(),
        annual_amount: decimal(amount),
    };
    CompensationRecord {
        id: format!("comp_{}", employee_id),
        employee_id: employee_id.to_string(),
        effective_from: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
        effective_to: None,
        annual_ctc: decimal("720000"),
        lines: vec![
            line("BASIC", "300000"),
            line("DA", "60000"),
            line("HRA", "120000"),
            line("SPECIAL", "150000"),
            line("LTA", "30000"),
            line("MEAL", "24000"),
            line("PERF", "36000"),
            line("GRATUITY", "0"),
        ],
    }
}

/// February 2026, Sundays off, absent on the 10th.
fn attendance(employee_id: &str) -> Vec<AttendanceRecord> {
    (1..=28)
        .filter_map(|day| NaiveDate::from_ymd_opt(2026, 2, day))
        .filter(|d| d.weekday() != Weekday::Sun)
        .map(|d| {
            let present = d.day() != 10;
            AttendanceRecord {
                employee_id: employee_id.to_string(),
                date: d,
                punch_in: None,
                punch_out: None,
                is_present: present,
                is_absent: !present,
                is_weekend: false,
                is_holiday: false,
                on_paid_leave: false,
                worked_hours: present.then(|| decimal("9")),
                is_late: false,
                shift_code: None,
            }
        })
        .collect()
}

fn period() -> PayrollPeriod {
    PayrollPeriod {
        id: PERIOD.to_string(),
        organization_id: "org_001".to_string(),
        month: 2,
        year: 2026,
        status: PeriodStatus::Draft,
    }
}

/// Creates an engine over a store seeded with `count` employees.
fn seeded_engine(count: usize) -> Arc<PayrollEngine> {
    let store = Arc::new(InMemoryStore::new());
    store.insert_period(period()).unwrap();
    for i in 0..count {
        let id = format!("emp_{:05}", i);
        store.insert_employee(employee(&id)).unwrap();
        store.insert_compensation(compensation(&id)).unwrap();
        store.insert_attendance(attendance(&id)).unwrap();
    }
    Arc::new(PayrollEngine::new(store, Arc::new(reference())))
}

fn bench_compose(c: &mut Criterion) {
    let reference = reference();
    let emp = employee("emp_00000");
    let period = period();
    let rows = attendance("emp_00000");
    let records = vec![compensation("emp_00000")];

    c.bench_function("compose_single_employee", |b| {
        b.iter(|| {
            let inputs = RunInputs {
                employee: &emp,
                period: &period,
                jurisdiction: "MH",
                attendance: &rows,
                override_record: None,
                compensation: &records,
            };
            black_box(compose_run(black_box(inputs), &reference, &RuleBasedWithholding).unwrap())
        })
    });
}

fn bench_finalize(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let engine = seeded_engine(1);

    c.bench_function("finalize_single_employee", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(
                engine
                    .finalize_run(PERIOD, "emp_00000", "MH")
                    .await
                    .unwrap(),
            )
        })
    });
}

fn bench_bulk(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("bulk_finalize");
    group.sample_size(10);

    for count in [100usize, 1000] {
        let engine = seeded_engine(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.to_async(&rt).iter(|| async {
                let options = BulkOptions {
                    recompute_existing: true,
                    ..Default::default()
                };
                black_box(
                    engine
                        .clone()
                        .bulk_finalize(PERIOD, "MH", options)
                        .await
                        .unwrap(),
                )
            })
        });
    }
    group.finish();
}

fn bench_http_finalize(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let state = AppState::new(seeded_engine(1));
    let body = serde_json::json!({ "jurisdiction": "MH" }).to_string();

    c.bench_function("http_finalize", |b| {
        b.to_async(&rt).iter(|| async {
            let router = create_router(state.clone());
            let response = router
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri(format!("/periods/{}/runs/emp_00000", PERIOD))
                        .header("Content-Type", "application/json")
                        .body(Body::from(body.clone()))
                        .unwrap(),
                )
                .await
                .unwrap();
            black_box(response.status())
        })
    });
}

criterion_group!(
    benches,
    bench_compose,
    bench_finalize,
    bench_bulk,
    bench_http_finalize
);
criterion_main!(benches);
