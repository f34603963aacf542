//! Active compensation resolution.
//!
//! Picks the salary structure in force on a reference date. Overlapping
//! effective intervals are surfaced, never hidden: [`find_overlaps`] and
//! [`ensure_no_overlaps`] detect them up front, and
//! [`resolve_active_compensation`] applies a fixed tie-break and records it
//! as an `AmbiguousState` warning on the run.

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditStep, AuditWarning, CompensationRecord, Employee, WarningKind, clamped_day, month_bounds,
};

/// The chosen record with its audit step and any warnings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationResolution {
    /// The record in force on the reference date.
    pub record: CompensationRecord,
    /// `AmbiguousState` warning when more than one record covered the date.
    pub warnings: Vec<AuditWarning>,
    /// The audit step recording the choice.
    pub audit_step: AuditStep,
}

/// The date compensation and compliance rules are resolved for.
///
/// This is the policy's reference day, clamped to the month's last day.
pub fn reference_date(month: u32, year: i32, reference_day: u32) -> EngineResult<NaiveDate> {
    clamped_day(month, year, reference_day)
}

/// The reference date moved into the employee's employment window.
///
/// A joiner after the reference day resolves on their join date and a leaver
/// before it on their exit date. Employees with no days in the month keep the
/// plain reference date.
pub fn effective_date(
    employee: &Employee,
    month: u32,
    year: i32,
    reference_day: u32,
) -> EngineResult<NaiveDate> {
    let reference = reference_date(month, year, reference_day)?;
    let (first, last) = month_bounds(month, year)?;
    Ok(match employee.employment_window(first, last) {
        Some((start, end)) => reference.max(start).min(end),
        None => reference,
    })
}

/// Returns the ids of every pair of the employee's records whose intervals intersect.
///
/// Pairs are ordered by `effective_from`, then id.
pub fn find_overlaps(records: &[CompensationRecord]) -> Vec<(String, String)> {
    let mut sorted: Vec<&CompensationRecord> = records.iter().collect();
    sorted.sort_by(|a, b| {
        a.effective_from
            .cmp(&b.effective_from)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut pairs = Vec::new();
    for (i, a) in sorted.iter().enumerate() {
        for b in &sorted[i + 1..] {
            if a.employee_id == b.employee_id && a.overlaps(b) {
                pairs.push((a.id.clone(), b.id.clone()));
            }
        }
    }
    pairs
}

/// Fails with `AmbiguousState` if any two records overlap.
///
/// The reported date is where the first overlapping pair starts to intersect.
pub fn ensure_no_overlaps(employee_id: &str, records: &[CompensationRecord]) -> EngineResult<()> {
    let overlaps = find_overlaps(records);
    let Some((first, second)) = overlaps.first() else {
        return Ok(());
    };

    let date = records
        .iter()
        .filter(|r| r.id == *first || r.id == *second)
        .map(|r| r.effective_from)
        .max()
        .unwrap_or(NaiveDate::MIN);

    Err(EngineError::AmbiguousState {
        employee_id: employee_id.to_string(),
        date,
        record_ids: vec![first.clone(), second.clone()],
    })
}

/// Picks the compensation record in force on `date`.
///
/// When several records cover the date, the one with the latest
/// `effective_from` wins (ties go to the greatest id) and an
/// `AmbiguousState` warning lists every candidate. Fails with
/// `CompensationNotFound` if nothing covers the date, and with
/// `InvalidCompensation` if the chosen record has a negative line.
pub fn resolve_active_compensation(
    employee_id: &str,
    date: NaiveDate,
    records: &[CompensationRecord],
    step_number: u32,
) -> EngineResult<CompensationResolution> {
    let mut candidates: Vec<&CompensationRecord> = records
        .iter()
        .filter(|r| r.employee_id == employee_id && r.covers(date))
        .collect();
    candidates.sort_by(|a, b| {
        b.effective_from
            .cmp(&a.effective_from)
            .then_with(|| b.id.cmp(&a.id))
    });

    let chosen = *candidates
        .first()
        .ok_or_else(|| EngineError::CompensationNotFound {
            employee_id: employee_id.to_string(),
            date,
        })?;

    for line in &chosen.lines {
        if line.annual_amount < Decimal::ZERO {
            return Err(EngineError::InvalidCompensation {
                record_id: chosen.id.clone(),
                message: format!("line {} has negative annual amount", line.code),
            });
        }
    }
    let mut seen = HashSet::new();
    for line in &chosen.lines {
        if !seen.insert(line.code.as_str()) {
            return Err(EngineError::InvalidCompensation {
                record_id: chosen.id.clone(),
                message: format!("component {} appears more than once", line.code),
            });
        }
    }

    let candidate_ids: Vec<String> = candidates.iter().map(|r| r.id.clone()).collect();
    let mut warnings = Vec::new();
    let reasoning = if candidates.len() > 1 {
        let ambiguity = EngineError::AmbiguousState {
            employee_id: employee_id.to_string(),
            date,
            record_ids: candidate_ids.clone(),
        };
        warn!(
            employee_id = %employee_id,
            chosen = %chosen.id,
            candidates = candidate_ids.len(),
            "Overlapping compensation records"
        );
        warnings.push(AuditWarning {
            kind: WarningKind::AmbiguousState,
            message: format!(
                "{}; chose {} (latest effective_from {})",
                ambiguity, chosen.id, chosen.effective_from
            ),
            severity: "medium".to_string(),
        });
        format!(
            "{} records cover {}; {} wins with the latest effective_from",
            candidates.len(),
            date,
            chosen.id
        )
    } else {
        format!("{} is the only record covering {}", chosen.id, date)
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "compensation_resolution".to_string(),
        rule_name: "Active Compensation Resolution".to_string(),
        rule_ref: format!("compensation:{}", chosen.id),
        input: serde_json::json!({
            "employee_id": employee_id,
            "effective_date": date.to_string(),
            "candidates": candidate_ids,
        }),
        output: serde_json::json!({
            "compensation_id": chosen.id,
            "effective_from": chosen.effective_from.to_string(),
            "annual_ctc": chosen.annual_ctc.to_string(),
        }),
        reasoning,
    };

    Ok(CompensationResolution {
        record: chosen.clone(),
        warnings,
        audit_step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::fixtures::{date, dec, employee};
    use crate::models::CompensationLine;

    fn record(id: &str, from: NaiveDate, to: Option<NaiveDate>) -> CompensationRecord {
        CompensationRecord {
            id: id.to_string(),
            employee_id: "emp_001".to_string(),
            effective_from: from,
            effective_to: to,
            annual_ctc: dec("600000"),
            lines: vec![CompensationLine {
                code: "BASIC".to_string(),
                annual_amount: dec("300000"),
            }],
        }
    }

    #[test]
    fn test_effective_date_clamped_into_employment_window() {
        let joiner = employee(date(2026, 2, 20), None);
        assert_eq!(effective_date(&joiner, 2, 2026, 15).unwrap(), date(2026, 2, 20));

        let leaver = employee(date(2020, 1, 1), Some(date(2026, 2, 10)));
        assert_eq!(effective_date(&leaver, 2, 2026, 15).unwrap(), date(2026, 2, 10));

        let regular = employee(date(2020, 1, 1), None);
        assert_eq!(effective_date(&regular, 2, 2026, 15).unwrap(), date(2026, 2, 15));

        let gone = employee(date(2020, 1, 1), Some(date(2025, 12, 31)));
        assert_eq!(effective_date(&gone, 2, 2026, 15).unwrap(), date(2026, 2, 15));
    }

    #[test]
    fn test_reference_date_clamps_to_month_end() {
        assert_eq!(reference_date(2, 2026, 31).unwrap(), date(2026, 2, 28));
        assert_eq!(reference_date(3, 2026, 15).unwrap(), date(2026, 3, 15));
    }

    #[test]
    fn test_single_covering_record() {
        let records = vec![
            record("old", date(2024, 4, 1), Some(date(2025, 3, 31))),
            record("new", date(2025, 4, 1), None),
        ];
        let result =
            resolve_active_compensation("emp_001", date(2026, 2, 15), &records, 2).unwrap();
        assert_eq!(result.record.id, "new");
        assert!(result.warnings.is_empty());
        assert_eq!(result.audit_step.step_number, 2);
    }

    #[test]
    fn test_overlap_latest_effective_from_wins_with_warning() {
        let records = vec![
            record("comp_a", date(2025, 4, 1), None),
            record("comp_b", date(2026, 1, 1), None),
        ];
        let result =
            resolve_active_compensation("emp_001", date(2026, 2, 15), &records, 1).unwrap();

        assert_eq!(result.record.id, "comp_b");
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, WarningKind::AmbiguousState);
        assert!(result.warnings[0].message.contains("comp_a"));
        assert!(result.warnings[0].message.contains("comp_b"));
    }

    #[test]
    fn test_equal_effective_from_tie_breaks_on_id() {
        let records = vec![
            record("comp_b", date(2025, 4, 1), None),
            record("comp_a", date(2025, 4, 1), None),
        ];
        let result =
            resolve_active_compensation("emp_001", date(2026, 2, 15), &records, 1).unwrap();
        assert_eq!(result.record.id, "comp_b");
    }

    #[test]
    fn test_no_covering_record() {
        let records = vec![record("future", date(2027, 1, 1), None)];
        let result = resolve_active_compensation("emp_001", date(2026, 2, 15), &records, 1);
        assert!(matches!(
            result,
            Err(EngineError::CompensationNotFound { .. })
        ));
    }

    #[test]
    fn test_negative_line_rejected() {
        let mut r = record("bad", date(2025, 4, 1), None);
        r.lines.push(CompensationLine {
            code: "SPECIAL".to_string(),
            annual_amount: dec("-1"),
        });
        let result = resolve_active_compensation("emp_001", date(2026, 2, 15), &[r], 1);
        assert!(matches!(
            result,
            Err(EngineError::InvalidCompensation { .. })
        ));
    }

    #[test]
    fn test_zero_line_allowed() {
        let mut r = record("ok", date(2025, 4, 1), None);
        r.lines.push(CompensationLine {
            code: "SPECIAL".to_string(),
            annual_amount: Decimal::ZERO,
        });
        assert!(resolve_active_compensation("emp_001", date(2026, 2, 15), &[r], 1).is_ok());
    }

    #[test]
    fn test_find_and_ensure_overlaps() {
        let clean = vec![
            record("a", date(2024, 4, 1), Some(date(2025, 3, 31))),
            record("b", date(2025, 4, 1), None),
        ];
        assert!(find_overlaps(&clean).is_empty());
        assert!(ensure_no_overlaps("emp_001", &clean).is_ok());

        let overlapping = vec![
            record("a", date(2024, 4, 1), Some(date(2025, 6, 30))),
            record("b", date(2025, 4, 1), None),
        ];
        assert_eq!(
            find_overlaps(&overlapping),
            vec![("a".to_string(), "b".to_string())]
        );
        match ensure_no_overlaps("emp_001", &overlapping) {
            Err(EngineError::AmbiguousState {
                date: d, record_ids, ..
            }) => {
                assert_eq!(d, date(2025, 4, 1));
                assert_eq!(record_ids, vec!["a", "b"]);
            }
            other => panic!("Expected AmbiguousState, got {:?}", other),
        }
    }
}
