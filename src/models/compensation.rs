//! Compensation record models.
//!
//! A [`CompensationRecord`] is an effective-dated salary structure for one
//! employee, holding annual CTC and the component lines that make it up.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One component of a salary structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationLine {
    /// Component code, matching an entry in the component catalogue.
    pub code: String,
    /// Annual amount for this component.
    #[serde(default)]
    pub annual_amount: Decimal,
}

/// An effective-dated salary structure.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{CompensationLine, CompensationRecord};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let record = CompensationRecord {
///     id: "comp_001".to_string(),
///     employee_id: "emp_001".to_string(),
///     effective_from: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
///     effective_to: None,
///     annual_ctc: Decimal::from(600_000),
///     lines: vec![CompensationLine {
///         code: "BASIC".to_string(),
///         annual_amount: Decimal::from(300_000),
///     }],
/// };
///
/// assert!(record.covers(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationRecord {
    /// Unique identifier for the record.
    pub id: String,
    /// The employee this structure belongs to.
    pub employee_id: String,
    /// First day the structure applies (inclusive).
    pub effective_from: NaiveDate,
    /// Last day the structure applies (inclusive); `None` means open-ended.
    #[serde(default)]
    pub effective_to: Option<NaiveDate>,
    /// Annual cost to company.
    pub annual_ctc: Decimal,
    /// Ordered component lines.
    pub lines: Vec<CompensationLine>,
}

impl CompensationRecord {
    /// Returns true if the record's validity interval contains `date`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.effective_from && self.effective_to.is_none_or(|to| date <= to)
    }

    /// Returns true if this record's validity interval intersects `other`'s.
    pub fn overlaps(&self, other: &CompensationRecord) -> bool {
        let self_before_other = self.effective_to.is_some_and(|to| to < other.effective_from);
        let other_before_self = other.effective_to.is_some_and(|to| to < self.effective_from);
        !self_before_other && !other_before_self
    }

    /// Returns the line for a component code, if present.
    pub fn line(&self, code: &str) -> Option<&CompensationLine> {
        self.lines.iter().find(|l| l.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(id: &str, from: NaiveDate, to: Option<NaiveDate>) -> CompensationRecord {
        CompensationRecord {
            id: id.to_string(),
            employee_id: "emp_001".to_string(),
            effective_from: from,
            effective_to: to,
            annual_ctc: Decimal::from(600_000),
            lines: vec![],
        }
    }

    #[test]
    fn test_covers_is_inclusive_at_both_ends() {
        let r = record("a", date(2026, 1, 1), Some(date(2026, 3, 31)));
        assert!(r.covers(date(2026, 1, 1)));
        assert!(r.covers(date(2026, 3, 31)));
        assert!(!r.covers(date(2025, 12, 31)));
        assert!(!r.covers(date(2026, 4, 1)));
    }

    #[test]
    fn test_open_ended_record_covers_future() {
        let r = record("a", date(2026, 1, 1), None);
        assert!(r.covers(date(2030, 6, 15)));
    }

    #[test]
    fn test_adjacent_records_do_not_overlap() {
        let a = record("a", date(2025, 4, 1), Some(date(2026, 3, 31)));
        let b = record("b", date(2026, 4, 1), None);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_open_ended_records_overlap() {
        let a = record("a", date(2025, 4, 1), None);
        let b = record("b", date(2026, 4, 1), None);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn test_shared_boundary_day_overlaps() {
        let a = record("a", date(2025, 4, 1), Some(date(2026, 4, 1)));
        let b = record("b", date(2026, 4, 1), None);
        assert!(a.overlaps(&b));
    }

    #[test]
    fn test_deserialize_record_with_string_amounts() {
        let json = r#"{
            "id": "comp_001",
            "employee_id": "emp_001",
            "effective_from": "2025-04-01",
            "annual_ctc": "600000",
            "lines": [
                {"code": "BASIC", "annual_amount": "300000"},
                {"code": "HRA", "annual_amount": "120000"}
            ]
        }"#;
        let r: CompensationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.effective_to, None);
        assert_eq!(r.lines.len(), 2);
        assert_eq!(r.line("HRA").unwrap().annual_amount, Decimal::from(120_000));
        assert!(r.line("DA").is_none());
    }
}
