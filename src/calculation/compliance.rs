//! Statutory compliance.
//!
//! Applies the jurisdiction's retirement fund, health insurance, payroll tax
//! and withholding rules to evaluated components. Rule values come from
//! versioned reference data, so nothing here hard-codes a rate or ceiling.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ComplianceRule, ComplianceRuleSet};
use crate::error::EngineResult;
use crate::models::{AuditStep, ContributionSide, StatutoryBreakdown, StatutoryLine};

use super::components::ComponentEvaluation;
use super::rounding::{percent_of, round_money};
use super::withholding::{AnnualProjection, WithholdingPolicy};

/// Statutory line code for retirement-fund contributions.
pub const RETIREMENT_FUND: &str = "RETIREMENT_FUND";
/// Statutory line code for health-insurance contributions.
pub const HEALTH_INSURANCE: &str = "HEALTH_INSURANCE";
/// Statutory line code for regional payroll tax.
pub const PAYROLL_TAX: &str = "PAYROLL_TAX";
/// Statutory line code for income-tax withholding.
pub const WITHHOLDING_TAX: &str = "WITHHOLDING_TAX";

/// The statutory breakdown and its audit steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceResult {
    /// Statutory lines and totals.
    pub breakdown: StatutoryBreakdown,
    /// One step per scheme.
    pub audit_steps: Vec<AuditStep>,
}

/// Applies the compliance rule in force for `jurisdiction` on `date`.
///
/// Fails with `ComplianceRuleNotFound` when no rule covers the date.
pub fn apply_compliance(
    evaluation: &ComponentEvaluation,
    jurisdiction: &str,
    date: NaiveDate,
    rules: &ComplianceRuleSet,
    withholding: &dyn WithholdingPolicy,
    step_number: u32,
) -> EngineResult<ComplianceResult> {
    let rule = rules.rule_for(jurisdiction, date)?;
    apply_rule(evaluation, rule, date, withholding, step_number)
}

/// Applies one compliance rule.
///
/// - Retirement fund: rate × min(Σ wage components, ceiling), both sides.
/// - Health insurance: rate × gross on both sides when gross ≤ ceiling, else zero.
/// - Payroll tax: the slab amount for gross, with per-month overrides.
/// - Withholding: delegated to `withholding`.
pub fn apply_rule(
    evaluation: &ComponentEvaluation,
    rule: &ComplianceRule,
    date: NaiveDate,
    withholding: &dyn WithholdingPolicy,
    step_number: u32,
) -> EngineResult<ComplianceResult> {
    let gross = evaluation.gross_earnings;
    let rule_ref = rule.rule_ref();
    let mut lines = Vec::new();
    let mut audit_steps = Vec::new();
    let mut step = step_number;

    // Retirement fund
    let retirement = &rule.retirement_fund;
    let wages: Decimal = retirement
        .wage_components
        .iter()
        .map(|code| evaluation.amount(code))
        .sum();
    let wage_base = wages.min(retirement.wage_ceiling);
    let employee_contribution = round_money(percent_of(wage_base, retirement.employee_rate));
    let employer_contribution = round_money(percent_of(wage_base, retirement.employer_rate));
    lines.push(StatutoryLine {
        code: RETIREMENT_FUND.to_string(),
        side: ContributionSide::Employee,
        wage_base,
        rate: Some(retirement.employee_rate),
        amount: employee_contribution,
    });
    lines.push(StatutoryLine {
        code: RETIREMENT_FUND.to_string(),
        side: ContributionSide::Employer,
        wage_base,
        rate: Some(retirement.employer_rate),
        amount: employer_contribution,
    });
    audit_steps.push(AuditStep {
        step_number: step,
        rule_id: "retirement_fund".to_string(),
        rule_name: "Retirement Fund Contribution".to_string(),
        rule_ref: rule_ref.clone(),
        input: serde_json::json!({
            "wage_components": retirement.wage_components,
            "wages": wages.to_string(),
            "wage_ceiling": retirement.wage_ceiling.to_string(),
        }),
        output: serde_json::json!({
            "wage_base": wage_base.to_string(),
            "employee": employee_contribution.to_string(),
            "employer": employer_contribution.to_string(),
        }),
        reasoning: format!(
            "min({}, ceiling {}) = {}; employee {}%, employer {}%",
            wages,
            retirement.wage_ceiling,
            wage_base,
            retirement.employee_rate.normalize(),
            retirement.employer_rate.normalize()
        ),
    });
    step += 1;

    // Health insurance
    let health = &rule.health_insurance;
    let eligible = gross <= health.eligibility_ceiling;
    let (employee_health, employer_health) = if eligible {
        (
            round_money(percent_of(gross, health.employee_rate)),
            round_money(percent_of(gross, health.employer_rate)),
        )
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };
    lines.push(StatutoryLine {
        code: HEALTH_INSURANCE.to_string(),
        side: ContributionSide::Employee,
        wage_base: gross,
        rate: Some(health.employee_rate),
        amount: employee_health,
    });
    lines.push(StatutoryLine {
        code: HEALTH_INSURANCE.to_string(),
        side: ContributionSide::Employer,
        wage_base: gross,
        rate: Some(health.employer_rate),
        amount: employer_health,
    });
    audit_steps.push(AuditStep {
        step_number: step,
        rule_id: "health_insurance".to_string(),
        rule_name: "Health Insurance Contribution".to_string(),
        rule_ref: rule_ref.clone(),
        input: serde_json::json!({
            "gross": gross.to_string(),
            "eligibility_ceiling": health.eligibility_ceiling.to_string(),
        }),
        output: serde_json::json!({
            "eligible": eligible,
            "employee": employee_health.to_string(),
            "employer": employer_health.to_string(),
        }),
        reasoning: if eligible {
            format!(
                "gross {} within ceiling {}; employee {}%, employer {}%",
                gross,
                health.eligibility_ceiling,
                health.employee_rate.normalize(),
                health.employer_rate.normalize()
            )
        } else {
            format!(
                "gross {} exceeds ceiling {}; not covered",
                gross, health.eligibility_ceiling
            )
        },
    });
    step += 1;

    // Payroll tax
    let month = date.month();
    let slab = rule.payroll_tax.slab_for(gross);
    let payroll_tax = round_money(slab.map_or(Decimal::ZERO, |s| s.amount_for_month(month)));
    lines.push(StatutoryLine {
        code: PAYROLL_TAX.to_string(),
        side: ContributionSide::Employee,
        wage_base: gross,
        rate: None,
        amount: payroll_tax,
    });
    audit_steps.push(AuditStep {
        step_number: step,
        rule_id: "payroll_tax".to_string(),
        rule_name: "Payroll Tax".to_string(),
        rule_ref: rule_ref.clone(),
        input: serde_json::json!({ "gross": gross.to_string(), "month": month }),
        output: serde_json::json!({
            "slab_from": slab.map(|s| s.from.to_string()),
            "slab_to": slab.and_then(|s| s.to.map(|t| t.to_string())),
            "amount": payroll_tax.to_string(),
        }),
        reasoning: match slab {
            Some(s) => format!(
                "gross {} falls in slab from {}; month {} amount {}",
                gross, s.from, month, payroll_tax
            ),
            None => format!("no slab covers gross {}", gross),
        },
    });
    step += 1;

    // Withholding
    let projection = AnnualProjection::from_monthly(&rule.jurisdiction, month, gross);
    let withheld = withholding.monthly_withholding(&projection, rule.withholding.as_ref())?;
    lines.push(StatutoryLine {
        code: WITHHOLDING_TAX.to_string(),
        side: ContributionSide::Employee,
        wage_base: projection.annual_gross,
        rate: None,
        amount: withheld,
    });
    audit_steps.push(AuditStep {
        step_number: step,
        rule_id: "withholding_tax".to_string(),
        rule_name: "Income Tax Withholding".to_string(),
        rule_ref,
        input: serde_json::json!({
            "annual_gross": projection.annual_gross.to_string(),
            "configured": rule.withholding.is_some(),
        }),
        output: serde_json::json!({ "amount": withheld.to_string() }),
        reasoning: format!(
            "projected annual gross {}; withholding {} this month",
            projection.annual_gross, withheld
        ),
    });

    let employee_total = lines
        .iter()
        .filter(|l| l.side == ContributionSide::Employee)
        .map(|l| l.amount)
        .sum();
    let employer_total = lines
        .iter()
        .filter(|l| l.side == ContributionSide::Employer)
        .map(|l| l.amount)
        .sum();

    debug!(
        jurisdiction = %rule.jurisdiction,
        employee_total = %employee_total,
        employer_total = %employer_total,
        "Applied compliance rules"
    );

    Ok(ComplianceResult {
        breakdown: StatutoryBreakdown {
            jurisdiction: rule.jurisdiction.clone(),
            rule_effective_from: rule.effective_from,
            lines,
            employee_total,
            employer_total,
        },
        audit_steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::fixtures::{date, dec, reference_data};
    use crate::calculation::{NoWithholding, RuleBasedWithholding};
    use crate::error::EngineError;
    use crate::models::{ComponentAmount, ComponentType};

    fn evaluation(components: &[(&str, &str)]) -> ComponentEvaluation {
        let components: Vec<ComponentAmount> = components
            .iter()
            .map(|(code, amount)| ComponentAmount {
                code: code.to_string(),
                name: code.to_string(),
                component_type: ComponentType::Earning,
                method: "fixed".to_string(),
                prorated: true,
                amount: dec(amount),
            })
            .collect();
        let gross = components.iter().map(|c| c.amount).sum();
        ComponentEvaluation {
            evaluation_order: components.iter().map(|c| c.code.clone()).collect(),
            components,
            provisional_gross: gross,
            gross_earnings: gross,
            component_deductions: Decimal::ZERO,
            employer_components: Decimal::ZERO,
            audit_steps: vec![],
        }
    }

    fn scenario_a() -> ComponentEvaluation {
        evaluation(&[("BASIC", "22916.67"), ("HRA", "9166.67"), ("SPECIAL", "13750.00")])
    }

    #[test]
    fn test_scenario_b_ceilings() {
        let reference = reference_data();
        let result = apply_compliance(
            &scenario_a(),
            "MH",
            date(2026, 3, 15),
            reference.compliance(),
            &NoWithholding,
            1,
        )
        .unwrap();
        let b = &result.breakdown;

        assert_eq!(b.amount(RETIREMENT_FUND, ContributionSide::Employee), dec("1800.00"));
        assert_eq!(b.amount(RETIREMENT_FUND, ContributionSide::Employer), dec("1800.00"));
        assert_eq!(b.amount(HEALTH_INSURANCE, ContributionSide::Employee), Decimal::ZERO);
        assert_eq!(b.amount(HEALTH_INSURANCE, ContributionSide::Employer), Decimal::ZERO);
        assert_eq!(b.amount(PAYROLL_TAX, ContributionSide::Employee), dec("200"));
        assert_eq!(b.employee_total, dec("2000.00"));
        assert_eq!(b.employer_total, dec("1800.00"));
        assert_eq!(result.audit_steps.len(), 4);
    }

    #[test]
    fn test_february_payroll_tax_override() {
        let reference = reference_data();
        let result = apply_compliance(
            &scenario_a(),
            "MH",
            date(2026, 2, 15),
            reference.compliance(),
            &NoWithholding,
            1,
        )
        .unwrap();
        assert_eq!(
            result.breakdown.amount(PAYROLL_TAX, ContributionSide::Employee),
            dec("300")
        );
    }

    #[test]
    fn test_health_insurance_below_ceiling() {
        let reference = reference_data();
        let low = evaluation(&[("BASIC", "12000"), ("HRA", "4800")]);
        let result = apply_compliance(
            &low,
            "MH",
            date(2026, 3, 15),
            reference.compliance(),
            &NoWithholding,
            1,
        )
        .unwrap();
        let b = &result.breakdown;

        // 16800 × 0.75% and × 3.25%
        assert_eq!(b.amount(HEALTH_INSURANCE, ContributionSide::Employee), dec("126.00"));
        assert_eq!(b.amount(HEALTH_INSURANCE, ContributionSide::Employer), dec("546.00"));
        // Wages below the ceiling: 12% of 12000
        assert_eq!(b.amount(RETIREMENT_FUND, ContributionSide::Employee), dec("1440.00"));
        assert_eq!(b.amount(PAYROLL_TAX, ContributionSide::Employee), dec("200"));
    }

    #[test]
    fn test_retirement_wages_include_da() {
        let reference = reference_data();
        let e = evaluation(&[("BASIC", "8000"), ("DA", "2000"), ("HRA", "3200")]);
        let result = apply_compliance(
            &e,
            "MH",
            date(2026, 3, 15),
            reference.compliance(),
            &NoWithholding,
            1,
        )
        .unwrap();
        assert_eq!(
            result.breakdown.amount(RETIREMENT_FUND, ContributionSide::Employee),
            dec("1200.00")
        );
    }

    #[test]
    fn test_withholding_line_uses_policy() {
        let reference = reference_data();
        let result = apply_compliance(
            &scenario_a(),
            "MH",
            date(2026, 3, 15),
            reference.compliance(),
            &RuleBasedWithholding,
            1,
        )
        .unwrap();
        assert_eq!(
            result.breakdown.amount(WITHHOLDING_TAX, ContributionSide::Employee),
            dec("312.50")
        );
        assert_eq!(result.breakdown.employee_total, dec("2312.50"));
    }

    #[test]
    fn test_jurisdiction_without_withholding_schedule() {
        let reference = reference_data();
        let result = apply_compliance(
            &scenario_a(),
            "KA",
            date(2026, 3, 15),
            reference.compliance(),
            &RuleBasedWithholding,
            1,
        )
        .unwrap();
        assert_eq!(
            result.breakdown.amount(WITHHOLDING_TAX, ContributionSide::Employee),
            Decimal::ZERO
        );
        assert_eq!(result.breakdown.jurisdiction, "KA");
    }

    #[test]
    fn test_unknown_jurisdiction() {
        let reference = reference_data();
        let result = apply_compliance(
            &scenario_a(),
            "ZZ",
            date(2026, 3, 15),
            reference.compliance(),
            &NoWithholding,
            1,
        );
        assert!(matches!(
            result,
            Err(EngineError::ComplianceRuleNotFound { .. })
        ));
    }

    #[test]
    fn test_older_rule_applies_to_past_dates() {
        let reference = reference_data();
        let result = apply_compliance(
            &scenario_a(),
            "MH",
            date(2025, 2, 15),
            reference.compliance(),
            &RuleBasedWithholding,
            1,
        )
        .unwrap();
        assert_eq!(result.breakdown.rule_effective_from, date(2024, 4, 1));
        // No February override and no withholding schedule in the older rule.
        assert_eq!(
            result.breakdown.amount(PAYROLL_TAX, ContributionSide::Employee),
            dec("200")
        );
        assert_eq!(
            result.breakdown.amount(WITHHOLDING_TAX, ContributionSide::Employee),
            Decimal::ZERO
        );
    }
}
