//! Configuration types for payroll calculation.
//!
//! This module contains the strongly-typed reference data structures that
//! are deserialized from YAML configuration files.

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

use crate::calculation::{Expr, parse_formula};
use crate::error::{EngineError, EngineResult};
use crate::models::{CalculationMethod, Holiday, PayComponentDefinition};

/// Component catalogue file structure.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogueConfig {
    /// Version label of the catalogue.
    pub version: String,
    /// Component definitions.
    pub components: Vec<PayComponentDefinition>,
}

/// The component catalogue with formulas parsed once at load time.
#[derive(Debug, Clone)]
pub struct ComponentCatalogue {
    version: String,
    definitions: HashMap<String, PayComponentDefinition>,
    formulas: HashMap<String, Expr>,
}

impl ComponentCatalogue {
    /// Builds a catalogue, rejecting duplicate codes and unparsable formulas.
    pub fn new(version: String, components: Vec<PayComponentDefinition>) -> EngineResult<Self> {
        let mut definitions = HashMap::with_capacity(components.len());
        let mut formulas = HashMap::new();

        for definition in components {
            if let CalculationMethod::Formula { expression } = &definition.method {
                let expr = parse_formula(&definition.code, expression)?;
                formulas.insert(definition.code.clone(), expr);
            }
            let code = definition.code.clone();
            if definitions.insert(code.clone(), definition).is_some() {
                return Err(EngineError::InvalidConfig {
                    source_name: "catalogue".to_string(),
                    message: format!("duplicate component code '{}'", code),
                });
            }
        }

        Ok(Self {
            version,
            definitions,
            formulas,
        })
    }

    /// Returns the catalogue version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Gets a component definition by code.
    pub fn get(&self, code: &str) -> EngineResult<&PayComponentDefinition> {
        self.definitions
            .get(code)
            .ok_or_else(|| EngineError::ComponentNotFound {
                code: code.to_string(),
            })
    }

    /// Returns the parsed formula for a formula component.
    pub fn formula(&self, code: &str) -> Option<&Expr> {
        self.formulas.get(code)
    }

    /// Returns the number of components in the catalogue.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns true if the catalogue is empty.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

fn default_overtime_code() -> String {
    "OVERTIME".to_string()
}

/// Overtime policy.
///
/// Both numbers are organisational choices, so they live in configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OvertimePolicy {
    /// Hours in a standard month; the hourly rate is `provisional_gross / standard_monthly_hours`.
    pub standard_monthly_hours: Decimal,
    /// Multiplier applied to the hourly rate for overtime hours.
    pub multiplier: Decimal,
    /// Code of the synthetic overtime earning.
    #[serde(default = "default_overtime_code")]
    pub component_code: String,
}

/// A rostered shift.
#[derive(Debug, Clone, Deserialize)]
pub struct ShiftDefinition {
    /// Hours expected for one shift; anything beyond is overtime.
    pub expected_hours: Decimal,
    /// Whether the shift crosses midnight.
    #[serde(default)]
    pub overnight: bool,
}

fn default_max_concurrency() -> usize {
    8
}

/// Bulk orchestration limits.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkPolicy {
    /// Maximum employees finalized at once; sized to the store's connection budget.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for BulkPolicy {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

fn default_reference_day() -> u32 {
    15
}

fn default_weekend_days() -> Vec<Weekday> {
    vec![Weekday::Sat, Weekday::Sun]
}

/// Organisation payroll policy from policy.yaml.
#[derive(Debug, Clone, Deserialize)]
pub struct PayrollPolicy {
    /// Day of month used to pick compensation and compliance rules.
    #[serde(default = "default_reference_day")]
    pub reference_day: u32,
    /// Days of the week that are never working days.
    #[serde(default = "default_weekend_days")]
    pub weekend_days: Vec<Weekday>,
    /// Overtime policy.
    pub overtime: OvertimePolicy,
    /// Shift definitions keyed by shift code.
    pub shifts: HashMap<String, ShiftDefinition>,
    /// Shift used for attendance rows without a shift code.
    pub default_shift: String,
    /// Bulk orchestration limits.
    #[serde(default)]
    pub bulk: BulkPolicy,
}

impl PayrollPolicy {
    /// Returns true if the date falls on a configured weekend day.
    pub fn is_weekend(&self, date: NaiveDate) -> bool {
        self.weekend_days.contains(&date.weekday())
    }

    /// Resolves a row's shift, falling back to the default shift.
    pub fn shift(&self, code: Option<&str>) -> Option<&ShiftDefinition> {
        self.shifts.get(code.unwrap_or(&self.default_shift))
    }

    /// Checks internal consistency.
    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |message: String| EngineError::InvalidConfig {
            source_name: "policy".to_string(),
            message,
        };
        if self.overtime.standard_monthly_hours <= Decimal::ZERO {
            return Err(invalid(
                "overtime.standard_monthly_hours must be positive".to_string(),
            ));
        }
        if self.overtime.multiplier < Decimal::ZERO {
            return Err(invalid("overtime.multiplier must not be negative".to_string()));
        }
        if !self.shifts.contains_key(&self.default_shift) {
            return Err(invalid(format!(
                "default_shift '{}' is not defined",
                self.default_shift
            )));
        }
        if self.bulk.max_concurrency == 0 {
            return Err(invalid("bulk.max_concurrency must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Holiday calendar file structure.
#[derive(Debug, Clone, Deserialize)]
pub struct HolidaysConfig {
    /// All holidays across organisations.
    #[serde(default)]
    pub holidays: Vec<Holiday>,
}

/// Holiday calendar for every organisation.
#[derive(Debug, Clone, Default)]
pub struct HolidayCalendar {
    holidays: Vec<Holiday>,
}

impl HolidayCalendar {
    /// Creates a calendar from a list of holidays.
    pub fn new(holidays: Vec<Holiday>) -> Self {
        Self { holidays }
    }

    /// Returns true if `date` is a holiday for the organisation.
    pub fn is_holiday(&self, organization_id: &str, date: NaiveDate) -> bool {
        self.holidays
            .iter()
            .any(|h| h.date == date && h.applies_to(organization_id))
    }

    /// Returns all holidays.
    pub fn holidays(&self) -> &[Holiday] {
        &self.holidays
    }
}

fn default_retirement_employee_rate() -> Decimal {
    Decimal::new(12, 0)
}

fn default_retirement_employer_rate() -> Decimal {
    Decimal::new(12, 0)
}

fn default_retirement_components() -> Vec<String> {
    vec!["BASIC".to_string(), "DA".to_string()]
}

/// Retirement-fund contribution rule.
#[derive(Debug, Clone, Deserialize)]
pub struct RetirementFundRule {
    /// Cap on the contributory wage base.
    pub wage_ceiling: Decimal,
    /// Employee contribution percentage.
    #[serde(default = "default_retirement_employee_rate")]
    pub employee_rate: Decimal,
    /// Employer contribution percentage.
    #[serde(default = "default_retirement_employer_rate")]
    pub employer_rate: Decimal,
    /// Component codes summed into the wage base (Basic + DA).
    #[serde(default = "default_retirement_components")]
    pub wage_components: Vec<String>,
}

fn default_health_employee_rate() -> Decimal {
    Decimal::new(75, 2)
}

fn default_health_employer_rate() -> Decimal {
    Decimal::new(325, 2)
}

/// Health-insurance contribution rule.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthInsuranceRule {
    /// Employees with gross above this are not covered.
    pub eligibility_ceiling: Decimal,
    /// Employee contribution percentage.
    #[serde(default = "default_health_employee_rate")]
    pub employee_rate: Decimal,
    /// Employer contribution percentage.
    #[serde(default = "default_health_employer_rate")]
    pub employer_rate: Decimal,
}

/// One band of a payroll-tax slab table.
#[derive(Debug, Clone, Deserialize)]
pub struct TaxSlab {
    /// Lower bound of gross earnings (inclusive).
    pub from: Decimal,
    /// Upper bound of gross earnings (inclusive); `None` is unbounded.
    #[serde(default)]
    pub to: Option<Decimal>,
    /// Monthly tax for this band.
    pub amount: Decimal,
    /// Per-month amounts that replace `amount` (month number to amount).
    #[serde(default)]
    pub month_amounts: HashMap<u32, Decimal>,
}

impl TaxSlab {
    /// Returns true if `gross` falls in this band.
    pub fn contains(&self, gross: Decimal) -> bool {
        gross >= self.from && self.to.is_none_or(|to| gross <= to)
    }

    /// Returns the tax for the given month.
    pub fn amount_for_month(&self, month: u32) -> Decimal {
        self.month_amounts.get(&month).copied().unwrap_or(self.amount)
    }
}

/// Regional payroll tax.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayrollTaxRule {
    /// Slab table ordered by `from`.
    #[serde(default)]
    pub slabs: Vec<TaxSlab>,
}

impl PayrollTaxRule {
    /// Returns the slab containing `gross`, if any.
    pub fn slab_for(&self, gross: Decimal) -> Option<&TaxSlab> {
        self.slabs.iter().find(|s| s.contains(gross))
    }
}

/// One bracket of a progressive withholding schedule.
#[derive(Debug, Clone, Deserialize)]
pub struct WithholdingBracket {
    /// Lower bound of annual taxable income.
    pub from: Decimal,
    /// Upper bound of annual taxable income; `None` is unbounded.
    #[serde(default)]
    pub to: Option<Decimal>,
    /// Percentage applied to income inside the bracket.
    pub rate: Decimal,
}

/// Progressive annual withholding schedule.
#[derive(Debug, Clone, Deserialize)]
pub struct WithholdingRule {
    /// Amount subtracted from projected annual income before brackets apply.
    #[serde(default)]
    pub standard_deduction: Decimal,
    /// Brackets ordered by `from`.
    pub brackets: Vec<WithholdingBracket>,
}

/// Statutory rules for one jurisdiction over a validity interval.
#[derive(Debug, Clone, Deserialize)]
pub struct ComplianceRule {
    /// Jurisdiction code (e.g. "MH").
    pub jurisdiction: String,
    /// First day the rule applies.
    pub effective_from: NaiveDate,
    /// Last day the rule applies; `None` is open-ended.
    #[serde(default)]
    pub effective_to: Option<NaiveDate>,
    /// Retirement fund.
    pub retirement_fund: RetirementFundRule,
    /// Health insurance.
    pub health_insurance: HealthInsuranceRule,
    /// Regional payroll tax.
    #[serde(default)]
    pub payroll_tax: PayrollTaxRule,
    /// Income-tax withholding, when configured.
    #[serde(default)]
    pub withholding: Option<WithholdingRule>,
}

impl ComplianceRule {
    /// Returns true if the rule is in force on `date`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.effective_from && self.effective_to.is_none_or(|to| date <= to)
    }

    /// Short reference recorded in audit steps, e.g. `MH@2025-04-01`.
    pub fn rule_ref(&self) -> String {
        format!("{}@{}", self.jurisdiction, self.effective_from)
    }

    /// Checks rates are non-negative and slab tables are ordered without overlap.
    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |message: String| EngineError::InvalidConfig {
            source_name: format!("compliance {}", self.rule_ref()),
            message,
        };

        let rates = [
            ("retirement_fund.employee_rate", self.retirement_fund.employee_rate),
            ("retirement_fund.employer_rate", self.retirement_fund.employer_rate),
            ("health_insurance.employee_rate", self.health_insurance.employee_rate),
            ("health_insurance.employer_rate", self.health_insurance.employer_rate),
        ];
        for (name, rate) in rates {
            if rate < Decimal::ZERO {
                return Err(invalid(format!("{} must not be negative", name)));
            }
        }

        validate_bands(
            self.payroll_tax.slabs.iter().map(|s| (s.from, s.to)),
            "payroll_tax.slabs",
            false,
        )
        .map_err(invalid)?;

        if let Some(withholding) = &self.withholding {
            validate_bands(
                withholding.brackets.iter().map(|b| (b.from, b.to)),
                "withholding.brackets",
                true,
            )
            .map_err(invalid)?;
        }

        Ok(())
    }
}

/// Bands must be ordered and non-overlapping; only the last may be unbounded.
///
/// Slabs are inclusive at both ends so neighbours may not share a bound.
/// Marginal brackets tax income above `from`, so `touching` lets a bracket
/// start where the previous one ends.
fn validate_bands(
    bands: impl Iterator<Item = (Decimal, Option<Decimal>)>,
    name: &str,
    touching: bool,
) -> Result<(), String> {
    let mut previous_to: Option<Option<Decimal>> = None;
    for (index, (from, to)) in bands.enumerate() {
        if let Some(to) = to {
            if to < from {
                return Err(format!("{}[{}] ends before it starts", name, index));
            }
        }
        match previous_to {
            Some(None) => {
                return Err(format!("{}[{}] follows an unbounded band", name, index));
            }
            Some(Some(prev)) if from < prev || (from == prev && !touching) => {
                return Err(format!("{}[{}] overlaps the previous band", name, index));
            }
            _ => {}
        }
        previous_to = Some(to);
    }
    Ok(())
}

/// One compliance file: a version label plus rules.
#[derive(Debug, Clone, Deserialize)]
pub struct ComplianceConfig {
    /// Version label of this file.
    pub version: String,
    /// Rules defined in this file.
    pub rules: Vec<ComplianceRule>,
}

/// Every compliance rule across jurisdictions.
#[derive(Debug, Clone, Default)]
pub struct ComplianceRuleSet {
    rules: Vec<ComplianceRule>,
}

impl ComplianceRuleSet {
    /// Creates a rule set; rules are ordered by jurisdiction then effective date.
    pub fn new(rules: Vec<ComplianceRule>) -> Self {
        let mut rules = rules;
        rules.sort_by(|a, b| {
            a.jurisdiction
                .cmp(&b.jurisdiction)
                .then(a.effective_from.cmp(&b.effective_from))
        });
        Self { rules }
    }

    /// Finds the rule for a jurisdiction in force on `date`.
    ///
    /// When several rules cover the date, the latest `effective_from` wins.
    pub fn rule_for(&self, jurisdiction: &str, date: NaiveDate) -> EngineResult<&ComplianceRule> {
        self.rules
            .iter()
            .rev()
            .find(|r| r.jurisdiction == jurisdiction && r.covers(date))
            .ok_or_else(|| EngineError::ComplianceRuleNotFound {
                jurisdiction: jurisdiction.to_string(),
                date,
            })
    }

    /// Returns all rules.
    pub fn rules(&self) -> &[ComplianceRule] {
        &self.rules
    }
}

/// The complete reference data loaded from YAML files.
///
/// This is an immutable snapshot; every run records [`ReferenceData::version`]
/// so it can be replayed against the data it was computed with.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    /// Combined version label.
    version: String,
    /// Component catalogue.
    catalogue: ComponentCatalogue,
    /// Compliance rules.
    compliance: ComplianceRuleSet,
    /// Payroll policy.
    policy: PayrollPolicy,
    /// Holiday calendar.
    holidays: HolidayCalendar,
}

impl ReferenceData {
    /// Creates reference data from its component parts.
    pub fn new(
        version: String,
        catalogue: ComponentCatalogue,
        compliance: ComplianceRuleSet,
        policy: PayrollPolicy,
        holidays: HolidayCalendar,
    ) -> Self {
        Self {
            version,
            catalogue,
            compliance,
            policy,
            holidays,
        }
    }

    /// Returns the combined version label.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the component catalogue.
    pub fn catalogue(&self) -> &ComponentCatalogue {
        &self.catalogue
    }

    /// Returns the compliance rules.
    pub fn compliance(&self) -> &ComplianceRuleSet {
        &self.compliance
    }

    /// Returns the payroll policy.
    pub fn policy(&self) -> &PayrollPolicy {
        &self.policy
    }

    /// Returns the holiday calendar.
    pub fn holidays(&self) -> &HolidayCalendar {
        &self.holidays
    }
}
