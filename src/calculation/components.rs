//! Component evaluation.
//!
//! Evaluates a compensation record's lines into monthly amounts in two
//! passes. The first pass covers fixed, percent-of-component and formula
//! lines in dependency order and yields provisional gross. The second pass
//! evaluates percent-of-gross lines against that provisional gross, so they
//! never feed back into their own base. Overtime is priced last, on the
//! provisional gross.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ComponentCatalogue, OvertimePolicy};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AttendanceBasis, AuditStep, CalculationMethod, CompensationRecord, ComponentAmount,
    ComponentType, PayComponentDefinition,
};

use super::dependency::ComponentGraph;
use super::overtime::calculate_overtime;
use super::rounding::{percent_of, round_money};

/// Evaluated components with aggregates and audit steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentEvaluation {
    /// Amounts in compensation-line order, overtime last.
    pub components: Vec<ComponentAmount>,
    /// Codes in the order they were evaluated.
    pub evaluation_order: Vec<String>,
    /// First-pass earnings total; the base for percent-of-gross and overtime.
    pub provisional_gross: Decimal,
    /// All earnings including second pass and overtime.
    pub gross_earnings: Decimal,
    /// Sum of deduction components.
    pub component_deductions: Decimal,
    /// Sum of employer-cost components.
    pub employer_components: Decimal,
    /// One step per evaluated component.
    pub audit_steps: Vec<AuditStep>,
}

impl ComponentEvaluation {
    /// Returns the amount for a component code, or zero when absent.
    pub fn amount(&self, code: &str) -> Decimal {
        self.components
            .iter()
            .filter(|c| c.code == code)
            .map(|c| c.amount)
            .sum()
    }
}

/// Names formulas may use besides component codes and basis fields.
const ANNUAL: &str = "annual";
const MONTHLY: &str = "monthly";

fn is_context_identifier(name: &str, basis: &AttendanceBasis) -> bool {
    name == ANNUAL || name == MONTHLY || basis.field(name).is_some()
}

/// Pro-ration factor `payable_days / working_days`; zero when there are no working days.
fn proration_factor(basis: &AttendanceBasis) -> Decimal {
    if basis.working_days.is_zero() {
        Decimal::ZERO
    } else {
        basis.payable_days / basis.working_days
    }
}

/// Evaluates every line of a compensation record.
///
/// Fails with `ComponentNotFound` when a line's code is missing from the
/// catalogue, and with `InvalidFormula` for unknown references, circular
/// references, a first-pass line referencing a percent-of-gross line,
/// division by zero, or a formula that evaluates negative.
pub fn evaluate_components(
    basis: &AttendanceBasis,
    compensation: &CompensationRecord,
    catalogue: &ComponentCatalogue,
    overtime: &OvertimePolicy,
    step_number: u32,
) -> EngineResult<ComponentEvaluation> {
    let mut definitions: HashMap<&str, &PayComponentDefinition> = HashMap::new();
    let mut annual: HashMap<&str, Decimal> = HashMap::new();
    for line in &compensation.lines {
        definitions.insert(line.code.as_str(), catalogue.get(&line.code)?);
        annual.insert(line.code.as_str(), line.annual_amount);
    }

    let is_second_pass = |code: &str| {
        definitions
            .get(code)
            .is_some_and(|d| matches!(d.method, CalculationMethod::PercentOfGross { .. }))
    };

    // First-pass dependency graph.
    let mut graph = ComponentGraph::new();
    for line in &compensation.lines {
        let code = line.code.as_str();
        if is_second_pass(code) {
            continue;
        }
        graph.add_component(code);

        let references: Vec<String> = match &definitions[code].method {
            CalculationMethod::PercentOfComponent { reference, .. } => vec![reference.clone()],
            CalculationMethod::Formula { .. } => catalogue
                .formula(code)
                .map(|expr| expr.identifiers().into_iter().collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        for reference in references {
            if is_second_pass(&reference) {
                return Err(EngineError::invalid_formula(
                    code,
                    format!("cannot reference percent-of-gross component '{}'", reference),
                ));
            }
            if definitions.contains_key(reference.as_str()) {
                graph.add_dependency(code, &reference);
            } else if matches!(definitions[code].method, CalculationMethod::Formula { .. })
                && is_context_identifier(&reference, basis)
            {
                continue;
            } else {
                return Err(EngineError::invalid_formula(
                    code,
                    format!(
                        "references '{}', which is not on compensation record {}",
                        reference, compensation.id
                    ),
                ));
            }
        }
    }

    let first_pass_order = graph.evaluation_order()?;
    let factor = proration_factor(basis);
    let mut amounts: HashMap<String, Decimal> = HashMap::new();
    let mut prorated: HashMap<String, bool> = HashMap::new();
    let mut audit_steps = Vec::new();
    let mut step = step_number;

    for code in &first_pass_order {
        let definition = definitions[code.as_str()];
        let annual_amount = annual[code.as_str()];
        let monthly = annual_amount / Decimal::from(12);

        let (amount, was_prorated, input, reasoning) = match &definition.method {
            CalculationMethod::Fixed => {
                if definition.exempt_from_proration {
                    let amount = round_money(monthly);
                    (
                        amount,
                        false,
                        serde_json::json!({ "annual": annual_amount.to_string() }),
                        format!("{} / 12 = {} (exempt from pro-ration)", annual_amount, amount),
                    )
                } else {
                    let amount = round_money(monthly * factor);
                    (
                        amount,
                        true,
                        serde_json::json!({
                            "annual": annual_amount.to_string(),
                            "payable_days": basis.payable_days.to_string(),
                            "working_days": basis.working_days.to_string(),
                        }),
                        format!(
                            "{} / 12 × {}/{} days = {}",
                            annual_amount, basis.payable_days, basis.working_days, amount
                        ),
                    )
                }
            }
            CalculationMethod::PercentOfComponent { reference, percent } => {
                let base = amounts.get(reference).copied().unwrap_or(Decimal::ZERO);
                let amount = round_money(percent_of(base, *percent));
                (
                    amount,
                    prorated.get(reference).copied().unwrap_or(false),
                    serde_json::json!({
                        "reference": reference,
                        "reference_amount": base.to_string(),
                        "percent": percent.normalize().to_string(),
                    }),
                    format!("{}% of {} ({}) = {}", percent.normalize(), reference, base, amount),
                )
            }
            CalculationMethod::Formula { expression } => {
                let expr = catalogue.formula(code).ok_or_else(|| {
                    EngineError::invalid_formula(code, "formula was not parsed at load time")
                })?;
                let resolve = |name: &str| -> Option<Decimal> {
                    if let Some(value) = amounts.get(name) {
                        return Some(*value);
                    }
                    match name {
                        ANNUAL => Some(annual_amount),
                        MONTHLY => Some(monthly),
                        _ => basis.field(name),
                    }
                };
                let value = expr.evaluate(code, &resolve)?;
                if value < Decimal::ZERO {
                    return Err(EngineError::invalid_formula(
                        code,
                        format!("evaluated to negative amount {}", value),
                    ));
                }
                let amount = round_money(value);
                (
                    amount,
                    false,
                    serde_json::json!({ "expression": expression }),
                    format!("{} = {}", expression, amount),
                )
            }
            CalculationMethod::PercentOfGross { .. } => {
                return Err(EngineError::CalculationError {
                    message: format!("{} scheduled in the first pass", code),
                });
            }
        };

        amounts.insert(code.clone(), amount);
        prorated.insert(code.clone(), was_prorated);
        audit_steps.push(component_step(step, definition, input, amount, reasoning));
        step += 1;
    }

    let provisional_gross: Decimal = first_pass_order
        .iter()
        .filter(|code| definitions[code.as_str()].component_type == ComponentType::Earning)
        .map(|code| amounts[code.as_str()])
        .sum();

    let mut evaluation_order = first_pass_order;
    for line in &compensation.lines {
        let definition = definitions[line.code.as_str()];
        let CalculationMethod::PercentOfGross { percent } = &definition.method else {
            continue;
        };
        let amount = round_money(percent_of(provisional_gross, *percent));
        audit_steps.push(component_step(
            step,
            definition,
            serde_json::json!({
                "provisional_gross": provisional_gross.to_string(),
                "percent": percent.normalize().to_string(),
            }),
            amount,
            format!(
                "{}% of provisional gross {} = {}",
                percent.normalize(),
                provisional_gross,
                amount
            ),
        ));
        step += 1;
        amounts.insert(line.code.clone(), amount);
        prorated.insert(line.code.clone(), false);
        evaluation_order.push(line.code.clone());
    }

    let mut components: Vec<ComponentAmount> = compensation
        .lines
        .iter()
        .map(|line| {
            let definition = definitions[line.code.as_str()];
            ComponentAmount {
                code: definition.code.clone(),
                name: definition.name.clone(),
                component_type: definition.component_type,
                method: definition.method.label().to_string(),
                prorated: prorated.get(&line.code).copied().unwrap_or(false),
                amount: amounts.get(&line.code).copied().unwrap_or(Decimal::ZERO),
            }
        })
        .collect();

    if basis.ot_hours > Decimal::ZERO {
        let result = calculate_overtime(basis.ot_hours, provisional_gross, overtime, step)?;
        evaluation_order.push(result.component.code.clone());
        components.push(result.component);
        audit_steps.push(result.audit_step);
    }

    let total = |kind: ComponentType| -> Decimal {
        components
            .iter()
            .filter(|c| c.component_type == kind)
            .map(|c| c.amount)
            .sum()
    };
    let gross_earnings = total(ComponentType::Earning);
    let component_deductions = total(ComponentType::Deduction);
    let employer_components = total(ComponentType::EmployerCost);

    debug!(
        compensation_id = %compensation.id,
        components = components.len(),
        gross = %gross_earnings,
        "Evaluated components"
    );

    Ok(ComponentEvaluation {
        components,
        evaluation_order,
        provisional_gross,
        gross_earnings,
        component_deductions,
        employer_components,
        audit_steps,
    })
}

fn component_step(
    step_number: u32,
    definition: &PayComponentDefinition,
    input: serde_json::Value,
    amount: Decimal,
    reasoning: String,
) -> AuditStep {
    AuditStep {
        step_number,
        rule_id: format!("component_{}", definition.method.label()),
        rule_name: definition.name.clone(),
        rule_ref: format!("catalogue:{}", definition.code),
        input,
        output: serde_json::json!({ "amount": amount.to_string() }),
        reasoning,
    }
}
