//! Pay component catalogue models.
//!
//! A [`PayComponentDefinition`] tells the evaluator how to turn a compensation
//! line into a monthly amount. [`ComponentAmount`] is the evaluated result.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Whether a component is paid to, recovered from, or paid on behalf of the employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    /// Counts towards gross earnings.
    Earning,
    /// Recovered from the employee's pay.
    Deduction,
    /// Paid by the employer on top of gross.
    EmployerCost,
}

/// How a component's monthly amount is calculated.
///
/// # Example
///
/// ```
/// use payroll_engine::models::CalculationMethod;
///
/// let method: CalculationMethod = serde_yaml::from_str(
///     "type: percent_of_component\nreference: BASIC\npercent: \"40\"",
/// )
/// .unwrap();
/// assert_eq!(method.references(), vec!["BASIC".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CalculationMethod {
    /// `annual / 12`, pro-rated unless the definition is exempt.
    Fixed,
    /// A percentage of another component's evaluated amount.
    PercentOfComponent {
        /// The referenced component code.
        reference: String,
        /// Percentage (40 means 40%).
        percent: Decimal,
    },
    /// A percentage of provisional gross, evaluated in the second pass.
    PercentOfGross {
        /// Percentage (10 means 10%).
        percent: Decimal,
    },
    /// An arithmetic expression over component amounts and basis fields.
    Formula {
        /// The expression source, e.g. `min(BASIC * 0.5, 20000)`.
        expression: String,
    },
}

impl CalculationMethod {
    /// Short label recorded on evaluated amounts.
    pub fn label(&self) -> &'static str {
        match self {
            CalculationMethod::Fixed => "fixed",
            CalculationMethod::PercentOfComponent { .. } => "percent_of_component",
            CalculationMethod::PercentOfGross { .. } => "percent_of_gross",
            CalculationMethod::Formula { .. } => "formula",
        }
    }

    /// Component codes this method directly references.
    ///
    /// Formula references are resolved after parsing and are not listed here.
    pub fn references(&self) -> Vec<String> {
        match self {
            CalculationMethod::PercentOfComponent { reference, .. } => vec![reference.clone()],
            _ => Vec::new(),
        }
    }
}

/// Catalogue entry for one pay component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayComponentDefinition {
    /// Unique component code (e.g. "BASIC").
    pub code: String,
    /// Human-readable name.
    pub name: String,
    /// Earning, deduction or employer cost.
    pub component_type: ComponentType,
    /// How the amount is calculated.
    pub method: CalculationMethod,
    /// Fixed amounts paid in full regardless of attendance.
    #[serde(default)]
    pub exempt_from_proration: bool,
}

/// One evaluated component for a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentAmount {
    /// Component code.
    pub code: String,
    /// Component name.
    pub name: String,
    /// Earning, deduction or employer cost.
    pub component_type: ComponentType,
    /// Calculation method label.
    pub method: String,
    /// Whether attendance pro-ration was applied.
    pub prorated: bool,
    /// Rounded monthly amount.
    pub amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_deserialize_fixed_definition_defaults_to_prorated() {
        let yaml = r#"
code: BASIC
name: Basic Salary
component_type: earning
method:
  type: fixed
"#;
        let definition: PayComponentDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(definition.method, CalculationMethod::Fixed);
        assert!(!definition.exempt_from_proration);
        assert_eq!(definition.component_type, ComponentType::Earning);
    }

    #[test]
    fn test_deserialize_percent_of_gross() {
        let yaml = r#"
code: PERF
name: Performance Pay
component_type: earning
method:
  type: percent_of_gross
  percent: "5"
"#;
        let definition: PayComponentDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            definition.method,
            CalculationMethod::PercentOfGross { percent: dec("5") }
        );
    }

    #[test]
    fn test_deserialize_formula() {
        let yaml = r#"
code: LTA
name: Leave Travel
component_type: earning
method:
  type: formula
  expression: "min(BASIC * 0.1, 2500)"
"#;
        let definition: PayComponentDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(definition.method.label(), "formula");
        assert!(definition.method.references().is_empty());
    }

    #[test]
    fn test_component_type_serialization() {
        assert_eq!(
            serde_json::to_string(&ComponentType::EmployerCost).unwrap(),
            "\"employer_cost\""
        );
    }

    #[test]
    fn test_method_labels() {
        assert_eq!(CalculationMethod::Fixed.label(), "fixed");
        assert_eq!(
            CalculationMethod::PercentOfGross { percent: dec("1") }.label(),
            "percent_of_gross"
        );
    }
}
