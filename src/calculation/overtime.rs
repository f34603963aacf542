//! Monthly overtime pay.
//!
//! Overtime is paid on the hourly equivalent of provisional gross:
//! `provisional_gross / standard_monthly_hours × multiplier × ot_hours`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::OvertimePolicy;
use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, ComponentAmount, ComponentType};

use super::rounding::round_money;

/// The overtime earning and how it was derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeResult {
    /// Hourly rate before the multiplier, unrounded.
    pub hourly_rate: Decimal,
    /// The overtime earning line.
    pub component: ComponentAmount,
    /// The audit step recording the calculation.
    pub audit_step: AuditStep,
}

/// Calculates overtime pay for a month.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::calculate_overtime;
/// use payroll_engine::config::OvertimePolicy;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let policy = OvertimePolicy {
///     standard_monthly_hours: Decimal::from(208),
///     multiplier: Decimal::from(2),
///     component_code: "OVERTIME".to_string(),
/// };
/// let result = calculate_overtime(
///     Decimal::from(4),
///     Decimal::from_str("41600").unwrap(),
///     &policy,
///     5,
/// )
/// .unwrap();
///
/// // 41600 / 208 = 200 per hour, × 2 × 4 hours
/// assert_eq!(result.component.amount, Decimal::from(1600));
/// ```
pub fn calculate_overtime(
    ot_hours: Decimal,
    provisional_gross: Decimal,
    policy: &OvertimePolicy,
    step_number: u32,
) -> EngineResult<OvertimeResult> {
    let hourly_rate = provisional_gross
        .checked_div(policy.standard_monthly_hours)
        .ok_or_else(|| EngineError::CalculationError {
            message: "overtime standard_monthly_hours must be positive".to_string(),
        })?;
    let amount = round_money(ot_hours * hourly_rate * policy.multiplier);

    let audit_step = AuditStep {
        step_number,
        rule_id: "overtime".to_string(),
        rule_name: "Overtime Pay".to_string(),
        rule_ref: "policy:overtime".to_string(),
        input: serde_json::json!({
            "ot_hours": ot_hours.normalize().to_string(),
            "provisional_gross": provisional_gross.to_string(),
            "standard_monthly_hours": policy.standard_monthly_hours.normalize().to_string(),
            "multiplier": policy.multiplier.normalize().to_string(),
        }),
        output: serde_json::json!({
            "hourly_rate": hourly_rate.round_dp(4).to_string(),
            "amount": amount.to_string(),
        }),
        reasoning: format!(
            "{} OT hours × ({} / {} hours) × {} = {}",
            ot_hours.normalize(),
            provisional_gross,
            policy.standard_monthly_hours.normalize(),
            policy.multiplier.normalize(),
            amount
        ),
    };

    Ok(OvertimeResult {
        hourly_rate,
        component: ComponentAmount {
            code: policy.component_code.clone(),
            name: "Overtime".to_string(),
            component_type: ComponentType::Earning,
            method: "overtime".to_string(),
            prorated: false,
            amount,
        },
        audit_step,
    })
}
