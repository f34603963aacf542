//! Income-tax withholding.
//!
//! Withholding is pluggable: the engine asks a [`WithholdingPolicy`] for the
//! month's amount given an annual projection and the jurisdiction's
//! configured schedule, if any.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::WithholdingRule;
use crate::error::EngineResult;

use super::rounding::{percent_of, round_money};

/// Annualised view of the month being paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnualProjection {
    /// Jurisdiction of the run.
    pub jurisdiction: String,
    /// Calendar month (1-12).
    pub month: u32,
    /// This month's gross earnings.
    pub monthly_gross: Decimal,
    /// `monthly_gross × 12`.
    pub annual_gross: Decimal,
}

impl AnnualProjection {
    /// Projects a month's gross over twelve months.
    pub fn from_monthly(jurisdiction: &str, month: u32, monthly_gross: Decimal) -> Self {
        Self {
            jurisdiction: jurisdiction.to_string(),
            month,
            monthly_gross,
            annual_gross: monthly_gross * Decimal::from(12),
        }
    }
}

/// Computes the monthly withholding amount.
pub trait WithholdingPolicy: Send + Sync {
    /// Returns the rounded amount to withhold this month.
    fn monthly_withholding(
        &self,
        projection: &AnnualProjection,
        rule: Option<&WithholdingRule>,
    ) -> EngineResult<Decimal>;
}

/// Progressive brackets applied to projected annual income, spread evenly over the year.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedWithholding;

impl WithholdingPolicy for RuleBasedWithholding {
    fn monthly_withholding(
        &self,
        projection: &AnnualProjection,
        rule: Option<&WithholdingRule>,
    ) -> EngineResult<Decimal> {
        let Some(rule) = rule else {
            return Ok(Decimal::ZERO);
        };

        let taxable = (projection.annual_gross - rule.standard_deduction).max(Decimal::ZERO);
        let mut annual_tax = Decimal::ZERO;
        for bracket in &rule.brackets {
            if taxable <= bracket.from {
                break;
            }
            let upper = bracket.to.map_or(taxable, |to| taxable.min(to));
            annual_tax += percent_of(upper - bracket.from, bracket.rate);
        }

        Ok(round_money(annual_tax / Decimal::from(12)))
    }
}

/// Never withholds; for jurisdictions or deployments where tax is handled elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWithholding;

impl WithholdingPolicy for NoWithholding {
    fn monthly_withholding(
        &self,
        _projection: &AnnualProjection,
        _rule: Option<&WithholdingRule>,
    ) -> EngineResult<Decimal> {
        Ok(Decimal::ZERO)
    }
}
