//! Reference data loading for the payroll engine.
//!
//! This module loads the component catalogue, organisation policy, holiday
//! calendar and per-jurisdiction compliance rules from YAML files.
//!
//! # Example
//!
//! ```no_run
//! use payroll_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/standard").unwrap();
//! println!("Reference data: {}", config.reference().version());
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    BulkPolicy, CatalogueConfig, ComplianceConfig, ComplianceRule, ComplianceRuleSet,
    ComponentCatalogue, HealthInsuranceRule, HolidayCalendar, HolidaysConfig, OvertimePolicy,
    PayrollPolicy, PayrollTaxRule, ReferenceData, RetirementFundRule, ShiftDefinition, TaxSlab,
    WithholdingBracket, WithholdingRule,
};
