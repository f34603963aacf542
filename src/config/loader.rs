//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading payroll
//! reference data from YAML files.

use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::models::PayComponentDefinition;

use super::types::{
    CatalogueConfig, ComplianceConfig, ComplianceRule, ComplianceRuleSet, ComponentCatalogue,
    HolidayCalendar, HolidaysConfig, PayrollPolicy, ReferenceData,
};

/// Loads and provides access to payroll reference data.
///
/// # Directory Structure
///
/// ```text
/// config/standard/
/// ├── catalogue.yaml   # Pay component definitions
/// ├── policy.yaml      # Working week, shifts, overtime, bulk limits
/// ├── holidays.yaml    # Holiday calendar
/// └── compliance/
///     ├── mh.yaml      # Statutory rules per jurisdiction
///     └── ka.yaml
/// ```
///
/// # Example
///
/// ```no_run
/// use payroll_engine::config::ConfigLoader;
/// use chrono::NaiveDate;
///
/// let loader = ConfigLoader::load("./config/standard").unwrap();
///
/// let basic = loader.get_component("BASIC").unwrap();
/// println!("Component: {}", basic.name);
///
/// let date = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
/// let rule = loader.get_compliance_rule("MH", date).unwrap();
/// println!("Retirement ceiling: {}", rule.retirement_fund.wage_ceiling);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    reference: ReferenceData,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// Returns an error if any required file is missing, contains invalid
    /// YAML, or fails validation (duplicate component codes, overlapping
    /// slabs, negative rates, non-positive standard hours).
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let catalogue_config = Self::load_yaml::<CatalogueConfig>(&path.join("catalogue.yaml"))?;
        let catalogue =
            ComponentCatalogue::new(catalogue_config.version.clone(), catalogue_config.components)?;

        let policy = Self::load_yaml::<PayrollPolicy>(&path.join("policy.yaml"))?;
        policy.validate()?;

        let holidays = Self::load_yaml::<HolidaysConfig>(&path.join("holidays.yaml"))?;

        let (compliance_versions, rules) = Self::load_compliance(&path.join("compliance"))?;

        let version = format!(
            "catalogue:{};compliance:{}",
            catalogue.version(),
            compliance_versions.join(",")
        );

        info!(
            path = %path.display(),
            version = %version,
            components = catalogue.len(),
            compliance_rules = rules.len(),
            "Loaded payroll reference data"
        );

        let reference = ReferenceData::new(
            version,
            catalogue,
            ComplianceRuleSet::new(rules),
            policy,
            HolidayCalendar::new(holidays.holidays),
        );

        Ok(Self { reference })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Loads every compliance file, in file-name order.
    fn load_compliance(dir: &Path) -> EngineResult<(Vec<String>, Vec<ComplianceRule>)> {
        let dir_str = dir.display().to_string();

        if !dir.exists() {
            return Err(EngineError::ConfigNotFound { path: dir_str });
        }

        let entries = fs::read_dir(dir).map_err(|_| EngineError::ConfigNotFound {
            path: dir_str.clone(),
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|_| EngineError::ConfigNotFound {
                path: dir_str.clone(),
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "yaml") {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(EngineError::ConfigNotFound {
                path: format!("{} (no compliance files found)", dir_str),
            });
        }

        let mut versions = Vec::with_capacity(paths.len());
        let mut rules = Vec::new();
        for path in paths {
            let file = Self::load_yaml::<ComplianceConfig>(&path)?;
            for rule in &file.rules {
                rule.validate()?;
            }
            versions.push(file.version);
            rules.extend(file.rules);
        }

        Ok((versions, rules))
    }

    /// Returns the loaded reference data.
    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    /// Consumes the loader, returning the reference data.
    pub fn into_reference(self) -> ReferenceData {
        self.reference
    }

    /// Gets a component definition by its code.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use payroll_engine::config::ConfigLoader;
    ///
    /// let loader = ConfigLoader::load("./config/standard")?;
    /// let hra = loader.get_component("HRA")?;
    /// println!("Method: {}", hra.method.label());
    /// # Ok::<(), payroll_engine::error::EngineError>(())
    /// ```
    pub fn get_component(&self, code: &str) -> EngineResult<&PayComponentDefinition> {
        self.reference.catalogue().get(code)
    }

    /// Gets the compliance rule for a jurisdiction in force on `date`.
    pub fn get_compliance_rule(
        &self,
        jurisdiction: &str,
        date: NaiveDate,
    ) -> EngineResult<&ComplianceRule> {
        self.reference.compliance().rule_for(jurisdiction, date)
    }
}
