//! Application state for the payroll engine API.

use std::sync::Arc;

use crate::payroll::PayrollEngine;

/// Shared application state.
///
/// Holds the engine, which owns the store and the reference-data snapshot.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<PayrollEngine>,
}

impl AppState {
    /// Creates a new application state around an engine.
    pub fn new(engine: Arc<PayrollEngine>) -> Self {
        Self { engine }
    }

    /// Returns the engine.
    pub fn engine(&self) -> &Arc<PayrollEngine> {
        &self.engine
    }
}
