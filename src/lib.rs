//! Attendance-to-payroll calculation engine.
//!
//! Turns a month of attendance and an employee's effective-dated compensation
//! into an immutable, versioned payroll run: pro-rated pay components,
//! statutory contributions on both the employee and employer side, and a
//! step-by-step audit trace.
//!
//! - [`calculation`] holds the pure calculation steps.
//! - [`config`] loads versioned reference data from YAML.
//! - [`payroll`] owns the run state machine, persistence seam and bulk processing.
//! - [`api`] is a thin axum adapter over [`payroll::PayrollEngine`].

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
pub mod payroll;
