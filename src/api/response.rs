//! Response types for the payroll engine API.
//!
//! This module defines the error response structures and the mapping from
//! [`EngineError`] to HTTP status codes.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, ErrorKind};

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
#[derive(Debug)]
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl ApiErrorResponse {
    /// A 400 response.
    pub fn bad_request(error: ApiError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
        }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            Json(self.error),
        )
            .into_response()
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::PreconditionFailed => StatusCode::CONFLICT,
        ErrorKind::AmbiguousState | ErrorKind::InvalidFormula | ErrorKind::PartialData => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Configuration | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn code_for(error: &EngineError) -> &'static str {
    match error {
        EngineError::ConfigNotFound { .. }
        | EngineError::ConfigParseError { .. }
        | EngineError::InvalidConfig { .. } => "CONFIG_ERROR",
        EngineError::EmployeeNotFound { .. } => "EMPLOYEE_NOT_FOUND",
        EngineError::PeriodNotFound { .. } => "PERIOD_NOT_FOUND",
        EngineError::CompensationNotFound { .. } => "COMPENSATION_NOT_FOUND",
        EngineError::ComplianceRuleNotFound { .. } => "COMPLIANCE_RULE_NOT_FOUND",
        EngineError::ComponentNotFound { .. } => "COMPONENT_NOT_FOUND",
        EngineError::RunNotFound { .. } => "RUN_NOT_FOUND",
        EngineError::AmbiguousState { .. } => "AMBIGUOUS_STATE",
        EngineError::InvalidFormula { .. } => "INVALID_FORMULA",
        EngineError::PreconditionFailed { .. } => "PRECONDITION_FAILED",
        EngineError::PartialData { .. } => "PARTIAL_DATA",
        EngineError::InvalidAttendance { .. } => "INVALID_ATTENDANCE",
        EngineError::InvalidCompensation { .. } => "INVALID_COMPENSATION",
        EngineError::Store { .. } => "STORE_ERROR",
        EngineError::CalculationError { .. } => "CALCULATION_ERROR",
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let status = status_for(error.kind());
        let code = code_for(&error);
        // Internal details stay in the logs.
        let api_error = if status.is_server_error() {
            ApiError::with_details(code, "Payroll engine error", error.to_string())
        } else {
            ApiError::new(code, error.to_string())
        };
        ApiErrorResponse {
            status,
            error: api_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_api_error_serialization() {
        let error = ApiError::new("TEST_ERROR", "Test message");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"code\":\"TEST_ERROR\""));
        assert!(json.contains("\"message\":\"Test message\""));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let response: ApiErrorResponse = EngineError::CompensationNotFound {
            employee_id: "emp_001".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 2, 15).unwrap(),
        }
        .into();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.error.code, "COMPENSATION_NOT_FOUND");
        assert!(response.error.message.contains("emp_001"));
    }

    #[test]
    fn test_precondition_maps_to_409() {
        let response: ApiErrorResponse = EngineError::precondition("period is locked").into();
        assert_eq!(response.status, StatusCode::CONFLICT);
        assert_eq!(response.error.code, "PRECONDITION_FAILED");
    }

    #[test]
    fn test_formula_maps_to_422() {
        let response: ApiErrorResponse =
            EngineError::invalid_formula("LTA", "unknown identifier FOO").into();
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.error.code, "INVALID_FORMULA");
    }

    #[test]
    fn test_store_error_is_500_with_details() {
        let response: ApiErrorResponse = EngineError::Store {
            message: "lock poisoned".to_string(),
        }
        .into();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.error.message, "Payroll engine error");
        assert!(response.error.details.unwrap().contains("lock poisoned"));
    }
}
