//! HTTP request handlers for the payroll engine API.
//!
//! Every handler is a thin adapter over a [`PayrollEngine`] operation:
//! decode the request, call the engine, and map the result or error to JSON.
//!
//! [`PayrollEngine`]: crate::payroll::PayrollEngine

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::EngineError;
use crate::payroll::BulkOptions;

use super::request::{BulkRequest, FinalizeRequest, ReversalRequest};
use super::response::{ApiError, ApiErrorResponse};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/periods/:period_id/runs/:employee_id",
            post(finalize_handler).get(current_run_handler),
        )
        .route(
            "/periods/:period_id/runs/:employee_id/history",
            get(run_history_handler),
        )
        .route(
            "/periods/:period_id/runs/:employee_id/reversal",
            post(reversal_handler),
        )
        .route("/periods/:period_id/bulk", post(bulk_handler))
        .route("/periods/:period_id/lock", post(lock_handler))
        .route("/periods/:period_id/unlock", post(unlock_handler))
        .route("/periods/:period_id/post", post(post_handler))
        .route(
            "/employees/:employee_id/attendance-basis",
            get(attendance_basis_handler),
        )
        .with_state(state)
}

fn ok_json<T: Serialize>(body: &T) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        Json(body),
    )
        .into_response()
}

fn engine_error(correlation_id: Uuid, err: EngineError) -> Response {
    warn!(
        correlation_id = %correlation_id,
        kind = ?err.kind(),
        error = %err,
        "Request failed"
    );
    ApiErrorResponse::from(err).into_response()
}

/// Maps a JSON body rejection to a 400 response.
fn rejection_error(correlation_id: Uuid, rejection: JsonRejection) -> Response {
    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    ApiErrorResponse::bad_request(error).into_response()
}

fn query_rejection_error(correlation_id: Uuid, rejection: QueryRejection) -> Response {
    let body_text = rejection.body_text();
    warn!(
        correlation_id = %correlation_id,
        error = %body_text,
        "Query string error"
    );
    ApiErrorResponse::bad_request(ApiError::validation_error(body_text)).into_response()
}

/// Handler for `POST /periods/:period_id/runs/:employee_id`.
async fn finalize_handler(
    State(state): State<AppState>,
    Path((period_id, employee_id)): Path<(String, String)>,
    payload: Result<Json<FinalizeRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, %period_id, %employee_id, "Finalize request");

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return rejection_error(correlation_id, rejection),
    };

    match state
        .engine()
        .finalize_run(&period_id, &employee_id, &request.jurisdiction)
        .await
    {
        Ok(run) => ok_json(&run),
        Err(err) => engine_error(correlation_id, err),
    }
}

/// Handler for `GET /periods/:period_id/runs/:employee_id`.
async fn current_run_handler(
    State(state): State<AppState>,
    Path((period_id, employee_id)): Path<(String, String)>,
) -> Response {
    match state.engine().current_run(&period_id, &employee_id) {
        Ok(run) => ok_json(&run),
        Err(err) => engine_error(Uuid::new_v4(), err),
    }
}

/// Handler for `GET /periods/:period_id/runs/:employee_id/history`.
async fn run_history_handler(
    State(state): State<AppState>,
    Path((period_id, employee_id)): Path<(String, String)>,
) -> Response {
    match state.engine().run_history(&period_id, &employee_id) {
        Ok(runs) => ok_json(&runs),
        Err(err) => engine_error(Uuid::new_v4(), err),
    }
}

/// Handler for `POST /periods/:period_id/runs/:employee_id/reversal`.
async fn reversal_handler(
    State(state): State<AppState>,
    Path((period_id, employee_id)): Path<(String, String)>,
    payload: Result<Json<ReversalRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, %period_id, %employee_id, "Reversal request");

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return rejection_error(correlation_id, rejection),
    };

    match state
        .engine()
        .reverse_run(&period_id, &employee_id, &request.jurisdiction, &request.reason)
        .await
    {
        Ok(run) => ok_json(&run),
        Err(err) => engine_error(correlation_id, err),
    }
}

/// Handler for `POST /periods/:period_id/bulk`.
async fn bulk_handler(
    State(state): State<AppState>,
    Path(period_id): Path<String>,
    payload: Result<Json<BulkRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, %period_id, "Bulk finalize request");

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return rejection_error(correlation_id, rejection),
    };
    let jurisdiction = request.jurisdiction.clone();
    let options: BulkOptions = request.into();

    match state
        .engine()
        .clone()
        .bulk_finalize(&period_id, &jurisdiction, options)
        .await
    {
        Ok(report) => ok_json(&report),
        Err(err) => engine_error(correlation_id, err),
    }
}

#[derive(Debug, Clone, Copy)]
enum PeriodAction {
    Lock,
    Unlock,
    Post,
}

fn transition(state: &AppState, period_id: &str, action: PeriodAction) -> Response {
    let engine = state.engine();
    let result = match action {
        PeriodAction::Lock => engine.lock_period(period_id),
        PeriodAction::Unlock => engine.unlock_period(period_id),
        PeriodAction::Post => engine.post_period(period_id),
    };
    match result {
        Ok(period) => ok_json(&period),
        Err(err) => engine_error(Uuid::new_v4(), err),
    }
}

/// Handler for `POST /periods/:period_id/lock`.
async fn lock_handler(State(state): State<AppState>, Path(period_id): Path<String>) -> Response {
    transition(&state, &period_id, PeriodAction::Lock)
}

/// Handler for `POST /periods/:period_id/unlock`.
async fn unlock_handler(State(state): State<AppState>, Path(period_id): Path<String>) -> Response {
    transition(&state, &period_id, PeriodAction::Unlock)
}

/// Handler for `POST /periods/:period_id/post`.
async fn post_handler(State(state): State<AppState>, Path(period_id): Path<String>) -> Response {
    transition(&state, &period_id, PeriodAction::Post)
}

/// Query for the attendance-basis preview.
#[derive(Debug, Deserialize)]
struct AttendanceQuery {
    month: u32,
    year: i32,
    #[serde(default)]
    strict: bool,
}

/// Handler for `GET /employees/:employee_id/attendance-basis`.
///
/// With `strict=true`, incomplete attendance is an error instead of a warning.
async fn attendance_basis_handler(
    State(state): State<AppState>,
    Path(employee_id): Path<String>,
    query: Result<Query<AttendanceQuery>, QueryRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return query_rejection_error(correlation_id, rejection),
    };

    let result = state
        .engine()
        .resolve_attendance_basis(&employee_id, query.month, query.year)
        .and_then(|r| {
            if query.strict {
                r.require_complete(&employee_id)
            } else {
                Ok(r)
            }
        });
    match result {
        Ok(result) => ok_json(&result),
        Err(err) => engine_error(correlation_id, err),
    }
}
