//! `/check` handler.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::types::{AppState, ErrorResponse};
use crate::check::run_check;
use crate::config::MAX_TARGET_LENGTH;
use crate::dns::AddressResolver;
use crate::error_handling::SinkError;
use crate::models::CheckParams;
use crate::probe::ProbeEngine;

/// Runs a check for `?server=` and returns the record.
///
/// Only a bad `server` parameter (400) or a closed output sink (503) yields
/// a non-200 status; DNS and probe failures are reported inside the record.
pub async fn check_handler<R, E>(
    State(state): State<AppState<R, E>>,
    query: Result<Query<CheckParams>, QueryRejection>,
) -> Response
where
    R: AddressResolver,
    E: ProbeEngine,
{
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => {
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };
    if let Err(message) = validate_server(&params.server) {
        return error_response(StatusCode::BAD_REQUEST, message);
    }
    if state.sink.is_closed() {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            SinkError::Closed.to_string(),
        );
    }

    let record = run_check(&state.check, &params).await;

    match state.sink.enqueue(Arc::clone(&record)).await {
        // Dropped records are already logged and counted by the sink
        Ok(()) | Err(SinkError::Full) => {}
        Err(e) => {
            log::warn!("Record for {:?} not written: {e}", params.server);
            return error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string());
        }
    }

    Json(&*record).into_response()
}

/// Rejects blank and oversized targets.
pub(crate) fn validate_server(server: &str) -> Result<(), String> {
    if server.trim().is_empty() {
        return Err("missing server parameter".to_string());
    }
    if server.len() > MAX_TARGET_LENGTH {
        return Err(format!("server parameter longer than {MAX_TARGET_LENGTH} bytes"));
    }
    Ok(())
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}
