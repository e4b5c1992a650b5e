use axum::extract::{Path, Query, State};
use axum::Json;
use autodial_core::{CallRecord, CallStatus};
use dialer::CallStats;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_RECENT_LIMIT: usize = 5;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Only records with this status, e.g. `answered`
    pub status: Option<String>,
    /// Only the newest `limit` records
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/api/call-history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Call records in dialing order", body = [CallRecord]),
        (status = 400, description = "Unknown status filter", body = crate::error::ErrorResponse)
    ),
    tag = "calls"
)]
pub async fn list_call_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<CallRecord>>, AppError> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => Some(
            s.parse::<CallStatus>()
                .map_err(|e| AppError::BadRequest(e.to_string()))?,
        ),
    };

    Ok(Json(state.records.filter(status, query.limit)))
}

#[utoipa::path(
    get,
    path = "/api/call-history/stats",
    responses(
        (status = 200, description = "Per-status call counts", body = CallStats)
    ),
    tag = "calls"
)]
pub async fn call_stats(State(state): State<AppState>) -> Json<CallStats> {
    Json(state.records.stats())
}

#[utoipa::path(
    get,
    path = "/api/call-history/recent",
    params(RecentQuery),
    responses(
        (status = 200, description = "Most recent completed calls, newest first", body = [CallRecord])
    ),
    tag = "calls"
)]
pub async fn recent_calls(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Json<Vec<CallRecord>> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    Json(state.records.recent_completed(limit))
}

#[utoipa::path(
    get,
    path = "/api/call-history/{id}",
    params(
        ("id" = String, Path, description = "Call record ID"),
    ),
    responses(
        (status = 200, description = "Call record", body = CallRecord),
        (status = 404, description = "Call record not found", body = crate::error::ErrorResponse)
    ),
    tag = "calls"
)]
pub async fn get_call(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CallRecord>, AppError> {
    state
        .records
        .get(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Call record not found: {}", id)))
}
