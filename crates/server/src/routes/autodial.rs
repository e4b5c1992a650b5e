use axum::extract::State;
use axum::Json;
use autodial_core::Customer;
use dialer::DialStatus;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Either an explicit customer list or case ids picked from the roster.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartAutodialRequest {
    #[serde(default)]
    pub customers: Option<Vec<Customer>>,
    #[serde(default)]
    pub case_ids: Option<Vec<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartAutodialResponse {
    pub run_id: Uuid,
    pub total: usize,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StopAutodialResponse {
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/api/start-autodial",
    request_body = StartAutodialRequest,
    responses(
        (status = 200, description = "Run started in the background", body = StartAutodialResponse),
        (status = 400, description = "Empty selection or line not connected", body = crate::error::ErrorResponse),
        (status = 409, description = "A run is already in progress", body = crate::error::ErrorResponse)
    ),
    tag = "autodial"
)]
pub async fn start_autodial(
    State(state): State<AppState>,
    Json(payload): Json<StartAutodialRequest>,
) -> Result<Json<StartAutodialResponse>, AppError> {
    let selection = match (payload.customers, payload.case_ids) {
        (Some(customers), _) => customers
            .into_iter()
            .filter(|customer| {
                let dialable = customer.is_dialable();
                if !dialable {
                    debug!(case_id = %customer.case_id, "Skipping customer without a dialable number");
                }
                dialable
            })
            .collect(),
        (None, Some(case_ids)) => state.roster.select(&case_ids),
        (None, None) => Vec::new(),
    };

    let ticket = state.sequencer.start(selection)?;
    info!(run_id = %ticket.run_id, total = ticket.total, "Auto-dial accepted");

    Ok(Json(StartAutodialResponse {
        run_id: ticket.run_id,
        total: ticket.total,
        message: format!("Auto-dial started for {} customers", ticket.total),
    }))
}

#[utoipa::path(
    post,
    path = "/api/stop-autodial",
    responses(
        (status = 200, description = "Stop requested", body = StopAutodialResponse),
        (status = 409, description = "No run in progress", body = crate::error::ErrorResponse)
    ),
    tag = "autodial"
)]
pub async fn stop_autodial(
    State(state): State<AppState>,
) -> Result<Json<StopAutodialResponse>, AppError> {
    state.sequencer.stop()?;

    Ok(Json(StopAutodialResponse {
        message: "Auto-dial stopping".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/status",
    responses(
        (status = 200, description = "Connection and dialing status", body = DialStatus)
    ),
    tag = "autodial"
)]
pub async fn get_status(State(state): State<AppState>) -> Json<DialStatus> {
    Json(state.sequencer.status())
}
