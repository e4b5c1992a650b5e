use axum::extract::State;
use axum::Json;
use events::Event;
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionResponse {
    pub connected: bool,
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/api/connect",
    responses(
        (status = 200, description = "Registered with the SIP server", body = ConnectionResponse),
        (status = 502, description = "SIP server unreachable or refused registration", body = crate::error::ErrorResponse)
    ),
    tag = "telephony"
)]
pub async fn connect(State(state): State<AppState>) -> Result<Json<ConnectionResponse>, AppError> {
    let sip_config = state.settings.sip_config();

    state.line.connect(&sip_config).await?;

    state.event_bus.emit(Event::TelephonyConnected {
        server: sip_config.server.clone(),
    });

    Ok(Json(ConnectionResponse {
        connected: true,
        message: format!("Connected to {}", sip_config.server),
    }))
}

#[utoipa::path(
    post,
    path = "/api/disconnect",
    responses(
        (status = 200, description = "Line disconnected", body = ConnectionResponse)
    ),
    tag = "telephony"
)]
pub async fn disconnect(State(state): State<AppState>) -> Json<ConnectionResponse> {
    if state.sequencer.is_dialing() {
        info!("Disconnecting while auto-dial is active; remaining calls will fail");
    }

    state.line.disconnect().await;
    state.event_bus.emit(Event::TelephonyDisconnected);

    Json(ConnectionResponse {
        connected: false,
        message: "Disconnected".to_string(),
    })
}
