use axum::extract::State;
use axum::Json;
use dialer::{DialSettings, SettingsUpdate};
use events::Event;
use serde::Serialize;
use telephony::SipConfig;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::state::AppState;

const MASK: &str = "****";

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    /// SIP account, with the password masked
    pub sip_config: SipConfig,
    pub call_delay: u64,
    pub auto_hangup: bool,
    pub has_password: bool,
}

impl From<DialSettings> for SettingsResponse {
    fn from(settings: DialSettings) -> Self {
        let has_password = !settings.sip_config.password.is_empty();
        let sip_config = SipConfig {
            password: mask_secret(&settings.sip_config.password),
            ..settings.sip_config
        };

        Self {
            sip_config,
            call_delay: settings.call_delay,
            auto_hangup: settings.auto_hangup,
            has_password,
        }
    }
}

/// Mask a secret for display, showing at most the last 2 chars.
fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    if secret.chars().count() <= 6 {
        return MASK.to_string();
    }

    let suffix: String = secret
        .chars()
        .rev()
        .take(2)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("{}{}", MASK, suffix)
}

#[utoipa::path(
    get,
    path = "/api/settings",
    responses(
        (status = 200, description = "Current dial settings", body = SettingsResponse)
    ),
    tag = "settings"
)]
pub async fn get_settings(State(state): State<AppState>) -> Json<SettingsResponse> {
    debug!("Reading dial settings");
    Json(state.settings.get().into())
}

#[utoipa::path(
    post,
    path = "/api/settings",
    request_body = SettingsUpdate,
    responses(
        (status = 200, description = "Settings updated", body = SettingsResponse),
        (status = 400, description = "Invalid settings", body = crate::error::ErrorResponse)
    ),
    tag = "settings"
)]
pub async fn update_settings(
    State(state): State<AppState>,
    Json(mut payload): Json<SettingsUpdate>,
) -> Result<Json<SettingsResponse>, AppError> {
    info!("Updating dial settings");

    // A masked password echoed back from GET means "keep the current one".
    if let Some(sip_config) = payload.sip_config.as_mut() {
        if sip_config.password.starts_with(MASK) {
            sip_config.password = state.settings.sip_config().password;
        }
    }

    let updated = state.settings.update(payload)?;

    state.event_bus.emit(Event::SettingsUpdated {
        call_delay: updated.call_delay,
        auto_hangup: updated.auto_hangup,
    });

    Ok(Json(updated.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "");
        assert_eq!(mask_secret("abc"), "****");
        assert_eq!(mask_secret("s3cret-pass"), "****ss");
    }

    #[test]
    fn test_response_masks_password() {
        let settings = DialSettings {
            sip_config: SipConfig {
                password: "hunter2hunter2".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        let response = SettingsResponse::from(settings);
        assert!(response.has_password);
        assert_eq!(response.sip_config.password, "****r2");
    }
}
