use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dialer::DialerError;
use serde::Serialize;
use telephony::TelephonyError;
use utoipa::ToSchema;

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
    Dialer(DialerError),
    Telephony(TelephonyError),
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
            AppError::Dialer(err) => {
                let status = match err {
                    DialerError::AlreadyRunning | DialerError::NotRunning => StatusCode::CONFLICT,
                    DialerError::EmptySelection
                    | DialerError::NotConnected
                    | DialerError::InvalidSettings(_) => StatusCode::BAD_REQUEST,
                    DialerError::RecordNotFound(_) => StatusCode::NOT_FOUND,
                    DialerError::InvalidTransition { .. } | DialerError::RecordAlreadyFinal(_) => {
                        tracing::error!("Dialer error: {:?}", err);
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.code(), err.to_string())
            }
            AppError::Telephony(err) => {
                tracing::error!("Telephony error: {:?}", err);
                (StatusCode::BAD_GATEWAY, "telephony_error", err.to_string())
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<DialerError> for AppError {
    fn from(err: DialerError) -> Self {
        AppError::Dialer(err)
    }
}

impl From<TelephonyError> for AppError {
    fn from(err: TelephonyError) -> Self {
        AppError::Telephony(err)
    }
}
