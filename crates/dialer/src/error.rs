use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DialerError {
    #[error("Auto-dial already in progress")]
    AlreadyRunning,

    #[error("No auto-dial in progress")]
    NotRunning,

    #[error("No customers selected")]
    EmptySelection,

    #[error("Telephony line is not connected")]
    NotConnected,

    #[error("Invalid run state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Call record not found: {0}")]
    RecordNotFound(String),

    #[error("Call record already final: {0}")]
    RecordAlreadyFinal(String),
}

impl DialerError {
    /// Stable machine-readable code, used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyRunning => "already_running",
            Self::NotRunning => "not_running",
            Self::EmptySelection => "empty_selection",
            Self::NotConnected => "not_connected",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::InvalidSettings(_) => "invalid_settings",
            Self::RecordNotFound(_) => "not_found",
            Self::RecordAlreadyFinal(_) => "record_final",
        }
    }

    /// Errors returned synchronously from start/stop for the operator to handle.
    pub fn is_control(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRunning | Self::NotRunning | Self::EmptySelection | Self::NotConnected
        )
    }
}

pub type Result<T> = std::result::Result<T, DialerError>;
