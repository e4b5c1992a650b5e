use thiserror::Error;

/// Per-call and per-connection failures reported by the telephony line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TelephonyError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Call setup failed: {0}")]
    CallSetup(String),

    #[error("Call setup did not complete within {duration_ms}ms")]
    SetupTimeout { duration_ms: u64 },

    #[error("No terminal call status after {duration_ms}ms")]
    PollTimeout { duration_ms: u64 },

    #[error("Hangup failed: {0}")]
    Hangup(String),

    #[error("Telephony client error: {0}")]
    Client(String),
}

impl TelephonyError {
    pub fn not_connected() -> Self {
        Self::CallSetup("line is not connected".to_string())
    }
}

pub type Result<T> = std::result::Result<T, TelephonyError>;
