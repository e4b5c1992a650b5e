use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown call status: {0}")]
    UnknownStatus(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
