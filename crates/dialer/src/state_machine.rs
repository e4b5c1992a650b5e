use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{DialerError, Result};

/// Lifecycle of the single dialing session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Stopping,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopping => "stopping",
        }
    }

    /// Running and stopping both count as dialing; the line is still in use.
    pub fn is_dialing(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct RunStateMachine;

impl RunStateMachine {
    pub fn validate_transition(from: &RunState, to: &RunState) -> Result<()> {
        let allowed = Self::allowed_transitions(from);

        if allowed.contains(to) {
            Ok(())
        } else {
            Err(DialerError::InvalidTransition {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }

    fn allowed_transitions(from: &RunState) -> Vec<RunState> {
        match from {
            RunState::Idle => vec![RunState::Running],
            RunState::Running => vec![RunState::Stopping, RunState::Idle],
            RunState::Stopping => vec![RunState::Idle],
        }
    }

    pub fn can_transition(from: &RunState, to: &RunState) -> bool {
        Self::validate_transition(from, to).is_ok()
    }
}
