//! Event types for the autodial event system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping all events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: Event,
}

impl EventEnvelope {
    /// Create a new event envelope with auto-generated ID and timestamp
    pub fn new(event: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// All possible events in the system
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    // Telephony events
    /// Telephony line connected to the SIP server
    #[serde(rename = "telephony.connected")]
    TelephonyConnected { server: String },

    /// Telephony line disconnected
    #[serde(rename = "telephony.disconnected")]
    TelephonyDisconnected,

    // Operator events
    /// Customer roster replaced by an upload
    #[serde(rename = "customers.loaded")]
    CustomersLoaded { count: usize, rejected: usize },

    /// Dial settings changed
    #[serde(rename = "settings.updated")]
    SettingsUpdated { call_delay: u64, auto_hangup: bool },

    // Dial run events
    /// Auto-dial run accepted and started
    #[serde(rename = "dial.started")]
    DialStarted { run_id: Uuid, total: usize },

    /// Stop requested; the run ends at its next checkpoint
    #[serde(rename = "dial.stopping")]
    DialStopping { run_id: Uuid },

    /// Auto-dial run ended
    #[serde(rename = "dial.finished")]
    DialFinished {
        run_id: Uuid,
        processed: usize,
        cancelled: bool,
    },

    /// A call record was opened and the number is being dialed
    #[serde(rename = "call.started")]
    CallStarted {
        run_id: Uuid,
        call_id: String,
        case_id: String,
        phone_number: String,
    },

    /// A call reached its terminal status
    #[serde(rename = "call.completed")]
    CallCompleted {
        run_id: Uuid,
        call_id: String,
        status: String,
        duration: u64,
    },

    // System events
    /// Generic error event
    #[serde(rename = "error")]
    Error {
        message: String,
        context: Option<String>,
    },
}

impl Event {
    /// Get the dial run ID associated with this event, if any
    pub fn run_id(&self) -> Option<Uuid> {
        match self {
            Event::DialStarted { run_id, .. } => Some(*run_id),
            Event::DialStopping { run_id } => Some(*run_id),
            Event::DialFinished { run_id, .. } => Some(*run_id),
            Event::CallStarted { run_id, .. } => Some(*run_id),
            Event::CallCompleted { run_id, .. } => Some(*run_id),
            Event::TelephonyConnected { .. }
            | Event::TelephonyDisconnected
            | Event::CustomersLoaded { .. }
            | Event::SettingsUpdated { .. }
            | Event::Error { .. } => None,
        }
    }

    /// Wire name of the event, as used for the `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::TelephonyConnected { .. } => "telephony.connected",
            Event::TelephonyDisconnected => "telephony.disconnected",
            Event::CustomersLoaded { .. } => "customers.loaded",
            Event::SettingsUpdated { .. } => "settings.updated",
            Event::DialStarted { .. } => "dial.started",
            Event::DialStopping { .. } => "dial.stopping",
            Event::DialFinished { .. } => "dial.finished",
            Event::CallStarted { .. } => "call.started",
            Event::CallCompleted { .. } => "call.completed",
            Event::Error { .. } => "error",
        }
    }
}
