pub mod error;
pub mod record_store;
pub mod run_guard;
pub mod sequencer;
pub mod session;
pub mod settings;
pub mod state_machine;

pub use error::{DialerError, Result};
pub use record_store::{CallRecordStore, CallStats};
pub use run_guard::{RunGuard, RunSummary};
pub use sequencer::{DialSequencer, DialStatus, RunTicket, SequencerConfig};
pub use session::{RunProgress, SessionHandle};
pub use settings::{DialSettings, SettingsStore, SettingsUpdate, MAX_CALL_DELAY_SECS};
pub use state_machine::{RunState, RunStateMachine};
