use std::sync::{Arc, RwLock};

use dialer::{CallRecordStore, DialSequencer, SettingsStore};
use events::EventBus;
use telephony::{SimulatedTelephony, TelephonyClient, TelephonyLine};

use crate::config::AutodialConfig;
use crate::roster::CustomerRoster;
use crate::routes::sse::{spawn_event_recorder, EventBuffer, SharedEventBuffer, DEFAULT_EVENT_BUFFER_SIZE};

#[derive(Clone)]
pub struct AppState {
    pub line: Arc<TelephonyLine>,
    pub settings: SettingsStore,
    pub roster: CustomerRoster,
    pub records: CallRecordStore,
    pub sequencer: DialSequencer,
    pub event_bus: EventBus,
    pub event_buffer: SharedEventBuffer,
}

impl AppState {
    /// Wire the dialer around `client`.
    ///
    /// Must be called from within a tokio runtime: it spawns the task that
    /// records events for `Last-Event-ID` replay.
    pub fn new(client: Arc<dyn TelephonyClient>, config: &AutodialConfig) -> Self {
        let event_bus = EventBus::new();
        let event_buffer = Arc::new(RwLock::new(EventBuffer::new(DEFAULT_EVENT_BUFFER_SIZE)));
        spawn_event_recorder(&event_bus, Arc::clone(&event_buffer));

        let line = Arc::new(TelephonyLine::new(client));
        let settings = SettingsStore::new(config.dial_settings());
        let records = CallRecordStore::new();
        let sequencer = DialSequencer::new(line.clone(), records.clone(), settings.clone())
            .with_event_bus(event_bus.clone())
            .with_config(config.sequencer_config());

        tracing::info!(
            client = %line.client_name(),
            call_timeout_secs = config.dialer.call_timeout_secs,
            "Dialer initialized"
        );

        Self {
            line,
            settings,
            roster: CustomerRoster::new(),
            records,
            sequencer,
            event_bus,
            event_buffer,
        }
    }

    /// State backed by the built-in softphone simulator.
    pub fn simulated(config: &AutodialConfig) -> Self {
        let client = Arc::new(SimulatedTelephony::new(config.simulator_timing()));
        Self::new(client, config)
    }
}
