//! Sequential auto-dialing over a customer selection.
//!
//! [`DialSequencer::start`] validates the request, flips the session to
//! running and returns immediately; the calls themselves are placed one at a
//! time by a background task that owns the run until it ends.

use std::sync::Arc;
use std::time::Duration;

use autodial_core::{CallCompletion, CallRecord, CallStatus, Customer};
use events::{Event, EventBus};
use serde::Serialize;
use telephony::{TelephonyError, TelephonyLine};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::Result;
use crate::record_store::CallRecordStore;
use crate::run_guard::RunGuard;
use crate::session::{RunProgress, SessionHandle};
use crate::settings::SettingsStore;
use crate::state_machine::RunState;

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Ceiling on call setup, and separately on how long a placed call may
    /// take to reach a terminal status
    pub call_timeout: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// Handed back by a successful start.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RunTicket {
    pub run_id: Uuid,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DialStatus {
    pub connected: bool,
    pub is_dialing: bool,
    pub state: RunState,
    /// The in-progress record, while a call is being placed
    pub current_call: Option<CallRecord>,
    pub progress: Option<RunProgress>,
}

#[derive(Clone)]
pub struct DialSequencer {
    line: Arc<TelephonyLine>,
    store: CallRecordStore,
    settings: SettingsStore,
    session: SessionHandle,
    event_bus: Option<EventBus>,
    config: SequencerConfig,
}

impl DialSequencer {
    pub fn new(line: Arc<TelephonyLine>, store: CallRecordStore, settings: SettingsStore) -> Self {
        Self {
            line,
            store,
            settings,
            session: SessionHandle::new(),
            event_bus: None,
            config: SequencerConfig::default(),
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn with_config(mut self, config: SequencerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn records(&self) -> &CallRecordStore {
        &self.store
    }

    pub fn is_dialing(&self) -> bool {
        self.session.is_dialing()
    }

    /// Start dialing `selection` in order.
    ///
    /// Fails with `AlreadyRunning`, `EmptySelection` or `NotConnected`
    /// (checked in that order) without touching any state.
    pub fn start(&self, selection: Vec<Customer>) -> Result<RunTicket> {
        let run_id = Uuid::new_v4();
        let total = selection.len();

        let cancel = self
            .session
            .begin_run(run_id, total, self.line.is_connected())?;

        info!(run_id = %run_id, total, "Auto-dial started");
        self.emit(Event::DialStarted { run_id, total });

        let sequencer = self.clone();
        tokio::spawn(async move {
            sequencer.run(run_id, selection, cancel).await;
        });

        Ok(RunTicket { run_id, total })
    }

    /// Request the active run to stop.
    ///
    /// A call already on the line runs to completion; a pending inter-call
    /// delay is cut short. Stopping twice is not an error.
    pub fn stop(&self) -> Result<()> {
        match self.session.request_stop()? {
            Some(run_id) => {
                info!(run_id = %run_id, "Auto-dial stop requested");
                self.emit(Event::DialStopping { run_id });
            }
            None => debug!("Auto-dial already stopping"),
        }
        Ok(())
    }

    pub fn status(&self) -> DialStatus {
        let state = self.session.state();
        // The record turns terminal a moment before the session lets go of it.
        let current_call = self
            .session
            .current_call()
            .and_then(|id| self.store.get(&id))
            .filter(|record| !record.is_terminal());

        DialStatus {
            connected: self.line.is_connected(),
            is_dialing: state.is_dialing(),
            state,
            current_call,
            progress: self.session.progress(),
        }
    }

    /// Resolve once no run is active.
    pub async fn wait_idle(&self) {
        self.session.wait_idle().await;
    }

    async fn run(self, run_id: Uuid, selection: Vec<Customer>, cancel: CancellationToken) {
        let guard = RunGuard::new(run_id, self.session.clone(), self.event_bus.clone());
        let total = selection.len();

        for (index, customer) in selection.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(run_id = %run_id, remaining = total - index, "Auto-dial stopped before next call");
                break;
            }

            self.dial_customer(run_id, customer).await;

            if index + 1 == total {
                break;
            }

            let delay = self.settings.call_delay();
            if delay.is_zero() {
                continue;
            }

            debug!(run_id = %run_id, delay_secs = delay.as_secs(), "Waiting before next call");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(run_id = %run_id, "Auto-dial stopped during call delay");
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let summary = guard.finish(cancel.is_cancelled());
        info!(
            run_id = %summary.run_id,
            processed = summary.processed,
            total = summary.total,
            cancelled = summary.cancelled,
            "Auto-dial finished"
        );
    }

    /// Place one call and write its record exactly twice: once in progress,
    /// once terminal.
    async fn dial_customer(&self, run_id: Uuid, customer: &Customer) -> CallStatus {
        let record = CallRecord::begin(customer);
        let call_id = record.id.clone();
        self.store.append(record);
        self.session.set_current_call(Some(call_id.clone()));

        info!(
            run_id = %run_id,
            call_id = %call_id,
            case_id = %customer.case_id,
            phone_number = %customer.phone_number,
            "Dialing customer"
        );
        self.emit(Event::CallStarted {
            run_id,
            call_id: call_id.clone(),
            case_id: customer.case_id.clone(),
            phone_number: customer.phone_number.clone(),
        });

        let completion = match self.drive_call(&customer.phone_number).await {
            Ok(status) => CallCompletion::new(status),
            Err(e) => {
                error!(call_id = %call_id, error = %e, "Call failed");
                CallCompletion::failed(e.to_string())
            }
        };
        let status = completion.status;

        let duration = match self.store.finalize(&call_id, completion) {
            Ok(finished) => finished.duration,
            Err(e) => {
                error!(call_id = %call_id, error = %e, "Failed to finalize call record");
                0
            }
        };

        self.session.set_current_call(None);
        self.session.record_processed();

        info!(call_id = %call_id, status = %status, duration, "Call completed");
        self.emit(Event::CallCompleted {
            run_id,
            call_id,
            status: status.as_str().to_string(),
            duration,
        });

        status
    }

    /// Drive one call on the line from setup to terminal status.
    ///
    /// A setup failure skips polling entirely. An answered call is hung up
    /// before the status is reported when auto-hangup is on.
    async fn drive_call(&self, phone_number: &str) -> std::result::Result<CallStatus, TelephonyError> {
        let lease = self.line.lease().await;

        let placed = lease.place_call(phone_number, self.config.call_timeout).await;
        let outcome = match placed {
            Ok(()) => lease.await_outcome(self.config.call_timeout).await,
            Err(e) => Err(e),
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                if matches!(
                    e,
                    TelephonyError::SetupTimeout { .. } | TelephonyError::PollTimeout { .. }
                ) {
                    // Do not leave a stuck call on the line.
                    if let Err(hangup) = lease.end_call().await {
                        warn!(phone_number = %phone_number, error = %hangup, "Hangup after timeout failed");
                    }
                }
                return Err(e);
            }
        };

        let status = CallStatus::from(outcome);
        if status == CallStatus::Answered && self.settings.auto_hangup() {
            debug!(phone_number = %phone_number, "Auto-hangup");
            lease.end_call().await?;
        }

        Ok(status)
    }

    fn emit(&self, event: Event) {
        if let Some(ref bus) = self.event_bus {
            bus.emit(event);
        }
    }
}

impl std::fmt::Debug for DialSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialSequencer")
            .field("line", &self.line)
            .field("state", &self.session.state())
            .field("config", &self.config)
            .finish()
    }
}
