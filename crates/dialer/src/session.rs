//! Shared state of the single dialing session.
//!
//! Every mutation goes through one lock so that the "is a run active"
//! check and the transition into `Running` happen atomically.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{DialerError, Result};
use crate::state_machine::{RunState, RunStateMachine};

/// Where the active run stands.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RunProgress {
    pub run_id: Uuid,
    pub total: usize,
    pub processed: usize,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct DialSession {
    state: RunState,
    current_call: Option<String>,
    progress: Option<RunProgress>,
    cancel: Option<CancellationToken>,
}

impl DialSession {
    fn transition(&mut self, to: RunState) -> Result<()> {
        RunStateMachine::validate_transition(&self.state, &to)?;
        debug!(from = %self.state, to = %to, "Run state transition");
        self.state = to;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<RwLock<DialSession>>,
    dialing: Arc<watch::Sender<bool>>,
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHandle {
    pub fn new() -> Self {
        let (dialing, _) = watch::channel(false);
        Self {
            inner: Arc::new(RwLock::new(DialSession::default())),
            dialing: Arc::new(dialing),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, DialSession> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, DialSession> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> RunState {
        self.read().state
    }

    pub fn is_dialing(&self) -> bool {
        self.state().is_dialing()
    }

    pub fn current_call(&self) -> Option<String> {
        self.read().current_call.clone()
    }

    pub fn progress(&self) -> Option<RunProgress> {
        self.read().progress.clone()
    }

    /// Enter `Running` for a new run.
    ///
    /// The checks run in order under the session lock: an active run wins
    /// over an empty selection, which wins over a disconnected line.
    pub fn begin_run(&self, run_id: Uuid, total: usize, connected: bool) -> Result<CancellationToken> {
        let mut session = self.write();

        if session.state.is_dialing() {
            return Err(DialerError::AlreadyRunning);
        }
        if total == 0 {
            return Err(DialerError::EmptySelection);
        }
        if !connected {
            return Err(DialerError::NotConnected);
        }

        session.transition(RunState::Running)?;
        let cancel = CancellationToken::new();
        session.cancel = Some(cancel.clone());
        session.current_call = None;
        session.progress = Some(RunProgress {
            run_id,
            total,
            processed: 0,
            started_at: Utc::now(),
        });
        self.dialing.send_replace(true);

        Ok(cancel)
    }

    /// Ask the active run to stop.
    ///
    /// Returns the run id when this call moved the run to `Stopping`, and
    /// `None` when a stop was already pending.
    pub fn request_stop(&self) -> Result<Option<Uuid>> {
        let mut session = self.write();

        match session.state {
            RunState::Idle => Err(DialerError::NotRunning),
            RunState::Stopping => Ok(None),
            RunState::Running => {
                session.transition(RunState::Stopping)?;
                if let Some(cancel) = &session.cancel {
                    cancel.cancel();
                }
                Ok(session.progress.as_ref().map(|p| p.run_id))
            }
        }
    }

    pub fn set_current_call(&self, call_id: Option<String>) {
        self.write().current_call = call_id;
    }

    pub fn record_processed(&self) {
        if let Some(progress) = self.write().progress.as_mut() {
            progress.processed += 1;
        }
    }

    /// Return to `Idle` and hand back the final progress of the run.
    pub fn end_run(&self) -> Option<RunProgress> {
        let mut session = self.write();

        if session.state.is_dialing() {
            // Running and Stopping both lead to Idle.
            let _ = session.transition(RunState::Idle);
        }
        session.current_call = None;
        session.cancel = None;
        let progress = session.progress.take();
        self.dialing.send_replace(false);

        progress
    }

    /// Resolve once no run is active.
    pub async fn wait_idle(&self) {
        let mut rx = self.dialing.subscribe();
        let _ = rx.wait_for(|dialing| !*dialing).await;
    }
}
