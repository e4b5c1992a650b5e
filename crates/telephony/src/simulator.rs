//! Softphone simulator.
//!
//! Mimics a MicroSip-style softphone: registration and call setup take a
//! moment, calls ring for a random time and end with a random disposition.
//! Outcomes can be scripted and individual numbers can be made to fail or
//! hang, which is what the dialer tests rely on.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use autodial_core::CallOutcome;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use crate::client::TelephonyClient;
use crate::config::SipConfig;
use crate::error::{Result, TelephonyError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatorTiming {
    pub connect_delay: Duration,
    pub setup_delay: Duration,
    pub min_ring: Duration,
    pub max_ring: Duration,
}

impl Default for SimulatorTiming {
    fn default() -> Self {
        Self {
            connect_delay: Duration::from_secs(1),
            setup_delay: Duration::from_secs(1),
            min_ring: Duration::from_secs(1),
            max_ring: Duration::from_secs(10),
        }
    }
}

impl SimulatorTiming {
    /// No delays at all.
    pub fn instant() -> Self {
        Self {
            connect_delay: Duration::ZERO,
            setup_delay: Duration::ZERO,
            min_ring: Duration::ZERO,
            max_ring: Duration::ZERO,
        }
    }

    /// Fixed ring time, no connect or setup delay.
    pub fn ringing_for(ring: Duration) -> Self {
        Self {
            min_ring: ring,
            max_ring: ring,
            ..Self::instant()
        }
    }
}

pub struct SimulatedTelephony {
    timing: SimulatorTiming,
    scripted: Mutex<VecDeque<CallOutcome>>,
    failing: HashSet<String>,
    stalling: HashSet<String>,
    hanging_setup: HashSet<String>,
    refuse_connect: bool,
    connected: AtomicBool,
    active_call: Mutex<Option<String>>,
    dialed: Mutex<Vec<String>>,
    hangups: AtomicUsize,
}

impl SimulatedTelephony {
    pub fn new(timing: SimulatorTiming) -> Self {
        Self {
            timing,
            scripted: Mutex::new(VecDeque::new()),
            failing: HashSet::new(),
            stalling: HashSet::new(),
            hanging_setup: HashSet::new(),
            refuse_connect: false,
            connected: AtomicBool::new(false),
            active_call: Mutex::new(None),
            dialed: Mutex::new(Vec::new()),
            hangups: AtomicUsize::new(0),
        }
    }

    /// Dispositions returned in order; random ones once the script runs out.
    pub fn with_outcomes(self, outcomes: impl IntoIterator<Item = CallOutcome>) -> Self {
        self.scripted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend(outcomes);
        self
    }

    /// Calls to `number` fail during setup.
    pub fn failing_number(mut self, number: impl Into<String>) -> Self {
        self.failing.insert(number.into());
        self
    }

    /// Calls to `number` connect but never report a status.
    pub fn stalling_number(mut self, number: impl Into<String>) -> Self {
        self.stalling.insert(number.into());
        self
    }

    /// Dialing `number` never returns from setup.
    pub fn hanging_setup_number(mut self, number: impl Into<String>) -> Self {
        self.hanging_setup.insert(number.into());
        self
    }

    pub fn refusing_connect(mut self) -> Self {
        self.refuse_connect = true;
        self
    }

    pub fn dialed_numbers(&self) -> Vec<String> {
        self.dialed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn hangups(&self) -> usize {
        self.hangups.load(Ordering::Relaxed)
    }

    fn active_call(&self) -> Option<String> {
        self.active_call
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_active_call(&self, number: Option<String>) -> Option<String> {
        let mut active = self
            .active_call
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *active, number)
    }

    fn ring_time(&self) -> Duration {
        let min = self.timing.min_ring.as_millis() as u64;
        let max = self.timing.max_ring.as_millis() as u64;
        if max <= min {
            return self.timing.min_ring;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    fn next_outcome(&self) -> CallOutcome {
        let scripted = self
            .scripted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();

        scripted.unwrap_or_else(|| {
            *CallOutcome::ALL
                .choose(&mut rand::thread_rng())
                .unwrap_or(&CallOutcome::NotAnswered)
        })
    }
}

impl Default for SimulatedTelephony {
    fn default() -> Self {
        Self::new(SimulatorTiming::default())
    }
}

#[async_trait]
impl TelephonyClient for SimulatedTelephony {
    async fn connect(&self, config: &SipConfig) -> Result<bool> {
        if config.server.trim().is_empty() {
            return Err(TelephonyError::Connection(
                "no SIP server configured".to_string(),
            ));
        }

        tokio::time::sleep(self.timing.connect_delay).await;

        if self.refuse_connect {
            return Ok(false);
        }

        self.connected.store(true, Ordering::Release);
        info!(server = %config.server, login = %config.login, "Simulator registered");
        Ok(true)
    }

    async fn disconnect(&self) -> bool {
        self.connected.store(false, Ordering::Release);
        self.set_active_call(None);
        true
    }

    async fn place_call(&self, phone_number: &str) -> Result<bool> {
        if !self.connected.load(Ordering::Acquire) {
            return Ok(false);
        }

        tokio::time::sleep(self.timing.setup_delay).await;

        if self.hanging_setup.contains(phone_number) {
            std::future::pending::<()>().await;
        }

        if self.failing.contains(phone_number) {
            return Err(TelephonyError::CallSetup(format!(
                "{} rejected by the SIP server",
                phone_number
            )));
        }

        self.dialed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(phone_number.to_string());
        self.set_active_call(Some(phone_number.to_string()));
        debug!(phone_number = %phone_number, "Simulator dialing");
        Ok(true)
    }

    async fn end_call(&self) -> Result<bool> {
        if let Some(number) = self.set_active_call(None) {
            self.hangups.fetch_add(1, Ordering::Relaxed);
            debug!(phone_number = %number, "Simulator hung up");
        }
        Ok(true)
    }

    async fn poll_status(&self) -> Result<CallOutcome> {
        let Some(number) = self.active_call() else {
            return Err(TelephonyError::Client("no call in progress".to_string()));
        };

        if self.stalling.contains(&number) {
            std::future::pending::<()>().await;
        }

        tokio::time::sleep(self.ring_time()).await;

        let outcome = self.next_outcome();
        // Anything but an answered call is already over on the far end.
        if outcome != CallOutcome::Answered {
            self.set_active_call(None);
        }
        Ok(outcome)
    }

    fn name(&self) -> &str {
        "simulator"
    }
}
