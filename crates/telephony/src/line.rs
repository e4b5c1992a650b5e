use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use autodial_core::CallOutcome;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::client::TelephonyClient;
use crate::config::SipConfig;
use crate::error::{Result, TelephonyError};

/// The single physical line shared by the whole process.
///
/// Owns the connection flag and serializes calls: a call may only be
/// driven through a [`LineLease`], and only one lease exists at a time.
pub struct TelephonyLine {
    client: Arc<dyn TelephonyClient>,
    connected: AtomicBool,
    line: Mutex<()>,
}

impl TelephonyLine {
    pub fn new(client: Arc<dyn TelephonyClient>) -> Self {
        Self {
            client,
            connected: AtomicBool::new(false),
            line: Mutex::new(()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn client_name(&self) -> &str {
        self.client.name()
    }

    pub async fn connect(&self, config: &SipConfig) -> Result<()> {
        info!(
            client = %self.client.name(),
            server = %config.server,
            proxy = %config.effective_proxy(),
            "Connecting to SIP server"
        );

        match self.client.connect(config).await {
            Ok(true) => {
                self.connected.store(true, Ordering::Release);
                info!(server = %config.server, "Connected to SIP server");
                Ok(())
            }
            Ok(false) => {
                self.connected.store(false, Ordering::Release);
                warn!(server = %config.server, "SIP server refused registration");
                Err(TelephonyError::Connection(format!(
                    "{} refused registration",
                    config.server
                )))
            }
            Err(e) => {
                self.connected.store(false, Ordering::Release);
                warn!(server = %config.server, error = %e, "Failed to connect to SIP server");
                Err(e)
            }
        }
    }

    /// Idempotent; the line is reported disconnected afterwards regardless
    /// of what the client says.
    pub async fn disconnect(&self) -> bool {
        info!(client = %self.client.name(), "Disconnecting from SIP server");
        let result = self.client.disconnect().await;
        self.connected.store(false, Ordering::Release);
        result
    }

    /// Wait for exclusive use of the line.
    pub async fn lease(&self) -> LineLease<'_> {
        let guard = self.line.lock().await;
        debug!("Line leased");
        LineLease {
            line: self,
            _guard: guard,
        }
    }
}

impl std::fmt::Debug for TelephonyLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelephonyLine")
            .field("client", &self.client.name())
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Exclusive hold on the line for the lifetime of one call.
pub struct LineLease<'a> {
    line: &'a TelephonyLine,
    _guard: MutexGuard<'a, ()>,
}

impl LineLease<'_> {
    /// Dial `phone_number`, giving up on setup after `ceiling`.
    pub async fn place_call(&self, phone_number: &str, ceiling: Duration) -> Result<()> {
        if !self.line.is_connected() {
            return Err(TelephonyError::not_connected());
        }

        info!(phone_number = %phone_number, "Placing call");
        let placed = tokio::time::timeout(ceiling, self.line.client.place_call(phone_number))
            .await
            .map_err(|_| TelephonyError::SetupTimeout {
                duration_ms: ceiling.as_millis() as u64,
            })??;

        match placed {
            true => Ok(()),
            false => Err(TelephonyError::CallSetup(format!(
                "client could not dial {}",
                phone_number
            ))),
        }
    }

    /// Wait for the call to settle, giving up after `ceiling`.
    pub async fn await_outcome(&self, ceiling: Duration) -> Result<CallOutcome> {
        match tokio::time::timeout(ceiling, self.line.client.poll_status()).await {
            Ok(result) => result,
            Err(_) => Err(TelephonyError::PollTimeout {
                duration_ms: ceiling.as_millis() as u64,
            }),
        }
    }

    pub async fn end_call(&self) -> Result<()> {
        info!("Ending current call");
        match self.line.client.end_call().await? {
            true => Ok(()),
            false => Err(TelephonyError::Hangup(
                "client refused to end the call".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::{SimulatedTelephony, SimulatorTiming};

    fn line_with(sim: SimulatedTelephony) -> (TelephonyLine, Arc<SimulatedTelephony>) {
        let sim = Arc::new(sim);
        (TelephonyLine::new(sim.clone()), sim)
    }

    #[tokio::test]
    async fn test_connect_sets_flag() {
        let (line, _) = line_with(SimulatedTelephony::new(SimulatorTiming::instant()));
        assert!(!line.is_connected());

        line.connect(&SipConfig::default()).await.unwrap();
        assert!(line.is_connected());

        assert!(line.disconnect().await);
        assert!(!line.is_connected());
        assert!(line.disconnect().await);
    }

    #[tokio::test]
    async fn test_refused_connect_leaves_line_disconnected() {
        let (line, _) = line_with(SimulatedTelephony::new(SimulatorTiming::instant()).refusing_connect());

        let err = line.connect(&SipConfig::default()).await.unwrap_err();
        assert!(matches!(err, TelephonyError::Connection(_)));
        assert!(!line.is_connected());
    }

    #[tokio::test]
    async fn test_place_call_requires_connection() {
        let (line, sim) = line_with(SimulatedTelephony::new(SimulatorTiming::instant()));

        let lease = line.lease().await;
        let err = lease
            .place_call("555-1", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, TelephonyError::CallSetup(_)));
        assert!(sim.dialed_numbers().is_empty());
    }

    #[tokio::test]
    async fn test_full_call_through_lease() {
        let (line, sim) = line_with(
            SimulatedTelephony::new(SimulatorTiming::instant())
                .with_outcomes([CallOutcome::Answered]),
        );
        line.connect(&SipConfig::default()).await.unwrap();

        let lease = line.lease().await;
        lease.place_call("555-1", Duration::from_secs(5)).await.unwrap();
        let outcome = lease.await_outcome(Duration::from_secs(5)).await.unwrap();
        assert_eq!(outcome, CallOutcome::Answered);
        lease.end_call().await.unwrap();

        assert_eq!(sim.dialed_numbers(), vec!["555-1".to_string()]);
        assert_eq!(sim.hangups(), 1);
    }

    #[tokio::test]
    async fn test_end_call_without_active_call_is_noop() {
        let (line, sim) = line_with(SimulatedTelephony::new(SimulatorTiming::instant()));

        line.lease().await.end_call().await.unwrap();
        assert_eq!(sim.hangups(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_outcome_times_out() {
        let (line, _) = line_with(
            SimulatedTelephony::new(SimulatorTiming::instant()).stalling_number("555-0"),
        );
        line.connect(&SipConfig::default()).await.unwrap();

        let lease = line.lease().await;
        lease.place_call("555-0", Duration::from_secs(5)).await.unwrap();
        let err = lease
            .await_outcome(Duration::from_secs(30))
            .await
            .unwrap_err();

        assert_eq!(err, TelephonyError::PollTimeout { duration_ms: 30_000 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_place_call_setup_times_out() {
        let (line, sim) = line_with(
            SimulatedTelephony::new(SimulatorTiming::instant()).hanging_setup_number("555-0"),
        );
        line.connect(&SipConfig::default()).await.unwrap();

        let lease = line.lease().await;
        let err = lease
            .place_call("555-0", Duration::from_secs(10))
            .await
            .unwrap_err();

        assert_eq!(err, TelephonyError::SetupTimeout { duration_ms: 10_000 });
        assert!(sim.dialed_numbers().is_empty());
    }

    #[tokio::test]
    async fn test_lease_is_exclusive() {
        let (line, _) = line_with(SimulatedTelephony::new(SimulatorTiming::instant()));
        let line = Arc::new(line);

        let first = line.lease().await;
        let contender = {
            let line = line.clone();
            tokio::spawn(async move {
                let _second = line.lease().await;
            })
        };

        tokio::task::yield_now().await;
        assert!(!contender.is_finished());

        drop(first);
        contender.await.unwrap();
    }
}
