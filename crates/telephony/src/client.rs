use async_trait::async_trait;
use autodial_core::CallOutcome;

use crate::config::SipConfig;
use crate::error::Result;

/// Softphone capability driven by the [`TelephonyLine`](crate::TelephonyLine).
///
/// Implementations do not need to serialize calls themselves; the line
/// never issues two calls at once.
#[async_trait]
pub trait TelephonyClient: Send + Sync {
    /// Register with the SIP server. `Ok(false)` means the server refused.
    async fn connect(&self, config: &SipConfig) -> Result<bool>;

    /// Tear down the registration. Safe to call when not connected.
    async fn disconnect(&self) -> bool;

    /// Dial `phone_number`. `Ok(false)` means the call could not be set up.
    async fn place_call(&self, phone_number: &str) -> Result<bool>;

    /// Hang up the current call. Succeeds without effect when no call is active.
    async fn end_call(&self) -> Result<bool>;

    /// Wait for the most recent call to settle and report its disposition.
    async fn poll_status(&self) -> Result<CallOutcome>;

    fn name(&self) -> &str {
        "telephony"
    }
}
