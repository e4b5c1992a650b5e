use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use telephony::SipConfig;
use tracing::info;
use utoipa::ToSchema;

use crate::error::{DialerError, Result};

/// Longest accepted pause between calls, in seconds.
pub const MAX_CALL_DELAY_SECS: u64 = 3600;

const DEFAULT_CALL_DELAY_SECS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DialSettings {
    pub sip_config: SipConfig,
    /// Seconds to wait between consecutive calls
    pub call_delay: u64,
    /// Hang up answered calls automatically
    pub auto_hangup: bool,
}

impl Default for DialSettings {
    fn default() -> Self {
        Self {
            sip_config: SipConfig::default(),
            call_delay: DEFAULT_CALL_DELAY_SECS,
            auto_hangup: true,
        }
    }
}

impl DialSettings {
    pub fn validate(&self) -> Result<()> {
        if self.call_delay > MAX_CALL_DELAY_SECS {
            return Err(DialerError::InvalidSettings(format!(
                "callDelay must be at most {} seconds, got {}",
                MAX_CALL_DELAY_SECS, self.call_delay
            )));
        }
        Ok(())
    }
}

/// Partial settings change; absent fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(default)]
    pub sip_config: Option<SipConfig>,
    #[serde(default)]
    pub call_delay: Option<u64>,
    #[serde(default)]
    pub auto_hangup: Option<bool>,
}

/// Process-wide dial settings.
///
/// The sequencer reads the delay and hangup flag at the moment it needs
/// them, so an update applies to the next wait of a run already in flight.
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    inner: Arc<RwLock<DialSettings>>,
}

impl SettingsStore {
    pub fn new(settings: DialSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    pub fn get(&self) -> DialSettings {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn sip_config(&self) -> SipConfig {
        self.get().sip_config
    }

    pub fn call_delay(&self) -> Duration {
        let secs = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .call_delay;
        Duration::from_secs(secs)
    }

    pub fn auto_hangup(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .auto_hangup
    }

    /// Apply `update` atomically. Nothing changes if the result is invalid.
    pub fn update(&self, update: SettingsUpdate) -> Result<DialSettings> {
        let mut current = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut next = current.clone();
        if let Some(sip_config) = update.sip_config {
            next.sip_config = sip_config;
        }
        if let Some(call_delay) = update.call_delay {
            next.call_delay = call_delay;
        }
        if let Some(auto_hangup) = update.auto_hangup {
            next.auto_hangup = auto_hangup;
        }
        next.validate()?;

        *current = next.clone();
        info!(
            call_delay = next.call_delay,
            auto_hangup = next.auto_hangup,
            server = %next.sip_config.server,
            "Dial settings updated"
        );
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let store = SettingsStore::default();
        assert_eq!(store.call_delay(), Duration::from_secs(5));
        assert!(store.auto_hangup());
    }

    #[test]
    fn test_partial_update() {
        let store = SettingsStore::default();
        let updated = store
            .update(SettingsUpdate {
                call_delay: Some(12),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(updated.call_delay, 12);
        assert!(updated.auto_hangup);
        assert_eq!(store.call_delay(), Duration::from_secs(12));
    }

    #[test]
    fn test_rejects_excessive_delay() {
        let store = SettingsStore::default();
        let err = store
            .update(SettingsUpdate {
                call_delay: Some(MAX_CALL_DELAY_SECS + 1),
                auto_hangup: Some(false),
                ..Default::default()
            })
            .unwrap_err();

        assert!(matches!(err, DialerError::InvalidSettings(_)));
        assert!(store.auto_hangup());
        assert_eq!(store.call_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_update_deserializes_from_camel_case() {
        let update: SettingsUpdate =
            serde_json::from_str(r#"{"callDelay": 0, "autoHangup": false}"#).unwrap();
        assert_eq!(update.call_delay, Some(0));
        assert_eq!(update.auto_hangup, Some(false));
        assert!(update.sip_config.is_none());
    }
}
