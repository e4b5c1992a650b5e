use std::path::Path;
use std::time::Duration;

use dialer::{DialSettings, SequencerConfig};
use serde::{Deserialize, Serialize};
use telephony::{SimulatorTiming, SipConfig};
use tokio::fs;
use tracing::{debug, warn};

pub const CONFIG_FILE: &str = "autodial.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialerSection {
    /// Seconds between consecutive calls
    pub call_delay_secs: u64,
    pub auto_hangup: bool,
    /// Ceiling on a single call before it is recorded as an error
    pub call_timeout_secs: u64,
}

impl Default for DialerSection {
    fn default() -> Self {
        let settings = DialSettings::default();
        Self {
            call_delay_secs: settings.call_delay,
            auto_hangup: settings.auto_hangup,
            call_timeout_secs: SequencerConfig::default().call_timeout.as_secs(),
        }
    }
}

/// Timing of the built-in softphone simulator, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorSection {
    pub connect_delay_ms: u64,
    pub setup_delay_ms: u64,
    pub min_ring_ms: u64,
    pub max_ring_ms: u64,
}

impl Default for SimulatorSection {
    fn default() -> Self {
        let timing = SimulatorTiming::default();
        Self {
            connect_delay_ms: timing.connect_delay.as_millis() as u64,
            setup_delay_ms: timing.setup_delay.as_millis() as u64,
            min_ring_ms: timing.min_ring.as_millis() as u64,
            max_ring_ms: timing.max_ring.as_millis() as u64,
        }
    }
}

/// Startup configuration read from `autodial.toml`.
///
/// Only seeds the in-memory settings; changes made through the API are
/// never written back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutodialConfig {
    pub server: ServerSection,
    pub sip: SipConfig,
    pub dialer: DialerSection,
    pub simulator: SimulatorSection,
}

impl AutodialConfig {
    /// Read config from `path`, falling back to defaults when the file is
    /// missing or unreadable.
    pub async fn read(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "Config file does not exist, using defaults");
            return Self::default();
        }

        match fs::read_to_string(path).await {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    debug!(path = %path.display(), "Config loaded successfully");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                Self::default()
            }
        }
    }

    pub async fn write(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir).await?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        fs::write(path, content).await?;
        debug!(path = %path.display(), "Config saved successfully");

        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn dial_settings(&self) -> DialSettings {
        DialSettings {
            sip_config: self.sip.clone(),
            call_delay: self.dialer.call_delay_secs,
            auto_hangup: self.dialer.auto_hangup,
        }
    }

    pub fn sequencer_config(&self) -> SequencerConfig {
        SequencerConfig {
            call_timeout: Duration::from_secs(self.dialer.call_timeout_secs),
        }
    }

    pub fn simulator_timing(&self) -> SimulatorTiming {
        SimulatorTiming {
            connect_delay: Duration::from_millis(self.simulator.connect_delay_ms),
            setup_delay: Duration::from_millis(self.simulator.setup_delay_ms),
            min_ring: Duration::from_millis(self.simulator.min_ring_ms),
            max_ring: Duration::from_millis(self.simulator.max_ring_ms),
        }
    }
}
