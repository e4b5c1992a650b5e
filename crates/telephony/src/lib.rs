//! Telephony line abstraction for the auto-dialer.
//!
//! The dialer only talks to a [`TelephonyLine`], which owns the connection
//! flag and hands out exclusive leases on the single physical line. The
//! actual softphone sits behind the [`TelephonyClient`] trait; a
//! [`SimulatedTelephony`] client is provided for development and tests.

mod client;
mod config;
mod error;
mod line;
mod simulator;

pub use client::TelephonyClient;
pub use config::SipConfig;
pub use error::{Result, TelephonyError};
pub use line::{LineLease, TelephonyLine};
pub use simulator::{SimulatedTelephony, SimulatorTiming};
