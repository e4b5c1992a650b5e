//! Event system for the autodial backend
//!
//! This crate provides the event bus and event types used to report
//! telephony, settings and dialing activity to operators in real time.

mod bus;
mod types;

pub use bus::EventBus;
pub use types::*;
