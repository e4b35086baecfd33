//! Broker-consumption listeners.
//!
//! [`ListenerController`] owns at most one consumption loop that writes
//! received payloads to disk, with a start/stop/status control surface.
//! [`QueueForwarder`] is the fixed-route variant that relays messages to
//! HTTP status endpoints instead of disk.

mod controller;
mod forward;

pub use controller::{ListenerConfig, ListenerController, ListenerStatus};
pub use forward::{ForwardRoute, QueueForwarder, format_payload};

/// Extension given to every file materialized from a consumed message.
pub const SAVED_FILE_EXTENSION: &str = ".bin";
