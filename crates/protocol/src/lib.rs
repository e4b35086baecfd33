//! Wire protocol types for the filegate relay.
//!
//! Defines the [`EnrichedMessage`] envelope published to the broker, the
//! [`QueueBinding`] route table consulted before every publish, and the
//! metadata types shared between the transfer and broker sides.

mod binding;
mod envelope;
mod types;

pub use binding::QueueBinding;
pub use envelope::EnrichedMessage;
pub use types::{Delivery, RemoteEntry};

/// Header carrying the original file extension of a binary payload.
pub const HEADER_EXTENSION: &str = "extension";

/// Header carrying the generated message id of a binary payload.
pub const HEADER_MESSAGE_ID: &str = "message-id";

/// Logical destination tag reserved for the SFTP download relay direction.
pub const SFTP_RELAY_TAG: &str = "sftp";
