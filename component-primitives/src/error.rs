//! Shared error definitions for component primitives.

use thiserror::Error;

/// Result alias used throughout the component framework.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while manipulating component primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// Provider identifier failed validation.
    #[error("invalid provider id `{id}`: {reason}")]
    InvalidProviderId {
        /// The offending identifier string.
        id: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Envelope definition failed validation.
    #[error("invalid component envelope: {reason}")]
    InvalidEnvelope {
        /// Human-readable reason for rejection.
        reason: String,
    },
}
