//! Core shared types for declarative components.

#![warn(missing_docs, clippy::pedantic)]

mod envelope;
mod error;
mod ids;

/// Config envelope, its builder, and well-known type labels.
pub use envelope::{ComponentModel, ComponentModelBuilder, component_type, json_kind};
/// Error type and result alias shared across the framework.
pub use error::{Error, Result};
/// Stable provider identifiers.
pub use ids::ProviderId;
