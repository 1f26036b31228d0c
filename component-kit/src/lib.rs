//! Declarative component configuration SDK facade.
//!
//! Depend on this crate via `cargo add component-kit`. It bundles the internal
//! crates behind feature flags so downstream users can drop the bundled
//! components and keep only the framework.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use component_primitives as primitives;

/// Schemas, registry, dumper and loader (enabled by `config` feature).
#[cfg(feature = "config")]
pub use component_config as config;

/// Model clients, contexts and agents (enabled by `adapters` feature).
#[cfg(feature = "adapters")]
pub use component_adapters as adapters;
