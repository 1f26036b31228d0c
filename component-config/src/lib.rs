//! Declarative component configuration.
//!
//! Components convert to a portable [`ComponentModel`] envelope and back. The
//! pieces, leaf first:
//!
//! - [`schema`]: structural validation and secret annotations.
//! - [`Component`]: the contract a type implements to participate.
//! - [`ComponentRegistry`]: provider id to definition, the polymorphic
//!   dispatch table.
//! - [`dump`]: instance to envelope, omitting secret fields.
//! - [`ComponentLoader`]: envelope to new instance, optionally narrowed to a
//!   [`Capability`].

#![warn(missing_docs, clippy::pedantic)]

mod capability;
mod component;
mod dumper;
mod error;
pub mod loader;
mod registry;
pub mod schema;
pub mod secrets;

pub use capability::{AnyComponent, Capability, CapabilitySet};
pub use component::{Component, DumpComponent, Migration, UpgradeFn};
pub use component_primitives::{ComponentModel, ProviderId, component_type};
pub use dumper::{dump, dump_str};
pub use error::{BoxError, ComponentError, ComponentResult, SchemaError, SchemaErrorKind};
pub use loader::{ComponentLoader, LoadedComponent, LoaderOptions};
pub use registry::{AliasRegistration, ComponentRegistration, ComponentRegistry, RegistryEntry};
pub use schema::{ConfigSchema, FieldKind, FieldSchema, UnknownFields, ValidatedConfig};
pub use secrets::SecretString;

#[doc(hidden)]
pub use inventory;
