//! The component contract.

use component_primitives::ComponentModel;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::capability::CapabilitySet;
use crate::error::{BoxError, ComponentResult};
use crate::loader::ComponentLoader;
use crate::schema::{ConfigSchema, ValidatedConfig};

/// A type that can be dumped to a config envelope and rebuilt from one.
///
/// Implementations describe their config with [`Component::config_schema`]
/// and convert between an instance and [`Component::Config`]. Only
/// constructor-relevant state belongs in the config; runtime state never
/// round-trips.
///
/// Register implementations with
/// [`register_component!`](crate::register_component) or
/// [`ComponentRegistry::register`](crate::ComponentRegistry::register).
pub trait Component: Sized + Send + Sync + 'static {
    /// Process-wide unique provider id.
    const PROVIDER: &'static str;

    /// Category label such as `model_client`.
    const COMPONENT_TYPE: &'static str;

    /// Current schema version of [`Component::Config`].
    const VERSION: u32 = 1;

    /// Optional description copied into dumped envelopes.
    const DESCRIPTION: Option<&'static str> = None;

    /// Typed config payload.
    type Config: Serialize + DeserializeOwned;

    /// Schema of the current config version.
    fn config_schema() -> ConfigSchema;

    /// Produces the config for this instance.
    ///
    /// Nested components belong in the config as envelopes produced by
    /// [`DumpComponent::dump_component`]. An envelope stored and echoed back
    /// verbatim keeps any secrets it was loaded with.
    ///
    /// # Errors
    ///
    /// Fails only when a nested component cannot be dumped.
    fn to_config(&self) -> Result<Self::Config, BoxError>;

    /// Builds a new instance from a config that already passed schema
    /// validation.
    ///
    /// Semantic checks on field values belong here. `loader` resolves nested
    /// component envelopes through the same registry.
    ///
    /// # Errors
    ///
    /// Any error is reported to the caller as a construction failure.
    fn from_config(config: Self::Config, loader: &ComponentLoader<'_>) -> Result<Self, BoxError>;

    /// Upgrade steps from earlier config versions.
    fn migrations() -> Vec<Migration> {
        Vec::new()
    }

    /// Declares the capabilities instances satisfy.
    fn capabilities(_set: &mut CapabilitySet<Self>) {}
}

/// Object-safe dumping, for components held behind trait objects.
pub trait DumpComponent {
    /// Dumps `self` to an envelope.
    ///
    /// # Errors
    ///
    /// See [`dump`](crate::dump).
    fn dump_component(&self) -> ComponentResult<ComponentModel>;
}

impl<T: Component> DumpComponent for T {
    fn dump_component(&self) -> ComponentResult<ComponentModel> {
        crate::dumper::dump(self)
    }
}

/// Upgrade function turning a validated config of version `n` into the raw
/// config of version `n + 1`.
pub type UpgradeFn = fn(ValidatedConfig) -> Result<Map<String, Value>, BoxError>;

/// One step of a component's config version history.
#[derive(Clone, Debug)]
pub struct Migration {
    from_version: u32,
    schema: ConfigSchema,
    upgrade: UpgradeFn,
}

impl Migration {
    /// Describes the upgrade from `from_version`, whose payloads match `schema`.
    #[must_use]
    pub fn new(from_version: u32, schema: ConfigSchema, upgrade: UpgradeFn) -> Self {
        Self {
            from_version,
            schema,
            upgrade,
        }
    }

    /// Version this step upgrades from.
    #[must_use]
    pub const fn from_version(&self) -> u32 {
        self.from_version
    }

    /// Schema of payloads at [`Migration::from_version`].
    #[must_use]
    pub const fn schema(&self) -> &ConfigSchema {
        &self.schema
    }

    pub(crate) fn apply(&self, config: ValidatedConfig) -> Result<Map<String, Value>, BoxError> {
        (self.upgrade)(config)
    }
}
