//! Configuration loader implementations.
//!
//! The loader turns an envelope back into a live component: resolve the
//! provider, validate (and if needed migrate) the payload, construct, and
//! optionally narrow the result to a capability.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use component_primitives::{ComponentModel, ProviderId, json_kind};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::capability::{AnyComponent, Capability};
use crate::component::Component;
use crate::error::{ComponentError, ComponentResult, SchemaError, SchemaErrorKind};
use crate::registry::{ComponentRegistry, RegistryEntry};
use crate::schema::{ROOT_PATH, UnknownFields, ValidatedConfig};

/// Tunables for [`ComponentLoader`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoaderOptions {
    unknown_fields: Option<UnknownFields>,
}

impl LoaderOptions {
    /// Options that reject undeclared fields regardless of schema policy.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            unknown_fields: Some(UnknownFields::Reject),
        }
    }

    /// Overrides every schema's unknown-field policy.
    #[must_use]
    pub const fn with_unknown_fields(mut self, policy: UnknownFields) -> Self {
        self.unknown_fields = Some(policy);
        self
    }

    /// Returns the override, `None` meaning each schema decides.
    #[must_use]
    pub const fn unknown_fields(self) -> Option<UnknownFields> {
        self.unknown_fields
    }
}

/// Rebuilds components from envelopes using a registry.
#[derive(Clone, Copy)]
pub struct ComponentLoader<'r> {
    registry: &'r ComponentRegistry,
    options: LoaderOptions,
}

impl fmt::Debug for ComponentLoader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentLoader")
            .field("providers", &self.registry.len())
            .field("options", &self.options)
            .finish()
    }
}

impl<'r> ComponentLoader<'r> {
    /// Creates a loader backed by `registry`.
    #[must_use]
    pub fn new(registry: &'r ComponentRegistry) -> Self {
        Self {
            registry,
            options: LoaderOptions::default(),
        }
    }

    /// Replaces the loader options.
    #[must_use]
    pub const fn with_options(mut self, options: LoaderOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the backing registry.
    #[must_use]
    pub const fn registry(&self) -> &'r ComponentRegistry {
        self.registry
    }

    /// Returns the active options.
    #[must_use]
    pub const fn options(&self) -> LoaderOptions {
        self.options
    }

    /// Loads a component from an envelope.
    ///
    /// # Errors
    ///
    /// - [`ComponentError::MissingProvider`] when the provider is empty.
    /// - [`ComponentError::UnknownProvider`] when nothing is registered under it.
    /// - [`ComponentError::VersionMismatch`] when the declared version has no
    ///   upgrade path to the current one.
    /// - [`ComponentError::Schema`] when the payload fails validation.
    /// - [`ComponentError::Construction`] when the component rejects the config.
    pub fn load(&self, envelope: &ComponentModel) -> ComponentResult<LoadedComponent> {
        if envelope.provider().is_empty() {
            return Err(ComponentError::MissingProvider);
        }

        let entry = self.resolve(envelope.provider())?;
        self.build(entry, envelope.version(), envelope.config())
    }

    /// Loads a component from an untyped JSON value.
    ///
    /// The provider is resolved before anything else in the envelope is
    /// inspected. A `config` that is not an object, or a `version` that is not
    /// a positive 32-bit integer, is reported against the resolved provider's
    /// schema. A missing or `null` config is an empty one.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Malformed`] when the value is not an object
    /// or its `provider` is not a string, [`ComponentError::MissingProvider`]
    /// when it has no provider, [`ComponentError::Schema`] for a mistyped
    /// `version` or `config`, and otherwise the errors of
    /// [`ComponentLoader::load`].
    pub fn load_value(&self, raw: &Value) -> ComponentResult<LoadedComponent> {
        let Value::Object(envelope) = raw else {
            return Err(ComponentError::malformed(format!(
                "component envelope must be an object, found {}",
                json_kind(raw)
            )));
        };

        let entry = self.resolve(envelope_provider(envelope)?)?;
        let provider = entry.provider().as_str();
        let version = envelope_version(envelope)
            .map_err(|err| ComponentError::schema(provider, err))?;
        let config = match envelope.get("config") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(config)) => config.clone(),
            Some(other) => {
                return Err(ComponentError::schema(
                    provider,
                    SchemaError::new(
                        ROOT_PATH,
                        SchemaErrorKind::TypeMismatch {
                            expected: "object".into(),
                            found: json_kind(other),
                        },
                    ),
                ));
            }
        };

        self.build(entry, version, &config)
    }

    /// Loads a component from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Malformed`] when `text` is not valid JSON, and
    /// otherwise the errors of [`ComponentLoader::load_value`].
    pub fn load_str(&self, text: &str) -> ComponentResult<LoadedComponent> {
        let raw: Value = serde_json::from_str(text)
            .map_err(|err| ComponentError::malformed(format!("invalid JSON: {err}")))?;
        self.load_value(&raw)
    }

    /// Loads a component and narrows it to capability `C`.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::CapabilityMismatch`] when the component does
    /// not provide `C`, and otherwise the errors of [`ComponentLoader::load`].
    pub fn load_as<C: Capability>(
        &self,
        envelope: &ComponentModel,
    ) -> ComponentResult<Box<C::Object>> {
        self.load(envelope)?.into_capability::<C>()
    }

    /// Loads a component as the concrete type `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::CapabilityMismatch`] when the provider builds a
    /// different type, and otherwise the errors of [`ComponentLoader::load`].
    pub fn load_typed<T: Component>(&self, envelope: &ComponentModel) -> ComponentResult<T> {
        self.load(envelope)?.downcast::<T>()
    }

    fn resolve(&self, requested: &str) -> ComponentResult<Arc<RegistryEntry>> {
        let entry = self.registry.resolve(requested)?;
        debug!(requested, provider = %entry.provider(), "provider resolved");
        Ok(entry)
    }

    fn build(
        &self,
        entry: Arc<RegistryEntry>,
        declared: Option<u32>,
        config: &Map<String, Value>,
    ) -> ComponentResult<LoadedComponent> {
        let validated = self.validate(&entry, declared, config)?;
        let instance = entry.construct(validated, self)?;
        Ok(LoadedComponent { entry, instance })
    }

    fn validate(
        &self,
        entry: &RegistryEntry,
        declared: Option<u32>,
        config: &Map<String, Value>,
    ) -> ComponentResult<ValidatedConfig> {
        let provider = entry.provider().as_str();
        let current = entry.version();
        let declared = declared.unwrap_or(current);
        let mismatch = || ComponentError::VersionMismatch {
            provider: provider.to_owned(),
            found: declared,
            current,
        };

        if declared == 0 || declared > current {
            return Err(mismatch());
        }

        let unknown_fields = self.options.unknown_fields;
        let mut raw = Value::Object(config.clone());
        for version in declared..current {
            let migration = entry.migration(version).ok_or_else(mismatch)?;
            let validated = migration
                .schema()
                .validate_with(&raw, unknown_fields)
                .map_err(|err| ComponentError::schema(provider, err))?;
            let upgraded = migration
                .apply(validated)
                .map_err(|source| ComponentError::construction(provider, source))?;
            info!(provider, from = version, to = version + 1, "config migrated");
            raw = Value::Object(upgraded);
        }

        entry
            .schema()
            .validate_with(&raw, unknown_fields)
            .map_err(|err| ComponentError::schema(provider, err))
    }
}

fn envelope_provider(envelope: &Map<String, Value>) -> ComponentResult<&str> {
    match envelope.get("provider") {
        None | Some(Value::Null) => Err(ComponentError::MissingProvider),
        Some(Value::String(provider)) if provider.is_empty() => Err(ComponentError::MissingProvider),
        Some(Value::String(provider)) => Ok(provider.as_str()),
        Some(other) => Err(ComponentError::malformed(format!(
            "`provider` must be a string, found {}",
            json_kind(other)
        ))),
    }
}

// Zero passes through so the loader reports it as a version mismatch.
fn envelope_version(envelope: &Map<String, Value>) -> Result<Option<u32>, SchemaError> {
    match envelope.get("version") {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|version| u32::try_from(version).ok())
            .map(Some)
            .ok_or_else(|| {
                SchemaError::new(
                    "version",
                    SchemaErrorKind::TypeMismatch {
                        expected: "32-bit unsigned integer".into(),
                        found: json_kind(value),
                    },
                )
            }),
    }
}

/// A freshly constructed component together with the entry that built it.
pub struct LoadedComponent {
    entry: Arc<RegistryEntry>,
    instance: AnyComponent,
}

impl fmt::Debug for LoadedComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedComponent")
            .field("provider", self.entry.provider())
            .field("type_name", &self.entry.type_name())
            .finish_non_exhaustive()
    }
}

impl LoadedComponent {
    /// Canonical provider id of the component.
    #[must_use]
    pub fn provider(&self) -> &ProviderId {
        self.entry.provider()
    }

    /// Registry entry that constructed the component.
    #[must_use]
    pub fn entry(&self) -> &RegistryEntry {
        &self.entry
    }

    /// Whether the instance is of concrete type `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        (*self.instance).is::<T>()
    }

    /// Dumps the instance without knowing its concrete type.
    ///
    /// # Errors
    ///
    /// See [`dump`](crate::dump).
    pub fn dump(&self) -> ComponentResult<ComponentModel> {
        self.entry.decompose(&*self.instance)
    }

    /// Recovers the concrete component.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::CapabilityMismatch`] when the instance is not a `T`.
    pub fn downcast<T: Component>(self) -> ComponentResult<T> {
        let provider = self.entry.provider().to_string();
        self.instance
            .downcast::<T>()
            .map(|concrete| *concrete)
            .map_err(|_| ComponentError::CapabilityMismatch {
                provider,
                capability: type_name::<T>().to_owned(),
            })
    }

    /// Converts the instance into the trait object for capability `C`.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::CapabilityMismatch`] when the component does
    /// not provide `C`.
    pub fn into_capability<C: Capability>(self) -> ComponentResult<Box<C::Object>> {
        self.entry.cast::<C>(self.instance)
    }

    /// Returns the type-erased instance.
    #[must_use]
    pub fn into_any(self) -> AnyComponent {
        self.instance
    }
}
