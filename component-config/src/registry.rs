//! Registry mapping provider ids to component definitions.

use std::any::{Any, TypeId, type_name};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, OnceLock};

use component_primitives::{ComponentModel, ProviderId};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::capability::{AnyComponent, Capability, CapabilityCast, CapabilitySet, cast_instance};
use crate::component::{Component, Migration};
use crate::error::{ComponentError, ComponentResult};
use crate::loader::ComponentLoader;
use crate::schema::{ConfigSchema, ValidatedConfig};
use crate::secrets::redact_nested;

type ConstructFn = fn(ValidatedConfig, &ComponentLoader<'_>) -> ComponentResult<AnyComponent>;
type DecomposeFn = fn(&(dyn Any + Send + Sync)) -> ComponentResult<ComponentModel>;

/// Everything the loader needs to rebuild one provider's components.
pub struct RegistryEntry {
    provider: ProviderId,
    component_type: &'static str,
    version: u32,
    description: Option<&'static str>,
    schema: ConfigSchema,
    migrations: BTreeMap<u32, Migration>,
    type_id: TypeId,
    type_name: &'static str,
    construct: ConstructFn,
    decompose: DecomposeFn,
    capabilities: Vec<CapabilityCast>,
}

impl RegistryEntry {
    /// Builds the entry for component type `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::InvalidDefinition`] when `T::PROVIDER` is not
    /// a valid provider id or `T::VERSION` is zero.
    pub fn of<T: Component>() -> ComponentResult<Self> {
        let provider = ProviderId::new(T::PROVIDER)?;
        if T::VERSION == 0 {
            return Err(component_primitives::Error::InvalidEnvelope {
                reason: format!("`{}` declares version 0", type_name::<T>()),
            }
            .into());
        }

        let mut set = CapabilitySet::<T>::new();
        T::capabilities(&mut set);

        let migrations = T::migrations()
            .into_iter()
            .map(|migration| (migration.from_version(), migration))
            .collect();

        Ok(Self {
            provider,
            component_type: T::COMPONENT_TYPE,
            version: T::VERSION,
            description: T::DESCRIPTION,
            schema: T::config_schema(),
            migrations,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            construct: construct_erased::<T>,
            decompose: decompose_erased::<T>,
            capabilities: set.into_casts(),
        })
    }

    /// Returns the canonical provider id.
    #[must_use]
    pub const fn provider(&self) -> &ProviderId {
        &self.provider
    }

    /// Returns the component type label.
    #[must_use]
    pub const fn component_type(&self) -> &'static str {
        self.component_type
    }

    /// Returns the current config version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Returns the component's declared description.
    #[must_use]
    pub const fn description(&self) -> Option<&'static str> {
        self.description
    }

    /// Returns the schema of the current version.
    #[must_use]
    pub const fn schema(&self) -> &ConfigSchema {
        &self.schema
    }

    /// Returns the upgrade step out of `version`, if one is registered.
    #[must_use]
    pub fn migration(&self, version: u32) -> Option<&Migration> {
        self.migrations.get(&version)
    }

    /// Rust type name of the registered component.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Names of the capabilities instances satisfy.
    #[must_use]
    pub fn capabilities(&self) -> Vec<&'static str> {
        self.capabilities.iter().map(CapabilityCast::name).collect()
    }

    /// Whether instances satisfy capability `C`.
    #[must_use]
    pub fn provides<C: Capability>(&self) -> bool {
        self.capabilities.iter().any(CapabilityCast::is::<C>)
    }

    pub(crate) fn construct(
        &self,
        config: ValidatedConfig,
        loader: &ComponentLoader<'_>,
    ) -> ComponentResult<AnyComponent> {
        (self.construct)(config, loader)
    }

    pub(crate) fn decompose(
        &self,
        instance: &(dyn Any + Send + Sync),
    ) -> ComponentResult<ComponentModel> {
        (self.decompose)(instance)
    }

    pub(crate) fn cast<C: Capability>(
        &self,
        instance: AnyComponent,
    ) -> ComponentResult<Box<C::Object>> {
        cast_instance::<C>(&self.capabilities, self.provider.as_str(), instance)
    }
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("provider", &self.provider)
            .field("component_type", &self.component_type)
            .field("version", &self.version)
            .field("type_name", &self.type_name)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

fn construct_erased<T: Component>(
    config: ValidatedConfig,
    loader: &ComponentLoader<'_>,
) -> ComponentResult<AnyComponent> {
    let typed: T::Config = config
        .deserialize()
        .map_err(|err| ComponentError::construction(T::PROVIDER, err))?;
    let instance = T::from_config(typed, loader)
        .map_err(|source| ComponentError::construction(T::PROVIDER, source))?;
    debug!(provider = T::PROVIDER, "component constructed");
    Ok(Box::new(instance))
}

fn decompose_erased<T: Component>(
    instance: &(dyn Any + Send + Sync),
) -> ComponentResult<ComponentModel> {
    let component =
        instance
            .downcast_ref::<T>()
            .ok_or_else(|| ComponentError::CapabilityMismatch {
                provider: T::PROVIDER.to_owned(),
                capability: type_name::<T>().to_owned(),
            })?;
    crate::dumper::dump(component)
}

#[derive(Default)]
struct RegistryState {
    entries: HashMap<ProviderId, Arc<RegistryEntry>>,
    aliases: HashMap<ProviderId, ProviderId>,
}

/// Process-wide map from provider id to [`RegistryEntry`].
///
/// Lookups take a shared lock and may run concurrently; registrations take the
/// exclusive lock and insert a fully built entry, so readers never observe a
/// partial one.
#[derive(Default)]
pub struct ComponentRegistry {
    inner: RwLock<RegistryState>,
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        let mut providers: Vec<_> = inner.entries.keys().map(ProviderId::as_str).collect();
        providers.sort_unstable();
        f.debug_struct("ComponentRegistry")
            .field("providers", &providers)
            .field("aliases", &inner.aliases.len())
            .finish()
    }
}

static GLOBAL: OnceLock<ComponentRegistry> = OnceLock::new();

impl ComponentRegistry {
    /// Creates an empty, isolated registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide registry, populated on first use from every
    /// [`register_component!`](crate::register_component) and
    /// [`register_alias!`](crate::register_alias) in the binary.
    ///
    /// # Panics
    ///
    /// Panics when two distinct component types claim the same provider id.
    /// That is a build-level configuration conflict; use
    /// [`ComponentRegistry::from_inventory`] to handle it as an error instead.
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(|| match Self::from_inventory() {
            Ok(registry) => registry,
            Err(err) => panic!("component registry bootstrap failed: {err}"),
        })
    }

    /// Builds a fresh registry from every statically submitted component and
    /// alias. Aliases are installed after all components.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::DuplicateProvider`] on a provider id or alias
    /// conflict, and the errors of [`ComponentRegistry::register_alias`] for a
    /// bad alias.
    pub fn from_inventory() -> ComponentResult<Self> {
        let registry = Self::new();
        for registration in inventory::iter::<ComponentRegistration> {
            registration.register(&registry)?;
        }
        for alias in inventory::iter::<AliasRegistration> {
            registry.register_alias(alias.alias, alias.provider)?;
        }
        Ok(registry)
    }

    /// Registers component type `T` under `T::PROVIDER`.
    ///
    /// # Errors
    ///
    /// See [`ComponentRegistry::register_entry`].
    pub fn register<T: Component>(&self) -> ComponentResult<()> {
        self.register_entry(RegistryEntry::of::<T>()?)
    }

    /// Registers a prebuilt entry.
    ///
    /// Registering the same component type twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::DuplicateProvider`] when the provider id is
    /// already bound to a different component type or used as an alias.
    pub fn register_entry(&self, entry: RegistryEntry) -> ComponentResult<()> {
        let mut inner = self.inner.write();
        let provider = entry.provider.clone();

        if let Some(target) = inner.aliases.get(&provider) {
            warn!(%provider, alias_for = %target, "provider id collides with an alias");
            return Err(ComponentError::DuplicateProvider {
                provider: provider.into(),
                existing: format!("alias for `{target}`"),
                incoming: entry.type_name.to_owned(),
            });
        }

        if let Some(existing) = inner.entries.get(&provider) {
            if existing.type_id == entry.type_id {
                debug!(%provider, "provider already registered with the same component");
                return Ok(());
            }
            warn!(
                %provider,
                existing = existing.type_name,
                incoming = entry.type_name,
                "conflicting provider registration rejected"
            );
            return Err(ComponentError::DuplicateProvider {
                provider: provider.into(),
                existing: existing.type_name.to_owned(),
                incoming: entry.type_name.to_owned(),
            });
        }

        info!(
            %provider,
            component_type = entry.component_type,
            version = entry.version,
            "component provider registered"
        );
        inner.entries.insert(provider, Arc::new(entry));
        Ok(())
    }

    /// Makes `alias` resolve to the already registered `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::UnknownProvider`] when `provider` is not
    /// registered, [`ComponentError::DuplicateProvider`] when `alias` is a
    /// registered provider or already aliases a different one, and
    /// [`ComponentError::InvalidDefinition`] when `alias` is not a valid id.
    pub fn register_alias(&self, alias: &str, provider: &str) -> ComponentResult<()> {
        let alias = ProviderId::new(alias)?;
        let mut inner = self.inner.write();

        let target = inner
            .aliases
            .get(provider)
            .cloned()
            .or_else(|| {
                inner
                    .entries
                    .get_key_value(provider)
                    .map(|(id, _)| id.clone())
            })
            .ok_or_else(|| ComponentError::UnknownProvider {
                provider: provider.to_owned(),
            })?;

        if let Some(existing) = inner.entries.get(&alias) {
            return Err(ComponentError::DuplicateProvider {
                provider: alias.into(),
                existing: existing.type_name.to_owned(),
                incoming: format!("alias for `{target}`"),
            });
        }

        if let Some(existing) = inner.aliases.get(&alias) {
            if *existing == target {
                return Ok(());
            }
            return Err(ComponentError::DuplicateProvider {
                provider: alias.into(),
                existing: format!("alias for `{existing}`"),
                incoming: format!("alias for `{target}`"),
            });
        }

        debug!(%alias, %target, "provider alias registered");
        inner.aliases.insert(alias, target);
        Ok(())
    }

    /// Resolves a provider id or alias to its entry.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::UnknownProvider`] when nothing is registered
    /// under `provider`.
    pub fn resolve(&self, provider: &str) -> ComponentResult<Arc<RegistryEntry>> {
        let inner = self.inner.read();
        inner
            .entries
            .get(provider)
            .or_else(|| {
                inner
                    .aliases
                    .get(provider)
                    .and_then(|target| inner.entries.get(target))
            })
            .cloned()
            .ok_or_else(|| ComponentError::UnknownProvider {
                provider: provider.to_owned(),
            })
    }

    /// Strips secret fields from `envelope`, including those inside nested
    /// component envelopes.
    ///
    /// [`dump`](crate::dump) only knows the dumped type's own schema, so a
    /// config that carries nested envelopes verbatim keeps their secrets.
    /// This walks every [`FieldKind::Component`](crate::FieldKind::Component)
    /// field and applies the nested provider's schema. Nested envelopes whose
    /// provider is not registered are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::UnknownProvider`] when the envelope's own
    /// provider is not registered.
    pub fn redact(&self, envelope: &mut ComponentModel) -> ComponentResult<()> {
        let entry = self.resolve(envelope.provider())?;
        redact_nested(self, entry.schema(), envelope.config_mut());
        debug!(provider = %entry.provider(), "envelope redacted");
        Ok(())
    }

    /// Whether `provider` resolves to an entry.
    #[must_use]
    pub fn contains(&self, provider: &str) -> bool {
        self.resolve(provider).is_ok()
    }

    /// Lists registered provider ids in sorted order, aliases excluded.
    #[must_use]
    pub fn providers(&self) -> Vec<ProviderId> {
        let mut providers: Vec<_> = self.inner.read().entries.keys().cloned().collect();
        providers.sort();
        providers
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Whether no provider is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }
}

/// Static registration record collected by [`inventory`].
///
/// Created by [`register_component!`](crate::register_component); not meant
/// to be built by hand.
#[derive(Debug)]
pub struct ComponentRegistration {
    provider: &'static str,
    register: fn(&ComponentRegistry) -> ComponentResult<()>,
}

impl ComponentRegistration {
    /// Registration record for component type `T`.
    #[must_use]
    pub const fn of<T: Component>() -> Self {
        Self {
            provider: T::PROVIDER,
            register: register_static::<T>,
        }
    }

    /// Provider id the record registers.
    #[must_use]
    pub const fn provider(&self) -> &'static str {
        self.provider
    }

    fn register(&self, registry: &ComponentRegistry) -> ComponentResult<()> {
        (self.register)(registry)
    }
}

fn register_static<T: Component>(registry: &ComponentRegistry) -> ComponentResult<()> {
    registry.register::<T>()
}

inventory::collect!(ComponentRegistration);

/// Static alias record collected by [`inventory`].
///
/// Created by [`register_alias!`](crate::register_alias).
#[derive(Debug)]
pub struct AliasRegistration {
    alias: &'static str,
    provider: &'static str,
}

impl AliasRegistration {
    /// Record making `alias` resolve to `provider`.
    #[must_use]
    pub const fn new(alias: &'static str, provider: &'static str) -> Self {
        Self { alias, provider }
    }

    /// The alternate name.
    #[must_use]
    pub const fn alias(&self) -> &'static str {
        self.alias
    }

    /// Provider id the alias resolves to.
    #[must_use]
    pub const fn provider(&self) -> &'static str {
        self.provider
    }
}

inventory::collect!(AliasRegistration);

/// Registers component types with the process-wide registry at definition
/// time.
///
/// ```ignore
/// register_component!(OpenAiModelClient, AnthropicModelClient);
/// ```
#[macro_export]
macro_rules! register_component {
    ($($component:ty),+ $(,)?) => {
        $(
            $crate::inventory::submit! {
                $crate::ComponentRegistration::of::<$component>()
            }
        )+
    };
}

/// Registers provider aliases with the process-wide registry at definition
/// time.
///
/// ```ignore
/// register_alias!("OpenAIChatCompletionClient" => "openai_model_client");
/// ```
#[macro_export]
macro_rules! register_alias {
    ($($alias:expr => $provider:expr),+ $(,)?) => {
        $(
            $crate::inventory::submit! {
                $crate::AliasRegistration::new($alias, $provider)
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use tracing_test::traced_test;

    use super::*;
    use crate::error::BoxError;
    use crate::schema::FieldSchema;

    #[derive(Serialize, Deserialize)]
    struct Empty {}

    struct First;
    struct Second;

    impl Component for First {
        const PROVIDER: &'static str = "custom";
        const COMPONENT_TYPE: &'static str = "tool";
        type Config = Empty;

        fn config_schema() -> ConfigSchema {
            ConfigSchema::new()
        }

        fn to_config(&self) -> Result<Empty, BoxError> {
            Ok(Empty {})
        }

        fn from_config(_: Empty, _: &ComponentLoader<'_>) -> Result<Self, BoxError> {
            Ok(Self)
        }
    }

    impl Component for Second {
        const PROVIDER: &'static str = "custom";
        const COMPONENT_TYPE: &'static str = "agent";
        const VERSION: u32 = 2;
        type Config = Empty;

        fn config_schema() -> ConfigSchema {
            ConfigSchema::new().field(FieldSchema::string("name"))
        }

        fn to_config(&self) -> Result<Empty, BoxError> {
            Ok(Empty {})
        }

        fn from_config(_: Empty, _: &ComponentLoader<'_>) -> Result<Self, BoxError> {
            Ok(Self)
        }
    }

    struct BadId;

    impl Component for BadId {
        const PROVIDER: &'static str = "not valid";
        const COMPONENT_TYPE: &'static str = "tool";
        type Config = Empty;

        fn config_schema() -> ConfigSchema {
            ConfigSchema::new()
        }

        fn to_config(&self) -> Result<Empty, BoxError> {
            Ok(Empty {})
        }

        fn from_config(_: Empty, _: &ComponentLoader<'_>) -> Result<Self, BoxError> {
            Ok(Self)
        }
    }

    #[test]
    fn identical_registration_is_idempotent() {
        let registry = ComponentRegistry::new();
        registry.register::<First>().unwrap();
        registry.register::<First>().unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[traced_test]
    #[test]
    fn conflicting_registration_fails_and_logs() {
        let registry = ComponentRegistry::new();
        registry.register::<First>().unwrap();

        let err = registry
            .register::<Second>()
            .expect_err("conflicting definition");
        assert!(matches!(
            err,
            ComponentError::DuplicateProvider { ref provider, .. } if provider == "custom"
        ));
        assert!(logs_contain("conflicting provider registration rejected"));

        let entry = registry.resolve("custom").unwrap();
        assert_eq!(entry.component_type(), "tool");
    }

    #[test]
    fn invalid_provider_id_is_rejected() {
        let registry = ComponentRegistry::new();
        let err = registry.register::<BadId>().expect_err("invalid id");
        assert!(matches!(err, ComponentError::InvalidDefinition(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn unknown_provider_errors() {
        let registry = ComponentRegistry::new();
        let err = registry.resolve("missing").expect_err("unknown");
        assert!(matches!(
            err,
            ComponentError::UnknownProvider { provider } if provider == "missing"
        ));
    }

    #[test]
    fn aliases_resolve_to_target() {
        let registry = ComponentRegistry::new();
        registry.register::<First>().unwrap();
        registry.register_alias("my_tool", "custom").unwrap();
        registry.register_alias("my_tool", "custom").unwrap();
        registry.register_alias("tool_alias", "my_tool").unwrap();

        assert_eq!(registry.resolve("my_tool").unwrap().provider().as_str(), "custom");
        assert_eq!(registry.resolve("tool_alias").unwrap().provider().as_str(), "custom");
        assert_eq!(registry.providers().len(), 1);

        let err = registry
            .register_alias("custom", "custom")
            .expect_err("alias shadows provider");
        assert!(matches!(err, ComponentError::DuplicateProvider { .. }));

        let err = registry
            .register_alias("other", "nowhere")
            .expect_err("unknown target");
        assert!(matches!(err, ComponentError::UnknownProvider { .. }));
    }

    #[test]
    fn provider_cannot_take_an_alias_name() {
        let registry = ComponentRegistry::new();
        registry.register::<First>().unwrap();
        registry.register_alias("custom_v2", "custom").unwrap();

        struct Shadow;
        impl Component for Shadow {
            const PROVIDER: &'static str = "custom_v2";
            const COMPONENT_TYPE: &'static str = "tool";
            type Config = Empty;

            fn config_schema() -> ConfigSchema {
                ConfigSchema::new()
            }

            fn to_config(&self) -> Result<Empty, BoxError> {
                Ok(Empty {})
            }

            fn from_config(_: Empty, _: &ComponentLoader<'_>) -> Result<Self, BoxError> {
                Ok(Self)
            }
        }

        let err = registry.register::<Shadow>().expect_err("alias taken");
        assert!(matches!(err, ComponentError::DuplicateProvider { .. }));
    }

    #[test]
    fn entry_exposes_metadata() {
        let entry = RegistryEntry::of::<Second>().unwrap();
        assert_eq!(entry.provider().as_str(), "custom");
        assert_eq!(entry.version(), 2);
        assert!(entry.schema().get("name").is_some());
        assert!(entry.migration(1).is_none());
        assert!(entry.capabilities().is_empty());
        assert!(entry.type_name().ends_with("Second"));
    }
}
