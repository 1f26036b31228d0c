//! Error taxonomy for dumping, registering and loading components.

use thiserror::Error;

/// Boxed error returned by component conversion functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias for framework operations.
pub type ComponentResult<T> = Result<T, ComponentError>;

/// Structural mismatch between a config payload and its schema.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("`{path}`: {kind}")]
pub struct SchemaError {
    path: String,
    kind: SchemaErrorKind,
}

impl SchemaError {
    pub(crate) fn new(path: impl Into<String>, kind: SchemaErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Path of the offending field, e.g. `retry.max_attempts` or `clients[1].provider`.
    ///
    /// The payload root is reported as `$`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Describes what was wrong at [`SchemaError::path`].
    #[must_use]
    pub const fn kind(&self) -> &SchemaErrorKind {
        &self.kind
    }
}

/// Category of a [`SchemaError`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SchemaErrorKind {
    /// A required field was absent.
    #[error("missing required field")]
    MissingField,

    /// A field was present with the wrong JSON type.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        /// Type the schema declares.
        expected: String,
        /// JSON type actually found.
        found: &'static str,
    },

    /// A field not declared by a schema that rejects unknown fields.
    #[error("unknown field")]
    UnknownField,

    /// A nested component envelope was structurally invalid.
    #[error("invalid component envelope: {reason}")]
    InvalidComponent {
        /// Human-readable reason for rejection.
        reason: String,
    },
}

/// Errors produced by the component framework.
#[derive(Debug, Error)]
pub enum ComponentError {
    /// Input text or value is not valid structured data.
    #[error("malformed component input: {reason}")]
    Malformed {
        /// Parser or shape diagnostic.
        reason: String,
    },

    /// Envelope carried no `provider` field.
    #[error("component envelope is missing a `provider`")]
    MissingProvider,

    /// Envelope referenced a provider nobody registered.
    #[error("provider `{provider}` is not registered")]
    UnknownProvider {
        /// Provider id found in the envelope.
        provider: String,
    },

    /// Config payload did not match the provider's schema.
    #[error("config for provider `{provider}` is invalid at {source}")]
    Schema {
        /// Provider whose schema rejected the payload.
        provider: String,
        /// Field-level diagnostic.
        #[source]
        source: SchemaError,
    },

    /// Declared payload version has no path to the current version.
    #[error(
        "provider `{provider}` cannot load config version {found} (current version {current})"
    )]
    VersionMismatch {
        /// Provider the envelope targets.
        provider: String,
        /// Version declared by the envelope.
        found: u32,
        /// Current version of the registered component.
        current: u32,
    },

    /// Two distinct component definitions claimed the same provider id.
    #[error("provider `{provider}` is already bound to `{existing}`; refusing `{incoming}`")]
    DuplicateProvider {
        /// Contested provider id or alias.
        provider: String,
        /// Definition already registered.
        existing: String,
        /// Definition that attempted to register.
        incoming: String,
    },

    /// The component's own conversion function failed.
    #[error("failed to construct component `{provider}`: {source}")]
    Construction {
        /// Provider whose conversion failed.
        provider: String,
        /// Underlying cause.
        #[source]
        source: BoxError,
    },

    /// The loaded instance does not implement the requested capability.
    #[error("component `{provider}` does not provide `{capability}`")]
    CapabilityMismatch {
        /// Provider that was loaded.
        provider: String,
        /// Capability or concrete type the caller asked for.
        capability: String,
    },

    /// A component definition declared a malformed provider id or version.
    #[error(transparent)]
    InvalidDefinition(#[from] component_primitives::Error),
}

impl ComponentError {
    /// Wraps an arbitrary failure as a [`ComponentError::Construction`].
    #[must_use]
    pub fn construction(provider: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Construction {
            provider: provider.into(),
            source: source.into(),
        }
    }

    /// Convenience constructor for malformed input.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    pub(crate) fn schema(provider: impl Into<String>, source: SchemaError) -> Self {
        Self::Schema {
            provider: provider.into(),
            source,
        }
    }
}
