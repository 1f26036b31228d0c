//! Secret handling for component configs.
//!
//! Secrecy is declared on the schema ([`FieldSchema::secret`]); the dumper
//! removes those fields outright. Secrets inside nested component envelopes
//! are only reachable through a registry, see [`ComponentRegistry::redact`]. [`SecretString`] keeps the in-memory copy out
//! of `Debug` output.
//!
//! [`FieldSchema::secret`]: crate::schema::FieldSchema::secret
//! [`ComponentRegistry::redact`]: crate::ComponentRegistry::redact

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::registry::ComponentRegistry;
use crate::schema::{ConfigSchema, FieldKind};

/// Removes every field the schema marks secret, recursing into nested object
/// schemas and arrays of objects.
///
/// Nested component envelopes are left alone; their schemas live in a
/// registry. See [`redact_nested`].
pub(crate) fn omit_secrets(schema: &ConfigSchema, config: &mut Map<String, Value>) {
    strip(None, schema, config);
}

/// Like [`omit_secrets`], and also strips secrets inside nested component
/// envelopes whose provider `registry` resolves. Envelopes naming an unknown
/// provider are kept as they are.
pub(crate) fn redact_nested(
    registry: &ComponentRegistry,
    schema: &ConfigSchema,
    config: &mut Map<String, Value>,
) {
    strip(Some(registry), schema, config);
}

fn strip(
    registry: Option<&ComponentRegistry>,
    schema: &ConfigSchema,
    config: &mut Map<String, Value>,
) {
    for field in schema.fields() {
        if field.is_secret() {
            config.remove(field.name());
            continue;
        }
        if let Some(value) = config.get_mut(field.name()) {
            strip_value(registry, field.kind(), value);
        }
    }
}

fn strip_value(registry: Option<&ComponentRegistry>, kind: &FieldKind, value: &mut Value) {
    match (kind, value) {
        (FieldKind::Object(schema), Value::Object(map)) => strip(registry, schema, map),
        (FieldKind::Array(item), Value::Array(items)) => {
            for entry in items {
                strip_value(registry, item, entry);
            }
        }
        (FieldKind::Component, Value::Object(envelope)) => {
            if let Some(registry) = registry {
                strip_envelope(registry, envelope);
            }
        }
        _ => {}
    }
}

fn strip_envelope(registry: &ComponentRegistry, envelope: &mut Map<String, Value>) {
    let Some(entry) = envelope
        .get("provider")
        .and_then(Value::as_str)
        .and_then(|provider| registry.resolve(provider).ok())
    else {
        return;
    };
    if let Some(Value::Object(config)) = envelope.get_mut("config") {
        strip(Some(registry), entry.schema(), config);
    }
}

/// String whose contents never appear in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    /// Wraps a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}
