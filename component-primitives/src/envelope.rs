//! Serializable envelope that carries a component blueprint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, ProviderId, Result};

/// Well-known component category labels.
///
/// Labels are informational; they are not required to be unique and the
/// loader never dispatches on them.
pub mod component_type {
    /// Chat/completion model clients.
    pub const MODEL_CLIENT: &str = "model_client";
    /// Conversational agents.
    pub const AGENT: &str = "agent";
    /// Message history buffers handed to model clients.
    pub const CHAT_COMPLETION_CONTEXT: &str = "chat_completion_context";
    /// Callable tools.
    pub const TOOL: &str = "tool";
}

/// Portable blueprint of a component: provider id, schema version, type label
/// and the config payload.
///
/// Envelopes are plain values. They can be cloned, compared, serialized and
/// shipped anywhere; nothing in them refers back to a live instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentModel {
    provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    component_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default)]
    config: Map<String, Value>,
}

impl ComponentModel {
    /// Starts building an envelope for the supplied provider.
    #[must_use]
    pub fn builder(provider: ProviderId) -> ComponentModelBuilder {
        ComponentModelBuilder {
            provider,
            component_type: None,
            version: None,
            description: None,
            label: None,
            config: Map::new(),
        }
    }

    /// Returns the provider identifier exactly as carried by the envelope.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Returns the informational component type label.
    #[must_use]
    pub fn component_type(&self) -> Option<&str> {
        self.component_type.as_deref()
    }

    /// Returns the declared schema version, if any.
    #[must_use]
    pub const fn version(&self) -> Option<u32> {
        self.version
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the optional human-facing label.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns the config payload.
    #[must_use]
    pub const fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    /// Mutable access to the config payload.
    pub fn config_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.config
    }

    /// Consumes the envelope and returns the config payload.
    #[must_use]
    pub fn into_config(self) -> Map<String, Value> {
        self.config
    }
}

/// Builder for [`ComponentModel`].
#[derive(Debug)]
pub struct ComponentModelBuilder {
    provider: ProviderId,
    component_type: Option<String>,
    version: Option<u32>,
    description: Option<String>,
    label: Option<String>,
    config: Map<String, Value>,
}

impl ComponentModelBuilder {
    /// Sets the component type label.
    #[must_use]
    pub fn component_type(mut self, component_type: impl Into<String>) -> Self {
        self.component_type = Some(component_type.into());
        self
    }

    /// Sets the schema version of the payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEnvelope`] when the version is zero.
    pub fn version(mut self, version: u32) -> Result<Self> {
        if version == 0 {
            return Err(Error::InvalidEnvelope {
                reason: "version must be >= 1".into(),
            });
        }
        self.version = Some(version);
        Ok(self)
    }

    /// Sets an optional description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets an optional label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Replaces the config payload.
    #[must_use]
    pub fn config(mut self, config: Map<String, Value>) -> Self {
        self.config = config;
        self
    }

    /// Replaces the config payload from an arbitrary JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEnvelope`] if the value is not a JSON object.
    pub fn config_value(mut self, config: Value) -> Result<Self> {
        match config {
            Value::Object(map) => {
                self.config = map;
                Ok(self)
            }
            other => Err(Error::InvalidEnvelope {
                reason: format!("config must be an object, found {}", json_kind(&other)),
            }),
        }
    }

    /// Consumes the builder and returns the envelope.
    #[must_use]
    pub fn build(self) -> ComponentModel {
        ComponentModel {
            provider: self.provider.into(),
            component_type: self.component_type,
            version: self.version,
            description: self.description,
            label: self.label,
            config: self.config,
        }
    }
}

/// Returns a short name for the JSON type of `value`, used in diagnostics.
#[must_use]
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider() -> ProviderId {
        ProviderId::new("openai_model_client").expect("id")
    }

    #[test]
    fn builds_envelope() {
        let envelope = ComponentModel::builder(provider())
            .component_type(component_type::MODEL_CLIENT)
            .version(1)
            .unwrap()
            .label("primary")
            .config_value(json!({ "model": "gpt-4o" }))
            .unwrap()
            .build();

        assert_eq!(envelope.provider(), "openai_model_client");
        assert_eq!(envelope.component_type(), Some("model_client"));
        assert_eq!(envelope.version(), Some(1));
        assert_eq!(envelope.label(), Some("primary"));
        assert_eq!(envelope.config().get("model"), Some(&json!("gpt-4o")));
    }

    #[test]
    fn rejects_zero_version_and_non_object_config() {
        let err = ComponentModel::builder(provider())
            .version(0)
            .expect_err("zero version");
        assert!(matches!(err, Error::InvalidEnvelope { .. }));

        let err = ComponentModel::builder(provider())
            .config_value(json!([1, 2]))
            .expect_err("array config");
        assert!(matches!(err, Error::InvalidEnvelope { reason } if reason.contains("array")));
    }

    #[test]
    fn wire_shape_omits_unset_fields() {
        let envelope = ComponentModel::builder(provider())
            .version(1)
            .unwrap()
            .config_value(json!({ "model": "gpt-4o" }))
            .unwrap()
            .build();

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            json!({
                "provider": "openai_model_client",
                "version": 1,
                "config": { "model": "gpt-4o" }
            })
        );
    }

    #[test]
    fn config_defaults_to_empty() {
        let envelope: ComponentModel =
            serde_json::from_value(json!({ "provider": "custom" })).unwrap();
        assert!(envelope.config().is_empty());
        assert_eq!(envelope.version(), None);
    }

    #[test]
    fn json_kind_names() {
        assert_eq!(json_kind(&json!(1)), "integer");
        assert_eq!(json_kind(&json!(1.5)), "number");
        assert_eq!(json_kind(&json!({})), "object");
    }
}
