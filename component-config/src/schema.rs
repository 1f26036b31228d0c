//! Strongly typed configuration schemas.
//!
//! A [`ConfigSchema`] describes the shape of a component's config payload. It
//! validates untyped JSON into a [`ValidatedConfig`], carries the per-field
//! `secret` annotation the dumper consults, and can render itself as a JSON
//! Schema document for tooling.

use component_primitives::json_kind;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::error::{SchemaError, SchemaErrorKind};

pub(crate) const ROOT_PATH: &str = "$";

/// Policy applied to fields a schema does not declare.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnknownFields {
    /// Drop undeclared fields from the validated value.
    #[default]
    Ignore,
    /// Fail validation with [`SchemaErrorKind::UnknownField`].
    Reject,
}

/// JSON type expected for a field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    /// JSON string.
    String,
    /// JSON integer.
    Integer,
    /// Any JSON number, integers included.
    Number,
    /// JSON boolean.
    Boolean,
    /// Homogeneous JSON array.
    Array(Box<FieldKind>),
    /// Nested object described by its own schema.
    Object(ConfigSchema),
    /// Nested component envelope, resolved later through the registry.
    Component,
    /// Any JSON value.
    Any,
}

impl FieldKind {
    fn describe(&self) -> String {
        match self {
            Self::String => "string".into(),
            Self::Integer => "integer".into(),
            Self::Number => "number".into(),
            Self::Boolean => "boolean".into(),
            Self::Array(item) => format!("array of {}", item.describe()),
            Self::Object(_) => "object".into(),
            Self::Component => "component envelope".into(),
            Self::Any => "any value".into(),
        }
    }
}

/// Declaration of a single config field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSchema {
    name: String,
    kind: FieldKind,
    required: bool,
    secret: bool,
    default: Option<Value>,
    description: Option<String>,
}

impl FieldSchema {
    /// Declares an optional field of the given kind.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            secret: false,
            default: None,
            description: None,
        }
    }

    /// Declares a string field.
    #[must_use]
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    /// Declares an integer field.
    #[must_use]
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    /// Declares a numeric field.
    #[must_use]
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Number)
    }

    /// Declares a boolean field.
    #[must_use]
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    /// Declares an array field whose items are of `item` kind.
    #[must_use]
    pub fn array(name: impl Into<String>, item: FieldKind) -> Self {
        Self::new(name, FieldKind::Array(Box::new(item)))
    }

    /// Declares a nested object field.
    #[must_use]
    pub fn object(name: impl Into<String>, schema: ConfigSchema) -> Self {
        Self::new(name, FieldKind::Object(schema))
    }

    /// Declares a nested component envelope field.
    ///
    /// The dumper cannot see the nested provider's schema. Dump nested
    /// components through [`DumpComponent`](crate::DumpComponent) so their own
    /// secrets are stripped, or pass the result through
    /// [`ComponentRegistry::redact`](crate::ComponentRegistry::redact).
    #[must_use]
    pub fn component(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Component)
    }

    /// Marks the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the field as secret; dumps omit it entirely.
    #[must_use]
    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    /// Value filled in when the field is absent.
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared kind.
    #[must_use]
    pub const fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Whether the field must be present.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Whether the field is excluded from dumps.
    #[must_use]
    pub const fn is_secret(&self) -> bool {
        self.secret
    }

    /// Returns the default value, if any.
    #[must_use]
    pub const fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Structural description of a config payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigSchema {
    title: Option<String>,
    fields: Vec<FieldSchema>,
    unknown_fields: UnknownFields,
}

impl ConfigSchema {
    /// Creates an empty schema that ignores unknown fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the title used when rendering JSON Schema.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Adds a field, replacing any earlier declaration with the same name.
    #[must_use]
    pub fn field(mut self, field: FieldSchema) -> Self {
        if let Some(existing) = self.fields.iter_mut().find(|f| f.name == field.name) {
            *existing = field;
        } else {
            self.fields.push(field);
        }
        self
    }

    /// Sets the unknown-field policy.
    #[must_use]
    pub fn unknown_fields(mut self, policy: UnknownFields) -> Self {
        self.unknown_fields = policy;
        self
    }

    /// Returns the declared fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the unknown-field policy.
    #[must_use]
    pub const fn unknown_field_policy(&self) -> UnknownFields {
        self.unknown_fields
    }

    /// Names of top-level fields marked secret.
    pub fn secret_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.secret)
            .map(|f| f.name.as_str())
    }

    /// Validates `raw` against this schema.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] naming the first offending field path.
    pub fn validate(&self, raw: &Value) -> Result<ValidatedConfig, SchemaError> {
        self.validate_with(raw, None)
    }

    /// Validates `raw`, optionally overriding the unknown-field policy of this
    /// schema and every nested object schema.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] naming the first offending field path.
    pub fn validate_with(
        &self,
        raw: &Value,
        unknown_fields: Option<UnknownFields>,
    ) -> Result<ValidatedConfig, SchemaError> {
        let Value::Object(map) = raw else {
            return Err(SchemaError::new(
                ROOT_PATH,
                SchemaErrorKind::TypeMismatch {
                    expected: "object".into(),
                    found: json_kind(raw),
                },
            ));
        };
        self.validate_object(map, "", unknown_fields)
            .map(ValidatedConfig)
    }

    fn validate_object(
        &self,
        map: &Map<String, Value>,
        prefix: &str,
        override_policy: Option<UnknownFields>,
    ) -> Result<Map<String, Value>, SchemaError> {
        let policy = override_policy.unwrap_or(self.unknown_fields);
        if policy == UnknownFields::Reject {
            if let Some(unknown) = map.keys().find(|key| self.get(key).is_none()) {
                return Err(SchemaError::new(
                    join(prefix, unknown),
                    SchemaErrorKind::UnknownField,
                ));
            }
        }

        let mut validated = Map::new();
        for field in &self.fields {
            let path = join(prefix, &field.name);
            match map.get(&field.name) {
                None | Some(Value::Null) if field.default.is_some() => {
                    if let Some(default) = &field.default {
                        validated.insert(field.name.clone(), default.clone());
                    }
                }
                None if field.required => {
                    return Err(SchemaError::new(path, SchemaErrorKind::MissingField));
                }
                None => {}
                Some(Value::Null) if !field.required => {}
                Some(value) => {
                    let checked = check_kind(&field.kind, value, &path, override_policy)?;
                    validated.insert(field.name.clone(), checked);
                }
            }
        }
        Ok(validated)
    }

    /// Renders this schema as a JSON Schema (draft 2020-12) document.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let mut document = self.object_json_schema();
        if let Value::Object(map) = &mut document {
            map.insert(
                "$schema".into(),
                json!("https://json-schema.org/draft/2020-12/schema"),
            );
            if let Some(title) = &self.title {
                map.insert("title".into(), json!(title));
            }
        }
        document
    }

    fn object_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &self.fields {
            let mut property = kind_json_schema(&field.kind);
            if let Value::Object(map) = &mut property {
                if let Some(description) = &field.description {
                    map.insert("description".into(), json!(description));
                }
                if let Some(default) = &field.default {
                    map.insert("default".into(), default.clone());
                }
                if field.secret {
                    map.insert("writeOnly".into(), Value::Bool(true));
                }
            }
            if field.required {
                required.push(json!(field.name));
            }
            properties.insert(field.name.clone(), property);
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": self.unknown_fields == UnknownFields::Ignore,
        })
    }
}

fn kind_json_schema(kind: &FieldKind) -> Value {
    match kind {
        FieldKind::String => json!({ "type": "string" }),
        FieldKind::Integer => json!({ "type": "integer" }),
        FieldKind::Number => json!({ "type": "number" }),
        FieldKind::Boolean => json!({ "type": "boolean" }),
        FieldKind::Array(item) => json!({ "type": "array", "items": kind_json_schema(item) }),
        FieldKind::Object(schema) => schema.object_json_schema(),
        FieldKind::Component => json!({
            "type": "object",
            "properties": {
                "provider": { "type": "string", "minLength": 1 },
                "component_type": { "type": "string" },
                "version": { "type": "integer", "minimum": 1 },
                "description": { "type": "string" },
                "label": { "type": "string" },
                "config": { "type": "object" }
            },
            "required": ["provider"]
        }),
        FieldKind::Any => json!({}),
    }
}

fn check_kind(
    kind: &FieldKind,
    value: &Value,
    path: &str,
    override_policy: Option<UnknownFields>,
) -> Result<Value, SchemaError> {
    let mismatch = || {
        SchemaError::new(
            path,
            SchemaErrorKind::TypeMismatch {
                expected: kind.describe(),
                found: json_kind(value),
            },
        )
    };

    match (kind, value) {
        (FieldKind::Any, _)
        | (FieldKind::String, Value::String(_))
        | (FieldKind::Number, Value::Number(_))
        | (FieldKind::Boolean, Value::Bool(_)) => Ok(value.clone()),
        (FieldKind::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        (FieldKind::Array(item), Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                check_kind(item, entry, &format!("{path}[{index}]"), override_policy)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (FieldKind::Object(schema), Value::Object(map)) => schema
            .validate_object(map, path, override_policy)
            .map(Value::Object),
        (FieldKind::Component, Value::Object(map)) => {
            check_component(map, path)?;
            Ok(value.clone())
        }
        _ => Err(mismatch()),
    }
}

fn check_component(map: &Map<String, Value>, path: &str) -> Result<(), SchemaError> {
    let invalid = |reason: &str| {
        SchemaError::new(
            path,
            SchemaErrorKind::InvalidComponent {
                reason: reason.into(),
            },
        )
    };

    match map.get("provider") {
        Some(Value::String(provider)) if !provider.is_empty() => {}
        _ => return Err(invalid("`provider` must be a non-empty string")),
    }
    if let Some(config) = map.get("config") {
        if !config.is_object() {
            return Err(invalid("`config` must be an object"));
        }
    }
    if let Some(version) = map.get("version") {
        if !version
            .as_u64()
            .is_some_and(|v| (1..=u64::from(u32::MAX)).contains(&v))
        {
            return Err(invalid("`version` must be a positive 32-bit integer"));
        }
    }
    Ok(())
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Config payload that passed schema validation.
///
/// Only a [`ConfigSchema`] can produce one, so holding a `ValidatedConfig`
/// means the structural checks already ran.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedConfig(Map<String, Value>);

impl ValidatedConfig {
    /// Returns the validated fields.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Returns a single validated field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Consumes the value and returns the field map.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Deserializes the payload into a typed config struct.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the typed struct is stricter than
    /// the schema that validated the payload.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.0))
    }
}
