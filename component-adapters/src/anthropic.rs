//! Anthropic Claude messages client.

use std::{env, fmt};

use component_config::{
    BoxError, CapabilitySet, Component, ComponentLoader, ConfigSchema, FieldSchema, SecretString,
    component_type,
};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Uri};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::traits::{
    AdapterError, AdapterResult, ChatRequest, MessageRole, ModelClient, ModelClientCapability,
    ModelInfo, check_temperature, endpoint_uri, sanitize_base_url, secret_header,
};

/// Environment variable consulted when no API key is configured.
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/";
const DEFAULT_MAX_TOKENS: u32 = 1024;

const fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

/// Declarative config of [`AnthropicModelClient`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnthropicClientConfig {
    /// Model name, e.g. `claude-3-5-sonnet-latest`.
    pub model: String,
    /// API key; never dumped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<SecretString>,
    /// Alternate API root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Output token budget used when a request sets none.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Default sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl AnthropicClientConfig {
    /// Creates a config for `model` with default limits.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key: None,
            base_url: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(key));
        self
    }

    /// Sets the default output token budget.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Model client targeting `/v1/messages`.
pub struct AnthropicModelClient {
    info: ModelInfo,
    config: AnthropicClientConfig,
    endpoint: Uri,
}

impl fmt::Debug for AnthropicModelClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicModelClient")
            .field("model", &self.info.model())
            .field("endpoint", &self.endpoint)
            .field("max_tokens", &self.config.max_tokens)
            .finish_non_exhaustive()
    }
}

impl AnthropicModelClient {
    /// Constructs a client, falling back to [`ANTHROPIC_API_KEY_ENV`] for the key.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] for an empty model, a zero token
    /// budget, a malformed base URL or an out-of-range temperature.
    pub fn new(mut config: AnthropicClientConfig) -> AdapterResult<Self> {
        if config.model.trim().is_empty() {
            return Err(AdapterError::configuration("Anthropic model must not be empty"));
        }
        if config.max_tokens == 0 {
            return Err(AdapterError::configuration("max_tokens must be positive"));
        }
        check_temperature(config.temperature)?;

        let base = match &config.base_url {
            Some(raw) => {
                let base = sanitize_base_url("Anthropic", raw)?;
                config.base_url = Some(base.clone());
                base
            }
            None => DEFAULT_BASE_URL.to_owned(),
        };
        let endpoint = endpoint_uri("Anthropic", &base, "v1/messages")?;

        if config.api_key.is_none() {
            config.api_key = env::var(ANTHROPIC_API_KEY_ENV).ok().map(SecretString::new);
        }

        debug!(model = %config.model, %endpoint, "anthropic client configured");
        Ok(Self {
            info: ModelInfo::new("anthropic", config.model.clone()),
            config,
            endpoint,
        })
    }
}

impl Component for AnthropicModelClient {
    const PROVIDER: &'static str = "anthropic_model_client";
    const COMPONENT_TYPE: &'static str = component_type::MODEL_CLIENT;
    const DESCRIPTION: Option<&'static str> = Some("Chat completion client for Anthropic Claude models");
    type Config = AnthropicClientConfig;

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .title("Anthropic model client")
            .field(FieldSchema::string("model").required())
            .field(FieldSchema::string("api_key").secret())
            .field(FieldSchema::string("base_url"))
            .field(
                FieldSchema::integer("max_tokens")
                    .with_default(Value::from(DEFAULT_MAX_TOKENS))
                    .with_description("Output token budget when a request sets none"),
            )
            .field(FieldSchema::number("temperature"))
    }

    fn to_config(&self) -> Result<AnthropicClientConfig, BoxError> {
        Ok(self.config.clone())
    }

    fn from_config(
        config: AnthropicClientConfig,
        _: &ComponentLoader<'_>,
    ) -> Result<Self, BoxError> {
        Ok(Self::new(config)?)
    }

    fn capabilities(set: &mut CapabilitySet<Self>) {
        set.provide::<ModelClientCapability>(|client| client as Box<dyn ModelClient>);
    }
}

impl ModelClient for AnthropicModelClient {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    fn request_headers(&self) -> AdapterResult<HeaderMap> {
        let key = self.config.api_key.as_ref().ok_or_else(|| {
            AdapterError::configuration(format!("{ANTHROPIC_API_KEY_ENV} is not set"))
        })?;
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-api-key"),
            secret_header("Anthropic", key.expose())?,
        );
        headers.insert(
            HeaderName::from_static("anthropic-version"),
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        Ok(headers)
    }

    fn chat_payload(&self, request: &ChatRequest) -> AdapterResult<Value> {
        // System role messages are folded into the top-level system field.
        let mut system: Vec<&str> = request.system_prompt().into_iter().collect();
        let mut messages = Vec::with_capacity(request.messages().len());
        for message in request.messages() {
            match message.role() {
                MessageRole::System => system.push(message.content()),
                role => messages.push(AnthropicMessage {
                    role,
                    content: message.content(),
                }),
            }
        }
        if messages.is_empty() {
            return Err(AdapterError::invalid_request(
                "Anthropic requests need at least one user or assistant message",
            ));
        }

        let body = MessagesRequest {
            model: &self.config.model,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages,
            max_tokens: request.max_output_tokens().unwrap_or(self.config.max_tokens),
            temperature: request.temperature().or(self.config.temperature),
        };
        serde_json::to_value(body).map_err(|err| AdapterError::invalid_request(err.to_string()))
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: MessageRole,
    content: &'a str,
}
