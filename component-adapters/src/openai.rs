//! OpenAI chat completions client.

use std::env;
use std::fmt;
use std::time::Duration;

use component_config::{
    BoxError, CapabilitySet, Component, ComponentLoader, ConfigSchema, FieldSchema, SecretString,
    component_type,
};
use http::header::AUTHORIZATION;
use http::{HeaderMap, Uri};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::traits::{
    AdapterError, AdapterResult, ChatRequest, MessageRole, ModelClient, ModelClientCapability,
    ModelInfo, PromptMessage, check_temperature, endpoint_uri, sanitize_base_url, secret_header,
};

/// Environment variable consulted when no API key is configured.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Declarative config of [`OpenAiModelClient`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenAiClientConfig {
    /// Model name, e.g. `gpt-4o`.
    pub model: String,
    /// API key; never dumped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<SecretString>,
    /// Alternate API root for compatible gateways.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Default sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl OpenAiClientConfig {
    /// Creates a config for `model` with every optional field unset.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(key));
        self
    }

    /// Sets the API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the default sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Model client targeting `/v1/chat/completions`.
pub struct OpenAiModelClient {
    info: ModelInfo,
    config: OpenAiClientConfig,
    endpoint: Uri,
}

impl fmt::Debug for OpenAiModelClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiModelClient")
            .field("model", &self.info.model())
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OpenAiModelClient {
    /// Constructs a client, falling back to [`OPENAI_API_KEY_ENV`] for the key.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] for an empty model, a malformed
    /// base URL or an out-of-range temperature.
    pub fn new(mut config: OpenAiClientConfig) -> AdapterResult<Self> {
        if config.model.trim().is_empty() {
            return Err(AdapterError::configuration("OpenAI model must not be empty"));
        }
        check_temperature(config.temperature)?;

        let base = match &config.base_url {
            Some(raw) => {
                let base = sanitize_base_url("OpenAI", raw)?;
                config.base_url = Some(base.clone());
                base
            }
            None => DEFAULT_BASE_URL.to_owned(),
        };
        let endpoint = endpoint_uri("OpenAI", &base, "v1/chat/completions")?;

        if config.api_key.is_none() {
            config.api_key = env::var(OPENAI_API_KEY_ENV).ok().map(SecretString::new);
        }

        debug!(model = %config.model, %endpoint, "openai client configured");
        Ok(Self {
            info: ModelInfo::new("openai", config.model.clone()),
            config,
            endpoint,
        })
    }

    /// Request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

impl Component for OpenAiModelClient {
    const PROVIDER: &'static str = "openai_model_client";
    const COMPONENT_TYPE: &'static str = component_type::MODEL_CLIENT;
    const DESCRIPTION: Option<&'static str> = Some("Chat completion client for OpenAI-hosted models");
    type Config = OpenAiClientConfig;

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .title("OpenAI model client")
            .field(
                FieldSchema::string("model")
                    .required()
                    .with_description("Model name, e.g. gpt-4o"),
            )
            .field(FieldSchema::string("api_key").secret())
            .field(FieldSchema::string("base_url"))
            .field(FieldSchema::integer("timeout_secs"))
            .field(FieldSchema::number("temperature"))
    }

    fn to_config(&self) -> Result<OpenAiClientConfig, BoxError> {
        Ok(self.config.clone())
    }

    fn from_config(config: OpenAiClientConfig, _: &ComponentLoader<'_>) -> Result<Self, BoxError> {
        Ok(Self::new(config)?)
    }

    fn capabilities(set: &mut CapabilitySet<Self>) {
        set.provide::<ModelClientCapability>(|client| client as Box<dyn ModelClient>);
    }
}

impl ModelClient for OpenAiModelClient {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    fn request_headers(&self) -> AdapterResult<HeaderMap> {
        let key = self.config.api_key.as_ref().ok_or_else(|| {
            AdapterError::configuration(format!("{OPENAI_API_KEY_ENV} is not set"))
        })?;
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            secret_header("OpenAI", &format!("Bearer {}", key.expose()))?,
        );
        Ok(headers)
    }

    fn chat_payload(&self, request: &ChatRequest) -> AdapterResult<Value> {
        let mut messages = Vec::with_capacity(request.messages().len() + 1);
        if let Some(system) = request.system_prompt() {
            messages.push(OpenAiMessage {
                role: MessageRole::System,
                content: system,
            });
        }
        messages.extend(request.messages().iter().map(map_prompt_message));

        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: request.temperature().or(self.config.temperature),
            max_tokens: request.max_output_tokens(),
            stream: false,
        };
        serde_json::to_value(body).map_err(|err| AdapterError::invalid_request(err.to_string()))
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: MessageRole,
    content: &'a str,
}

fn map_prompt_message(message: &PromptMessage) -> OpenAiMessage<'_> {
    OpenAiMessage {
        role: message.role(),
        content: message.content(),
    }
}
