//! Ollama chat client for locally hosted models.

use std::fmt;

use component_config::{
    BoxError, CapabilitySet, Component, ComponentLoader, ConfigSchema, FieldSchema, Migration,
    ValidatedConfig, component_type,
};
use http::{HeaderMap, Uri};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::traits::{
    AdapterError, AdapterResult, ChatRequest, MessageRole, ModelClient, ModelClientCapability,
    ModelInfo, check_temperature, endpoint_uri, sanitize_base_url,
};

/// Default address of a local Ollama daemon.
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434/";

fn default_base_url() -> String {
    DEFAULT_OLLAMA_URL.to_owned()
}

/// Declarative config of [`OllamaModelClient`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OllamaClientConfig {
    /// Model tag, e.g. `llama3.1`.
    pub model: String,
    /// Daemon address.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Default sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// How long the daemon keeps the model loaded, e.g. `5m`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
}

impl OllamaClientConfig {
    /// Creates a config for `model` against the local daemon.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            base_url: default_base_url(),
            temperature: None,
            keep_alive: None,
        }
    }

    /// Overrides the daemon address.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Model client targeting `/api/chat`.
pub struct OllamaModelClient {
    info: ModelInfo,
    config: OllamaClientConfig,
    endpoint: Uri,
}

impl fmt::Debug for OllamaModelClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaModelClient")
            .field("model", &self.info.model())
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OllamaModelClient {
    /// Constructs a client.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] for an empty model, a malformed
    /// base URL or an out-of-range temperature.
    pub fn new(mut config: OllamaClientConfig) -> AdapterResult<Self> {
        if config.model.trim().is_empty() {
            return Err(AdapterError::configuration("Ollama model must not be empty"));
        }
        check_temperature(config.temperature)?;

        config.base_url = sanitize_base_url("Ollama", &config.base_url)?;
        let endpoint = endpoint_uri("Ollama", &config.base_url, "api/chat")?;

        debug!(model = %config.model, %endpoint, "ollama client configured");
        Ok(Self {
            info: ModelInfo::new("ollama", config.model.clone()),
            config,
            endpoint,
        })
    }
}

impl Component for OllamaModelClient {
    const PROVIDER: &'static str = "ollama_model_client";
    const COMPONENT_TYPE: &'static str = component_type::MODEL_CLIENT;
    const VERSION: u32 = 2;
    const DESCRIPTION: Option<&'static str> = Some("Chat client for models served by Ollama");
    type Config = OllamaClientConfig;

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .title("Ollama model client")
            .field(FieldSchema::string("model").required())
            .field(FieldSchema::string("base_url").with_default(Value::from(DEFAULT_OLLAMA_URL)))
            .field(FieldSchema::number("temperature"))
            .field(FieldSchema::string("keep_alive"))
    }

    fn to_config(&self) -> Result<OllamaClientConfig, BoxError> {
        Ok(self.config.clone())
    }

    fn from_config(config: OllamaClientConfig, _: &ComponentLoader<'_>) -> Result<Self, BoxError> {
        Ok(Self::new(config)?)
    }

    fn migrations() -> Vec<Migration> {
        vec![Migration::new(
            1,
            ConfigSchema::new()
                .field(FieldSchema::string("model").required())
                .field(FieldSchema::string("host"))
                .field(FieldSchema::number("temperature"))
                .field(FieldSchema::string("keep_alive")),
            rename_host,
        )]
    }

    fn capabilities(set: &mut CapabilitySet<Self>) {
        set.provide::<ModelClientCapability>(|client| client as Box<dyn ModelClient>);
    }
}

/// Version 1 called the daemon address `host`.
fn rename_host(config: ValidatedConfig) -> Result<Map<String, Value>, BoxError> {
    let mut map = config.into_map();
    if let Some(host) = map.remove("host") {
        map.insert("base_url".to_owned(), host);
    }
    Ok(map)
}

impl ModelClient for OllamaModelClient {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    fn request_headers(&self) -> AdapterResult<HeaderMap> {
        Ok(HeaderMap::new())
    }

    fn chat_payload(&self, request: &ChatRequest) -> AdapterResult<Value> {
        let mut messages = Vec::with_capacity(request.messages().len() + 1);
        if let Some(system) = request.system_prompt() {
            messages.push(OllamaMessage {
                role: MessageRole::System,
                content: system,
            });
        }
        messages.extend(request.messages().iter().map(|message| OllamaMessage {
            role: message.role(),
            content: message.content(),
        }));

        let temperature = request.temperature().or(self.config.temperature);
        let num_predict = request.max_output_tokens();
        let options = (temperature.is_some() || num_predict.is_some()).then_some(OllamaOptions {
            temperature,
            num_predict,
        });

        let body = OllamaChatRequest {
            model: &self.config.model,
            messages,
            stream: false,
            options,
            keep_alive: self.config.keep_alive.as_deref(),
        };
        serde_json::to_value(body).map_err(|err| AdapterError::invalid_request(err.to_string()))
    }
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<&'a str>,
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: MessageRole,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::traits::PromptMessage;

    #[test]
    fn local_endpoint_by_default() {
        let client = OllamaModelClient::new(OllamaClientConfig::new("llama3.1")).unwrap();
        assert_eq!(client.endpoint().to_string(), "http://127.0.0.1:11434/api/chat");
        assert!(client.request_headers().unwrap().is_empty());
    }

    #[test]
    fn payload_includes_options_only_when_set() {
        let client = OllamaModelClient::new(OllamaClientConfig::new("llama3.1")).unwrap();
        let request = ChatRequest::new(vec![PromptMessage::user("hey")]).unwrap();
        assert_eq!(
            client.chat_payload(&request).unwrap(),
            json!({
                "model": "llama3.1",
                "messages": [{ "role": "user", "content": "hey" }],
                "stream": false
            })
        );

        let payload = client
            .chat_payload(&request.with_temperature(0.5).with_max_output_tokens(32))
            .unwrap();
        assert_eq!(payload["options"], json!({ "temperature": 0.5, "num_predict": 32 }));
    }

    #[test]
    fn host_is_renamed_by_migration() {
        let validated = OllamaModelClient::migrations()[0]
            .schema()
            .validate(&json!({ "model": "m", "host": "http://gpu-box:11434" }))
            .unwrap();
        let upgraded = rename_host(validated).unwrap();
        assert_eq!(upgraded["base_url"], "http://gpu-box:11434");
        assert!(!upgraded.contains_key("host"));
    }
}
