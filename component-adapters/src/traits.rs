//! Shared model client traits and data structures.

use std::fmt;

use component_config::{Capability, DumpComponent, FieldSchema};
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{HeaderMap, Request, Uri};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Result alias used by model clients.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Error type shared by client implementations.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Client is misconfigured or missing credentials.
    #[error("adapter not configured: {reason}")]
    Configuration {
        /// Additional context for the failure.
        reason: String,
    },

    /// The supplied request was invalid for the target model.
    #[error("invalid chat request: {reason}")]
    InvalidRequest {
        /// Reason describing why the request could not be processed.
        reason: String,
    },
}

impl AdapterError {
    /// Convenience constructor for invalid requests.
    #[must_use]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for configuration issues.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}

/// Minimal metadata describing a model client instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelInfo {
    vendor: &'static str,
    model: String,
}

impl ModelInfo {
    /// Creates metadata for the supplied vendor and model identifier.
    #[must_use]
    pub fn new(vendor: &'static str, model: impl Into<String>) -> Self {
        Self {
            vendor,
            model: model.into(),
        }
    }

    /// Returns the vendor label (e.g., "openai").
    #[must_use]
    pub const fn vendor(&self) -> &'static str {
        self.vendor
    }

    /// Returns the configured model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Roles supported in chat-style prompts.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System messages steer the assistant behaviour.
    System,
    /// User-authored content.
    User,
    /// Assistant (model) responses.
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        })
    }
}

/// Represents an instruction or message in a chat-style prompt.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PromptMessage {
    role: MessageRole,
    content: String,
}

impl PromptMessage {
    /// Creates a new prompt message.
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Shorthand for a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Returns the message role.
    #[must_use]
    pub const fn role(&self) -> MessageRole {
        self.role
    }

    /// Returns the message content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Config schema of a serialized message.
    pub(crate) fn schema_field(name: &str) -> FieldSchema {
        use component_config::{ConfigSchema, FieldKind};

        let message = ConfigSchema::new()
            .field(FieldSchema::string("role").required())
            .field(FieldSchema::string("content").required());
        FieldSchema::array(name, FieldKind::Object(message))
    }
}

/// Chat request handed to a [`ModelClient`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ChatRequest {
    /// Optional system prompt. Clients move it to wherever their vendor
    /// expects it: a leading system message for OpenAI and Ollama, the
    /// top-level `system` field for Anthropic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    system_prompt: Option<String>,
    messages: Vec<PromptMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

impl ChatRequest {
    /// Creates a request with the supplied messages.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidRequest`] if the message list is empty.
    pub fn new(messages: Vec<PromptMessage>) -> AdapterResult<Self> {
        if messages.is_empty() {
            return Err(AdapterError::invalid_request(
                "chat request requires at least one message",
            ));
        }

        Ok(Self {
            system_prompt: None,
            messages,
            max_output_tokens: None,
            temperature: None,
        })
    }

    /// Sets the system prompt that guides model behavior.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the maximum output token budget.
    #[must_use]
    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Returns the system prompt if configured.
    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Returns the prompt messages.
    #[must_use]
    pub fn messages(&self) -> &[PromptMessage] {
        &self.messages
    }

    /// Returns the configured maximum output tokens.
    #[must_use]
    pub const fn max_output_tokens(&self) -> Option<u32> {
        self.max_output_tokens
    }

    /// Returns the configured sampling temperature.
    #[must_use]
    pub const fn temperature(&self) -> Option<f64> {
        self.temperature
    }
}

/// Trait implemented by all model clients.
///
/// Clients are pure: they describe the HTTP exchange for a chat completion
/// and leave sending it to the caller.
pub trait ModelClient: DumpComponent + Send + Sync {
    /// Returns basic metadata describing the client instance.
    fn info(&self) -> &ModelInfo;

    /// Chat completion endpoint.
    fn endpoint(&self) -> &Uri;

    /// Vendor-specific headers, credentials included.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] when required credentials are absent.
    fn request_headers(&self) -> AdapterResult<HeaderMap>;

    /// Vendor-specific JSON body for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidRequest`] when the request cannot be
    /// expressed for this vendor.
    fn chat_payload(&self, request: &ChatRequest) -> AdapterResult<Value>;

    /// Assembles the full `POST` request for `request`.
    ///
    /// # Errors
    ///
    /// Propagates failures of [`ModelClient::request_headers`] and
    /// [`ModelClient::chat_payload`].
    fn http_request(&self, request: &ChatRequest) -> AdapterResult<Request<Vec<u8>>> {
        let body = serde_json::to_vec(&self.chat_payload(request)?)
            .map_err(|err| AdapterError::invalid_request(err.to_string()))?;
        let mut http_request = Request::post(self.endpoint().clone())
            .body(body)
            .map_err(|err| AdapterError::invalid_request(err.to_string()))?;

        let headers = http_request.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.extend(self.request_headers()?);
        Ok(http_request)
    }
}

/// Capability marker for [`ModelClient`].
pub struct ModelClientCapability;

impl Capability for ModelClientCapability {
    type Object = dyn ModelClient;
    const NAME: &'static str = "model_client";
}

/// Normalizes a configured base URL to carry a scheme and a trailing slash.
pub(crate) fn sanitize_base_url(vendor: &str, input: &str) -> AdapterResult<String> {
    let mut base = input.trim().to_owned();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(AdapterError::configuration(format!(
            "{vendor} base URL must start with http:// or https://"
        )));
    }
    if !base.ends_with('/') {
        base.push('/');
    }
    base.parse::<Uri>()
        .map_err(|err| AdapterError::configuration(format!("invalid {vendor} base URL: {err}")))?;
    Ok(base)
}

/// Joins a sanitized base URL with a relative endpoint path.
pub(crate) fn endpoint_uri(vendor: &str, base: &str, path: &str) -> AdapterResult<Uri> {
    format!("{base}{path}")
        .parse::<Uri>()
        .map_err(|err| AdapterError::configuration(format!("invalid {vendor} endpoint: {err}")))
}

/// Header value marked sensitive so it stays out of debug output.
pub(crate) fn secret_header(vendor: &str, value: &str) -> AdapterResult<HeaderValue> {
    let mut header = HeaderValue::from_str(value)
        .map_err(|_| AdapterError::configuration(format!("{vendor} API key is not a valid header")))?;
    header.set_sensitive(true);
    Ok(header)
}

/// Checks a sampling temperature against the range every vendor accepts.
pub(crate) fn check_temperature(temperature: Option<f64>) -> AdapterResult<()> {
    match temperature {
        Some(value) if !(0.0..=2.0).contains(&value) => Err(AdapterError::configuration(format!(
            "temperature {value} outside 0.0..=2.0"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_request_messages() {
        let err = ChatRequest::new(Vec::new()).expect_err("messages required");
        assert!(matches!(err, AdapterError::InvalidRequest { .. }));
    }

    #[test]
    fn builds_request() {
        let request = ChatRequest::new(vec![PromptMessage::user("ping")])
            .unwrap()
            .with_system_prompt("be brief")
            .with_max_output_tokens(256)
            .with_temperature(0.7);

        assert_eq!(request.messages().len(), 1);
        assert_eq!(request.system_prompt(), Some("be brief"));
        assert_eq!(request.max_output_tokens(), Some(256));
        assert_eq!(request.temperature(), Some(0.7));
    }

    #[test]
    fn base_url_requires_scheme() {
        let err = sanitize_base_url("OpenAI", "api.openai.com").expect_err("missing scheme");
        assert!(matches!(err, AdapterError::Configuration { .. }));
    }

    #[test]
    fn sanitize_appends_trailing_slash() {
        assert_eq!(
            sanitize_base_url("Ollama", " http://localhost:11434 ").unwrap(),
            "http://localhost:11434/"
        );
    }

    #[test]
    fn temperature_range() {
        assert!(check_temperature(None).is_ok());
        assert!(check_temperature(Some(1.2)).is_ok());
        assert!(check_temperature(Some(-0.1)).is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        let message = PromptMessage::new(MessageRole::Assistant, "hi");
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            serde_json::json!({ "role": "assistant", "content": "hi" })
        );
    }
}
