//! Assistant agent composed from a model client and an optional context.

use std::fmt;

use component_config::{
    BoxError, Capability, CapabilitySet, Component, ComponentLoader, ComponentModel, ConfigSchema,
    DumpComponent, FieldSchema, component_type,
};
use http::Request;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::{ChatContext, ChatContextCapability};
use crate::traits::{
    AdapterError, AdapterResult, ChatRequest, ModelClient, ModelClientCapability, PromptMessage,
};

const DEFAULT_DESCRIPTION: &str = "An agent that provides assistance with ability to use tools.";
const DEFAULT_SYSTEM_MESSAGE: &str =
    "You are a helpful AI assistant. Solve tasks using your tools. Reply with TERMINATE when the task has been completed.";

/// A conversational participant.
pub trait Agent: DumpComponent + Send + Sync {
    /// Unique name within a team.
    fn name(&self) -> &str;

    /// What the agent does, for other participants.
    fn description(&self) -> &str;

    /// Records `user_message` and builds the model request for the next turn.
    ///
    /// # Errors
    ///
    /// Propagates model client failures.
    fn prepare_turn(&mut self, user_message: &str) -> AdapterResult<Request<Vec<u8>>>;
}

/// Capability marker for [`Agent`].
pub struct AgentCapability;

impl Capability for AgentCapability {
    type Object = dyn Agent;
    const NAME: &'static str = "agent";
}

/// Declarative config of [`AssistantAgent`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssistantAgentConfig {
    /// Agent name; must be an identifier.
    pub name: String,
    /// Nested model client envelope.
    pub model_client: ComponentModel,
    /// Nested chat context envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_context: Option<ComponentModel>,
    /// System message; `None` uses the stock prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    /// Description shown to other agents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Agent that forwards each turn to its model client.
pub struct AssistantAgent {
    name: String,
    model_client: Box<dyn ModelClient>,
    model_context: Option<Box<dyn ChatContext>>,
    system_message: Option<String>,
    description: Option<String>,
}

impl fmt::Debug for AssistantAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistantAgent")
            .field("name", &self.name)
            .field("model", &self.model_client.info().model())
            .field("has_context", &self.model_context.is_some())
            .finish_non_exhaustive()
    }
}

impl AssistantAgent {
    /// Creates an agent around `model_client`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] when `name` is not an identifier.
    pub fn new(name: impl Into<String>, model_client: Box<dyn ModelClient>) -> AdapterResult<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            model_client,
            model_context: None,
            system_message: None,
            description: None,
        })
    }

    /// Attaches a chat context.
    #[must_use]
    pub fn with_context(mut self, context: Box<dyn ChatContext>) -> Self {
        self.model_context = Some(context);
        self
    }

    /// Overrides the system message.
    #[must_use]
    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = Some(message.into());
        self
    }

    /// Effective system message.
    #[must_use]
    pub fn system_message(&self) -> &str {
        self.system_message.as_deref().unwrap_or(DEFAULT_SYSTEM_MESSAGE)
    }

    /// The model client used for each turn.
    #[must_use]
    pub fn model_client(&self) -> &dyn ModelClient {
        &*self.model_client
    }
}

fn validate_name(name: &str) -> AdapterResult<()> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AdapterError::configuration(format!(
            "agent name `{name}` must be an identifier"
        )))
    }
}

impl Component for AssistantAgent {
    const PROVIDER: &'static str = "assistant_agent";
    const COMPONENT_TYPE: &'static str = component_type::AGENT;
    const DESCRIPTION: Option<&'static str> = Some("Agent that answers through a model client");
    type Config = AssistantAgentConfig;

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .title("Assistant agent")
            .field(FieldSchema::string("name").required())
            .field(FieldSchema::component("model_client").required())
            .field(FieldSchema::component("model_context"))
            .field(FieldSchema::string("system_message"))
            .field(FieldSchema::string("description"))
    }

    fn to_config(&self) -> Result<AssistantAgentConfig, BoxError> {
        Ok(AssistantAgentConfig {
            name: self.name.clone(),
            model_client: self.model_client.dump_component()?,
            model_context: self
                .model_context
                .as_ref()
                .map(|context| context.dump_component())
                .transpose()?,
            system_message: self.system_message.clone(),
            description: self.description.clone(),
        })
    }

    fn from_config(
        config: AssistantAgentConfig,
        loader: &ComponentLoader<'_>,
    ) -> Result<Self, BoxError> {
        validate_name(&config.name)?;
        let model_client = loader.load_as::<ModelClientCapability>(&config.model_client)?;
        let model_context = config
            .model_context
            .as_ref()
            .map(|context| loader.load_as::<ChatContextCapability>(context))
            .transpose()?;

        Ok(Self {
            name: config.name,
            model_client,
            model_context,
            system_message: config.system_message,
            description: config.description,
        })
    }

    fn capabilities(set: &mut CapabilitySet<Self>) {
        set.provide::<AgentCapability>(|agent| agent as Box<dyn Agent>);
    }
}

impl Agent for AssistantAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        self.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION)
    }

    fn prepare_turn(&mut self, user_message: &str) -> AdapterResult<Request<Vec<u8>>> {
        let message = PromptMessage::user(user_message);
        let messages = match self.model_context.as_mut() {
            Some(context) => {
                context.add_message(message);
                context.messages()
            }
            None => vec![message],
        };

        debug!(agent = %self.name, messages = messages.len(), "preparing turn");
        let request = ChatRequest::new(messages)?.with_system_prompt(self.system_message());
        self.model_client.http_request(&request)
    }
}
