//! Chat completion contexts: the message window handed to a model client.

use std::fmt;
use std::num::NonZeroUsize;

use component_config::{
    BoxError, Capability, CapabilitySet, Component, ComponentLoader, ConfigSchema, DumpComponent,
    FieldSchema, component_type,
};
use serde::{Deserialize, Serialize};

use crate::traits::PromptMessage;

/// Message history a model sees on each turn.
pub trait ChatContext: DumpComponent + Send + Sync {
    /// Appends a message to the history.
    fn add_message(&mut self, message: PromptMessage);

    /// Messages to send with the next request.
    fn messages(&self) -> Vec<PromptMessage>;

    /// Drops accumulated history, keeping configured seed messages.
    fn clear(&mut self);
}

/// Capability marker for [`ChatContext`].
pub struct ChatContextCapability;

impl Capability for ChatContextCapability {
    type Object = dyn ChatContext;
    const NAME: &'static str = "chat_completion_context";
}

/// Declarative config of [`BufferedChatContext`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BufferedContextConfig {
    /// Number of most recent messages kept in view.
    pub buffer_size: usize,
    /// Messages seeded into the history on construction.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub initial_messages: Vec<PromptMessage>,
}

/// Context exposing only the last `buffer_size` messages.
pub struct BufferedChatContext {
    buffer_size: NonZeroUsize,
    initial_messages: Vec<PromptMessage>,
    history: Vec<PromptMessage>,
}

impl fmt::Debug for BufferedChatContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedChatContext")
            .field("buffer_size", &self.buffer_size)
            .field("history", &self.history.len())
            .finish()
    }
}

impl BufferedChatContext {
    /// Creates an empty context keeping `buffer_size` messages.
    #[must_use]
    pub fn new(buffer_size: NonZeroUsize) -> Self {
        Self::with_initial_messages(buffer_size, Vec::new())
    }

    /// Creates a context seeded with `initial_messages`.
    #[must_use]
    pub fn with_initial_messages(
        buffer_size: NonZeroUsize,
        initial_messages: Vec<PromptMessage>,
    ) -> Self {
        Self {
            buffer_size,
            history: initial_messages.clone(),
            initial_messages,
        }
    }

    /// Configured window size.
    #[must_use]
    pub const fn buffer_size(&self) -> NonZeroUsize {
        self.buffer_size
    }
}

impl Component for BufferedChatContext {
    const PROVIDER: &'static str = "buffered_chat_completion_context";
    const COMPONENT_TYPE: &'static str = component_type::CHAT_COMPLETION_CONTEXT;
    const DESCRIPTION: Option<&'static str> =
        Some("Keeps the most recent messages of a conversation in view");
    type Config = BufferedContextConfig;

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .title("Buffered chat completion context")
            .field(FieldSchema::integer("buffer_size").required())
            .field(PromptMessage::schema_field("initial_messages"))
    }

    // Accumulated history is runtime state and is not part of the config.
    fn to_config(&self) -> Result<BufferedContextConfig, BoxError> {
        Ok(BufferedContextConfig {
            buffer_size: self.buffer_size.get(),
            initial_messages: self.initial_messages.clone(),
        })
    }

    fn from_config(
        config: BufferedContextConfig,
        _: &ComponentLoader<'_>,
    ) -> Result<Self, BoxError> {
        let buffer_size =
            NonZeroUsize::new(config.buffer_size).ok_or("buffer_size must be greater than zero")?;
        Ok(Self::with_initial_messages(buffer_size, config.initial_messages))
    }

    fn capabilities(set: &mut CapabilitySet<Self>) {
        set.provide::<ChatContextCapability>(|context| context as Box<dyn ChatContext>);
    }
}

impl ChatContext for BufferedChatContext {
    fn add_message(&mut self, message: PromptMessage) {
        self.history.push(message);
    }

    fn messages(&self) -> Vec<PromptMessage> {
        let skip = self.history.len().saturating_sub(self.buffer_size.get());
        self.history[skip..].to_vec()
    }

    fn clear(&mut self) {
        self.history.clone_from(&self.initial_messages);
    }
}
