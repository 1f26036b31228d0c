//! Declarative model clients, chat contexts and agents.
//!
//! Each module exposes a component for a specific vendor or role while
//! sharing the capability traits defined in [`traits`], [`context`] and
//! [`agent`]. Every component and alias here registers itself with the
//! process-wide registry on link; [`register_all`] populates an isolated one.

#![warn(missing_docs, clippy::pedantic)]

pub mod agent;
pub mod anthropic;
pub mod context;
pub mod ollama;
pub mod openai;
pub mod traits;

use component_config::{ComponentRegistry, ComponentResult, register_alias, register_component};

use crate::agent::AssistantAgent;
use crate::anthropic::AnthropicModelClient;
use crate::context::BufferedChatContext;
use crate::ollama::OllamaModelClient;
use crate::openai::OpenAiModelClient;

register_component!(
    OpenAiModelClient,
    AnthropicModelClient,
    OllamaModelClient,
    BufferedChatContext,
    AssistantAgent
);

// Expands to `ALIASES` plus a static submission per alias, so the
// process-wide registry and `register_all` accept the same names.
macro_rules! aliases {
    ($($alias:literal => $provider:literal),+ $(,)?) => {
        /// Alternate provider names accepted for the bundled components.
        pub const ALIASES: &[(&str, &str)] = &[$(($alias, $provider)),+];

        register_alias!($($alias => $provider),+);
    };
}

aliases! {
    "OpenAIChatCompletionClient" => "openai_model_client",
    "AnthropicChatCompletionClient" => "anthropic_model_client",
    "OllamaChatCompletionClient" => "ollama_model_client",
    "BufferedChatCompletionContext" => "buffered_chat_completion_context",
    "AssistantAgent" => "assistant_agent",
}

/// Registers every bundled component and its [`ALIASES`] into `registry`.
///
/// # Errors
///
/// Returns [`component_config::ComponentError::DuplicateProvider`] when a
/// different definition already owns one of the ids.
pub fn register_all(registry: &ComponentRegistry) -> ComponentResult<()> {
    registry.register::<OpenAiModelClient>()?;
    registry.register::<AnthropicModelClient>()?;
    registry.register::<OllamaModelClient>()?;
    registry.register::<BufferedChatContext>()?;
    registry.register::<AssistantAgent>()?;
    for (alias, provider) in ALIASES {
        registry.register_alias(alias, provider)?;
    }
    Ok(())
}
