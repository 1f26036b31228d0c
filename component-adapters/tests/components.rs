use component_adapters::agent::{Agent, AgentCapability, AssistantAgent};
use component_adapters::context::{BufferedChatContext, ChatContext, ChatContextCapability};
use component_adapters::ollama::OllamaModelClient;
use component_adapters::openai::OpenAiModelClient;
use component_adapters::traits::{ChatRequest, ModelClient, ModelClientCapability, PromptMessage};
use component_adapters::{ALIASES, register_all};
use component_config::{
    Component, ComponentError, ComponentLoader, ComponentRegistry, DumpComponent, SchemaErrorKind,
};
use http::header::AUTHORIZATION;
use serde_json::{Value, json};

fn registry() -> ComponentRegistry {
    let registry = ComponentRegistry::new();
    register_all(&registry).unwrap();
    registry
}

fn dumped(loader: &ComponentLoader<'_>, raw: &Value) -> Value {
    let envelope = loader.load_value(raw).unwrap().dump().unwrap();
    serde_json::to_value(envelope).unwrap()
}

#[test]
fn openai_client_round_trips_minimal_config() {
    let registry = registry();
    let loader = ComponentLoader::new(&registry);

    let value = dumped(
        &loader,
        &json!({ "provider": "openai_model_client", "config": { "model": "gpt-4o" } }),
    );
    assert_eq!(value["provider"], "openai_model_client");
    assert_eq!(value["component_type"], "model_client");
    assert_eq!(value["version"], 1);
    assert_eq!(value["config"], json!({ "model": "gpt-4o" }));
}

#[test]
fn api_keys_never_leave_the_process() {
    let registry = registry();
    let loader = ComponentLoader::new(&registry);
    let raw = json!({
        "provider": "openai_model_client",
        "config": { "model": "gpt-4o", "api_key": "sk-live", "temperature": 0.7 }
    });

    let client = loader
        .load_value(&raw)
        .unwrap()
        .into_capability::<ModelClientCapability>()
        .unwrap();
    let headers = client.request_headers().unwrap();
    assert_eq!(headers[AUTHORIZATION], "Bearer sk-live");

    let envelope = client.dump_component().unwrap();
    assert_eq!(
        Value::Object(envelope.into_config()),
        json!({ "model": "gpt-4o", "temperature": 0.7 })
    );
}

#[test]
fn anthropic_defaults_are_materialized() {
    let registry = registry();
    let value = dumped(
        &ComponentLoader::new(&registry),
        &json!({ "provider": "anthropic_model_client", "config": { "model": "claude" } }),
    );
    assert_eq!(value["config"], json!({ "model": "claude", "max_tokens": 1024 }));
}

#[test]
fn context_is_not_a_model_client() {
    let registry = registry();
    let loader = ComponentLoader::new(&registry);
    let raw = json!({
        "provider": "buffered_chat_completion_context",
        "config": { "buffer_size": 5 }
    });

    let err = loader
        .load_value(&raw)
        .unwrap()
        .into_capability::<ModelClientCapability>()
        .err()
        .expect("contexts are not model clients");
    assert!(matches!(
        err,
        ComponentError::CapabilityMismatch { ref provider, ref capability }
            if provider == "buffered_chat_completion_context" && capability == "model_client"
    ));

    let context = loader
        .load_value(&raw)
        .unwrap()
        .into_capability::<ChatContextCapability>()
        .unwrap();
    assert!(context.messages().is_empty());
}

#[test]
fn context_rejects_zero_buffer() {
    let registry = registry();
    let loader = ComponentLoader::new(&registry);

    let err = loader
        .load_value(&json!({
            "provider": "buffered_chat_completion_context",
            "config": { "buffer_size": 0 }
        }))
        .expect_err("zero buffer");
    assert!(matches!(err, ComponentError::Construction { .. }));

    let err = loader
        .load_value(&json!({ "provider": "buffered_chat_completion_context", "config": {} }))
        .expect_err("buffer_size required");
    let ComponentError::Schema { source, .. } = err else {
        panic!("expected schema error");
    };
    assert_eq!(source.path(), "buffer_size");
    assert_eq!(source.kind(), &SchemaErrorKind::MissingField);
}

#[test]
fn context_message_paths_are_indexed() {
    let registry = registry();
    let err = ComponentLoader::new(&registry)
        .load_value(&json!({
            "provider": "buffered_chat_completion_context",
            "config": {
                "buffer_size": 2,
                "initial_messages": [{ "role": "user", "content": "ok" }, { "role": "user" }]
            }
        }))
        .expect_err("second message lacks content");
    assert!(matches!(
        err,
        ComponentError::Schema { ref source, .. } if source.path() == "initial_messages[1].content"
    ));
}

#[test]
fn ollama_v1_configs_are_migrated() {
    let registry = registry();
    let loader = ComponentLoader::new(&registry);
    let raw = json!({
        "provider": "ollama_model_client",
        "version": 1,
        "config": { "model": "llama3.1", "host": "http://gpu-box:11434" }
    });

    let client = loader.load_value(&raw).unwrap().downcast::<OllamaModelClient>().unwrap();
    assert_eq!(client.endpoint().to_string(), "http://gpu-box:11434/api/chat");

    let value = serde_json::to_value(client.dump_component().unwrap()).unwrap();
    assert_eq!(value["version"], 2);
    assert_eq!(
        value["config"],
        json!({ "model": "llama3.1", "base_url": "http://gpu-box:11434/" })
    );
}

#[test]
fn ollama_rejects_versions_from_the_future() {
    let registry = registry();
    let err = ComponentLoader::new(&registry)
        .load_value(&json!({ "provider": "ollama_model_client", "version": 3, "config": {} }))
        .expect_err("future version");
    assert!(matches!(
        err,
        ComponentError::VersionMismatch { found: 3, current: 2, .. }
    ));
}

fn agent_envelope() -> Value {
    json!({
        "provider": "assistant_agent",
        "config": {
            "name": "helper",
            "system_message": "Answer briefly.",
            "model_client": {
                "provider": "openai_model_client",
                "config": { "model": "gpt-4o", "api_key": "sk-nested" }
            },
            "model_context": {
                "provider": "buffered_chat_completion_context",
                "config": { "buffer_size": 4 }
            }
        }
    })
}

#[test]
fn agent_round_trips_with_nested_components() {
    let registry = registry();
    let loader = ComponentLoader::new(&registry);

    let first = loader.load_value(&agent_envelope()).unwrap().dump().unwrap();
    let value = serde_json::to_value(&first).unwrap();
    assert_eq!(value["component_type"], "agent");
    assert_eq!(
        value["config"]["model_client"]["config"],
        json!({ "model": "gpt-4o" })
    );
    assert_eq!(value["config"]["model_context"]["config"], json!({ "buffer_size": 4 }));

    let second = loader.load(&first).unwrap().dump().unwrap();
    assert_eq!(first, second);
}

#[test]
fn agent_prepares_requests_through_its_client() {
    let registry = registry();
    let mut agent = ComponentLoader::new(&registry)
        .load_value(&agent_envelope())
        .unwrap()
        .into_capability::<AgentCapability>()
        .unwrap();

    agent.prepare_turn("first").unwrap();
    let request = agent.prepare_turn("second").unwrap();
    let body: Value = serde_json::from_slice(request.body()).unwrap();

    assert_eq!(agent.name(), "helper");
    assert_eq!(request.uri().to_string(), "https://api.openai.com/v1/chat/completions");
    assert_eq!(request.headers()[AUTHORIZATION], "Bearer sk-nested");
    assert_eq!(
        body["messages"],
        json!([
            { "role": "system", "content": "Answer briefly." },
            { "role": "user", "content": "first" },
            { "role": "user", "content": "second" }
        ])
    );
}

#[test]
fn agent_with_wrong_nested_capability_fails_construction() {
    let registry = registry();
    let err = ComponentLoader::new(&registry)
        .load_value(&json!({
            "provider": "assistant_agent",
            "config": {
                "name": "helper",
                "model_client": {
                    "provider": "buffered_chat_completion_context",
                    "config": { "buffer_size": 1 }
                }
            }
        }))
        .expect_err("context cannot act as a client");

    let ComponentError::Construction { provider, source } = err else {
        panic!("expected construction error");
    };
    assert_eq!(provider, "assistant_agent");
    assert!(matches!(
        source.downcast_ref::<ComponentError>(),
        Some(ComponentError::CapabilityMismatch { .. })
    ));
}

#[test]
fn agent_nested_envelope_is_checked_structurally() {
    let registry = registry();
    let err = ComponentLoader::new(&registry)
        .load_value(&json!({
            "provider": "assistant_agent",
            "config": { "name": "helper", "model_client": { "config": {} } }
        }))
        .expect_err("nested provider missing");
    assert!(matches!(
        err,
        ComponentError::Schema { ref source, .. } if source.path().starts_with("model_client")
    ));
}

#[test]
fn aliases_resolve_to_bundled_providers() {
    let registry = registry();
    let loader = ComponentLoader::new(&registry);
    for (alias, provider) in ALIASES {
        assert_eq!(registry.resolve(alias).unwrap().provider().as_str(), *provider);
    }

    let loaded = loader
        .load_value(&json!({
            "provider": "OpenAIChatCompletionClient",
            "config": { "model": "gpt-4o-mini" }
        }))
        .unwrap();
    assert!(loaded.is::<OpenAiModelClient>());
    assert_eq!(loaded.dump().unwrap().provider(), "openai_model_client");
}

#[test]
fn registering_twice_is_harmless() {
    let registry = registry();
    register_all(&registry).unwrap();
    assert_eq!(registry.len(), 5);
}

#[test]
fn global_registry_sees_bundled_components() {
    let global = ComponentRegistry::global();
    for provider in [
        OpenAiModelClient::PROVIDER,
        BufferedChatContext::PROVIDER,
        AssistantAgent::PROVIDER,
        "anthropic_model_client",
        "ollama_model_client",
    ] {
        assert!(global.contains(provider), "{provider}");
    }
    for (alias, provider) in ALIASES {
        let entry = global.resolve(alias).unwrap();
        assert_eq!(entry.provider().as_str(), *provider);
    }

    let client = ComponentLoader::new(global)
        .load_as::<ModelClientCapability>(
            &serde_json::from_value(json!({
                "provider": "OpenAIChatCompletionClient",
                "config": { "model": "gpt-4o", "api_key": "sk-test" }
            }))
            .unwrap(),
        )
        .unwrap();
    assert_eq!(client.info().model(), "gpt-4o");
}

#[test]
fn schemas_mark_secrets_write_only() {
    let schema = OpenAiModelClient::config_schema().to_json_schema();
    assert_eq!(schema["properties"]["api_key"]["writeOnly"], true);
    assert_eq!(schema["required"], json!(["model"]));
}

#[test]
fn chat_request_requires_messages() {
    assert!(ChatRequest::new(Vec::new()).is_err());
    assert!(ChatRequest::new(vec![PromptMessage::user("hi")]).is_ok());
}
