//! Test components shared by the integration suites.

#![allow(dead_code)]

use component_config::{
    BoxError, Capability, CapabilitySet, Component, ComponentLoader, ComponentModel, ConfigSchema,
    DumpComponent, FieldKind, FieldSchema, Migration, ValidatedConfig, component_type,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub trait Speaker: DumpComponent + Send + Sync {
    fn speak(&self) -> String;
}

pub struct SpeakerCapability;

impl Capability for SpeakerCapability {
    type Object = dyn Speaker;
    const NAME: &'static str = "speaker";
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EchoConfig {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
}

#[derive(Debug, PartialEq)]
pub struct Echo {
    pub config: EchoConfig,
}

impl Component for Echo {
    const PROVIDER: &'static str = "echo";
    const COMPONENT_TYPE: &'static str = component_type::MODEL_CLIENT;
    const DESCRIPTION: Option<&'static str> = Some("Repeats its model name");
    type Config = EchoConfig;

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .field(FieldSchema::string("model").required())
            .field(FieldSchema::string("api_key").secret())
            .field(FieldSchema::number("temperature"))
            .field(FieldSchema::array("stop", FieldKind::String))
    }

    fn to_config(&self) -> Result<EchoConfig, BoxError> {
        Ok(self.config.clone())
    }

    fn from_config(config: EchoConfig, _: &ComponentLoader<'_>) -> Result<Self, BoxError> {
        if let Some(temperature) = config.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(format!("temperature {temperature} outside 0.0..=2.0").into());
            }
        }
        Ok(Self { config })
    }

    fn capabilities(set: &mut CapabilitySet<Self>) {
        set.provide::<SpeakerCapability>(|echo| echo as Box<dyn Speaker>);
    }
}

impl Speaker for Echo {
    fn speak(&self) -> String {
        self.config.model.clone()
    }
}

#[derive(Serialize, Deserialize)]
pub struct CounterConfig {
    pub start: i64,
}

/// Component that provides no capabilities.
pub struct Counter {
    pub value: i64,
}

impl Component for Counter {
    const PROVIDER: &'static str = "counter";
    const COMPONENT_TYPE: &'static str = "tool";
    type Config = CounterConfig;

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new().field(FieldSchema::integer("start").with_default(Value::from(0)))
    }

    fn to_config(&self) -> Result<CounterConfig, BoxError> {
        Ok(CounterConfig { start: self.value })
    }

    fn from_config(config: CounterConfig, _: &ComponentLoader<'_>) -> Result<Self, BoxError> {
        Ok(Self {
            value: config.start,
        })
    }
}

#[derive(Serialize, Deserialize)]
pub struct DuetConfig {
    pub lead: ComponentModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backing: Option<ComponentModel>,
}

/// Component holding other components behind a capability.
pub struct Duet {
    pub lead: Box<dyn Speaker>,
    pub backing: Option<Box<dyn Speaker>>,
}

impl Component for Duet {
    const PROVIDER: &'static str = "duet";
    const COMPONENT_TYPE: &'static str = component_type::AGENT;
    type Config = DuetConfig;

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .field(FieldSchema::component("lead").required())
            .field(FieldSchema::component("backing"))
    }

    fn to_config(&self) -> Result<DuetConfig, BoxError> {
        Ok(DuetConfig {
            lead: self.lead.dump_component()?,
            backing: self
                .backing
                .as_ref()
                .map(|speaker| speaker.dump_component())
                .transpose()?,
        })
    }

    fn from_config(config: DuetConfig, loader: &ComponentLoader<'_>) -> Result<Self, BoxError> {
        Ok(Self {
            lead: loader.load_as::<SpeakerCapability>(&config.lead)?,
            backing: config
                .backing
                .as_ref()
                .map(|backing| loader.load_as::<SpeakerCapability>(backing))
                .transpose()?,
        })
    }

    fn capabilities(set: &mut CapabilitySet<Self>) {
        set.provide::<SpeakerCapability>(|duet| duet as Box<dyn Speaker>);
    }
}

impl Speaker for Duet {
    fn speak(&self) -> String {
        match &self.backing {
            Some(backing) => format!("{} & {}", self.lead.speak(), backing.speak()),
            None => self.lead.speak(),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct EndpointConfig {
    pub base_url: String,
    pub retries: u32,
}

/// Version 3 component: v1 named the URL `host`, v2 had no `retries`.
pub struct Endpoint {
    pub config: EndpointConfig,
}

impl Component for Endpoint {
    const PROVIDER: &'static str = "endpoint";
    const COMPONENT_TYPE: &'static str = "tool";
    const VERSION: u32 = 3;
    type Config = EndpointConfig;

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new()
            .field(FieldSchema::string("base_url").required())
            .field(FieldSchema::integer("retries").required())
    }

    fn to_config(&self) -> Result<EndpointConfig, BoxError> {
        Ok(EndpointConfig {
            base_url: self.config.base_url.clone(),
            retries: self.config.retries,
        })
    }

    fn from_config(config: EndpointConfig, _: &ComponentLoader<'_>) -> Result<Self, BoxError> {
        Ok(Self { config })
    }

    fn migrations() -> Vec<Migration> {
        vec![
            Migration::new(
                1,
                ConfigSchema::new().field(FieldSchema::string("host").required()),
                rename_host,
            ),
            Migration::new(
                2,
                ConfigSchema::new().field(FieldSchema::string("base_url").required()),
                add_retries,
            ),
        ]
    }
}

fn rename_host(config: ValidatedConfig) -> Result<Map<String, Value>, BoxError> {
    let mut map = config.into_map();
    let host = map.remove("host").ok_or("host missing")?;
    map.insert("base_url".into(), host);
    Ok(map)
}

fn add_retries(config: ValidatedConfig) -> Result<Map<String, Value>, BoxError> {
    let mut map = config.into_map();
    map.insert("retries".into(), Value::from(3));
    Ok(map)
}

#[derive(Serialize, Deserialize)]
pub struct RelayConfig {
    pub target: ComponentModel,
}

/// Keeps its nested envelope as loaded instead of building it.
pub struct Relay {
    pub target: ComponentModel,
}

impl Component for Relay {
    const PROVIDER: &'static str = "relay";
    const COMPONENT_TYPE: &'static str = "tool";
    type Config = RelayConfig;

    fn config_schema() -> ConfigSchema {
        ConfigSchema::new().field(FieldSchema::component("target").required())
    }

    fn to_config(&self) -> Result<RelayConfig, BoxError> {
        Ok(RelayConfig {
            target: self.target.clone(),
        })
    }

    fn from_config(config: RelayConfig, _: &ComponentLoader<'_>) -> Result<Self, BoxError> {
        Ok(Self {
            target: config.target,
        })
    }
}
