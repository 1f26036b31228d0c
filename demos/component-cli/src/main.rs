//! Command-line demo: load component envelopes from disk, re-dump them and
//! inspect provider schemas.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use component_adapters::agent::AgentCapability;
use component_adapters::context::ChatContextCapability;
use component_adapters::register_all;
use component_adapters::traits::ModelClientCapability;
use component_config::{
    ComponentLoader, ComponentModel, ComponentRegistry, DumpComponent, LoaderOptions,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "component-cli",
    about = "Load, re-dump and inspect declarative component configs"
)]
struct Cli {
    /// Reject config fields the schema does not declare.
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load an envelope and print its canonical re-dump.
    Load {
        /// JSON file holding the envelope.
        path: PathBuf,
        /// Require the component to provide this capability.
        #[arg(long = "as", value_enum)]
        capability: Option<CapabilityArg>,
    },
    /// Print the JSON Schema of a provider's config.
    Schema {
        /// Provider id or alias.
        provider: String,
    },
    /// List registered providers.
    Providers,
}

#[derive(Clone, Copy, ValueEnum)]
enum CapabilityArg {
    ModelClient,
    ChatContext,
    Agent,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let registry = ComponentRegistry::new();
    register_all(&registry)?;

    let options = if cli.strict {
        LoaderOptions::strict()
    } else {
        LoaderOptions::default()
    };
    let loader = ComponentLoader::new(&registry).with_options(options);

    match cli.command {
        Command::Load { path, capability } => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let mut envelope = load(&loader, &text, capability)?;
            registry.redact(&mut envelope)?;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        Command::Schema { provider } => {
            let entry = registry.resolve(&provider)?;
            info!(
                provider = %entry.provider(),
                version = entry.version(),
                capabilities = ?entry.capabilities(),
                "schema"
            );
            println!("{}", serde_json::to_string_pretty(&entry.schema().to_json_schema())?);
        }
        Command::Providers => {
            for provider in registry.providers() {
                let entry = registry.resolve(provider.as_str())?;
                println!(
                    "{provider}\t{}\tv{}\t{}",
                    entry.component_type(),
                    entry.version(),
                    entry.capabilities().join(",")
                );
            }
        }
    }

    Ok(())
}

fn load(
    loader: &ComponentLoader<'_>,
    text: &str,
    capability: Option<CapabilityArg>,
) -> Result<ComponentModel> {
    let loaded = loader.load_str(text)?;
    info!(provider = %loaded.provider(), "component loaded");

    let envelope = match capability {
        None => loaded.dump()?,
        Some(CapabilityArg::ModelClient) => {
            let client = loaded.into_capability::<ModelClientCapability>()?;
            info!(
                vendor = client.info().vendor(),
                model = client.info().model(),
                endpoint = %client.endpoint(),
                "model client ready"
            );
            client.dump_component()?
        }
        Some(CapabilityArg::ChatContext) => {
            let context = loaded.into_capability::<ChatContextCapability>()?;
            info!(messages = context.messages().len(), "chat context ready");
            context.dump_component()?
        }
        Some(CapabilityArg::Agent) => {
            let agent = loaded.into_capability::<AgentCapability>()?;
            info!(name = agent.name(), description = agent.description(), "agent ready");
            agent.dump_component()?
        }
    };
    Ok(envelope)
}
