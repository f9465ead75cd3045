//! ConverseBridge CLI
//!
//! Offline tooling: dry-run request conversion, schema sanitizing and
//! capability lookups against the model catalog.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use converse_bridge::{BridgeConfig, ChatAdapter, init_logging};
use converse_bridge_capabilities::{CapabilityResolver, HttpCatalogSource, TtlCache};
use converse_bridge_convert::{ModelProfile, sanitize_schema};
use converse_bridge_core::{
    Error, Result,
    chat::ChatRequest,
    converse::ConverseRequest,
    transport::{ConverseEventStream, ConverseTransport, Credentials},
};
use serde_json::{Value, json};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Parser)]
#[command(name = "converse-bridge")]
#[command(about = "ConverseBridge - Bedrock Converse protocol adapter", long_about = None)]
struct Cli {
    /// Configuration file (YAML or TOML)
    #[arg(long, short, global = true, env = "CONVERSE_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a chat request (JSON) into the Converse request that would be sent
    Convert {
        /// Chat request file, `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,

        /// Skip the capability catalog and use static limits
        #[arg(long, default_value = "false")]
        offline: bool,
    },
    /// Sanitize a JSON schema for use as a tool input schema
    SanitizeSchema {
        /// Schema file, `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,
    },
    /// Show resolved capabilities for a model id
    Capabilities {
        /// Model or inference profile id, e.g. `us.anthropic.claude-3-7-sonnet-20250219-v1:0`
        model: String,
    },
}

/// Transport for dry runs; never dispatches
struct DryRunTransport;

#[async_trait::async_trait]
impl ConverseTransport for DryRunTransport {
    async fn converse_stream(
        &self,
        _request: ConverseRequest,
        _credentials: &Credentials,
    ) -> Result<ConverseEventStream> {
        Err(Error::Transport("dry run transport cannot send requests".to_string()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => BridgeConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => BridgeConfig::default(),
    };
    config.merge_env();

    // Logs go to stderr; stdout carries the JSON output
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Convert { input, offline } => {
            let request: ChatRequest = serde_json::from_str(&read_input(&input)?)
                .context("input is not a valid chat request")?;
            if offline {
                config.catalog.enabled = false;
            }

            let adapter = ChatAdapter::new(config, Arc::new(DryRunTransport));
            let prepared = adapter.prepare(&request).await?;
            debug!(
                estimated_input_tokens = prepared.estimated_input_tokens,
                limit = prepared.input_token_limit,
                "Request prepared"
            );
            println!("{}", serde_json::to_string_pretty(&prepared.request)?);
        }
        Commands::SanitizeSchema { input } => {
            let schema: Value =
                serde_json::from_str(&read_input(&input)?).context("input is not valid JSON")?;
            println!("{}", serde_json::to_string_pretty(&sanitize_schema(&schema, None))?);
        }
        Commands::Capabilities { model } => {
            if !config.catalog.enabled {
                bail!("the capability catalog is disabled in configuration");
            }

            let source = HttpCatalogSource::new(config.catalog.url.clone(), config.catalog.timeout());
            let resolver = CapabilityResolver::new(Arc::new(source))
                .with_cache(TtlCache::with_ttl(config.catalog.ttl()));
            let count = resolver
                .refresh()
                .await
                .context("failed to fetch the model catalog")?;
            debug!("Fetched {} catalog models", count);

            let record = resolver.lookup(&model).await;
            let profile = ModelProfile::for_model(&model);
            let output = json!({
                "model": model,
                "catalog_match": record.is_some(),
                "supports_reasoning": record.as_ref().is_some_and(|r| r.supports_reasoning),
                "context_length": record.as_ref().and_then(|r| r.context_length),
                "max_output_tokens": record.as_ref().and_then(|r| r.max_output_tokens),
                "profile": {
                    "tool_result_format": format!("{:?}", profile.tool_result_format).to_lowercase(),
                    "supports_tool_choice": profile.supports_tool_choice,
                    "supports_tool_result_status": profile.supports_tool_result_status,
                    "supports_images": profile.supports_images,
                    "supports_thinking_budget": profile.supports_thinking_budget,
                },
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))
    }
}
