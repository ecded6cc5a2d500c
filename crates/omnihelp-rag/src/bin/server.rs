//! Query service binary
//!
//! Run with: cargo run -p omnihelp-rag --bin omnihelp-server -- --config omnihelp.toml

use clap::Parser;
use std::path::PathBuf;

use omnihelp_rag::{config::RagConfig, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Customer-support question answering over documents and orders
#[derive(Debug, Parser)]
#[command(name = "omnihelp-server", version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "omnihelp_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = RagConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Generate model: {}", config.llm.generate_model);
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - Order database: {}", config.database.path.display());
    tracing::info!("  - Router hint: {}", config.pipeline.router_hint);
    tracing::info!("  - Max concurrent pipelines: {}", config.pipeline.concurrency());

    tracing::info!("Checking Ollama at {}...", config.llm.base_url);
    let client = reqwest::Client::new();
    match client.get(format!("{}/api/tags", config.llm.base_url)).send().await {
        Ok(resp) if resp.status().is_success() => tracing::info!("Ollama is running"),
        _ => {
            tracing::warn!("Ollama not available at {}", config.llm.base_url);
            tracing::warn!(
                "Queries will fall back to canned answers until it is reachable. Pull models with: ollama pull {} && ollama pull {}",
                config.embeddings.model,
                config.llm.generate_model
            );
        }
    }

    let server = RagServer::new(config).await?;

    tracing::info!("Health: http://{}/health", server.address());
    server.start().await?;

    Ok(())
}
