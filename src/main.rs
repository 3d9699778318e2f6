use std::sync::Arc;

use clap::Parser;
use tokio::io::BufReader;

mod config;
mod convert;
mod download;
mod error;
mod extract;
mod fetch;
mod models;
mod pipeline;
mod response;
mod rewrite;
mod rpc;
mod server;

use config::{Cli, ReaderConfig, Transport};
use pipeline::Reader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // stdout carries JSON-RPC frames in stdio mode.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ReaderConfig::from(&cli);
    if config.api_key.is_empty() {
        anyhow::bail!("AI_API_KEY environment variable is not set");
    }
    if !config.verify_tls {
        tracing::warn!("TLS certificate verification is disabled for origin and image requests");
    }

    let reader = Arc::new(Reader::new(&config)?);

    match cli.transport {
        Transport::Stdio => {
            tracing::info!("starting web reader (stdio mode)");
            rpc::serve(&reader, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
        }
        Transport::Http => {
            server::serve(reader, cli.bind).await?;
        }
    }

    Ok(())
}
