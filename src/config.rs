use std::net::SocketAddr;

use clap::{Parser, ValueEnum};

pub const DEFAULT_API_URL: &str = "https://api.gitcode.com/api/v5/chat/completions";
pub const DEFAULT_MODEL: &str = "deepseek-ai/DeepSeek-V3";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    /// Newline-delimited JSON-RPC on stdin/stdout
    Stdio,
    /// HTTP endpoint
    Http,
}

/// Fetch web pages and convert them to Markdown
#[derive(Parser, Debug, Clone)]
#[command(name = "web-reader", version)]
pub struct Cli {
    /// API key for the text-generation service
    #[arg(long, env = "AI_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Chat-completions endpoint of the text-generation service
    #[arg(long, env = "AI_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Model used when a request does not name one
    #[arg(long, env = "AI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, env = "WEB_READER_TRANSPORT", value_enum, default_value_t = Transport::Stdio)]
    pub transport: Transport,

    /// Listen address for the HTTP transport
    #[arg(long, env = "WEB_READER_BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// Verify TLS certificates of origin sites and image hosts
    #[arg(long, env = "WEB_READER_VERIFY_TLS", default_value_t = false)]
    pub verify_tls: bool,

    /// Parallel image downloads per request
    #[arg(long, env = "WEB_READER_DOWNLOAD_CONCURRENCY", default_value_t = 4)]
    pub download_concurrency: usize,
}

/// Settings shared by every read. Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub api_key: String,
    pub api_url: String,
    pub default_model: String,
    pub verify_tls: bool,
    pub download_concurrency: usize,
}

impl ReaderConfig {
    pub fn new(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: api_url.into(),
            default_model: DEFAULT_MODEL.to_string(),
            verify_tls: false,
            download_concurrency: 4,
        }
    }
}

impl From<&Cli> for ReaderConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            default_model: cli.model.clone(),
            verify_tls: cli.verify_tls,
            download_concurrency: cli.download_concurrency.max(1),
            ..Self::new(cli.api_key.trim(), cli.api_url.clone())
        }
    }
}
