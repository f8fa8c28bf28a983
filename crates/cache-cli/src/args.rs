mod log;

use std::path::PathBuf;

use anyhow::Context;
use cache_client::CachePolicy;
use cache_config::{Config, LogLevel};
use clap::Parser;
pub use log::LogStyle;
use normalized_cache::Documents;
use serde_json::Value;
use tracing::Subscriber;
use tracing_subscriber::{registry::LookupSpan, Layer};

/// Runs one operation through the normalized cache and prints every result it settles with.
#[derive(Debug, Parser)]
#[command(name = "normcache", version)]
pub struct Args {
    /// Path to the TOML configuration
    #[arg(short, long, env = "NORMCACHE_CONFIG_PATH")]
    pub config: Option<PathBuf>,
    /// Path to the JSON file holding the compiled documents
    #[arg(short, long, env = "NORMCACHE_DOCUMENTS_PATH")]
    pub documents: PathBuf,
    /// Name of the operation to execute
    #[arg(short, long)]
    pub operation: String,
    /// Variables of the operation, as a JSON object
    #[arg(long, default_value = "{}")]
    pub variables: String,
    /// Overrides the default cache policy of the configuration
    #[arg(long)]
    pub policy: Option<CachePolicy>,
    /// Accept cached results with missing fields
    #[arg(long)]
    pub partial: bool,
    /// Set the logging level, this applies to all spans, logs and trace events.
    #[arg(long = "log", env = "NORMCACHE_LOG")]
    pub log_level: Option<LogLevel>,
    /// Set the style of log output
    #[arg(long, env = "NORMCACHE_LOG_STYLE", default_value_t = LogStyle::Text)]
    pub log_style: LogStyle,
}

impl Args {
    pub fn config(&self) -> anyhow::Result<Config> {
        match &self.config {
            Some(path) => Ok(Config::load(path)?),
            None => Ok(Config::default()),
        }
    }

    pub fn documents(&self) -> anyhow::Result<Documents> {
        let content = std::fs::read_to_string(&self.documents)
            .with_context(|| format!("could not read the documents at {}", self.documents.display()))?;

        Documents::from_json(&content).context("invalid documents")
    }

    pub fn variables(&self) -> anyhow::Result<Value> {
        serde_json::from_str(&self.variables).context("variables must be valid JSON")
    }

    pub fn log_format<S>(&self) -> Box<dyn Layer<S> + Send + Sync + 'static>
    where
        S: Subscriber + for<'span> LookupSpan<'span> + Send + Sync,
    {
        match self.log_style {
            LogStyle::Text => {
                let layer = tracing_subscriber::fmt::layer()
                    .with_ansi(atty::is(atty::Stream::Stderr))
                    .with_target(false)
                    .with_writer(std::io::stderr);

                Box::new(layer)
            }
            LogStyle::Json => Box::new(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
        }
    }
}
