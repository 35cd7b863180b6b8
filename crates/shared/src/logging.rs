//! Tracing setup shared by the client library and its CLI.
//!
//! Console output goes to stderr so command output on stdout stays clean.
//! File output rotates daily under the configured log directory.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Resolved logging settings for one process
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_dir: String,
    /// Binary name; prefixes the rotated log files
    pub component: String,
    /// Level for our own crates when RUST_LOG is unset
    pub default_level: Level,
    pub console: bool,
    pub file: bool,
    /// Write the file log as JSON lines
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: "data/logs".to_string(),
            component: "mangadex-client".to_string(),
            default_level: Level::INFO,
            console: true,
            file: true,
            json_format: false,
        }
    }
}

/// Parse a textual level from the config file, falling back to INFO
pub fn parse_level(level: &str) -> Level {
    level.parse().unwrap_or(Level::INFO)
}

/// Filter used when RUST_LOG is unset: our crates at the configured level,
/// HTTP internals at warn
fn default_filter(config: &LogConfig) -> String {
    let level = config.default_level;
    let component = config.component.replace('-', "_");
    let mut directives = vec![format!("{}={}", component, level)];
    for krate in ["shared", "mangadex_client"] {
        if krate != component {
            directives.push(format!("{}={}", krate, level));
        }
    }
    directives.extend(["hyper=warn", "reqwest=warn", "h2=warn"].map(String::from));
    directives.join(",")
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(config: LogConfig) -> Result<()> {
    let log_dir = Path::new(&config.log_dir);
    if config.file {
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", config.log_dir))?;
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&config)));

    let mut layers = Vec::new();

    if config.console {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_span_events(FmtSpan::NONE)
            .with_writer(std::io::stderr)
            .boxed();
        layers.push(console_layer);
    }

    if config.file {
        let file_appender = tracing_appender::rolling::daily(log_dir, &config.component);

        let file_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_current_span(true)
                .with_span_list(false)
                .with_writer(file_appender)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(file_appender)
                .boxed()
        };

        layers.push(file_layer);
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::info!(
        component = %config.component,
        log_dir = %config.log_dir,
        "Logging initialized"
    );

    Ok(())
}
