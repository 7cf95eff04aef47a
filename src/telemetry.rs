use crate::config::{Config, DEFAULT_LOG_FILTER};
use anyhow::Context;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber.
///
/// Events go to `config.log_path` when set, since the terminal UI owns the
/// screen. Without a log path they go to stderr, which is only the case when
/// stderr is not a terminal.
pub fn init(config: &Config) -> anyhow::Result<()> {
    let filter = build_filter(&config.log_filter);

    let installed = match &config.log_path {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    installed.map_err(|error| anyhow::anyhow!("failed to install tracing subscriber: {error}"))
}

fn build_filter(directive: &str) -> EnvFilter {
    match EnvFilter::try_new(directive) {
        Ok(filter) => filter,
        Err(error) => {
            eprintln!(
                "WARN: log filter '{directive}' is invalid ({error}); falling back to '{DEFAULT_LOG_FILTER}'"
            );
            EnvFilter::new(DEFAULT_LOG_FILTER)
        }
    }
}
