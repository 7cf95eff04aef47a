mod settings;
mod store;

pub use settings::{
    is_known_model, Settings, DEFAULT_DEVELOPER_MESSAGE, DEFAULT_MODEL, KNOWN_MODELS, SETTINGS_KEY,
};
pub use store::{ConfigStore, FileStorage, MemoryStorage, SettingsStorage};

use crate::util::{is_local_endpoint_url, parse_bool_flag};
use anyhow::{bail, Result};
use std::io::IsTerminal;
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_LOG_FILTER: &str = "streamchat=info";

const API_URL_ENV: &str = "STREAMCHAT_API_URL";
const CONFIG_DIR_ENV: &str = "STREAMCHAT_CONFIG_DIR";
const LOG_FILTER_ENV: &str = "STREAMCHAT_LOG";
const LOG_PATH_ENV: &str = "STREAMCHAT_LOG_PATH";
const DEBUG_PAYLOAD_ENV: &str = "STREAMCHAT_DEBUG_PAYLOAD";

/// Process-level settings taken from the environment. The user-editable
/// connection settings live in [`Settings`] and are persisted separately.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the chat backend; `/api/chat` and `/api/health` hang off it.
    pub api_url: String,
    pub settings_dir: PathBuf,
    pub log_filter: String,
    pub log_path: Option<PathBuf>,
    pub debug_payload: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        let api_url = non_empty_env(API_URL_ENV).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let settings_dir = match non_empty_env(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => default_settings_dir()?,
        };
        let log_filter =
            non_empty_env(LOG_FILTER_ENV).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        let log_path = non_empty_env(LOG_PATH_ENV).map(PathBuf::from).or_else(|| {
            // stderr belongs to the terminal UI, so logs go to a file instead.
            if std::io::stderr().is_terminal() {
                Some(std::env::temp_dir().join("streamchat.log"))
            } else {
                None
            }
        });
        let debug_payload = std::env::var(DEBUG_PAYLOAD_ENV)
            .ok()
            .and_then(|value| parse_bool_flag(&value))
            .unwrap_or(false);

        Ok(Self {
            api_url,
            settings_dir,
            log_filter,
            log_path,
            debug_payload,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            bail!(
                "Invalid {API_URL_ENV} '{}': expected http:// or https:// URL",
                self.api_url
            );
        }

        if self.api_url.contains("/api/") {
            bail!(
                "{API_URL_ENV} must be the backend base URL, not an endpoint (got '{}')",
                self.api_url
            );
        }

        Ok(())
    }

    pub fn is_local_endpoint(&self) -> bool {
        is_local_endpoint_url(&self.api_url)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn default_settings_dir() -> Result<PathBuf> {
    if let Some(dir) = dirs::config_dir() {
        return Ok(dir.join("streamchat"));
    }
    Ok(std::env::current_dir()?.join(".streamchat"))
}
