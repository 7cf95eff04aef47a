use crate::util::mask_secret;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage key of the persisted settings record.
pub const SETTINGS_KEY: &str = "chat-settings";
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";
pub const DEFAULT_DEVELOPER_MESSAGE: &str =
    "You are a helpful AI assistant. Provide clear, accurate, and engaging responses.";
pub const KNOWN_MODELS: [&str; 3] = ["gpt-4.1-nano", "gpt-4.1-mini", "gpt-4o-mini"];

/// Connection settings edited by the user and persisted between sessions.
///
/// The record is serialized as `{ "apiKey", "model", "developerMessage" }`.
/// A record missing any field is treated as corrupt.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub api_key: String,
    pub model: String,
    pub developer_message: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            developer_message: DEFAULT_DEVELOPER_MESSAGE.to_string(),
        }
    }
}

impl Settings {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &mask_secret(&self.api_key))
            .field("model", &self.model)
            .field("developer_message", &self.developer_message)
            .finish()
    }
}

/// Only the frontend gates on this; the core forwards any model string.
pub fn is_known_model(model: &str) -> bool {
    KNOWN_MODELS.contains(&model)
}
