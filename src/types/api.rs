use crate::config::Settings;
use crate::util::mask_secret;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of `POST /api/chat`. Built fresh for every send and never mutated.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub developer_message: String,
    pub user_message: String,
    pub model: String,
    pub api_key: String,
}

impl ChatRequest {
    pub fn new(settings: &Settings, user_message: impl Into<String>) -> Self {
        Self {
            developer_message: settings.developer_message.clone(),
            user_message: user_message.into(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
        }
    }
}

impl fmt::Debug for ChatRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatRequest")
            .field("developer_message", &self.developer_message)
            .field("user_message", &self.user_message)
            .field("model", &self.model)
            .field("api_key", &mask_secret(&self.api_key))
            .finish()
    }
}
