//! Chat types and structures

use serde::{Deserialize, Serialize};

use crate::gateway::types::ChatRole;

/// Default server host for new chats and for the catalog when no chat exists
pub const DEFAULT_HOST: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.1";
pub const DEFAULT_TITLE: &str = "New Chat";
pub const DEFAULT_HISTORY_LENGTH: usize = 10;

/// A message in a chat's history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub created_at: String,
    /// Attached images as data URLs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
            images: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        if !images.is_empty() {
            self.images = Some(images);
        }
        self
    }
}

/// Per-chat settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatSettings {
    pub title: String,
    pub host: String,
    pub model: String,
    pub system_message: String,
    /// Number of most recent messages sent with each request
    pub history_length: usize,
}

impl ChatSettings {
    pub fn with_host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            host: DEFAULT_HOST.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_message: String::new(),
            history_length: DEFAULT_HISTORY_LENGTH,
        }
    }
}

/// Partial settings update; `None` fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSettingsUpdate {
    pub title: Option<String>,
    pub host: Option<String>,
    pub model: Option<String>,
    pub system_message: Option<String>,
    pub history_length: Option<usize>,
}

impl ChatSettingsUpdate {
    pub fn host(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            ..Default::default()
        }
    }

    pub fn apply(self, settings: &mut ChatSettings) {
        if let Some(title) = self.title {
            settings.title = title;
        }
        if let Some(host) = self.host {
            settings.host = host;
        }
        if let Some(model) = self.model {
            settings.model = model;
        }
        if let Some(system_message) = self.system_message {
            settings.system_message = system_message;
        }
        if let Some(history_length) = self.history_length {
            settings.history_length = history_length;
        }
    }
}

/// A conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    pub chat_history: Vec<ChatMessage>,
    pub chat_settings: ChatSettings,
}

impl Chat {
    pub fn new(chat_settings: ChatSettings) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now.clone(),
            updated_at: now,
            chat_history: Vec::new(),
            chat_settings,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}
