//! Wire types for the Ollama-compatible server API
//!
//! Field names follow the server's JSON so the same structs are used for
//! decoding responses and for persisting them in the catalog.

use serde::{Deserialize, Serialize};

/// Role of a message sent to the server
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

/// Model capabilities reported by the detail endpoint
pub mod capabilities {
    pub const COMPLETION: &str = "completion";
    pub const VISION: &str = "vision";
    pub const TOOLS: &str = "tools";
}

/// A message in the request history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatHistoryMessage {
    pub role: ChatRole,
    pub content: String,
    /// Base64 image payloads (no data URL prefix)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl ChatHistoryMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            images: None,
        }
    }
}

/// Reply to a non-streaming chat request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub model: String,
    #[serde(default)]
    pub created_at: String,
    /// Absent when the server reply is malformed
    #[serde(default)]
    pub message: Option<ChatHistoryMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub total_duration: Option<u64>,
    #[serde(default)]
    pub load_duration: Option<u64>,
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    #[serde(default)]
    pub prompt_eval_duration: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u32>,
    #[serde(default)]
    pub eval_duration: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_model: Option<String>,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub family: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub families: Option<Vec<String>>,
    #[serde(default)]
    pub parameter_size: String,
    #[serde(default)]
    pub quantization_level: String,
}

/// Short descriptor returned by the list endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelShortData {
    pub name: String,
    #[serde(default)]
    pub modified_at: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub details: ModelDetails,
}

impl ModelShortData {
    /// Descriptor carrying only a name, used when a list entry is all we know
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modified_at: String::new(),
            size: 0,
            digest: String::new(),
            details: ModelDetails::default(),
        }
    }
}

/// Detail descriptor returned by the show endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelLongData {
    #[serde(default)]
    pub modelfile: String,
    #[serde(default)]
    pub parameters: String,
    #[serde(default)]
    pub template: String,
    #[serde(default)]
    pub details: ModelDetails,
    /// Architecture-specific keys (`general.architecture`, `llama.context_length`, ...)
    #[serde(default)]
    pub model_info: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl ModelLongData {
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }

    /// Context window from `<architecture>.context_length`, when the server reports it
    pub fn context_length(&self) -> Option<u64> {
        let arch = self.model_info.get("general.architecture")?.as_str()?;
        self.model_info
            .get(&format!("{}.context_length", arch))?
            .as_u64()
    }
}

/// Body of the list endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelShortData>,
}
