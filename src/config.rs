//! Client configuration: defaults plus environment overrides

use std::path::PathBuf;

use crate::chat::types::DEFAULT_HOST;

pub const ENV_HOST: &str = "LLAMA_CHAT_HOST";
pub const ENV_DATA_DIR: &str = "LLAMA_CHAT_DATA_DIR";
pub const ENV_TIMEOUT_SECS: &str = "LLAMA_CHAT_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Host for new chats, and the sync target when no chat names one
    pub default_host: String,
    /// Directory holding the persisted JSON documents
    pub data_dir: PathBuf,
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_host: DEFAULT_HOST.to_string(),
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("llama-chat"),
            request_timeout_secs: 120,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(host) = lookup(ENV_HOST).filter(|h| !h.trim().is_empty()) {
            config.default_host = host.trim().to_string();
        }
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|d| !d.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout_secs = secs,
                _ => log::warn!("Ignoring invalid {}: {:?}", ENV_TIMEOUT_SECS, raw),
            }
        }

        config
    }
}
