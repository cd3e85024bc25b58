// JSON document store for llama-chat
// Each store is one named JSON document under the data directory

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;

/// Store name of the persisted model catalog
pub const MODEL_STORE: &str = "llama-chat_ModelStore";
/// Store name of the persisted chats
pub const CHAT_STORE: &str = "llama-chat_ChatStore";

/// Reads and writes named JSON documents in a directory
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    /// Create a store rooted at `dir`, creating the directory if needed
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory {:?}", dir))?;

        log::info!("Data directory: {:?}", dir);

        Ok(Self { dir })
    }

    /// Path of the document for a store name
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    /// Load a document, `None` when it was never written
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        let value = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {:?}", path))?;

        Ok(Some(value))
    }

    /// Load a document, falling back to the default when missing or unreadable
    pub fn load_or_default<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        match self.load(name) {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(e) => {
                log::error!("Problem loading {}: {:#}", name, e);
                T::default()
            }
        }
    }

    /// Write a document via a temp file and rename
    pub fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.path(name);
        let tmp = self.dir.join(format!("{}.json.tmp", name));

        let raw = serde_json::to_string(value).context("Failed to serialize document")?;
        std::fs::write(&tmp, raw).with_context(|| format!("Failed to write {:?}", tmp))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace {:?}", path))?;

        Ok(())
    }
}
