//! Catalog data model
//!
//! The persisted shape keeps the `loading` / `loaded` / `error` flags. The explicit
//! [`FetchState`] is derived from them and is what the store and synchronizer reason
//! about.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::gateway::types::{ModelLongData, ModelShortData};

/// Result of a settled fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Failed(String),
}

/// Fetch state of a host list or a model detail record.
///
/// Legal transitions:
/// - `Absent -> Queued | Fetching`
/// - `Queued -> Queued | Fetching`
/// - `Fetching -> Settled` (and `Fetching -> Queued` only when restoring)
/// - `Settled -> Settled | Queued`
/// - anything `-> Absent` only through `reload()`
///
/// `Fetching -> Fetching` is the duplicate in-flight fetch and is never legal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState {
    Absent,
    Queued,
    Fetching,
    Settled(Outcome),
}

impl FetchState {
    fn from_flags(loading: bool, loaded: bool, error: Option<&String>) -> Self {
        if loaded {
            match error {
                Some(e) => FetchState::Settled(Outcome::Failed(e.clone())),
                None => FetchState::Settled(Outcome::Ok),
            }
        } else if loading {
            FetchState::Fetching
        } else {
            FetchState::Queued
        }
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, FetchState::Queued)
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, FetchState::Settled(_))
    }

    /// Whether a claim may move this state to `Fetching`
    pub fn is_claimable(&self) -> bool {
        matches!(self, FetchState::Absent | FetchState::Queued)
    }

    pub fn can_transition_to(&self, next: &FetchState) -> bool {
        use FetchState::*;
        match (self, next) {
            (_, Absent) => false,
            (Absent, Queued) | (Absent, Fetching) => true,
            (Queued, Queued) | (Queued, Fetching) => true,
            (Fetching, Settled(_)) => true,
            (Settled(_), Settled(_)) | (Settled(_), Queued) => true,
            _ => false,
        }
    }
}

/// Per (host, model-name) entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelRecord {
    #[serde(rename = "short")]
    pub short_info: ModelShortData,
    #[serde(rename = "long", default, skip_serializing_if = "Option::is_none")]
    pub detail_info: Option<ModelLongData>,
    #[serde(default)]
    pub loading: bool,
    /// A detail fetch has completed, successfully or not
    #[serde(default)]
    pub loaded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModelRecord {
    /// Record for a model that was just listed and still needs its detail fetch
    pub fn queued(short_info: ModelShortData) -> Self {
        Self {
            short_info,
            detail_info: None,
            loading: false,
            loaded: false,
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.short_info.name
    }

    pub fn state(&self) -> FetchState {
        FetchState::from_flags(self.loading, self.loaded, self.error.as_ref())
    }
}

/// Per host entry
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HostEntry {
    /// Absent until the first list fetch succeeds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<HashMap<String, ModelRecord>>,
    #[serde(default)]
    pub loading: bool,
    #[serde(default)]
    pub loaded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HostEntry {
    pub fn state(&self) -> FetchState {
        FetchState::from_flags(self.loading, self.loaded, self.error.as_ref())
    }

    pub fn model(&self, name: &str) -> Option<&ModelRecord> {
        self.models.as_ref()?.get(name)
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelRecord> {
        self.models.iter().flat_map(|m| m.values())
    }

    /// Model names in a stable order, for pickers and logs
    pub fn model_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models().map(|m| m.name().to_string()).collect();
        names.sort();
        names
    }
}

/// The entire catalog: host -> entry. Serialized as the bare map.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct CatalogSnapshot {
    pub hosts: HashMap<String, HostEntry>,
}

impl CatalogSnapshot {
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn host(&self, host: &str) -> Option<&HostEntry> {
        self.hosts.get(host)
    }

    pub fn host_state(&self, host: &str) -> FetchState {
        self.hosts
            .get(host)
            .map(HostEntry::state)
            .unwrap_or(FetchState::Absent)
    }

    pub fn model_state(&self, host: &str, name: &str) -> FetchState {
        self.hosts
            .get(host)
            .and_then(|h| h.model(name))
            .map(ModelRecord::state)
            .unwrap_or(FetchState::Absent)
    }

    /// Number of hosts and models currently marked as fetching
    pub fn in_flight(&self) -> usize {
        self.hosts
            .values()
            .map(|h| usize::from(h.loading) + h.models().filter(|m| m.loading).count())
            .sum()
    }
}
