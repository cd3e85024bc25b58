//! Model catalog store
//!
//! Observable container for the [`CatalogSnapshot`]. Every mutation re-reads the
//! live state under the lock and then notifies subscribers in registration order
//! while still holding it, so notifications are totally ordered.
//!
//! The `set_*` operations are tolerant upserts that never fail. The synchronizer
//! uses the claim/settle pairs instead, which check the fetch state atomically.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::catalog::types::{CatalogSnapshot, FetchState, HostEntry, ModelRecord};
use crate::gateway::types::{ModelLongData, ModelShortData};

/// Callback fired after every mutation. Must not call back into the store.
pub type CatalogSubscriber = Box<dyn Fn(&CatalogSnapshot) + Send + Sync>;

/// Right to fetch a host's model list, taken by [`CatalogStore::claim_host`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostClaim {
    pub host: String,
    generation: u64,
}

/// Right to fetch one model's detail, taken by [`CatalogStore::claim_models`]
#[derive(Debug, Clone, PartialEq)]
pub struct ModelClaim {
    pub host: String,
    pub short_info: ModelShortData,
    generation: u64,
}

impl ModelClaim {
    pub fn name(&self) -> &str {
        &self.short_info.name
    }
}

struct Inner {
    snapshot: CatalogSnapshot,
    /// Bumped by `reload()`; claims from older generations are stale
    generation: u64,
}

pub struct CatalogStore {
    inner: Mutex<Inner>,
    subscribers: Mutex<Vec<CatalogSubscriber>>,
}

fn log_transition(key: &str, before: &FetchState, after: &FetchState) {
    if before != after && !before.can_transition_to(after) {
        log::warn!(
            "Illegal catalog transition for {}: {:?} -> {:?}",
            key,
            before,
            after
        );
    }
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::with_snapshot(CatalogSnapshot::default())
    }

    fn with_snapshot(snapshot: CatalogSnapshot) -> Self {
        Self {
            inner: Mutex::new(Inner {
                snapshot,
                generation: 0,
            }),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, snapshot: &CatalogSnapshot) {
        let subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for subscriber in subscribers.iter() {
            subscriber(snapshot);
        }
    }

    /// Apply a mutation to the live snapshot and publish the result
    fn mutate<R>(&self, f: impl FnOnce(&mut CatalogSnapshot) -> R) -> R {
        let mut inner = self.lock();
        let result = f(&mut inner.snapshot);
        self.notify(&inner.snapshot);
        result
    }

    /// Register a callback fired after every mutation
    pub fn subscribe(&self, subscriber: CatalogSubscriber) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(subscriber);
    }

    /// Install a persisted snapshot.
    ///
    /// `loading` never survives a restart: a fetch abandoned by the previous process
    /// goes back to queued so it is attempted again. Subscribers are not notified.
    pub fn restore(&self, mut snapshot: CatalogSnapshot) {
        let mut reset = 0usize;
        for entry in snapshot.hosts.values_mut() {
            if entry.loading {
                entry.loading = false;
                reset += 1;
            }
            for record in entry.models.iter_mut().flat_map(|m| m.values_mut()) {
                if record.loading {
                    record.loading = false;
                    reset += 1;
                }
            }
        }

        if reset > 0 {
            log::info!("Re-queued {} fetches interrupted by the last shutdown", reset);
        }

        self.lock().snapshot = snapshot;
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        self.lock().snapshot.clone()
    }

    pub fn host(&self, host: &str) -> Option<HostEntry> {
        self.lock().snapshot.hosts.get(host).cloned()
    }

    pub fn set_host_loading(&self, host: &str, loading: bool) {
        self.mutate(|snapshot| {
            let before = snapshot.host_state(host);
            let entry = snapshot.hosts.entry(host.to_string()).or_default();
            entry.loading = loading;
            log_transition(host, &before, &entry.state());
        })
    }

    pub fn set_host_loaded(&self, host: &str, loaded: bool) {
        self.mutate(|snapshot| {
            let before = snapshot.host_state(host);
            let entry = snapshot.hosts.entry(host.to_string()).or_default();
            entry.loaded = loaded;
            log_transition(host, &before, &entry.state());
        })
    }

    pub fn set_host_error(&self, host: &str, error: impl Into<String>) {
        let error = error.into();
        self.mutate(|snapshot| {
            let before = snapshot.host_state(host);
            let entry = snapshot.hosts.entry(host.to_string()).or_default();
            entry.error = Some(error);
            log_transition(host, &before, &entry.state());
        })
    }

    /// Upsert a record by its short name (full replace of that name)
    pub fn set_model(&self, host: &str, record: ModelRecord) {
        self.mutate(|snapshot| {
            let before = snapshot.model_state(host, record.name());
            let key = format!("{} {}", host, record.name());
            log_transition(&key, &before, &record.state());

            snapshot
                .hosts
                .entry(host.to_string())
                .or_default()
                .models
                .get_or_insert_with(HashMap::new)
                .insert(record.name().to_string(), record);
        })
    }

    /// Drop every host entry to force a full re-discovery
    pub fn reload(&self) {
        let mut inner = self.lock();
        inner.snapshot = CatalogSnapshot::default();
        inner.generation += 1;
        log::info!("Model catalog cleared (generation {})", inner.generation);
        self.notify(&inner.snapshot);
    }

    /// Move a host from absent/queued to fetching.
    ///
    /// Returns `None` when the host is already fetching or settled.
    pub fn claim_host(&self, host: &str) -> Option<HostClaim> {
        let mut inner = self.lock();
        let state = inner.snapshot.host_state(host);
        if !state.is_claimable() {
            log::debug!("Not claiming host {}: {:?}", host, state);
            return None;
        }

        let entry = inner.snapshot.hosts.entry(host.to_string()).or_default();
        entry.loading = true;
        entry.error = None;

        let claim = HostClaim {
            host: host.to_string(),
            generation: inner.generation,
        };
        self.notify(&inner.snapshot);
        Some(claim)
    }

    /// Write the outcome of a list fetch.
    ///
    /// Listed models are upserted as queued records. Returns `false` when the claim
    /// was made stale by `reload()` and the result was dropped.
    pub fn settle_host(&self, claim: &HostClaim, result: Result<Vec<ModelShortData>, String>) -> bool {
        let mut inner = self.lock();
        if claim.generation != inner.generation {
            log::debug!("Dropping stale model list for {}", claim.host);
            return false;
        }
        if inner.snapshot.host_state(&claim.host) != FetchState::Fetching {
            log::debug!("Dropping model list for {}: host no longer fetching", claim.host);
            return false;
        }

        let Some(entry) = inner.snapshot.hosts.get_mut(&claim.host) else {
            return false;
        };

        match result {
            Ok(listed) => {
                let models = entry.models.get_or_insert_with(HashMap::new);
                for short_info in listed {
                    let in_flight = models
                        .get(&short_info.name)
                        .map(|r| r.state() == FetchState::Fetching)
                        .unwrap_or(false);
                    if in_flight {
                        continue;
                    }
                    models.insert(short_info.name.clone(), ModelRecord::queued(short_info));
                }
            }
            Err(error) => {
                entry.error = Some(error);
            }
        }
        entry.loading = false;
        entry.loaded = true;

        self.notify(&inner.snapshot);
        true
    }

    /// Claim every queued model of the given hosts, in name order per host
    pub fn claim_models(&self, hosts: &[String]) -> Vec<ModelClaim> {
        let mut inner = self.lock();
        let generation = inner.generation;
        let mut claims = Vec::new();

        for host in hosts {
            let Some(models) = inner
                .snapshot
                .hosts
                .get_mut(host)
                .and_then(|entry| entry.models.as_mut())
            else {
                continue;
            };

            let mut queued: Vec<&mut ModelRecord> =
                models.values_mut().filter(|r| r.state().is_queued()).collect();
            queued.sort_by(|a, b| a.short_info.name.cmp(&b.short_info.name));

            for record in queued {
                record.loading = true;
                record.error = None;
                claims.push(ModelClaim {
                    host: host.clone(),
                    short_info: record.short_info.clone(),
                    generation,
                });
            }
        }

        if !claims.is_empty() {
            self.notify(&inner.snapshot);
        }
        claims
    }

    /// Write the outcome of a detail fetch. Returns `false` when the result was dropped.
    pub fn settle_model(&self, claim: &ModelClaim, result: Result<ModelLongData, String>) -> bool {
        let mut inner = self.lock();
        if claim.generation != inner.generation {
            log::debug!("Dropping stale detail for {} on {}", claim.name(), claim.host);
            return false;
        }

        let Some(record) = inner
            .snapshot
            .hosts
            .get_mut(&claim.host)
            .and_then(|entry| entry.models.as_mut())
            .and_then(|models| models.get_mut(claim.name()))
        else {
            log::debug!("Dropping detail for {} on {}: record gone", claim.name(), claim.host);
            return false;
        };

        if record.state() != FetchState::Fetching {
            log::debug!("Dropping detail for {} on {}: not fetching", claim.name(), claim.host);
            return false;
        }

        match result {
            Ok(detail) => {
                record.detail_info = Some(detail);
                record.error = None;
            }
            Err(error) => {
                record.error = Some(error);
            }
        }
        record.loading = false;
        record.loaded = true;

        self.notify(&inner.snapshot);
        true
    }
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::Outcome;
    use std::sync::Arc;

    const HOST: &str = "http://a";

    fn short(name: &str) -> ModelShortData {
        ModelShortData::named(name)
    }

    #[test]
    fn test_setters_create_entries() {
        let store = CatalogStore::new();

        store.set_host_loading(HOST, true);
        assert_eq!(store.snapshot().host_state(HOST), FetchState::Fetching);

        store.set_host_error(HOST, "boom");
        store.set_host_loading(HOST, false);
        store.set_host_loaded(HOST, true);

        let entry = store.host(HOST).unwrap();
        assert_eq!(entry.error.as_deref(), Some("boom"));
        assert_eq!(entry.state(), FetchState::Settled(Outcome::Failed("boom".into())));
        assert!(entry.models.is_none());
    }

    #[test]
    fn test_set_model_replaces_by_name() {
        let store = CatalogStore::new();
        store.set_model(HOST, ModelRecord::queued(short("m1")));

        let mut loaded = ModelRecord::queued(short("m1"));
        loaded.loaded = true;
        loaded.detail_info = Some(ModelLongData::default());
        store.set_model(HOST, loaded.clone());

        let entry = store.host(HOST).unwrap();
        assert_eq!(entry.models.as_ref().unwrap().len(), 1);
        assert_eq!(entry.model("m1"), Some(&loaded));
    }

    #[test]
    fn test_subscribers_fire_in_order_on_every_mutation() {
        let store = CatalogStore::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for id in 0..2 {
            let log = log.clone();
            store.subscribe(Box::new(move |snapshot: &CatalogSnapshot| {
                log.lock().unwrap().push((id, snapshot.hosts.len()));
            }));
        }

        store.set_host_loading(HOST, true);
        store.reload();

        assert_eq!(*log.lock().unwrap(), vec![(0, 1), (1, 1), (0, 0), (1, 0)]);
    }

    #[test]
    fn test_claim_host_only_once() {
        let store = CatalogStore::new();

        let claim = store.claim_host(HOST).unwrap();
        assert!(store.claim_host(HOST).is_none());

        assert!(store.settle_host(&claim, Ok(vec![short("m1"), short("m2")])));
        assert!(store.claim_host(HOST).is_none());

        let snapshot = store.snapshot();
        assert_eq!(snapshot.host_state(HOST), FetchState::Settled(Outcome::Ok));
        assert_eq!(snapshot.model_state(HOST, "m1"), FetchState::Queued);
        assert_eq!(snapshot.model_state(HOST, "m2"), FetchState::Queued);
    }

    #[test]
    fn test_failed_list_keeps_models_absent() {
        let store = CatalogStore::new();
        let claim = store.claim_host(HOST).unwrap();

        store.settle_host(&claim, Err("boom".into()));

        let entry = store.host(HOST).unwrap();
        assert!(!entry.loading);
        assert!(entry.loaded);
        assert_eq!(entry.error.as_deref(), Some("boom"));
        assert!(entry.models.is_none());
    }

    #[test]
    fn test_claim_models_skips_non_queued() {
        let store = CatalogStore::new();
        let claim = store.claim_host(HOST).unwrap();
        store.settle_host(&claim, Ok(vec![short("b"), short("a")]));

        let claims = store.claim_models(&[HOST.to_string()]);
        let names: Vec<_> = claims.iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(store.claim_models(&[HOST.to_string()]).is_empty());

        assert!(store.settle_model(&claims[0], Ok(ModelLongData::default())));
        assert!(store.settle_model(&claims[1], Err("no such model".into())));
        // A second settle of the same claim is dropped
        assert!(!store.settle_model(&claims[1], Ok(ModelLongData::default())));

        let entry = store.host(HOST).unwrap();
        let a = entry.model("a").unwrap();
        assert!(a.loaded && !a.loading && a.detail_info.is_some());
        let b = entry.model("b").unwrap();
        assert!(b.loaded && !b.loading && b.detail_info.is_none());
        assert_eq!(b.error.as_deref(), Some("no such model"));
        assert_eq!(store.snapshot().in_flight(), 0);
    }

    #[test]
    fn test_relisting_keeps_in_flight_model() {
        let store = CatalogStore::new();
        let claim = store.claim_host(HOST).unwrap();
        store.settle_host(&claim, Ok(vec![short("m1")]));
        let model_claims = store.claim_models(&[HOST.to_string()]);

        // Host put back in the queue while the detail fetch is running
        store.set_host_loaded(HOST, false);
        let claim = store.claim_host(HOST).unwrap();
        store.settle_host(&claim, Ok(vec![short("m1")]));

        assert_eq!(store.snapshot().model_state(HOST, "m1"), FetchState::Fetching);
        assert!(store.settle_model(&model_claims[0], Ok(ModelLongData::default())));
    }

    #[test]
    fn test_reload_makes_claims_stale() {
        let store = CatalogStore::new();
        let claim = store.claim_host(HOST).unwrap();

        store.reload();
        assert!(store.snapshot().is_empty());

        assert!(!store.settle_host(&claim, Ok(vec![short("m1")])));
        assert!(store.snapshot().is_empty());

        // The host can be claimed again in the new generation
        let claim = store.claim_host(HOST).unwrap();
        assert!(store.settle_host(&claim, Ok(vec![])));
    }

    #[test]
    fn test_restore_requeues_interrupted_fetches() {
        let source = CatalogStore::new();
        let claim = source.claim_host(HOST).unwrap();
        source.settle_host(&claim, Ok(vec![short("m1"), short("m2")]));
        source.claim_models(&[HOST.to_string()]);
        source.set_host_loading("http://b", true);
        let persisted = serde_json::to_string(&source.snapshot()).unwrap();

        let store = CatalogStore::new();
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        store.subscribe(Box::new(move |_: &CatalogSnapshot| *counter.lock().unwrap() += 1));
        store.restore(serde_json::from_str(&persisted).unwrap());

        let snapshot = store.snapshot();
        assert_eq!(snapshot.in_flight(), 0);
        assert_eq!(snapshot.model_state(HOST, "m1"), FetchState::Queued);
        assert_eq!(snapshot.host_state("http://b"), FetchState::Queued);
        assert_eq!(*calls.lock().unwrap(), 0);
    }
}
