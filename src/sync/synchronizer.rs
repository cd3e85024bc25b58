//! Catalog synchronizer
//!
//! One pass runs in two phases. Every host that still needs its model list is
//! claimed and fetched concurrently; once all lists have settled, every queued
//! model of those hosts is claimed and its detail fetched concurrently.
//!
//! Claims are taken synchronously before the first await, so a second pass that
//! starts while this one is suspended sees the keys as fetching and skips them.
//! Failures are written to the catalog as terminal errors and never retried here.

use std::sync::Arc;

use futures_util::future::join_all;

use crate::catalog::store::{CatalogStore, HostClaim, ModelClaim};
use crate::chat::store::ChatStore;
use crate::gateway::provider::ModelGateway;

/// What a pass actually wrote to the catalog.
///
/// Results dropped because the catalog was reloaded mid-fetch are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub hosts_fetched: usize,
    pub hosts_failed: usize,
    pub models_fetched: usize,
    pub models_failed: usize,
}

impl SyncReport {
    /// Nothing was fetched or failed
    pub fn is_idle(&self) -> bool {
        *self == SyncReport::default()
    }
}

pub struct CatalogSynchronizer {
    chats: Arc<ChatStore>,
    catalog: Arc<CatalogStore>,
    gateway: Arc<dyn ModelGateway>,
    default_host: String,
}

impl CatalogSynchronizer {
    pub fn new(
        chats: Arc<ChatStore>,
        catalog: Arc<CatalogStore>,
        gateway: Arc<dyn ModelGateway>,
        default_host: impl Into<String>,
    ) -> Self {
        Self {
            chats,
            catalog,
            gateway,
            default_host: default_host.into(),
        }
    }

    /// Hosts referenced by any chat, or the default host when there are none
    pub fn hosts(&self) -> Vec<String> {
        let hosts = self.chats.distinct_hosts();
        if hosts.is_empty() {
            vec![self.default_host.clone()]
        } else {
            hosts
        }
    }

    pub async fn run(&self) -> SyncReport {
        let hosts = self.hosts();
        let mut report = SyncReport::default();

        let host_claims: Vec<HostClaim> = hosts
            .iter()
            .filter_map(|host| self.catalog.claim_host(host))
            .collect();
        log::info!(
            "Syncing model catalog: {} hosts, {} lists to load",
            hosts.len(),
            host_claims.len()
        );

        let listed = join_all(host_claims.iter().map(|claim| self.load_host(claim))).await;
        for ok in listed.into_iter().flatten() {
            if ok {
                report.hosts_fetched += 1;
            } else {
                report.hosts_failed += 1;
            }
        }

        let model_claims = self.catalog.claim_models(&hosts);
        if !model_claims.is_empty() {
            log::info!("Loading details for {} models", model_claims.len());
        }

        let detailed = join_all(model_claims.iter().map(|claim| self.load_model(claim))).await;
        for ok in detailed.into_iter().flatten() {
            if ok {
                report.models_fetched += 1;
            } else {
                report.models_failed += 1;
            }
        }

        log::info!(
            "Model catalog sync finished: {} hosts loaded ({} failed), {} models loaded ({} failed)",
            report.hosts_fetched,
            report.hosts_failed,
            report.models_fetched,
            report.models_failed
        );
        report
    }

    /// Fetch one host's list. `None` when the result was dropped, else whether it succeeded.
    async fn load_host(&self, claim: &HostClaim) -> Option<bool> {
        let result = self
            .gateway
            .fetch_model_list(&claim.host)
            .await
            .map(|response| response.models)
            .map_err(|e| e.error_text());

        match &result {
            Ok(models) => log::info!("Host {} lists {} models", claim.host, models.len()),
            Err(e) => log::warn!("Failed to list models on {}: {}", claim.host, e),
        }

        let ok = result.is_ok();
        self.catalog.settle_host(claim, result).then_some(ok)
    }

    async fn load_model(&self, claim: &ModelClaim) -> Option<bool> {
        let result = self
            .gateway
            .fetch_model_detail(&claim.host, claim.name())
            .await
            .map_err(|e| e.error_text());

        if let Err(e) = &result {
            log::warn!("Failed to load model {} on {}: {}", claim.name(), claim.host, e);
        }

        let ok = result.is_ok();
        self.catalog.settle_model(claim, result).then_some(ok)
    }
}
