// Application state for llama-chat

use std::sync::Arc;

use anyhow::Result;

use crate::catalog::guards::{needs_loading_after_change, needs_loading_after_restore};
use crate::catalog::store::CatalogStore;
use crate::catalog::types::{CatalogSnapshot, FetchState};
use crate::chat::completion::{self, ChatError};
use crate::chat::store::{ChatState, ChatStore};
use crate::chat::types::{ChatMessage, ChatSettings};
use crate::config::ClientConfig;
use crate::gateway::provider::ModelGateway;
use crate::persist::{JsonStore, CHAT_STORE, MODEL_STORE};
use crate::sync::scheduler::SyncScheduler;
use crate::sync::synchronizer::CatalogSynchronizer;
use crate::sync::triggers::hosts_changed;

pub struct AppState {
    pub config: ClientConfig,
    pub chats: Arc<ChatStore>,
    pub catalog: Arc<CatalogStore>,
    gateway: Arc<dyn ModelGateway>,
    scheduler: SyncScheduler,
}

impl AppState {
    /// Restore both stores from disk, wire persistence and sync triggers, and start
    /// the sync worker. Must be called from within a tokio runtime.
    pub fn start(config: ClientConfig, gateway: Arc<dyn ModelGateway>) -> Result<Self> {
        log::info!("Starting llama-chat state in {}", config.data_dir.display());
        let store = Arc::new(JsonStore::new(config.data_dir.clone())?);

        let chats = Arc::new(ChatStore::new(ChatSettings::with_host(
            config.default_host.clone(),
        )));
        chats.restore(store.load_or_default::<ChatState>(CHAT_STORE));

        let catalog = Arc::new(CatalogStore::new());
        catalog.restore(store.load_or_default::<CatalogSnapshot>(MODEL_STORE));

        // Blocking writes under the store lock, once per claim and settle
        {
            let store = store.clone();
            catalog.subscribe(Box::new(move |snapshot: &CatalogSnapshot| {
                if let Err(e) = store.save(MODEL_STORE, snapshot) {
                    log::warn!("Failed to persist model catalog: {:#}", e);
                }
            }));
        }
        {
            let store = store.clone();
            chats.subscribe(Box::new(move |_: &ChatState, next: &ChatState| {
                if let Err(e) = store.save(CHAT_STORE, next) {
                    log::warn!("Failed to persist chats: {:#}", e);
                }
            }));
        }

        let synchronizer = Arc::new(CatalogSynchronizer::new(
            chats.clone(),
            catalog.clone(),
            gateway.clone(),
            config.default_host.clone(),
        ));
        let scheduler = SyncScheduler::spawn(synchronizer.clone());

        let trigger = scheduler.handle();
        catalog.subscribe(Box::new(move |snapshot: &CatalogSnapshot| {
            if needs_loading_after_change(snapshot) {
                trigger.trigger();
            }
        }));

        let trigger = scheduler.handle();
        chats.subscribe(Box::new(move |prev: &ChatState, next: &ChatState| {
            if hosts_changed(prev, next) {
                log::debug!("Chat hosts changed, scheduling model sync");
                trigger.trigger();
            }
        }));

        let restored = catalog.snapshot();
        let unseen: Vec<String> = synchronizer
            .hosts()
            .into_iter()
            .filter(|host| restored.host_state(host) == FetchState::Absent)
            .collect();
        if needs_loading_after_restore(&restored) {
            log::info!("Model catalog incomplete after restore, scheduling sync");
            scheduler.trigger();
        } else if !unseen.is_empty() {
            log::info!("Chats use hosts missing from the catalog: {:?}", unseen);
            scheduler.trigger();
        }

        Ok(Self {
            config,
            chats,
            catalog,
            gateway,
            scheduler,
        })
    }

    /// Clear the catalog; the empty catalog schedules a full re-discovery
    pub fn reload_models(&self) {
        self.catalog.reload();
    }

    pub fn trigger_sync(&self) {
        self.scheduler.trigger();
    }

    pub async fn wait_idle(&self) {
        self.scheduler.wait_idle().await;
    }

    pub async fn send_message(
        &self,
        chat_id: &str,
        content: &str,
        images: Vec<String>,
    ) -> Result<ChatMessage, ChatError> {
        completion::send_message(&self.chats, self.gateway.as_ref(), chat_id, content, images).await
    }

    pub async fn shutdown(&self) {
        log::info!("Shutting down llama-chat state");
        self.scheduler.shutdown().await;
    }
}
