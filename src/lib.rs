// llama-chat - chat client for local LLM servers
//
// Keeps a per-host catalog of models in step with the hosts that chats point at:
// - catalog: observable model catalog with an explicit fetch state machine
// - sync: two-phase list/detail synchronizer and its coalescing scheduler
// - chat: conversations, settings and sending a turn
// - gateway: HTTP access to Ollama-compatible servers
// - persist / config / state: JSON documents on disk and application wiring

pub mod catalog;
pub mod chat;
pub mod config;
pub mod gateway;
pub mod persist;
pub mod state;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{CatalogSnapshot, CatalogStore, FetchState, HostEntry, ModelRecord};
pub use chat::{Chat, ChatError, ChatMessage, ChatSettings, ChatStore};
pub use config::ClientConfig;
pub use gateway::{GatewayError, ModelGateway, OllamaConfig, OllamaGateway};
pub use persist::JsonStore;
pub use state::AppState;
pub use sync::{CatalogSynchronizer, SyncReport, SyncScheduler, SyncTrigger};
