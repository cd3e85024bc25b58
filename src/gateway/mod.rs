//! Gateway module for talking to LLM servers
//!
//! - provider.rs: ModelGateway trait and GatewayError
//! - types.rs: wire types shared with the catalog
//! - ollama.rs: reqwest implementation for Ollama-compatible hosts

pub mod provider;
pub mod types;
pub mod ollama;

pub use provider::{GatewayError, ModelGateway};
pub use types::{
    ChatHistoryMessage, ChatResponse, ChatRole, ModelDetails, ModelLongData, ModelShortData,
    ModelsResponse,
};
pub use ollama::{OllamaConfig, OllamaGateway};
