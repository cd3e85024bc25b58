//! Gateway trait and error type
//!
//! Defines the request/response seam between the catalog engine and an LLM server.
//! Implementations are stateless: no retries, no caching.

use async_trait::async_trait;

use crate::gateway::types::{ChatHistoryMessage, ChatResponse, ModelLongData, ModelsResponse};

/// Error types for gateway requests
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Could not reach the server (connection refused, timeout, DNS)
    #[error("Cannot connect to server: {0}")]
    Transport(String),
    /// Server answered with a non-success status
    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },
    /// Response body missing or not in the expected shape
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Collapse the error into the single string stored in the catalog.
    ///
    /// For a status failure this is the response body, which is what servers put
    /// their message in. An empty body falls back to `HTTP <code>`.
    pub fn error_text(&self) -> String {
        match self {
            GatewayError::Status { status, body } => {
                if body.trim().is_empty() {
                    format!("HTTP {}", status)
                } else {
                    body.clone()
                }
            }
            GatewayError::Transport(msg) | GatewayError::Decode(msg) => msg.clone(),
        }
    }
}

/// The requests the client makes against a server host
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// List the models installed on a host
    async fn fetch_model_list(&self, host: &str) -> Result<ModelsResponse, GatewayError>;

    /// Fetch the detail record of a single model
    async fn fetch_model_detail(&self, host: &str, name: &str)
        -> Result<ModelLongData, GatewayError>;

    /// Send one non-streaming chat turn
    async fn fetch_chat_completion(
        &self,
        host: &str,
        model: &str,
        messages: &[ChatHistoryMessage],
    ) -> Result<ChatResponse, GatewayError>;
}
