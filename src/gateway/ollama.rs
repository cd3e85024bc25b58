//! Ollama API gateway
//!
//! Talks to a running Ollama server (default: localhost:11434). The host is passed
//! per request because every chat may point at a different server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::gateway::provider::{GatewayError, ModelGateway};
use crate::gateway::types::{ChatHistoryMessage, ChatResponse, ModelLongData, ModelsResponse};

/// Ollama chat request
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatHistoryMessage],
    stream: bool,
}

/// Ollama show request
#[derive(Debug, Serialize)]
struct OllamaShowRequest<'a> {
    model: &'a str,
}

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self { timeout_secs: 120 }
    }
}

/// Stateless HTTP gateway for Ollama-compatible servers
pub struct OllamaGateway {
    client: Client,
}

impl OllamaGateway {
    pub fn new(config: OllamaConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn with_default_config() -> Result<Self, GatewayError> {
        Self::new(OllamaConfig::default())
    }

    fn url(host: &str, path: &str) -> String {
        format!("{}{}", host.trim_end_matches('/'), path)
    }

    /// Turn a response into the decoded body or a gateway error
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ModelGateway for OllamaGateway {
    async fn fetch_model_list(&self, host: &str) -> Result<ModelsResponse, GatewayError> {
        let url = Self::url(host, "/api/tags");
        log::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Self::decode(response).await
    }

    async fn fetch_model_detail(
        &self,
        host: &str,
        name: &str,
    ) -> Result<ModelLongData, GatewayError> {
        let url = Self::url(host, "/api/show");
        log::debug!("POST {} ({})", url, name);

        let response = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .json(&OllamaShowRequest { model: name })
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Self::decode(response).await
    }

    async fn fetch_chat_completion(
        &self,
        host: &str,
        model: &str,
        messages: &[ChatHistoryMessage],
    ) -> Result<ChatResponse, GatewayError> {
        let url = Self::url(host, "/api/chat");
        log::debug!("POST {} ({}, {} messages)", url, model, messages.len());

        let request = OllamaChatRequest {
            model,
            messages,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Self::decode(response).await
    }
}
