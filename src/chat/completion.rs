//! Chat completion - sends one turn of a chat to its host

use crate::chat::store::{ChatStore, ChatStoreError};
use crate::chat::types::{ChatMessage, ChatSettings};
use crate::gateway::provider::{GatewayError, ModelGateway};
use crate::gateway::types::{ChatHistoryMessage, ChatRole};

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error(transparent)]
    Store(#[from] ChatStoreError),
    #[error("Problem getting chat response: {0}")]
    Gateway(#[from] GatewayError),
    #[error("No message in response")]
    EmptyReply,
}

/// Base64 payload of a data URL (`data:image/png;base64,AAAA` -> `AAAA`)
pub fn base64_from_data_url(url: &str) -> &str {
    match url.find(";base64,") {
        Some(idx) => &url[idx + ";base64,".len()..],
        None => url,
    }
}

/// Build the message list sent with a request: the most recent
/// `history_length` messages, preceded by the system message when one is set.
pub fn build_request_history(
    history: &[ChatMessage],
    settings: &ChatSettings,
) -> Vec<ChatHistoryMessage> {
    let start = history.len().saturating_sub(settings.history_length);

    let mut request: Vec<ChatHistoryMessage> = history[start..]
        .iter()
        .map(|msg| ChatHistoryMessage {
            role: msg.role,
            content: msg.content.clone(),
            images: msg
                .images
                .as_ref()
                .filter(|images| !images.is_empty())
                .map(|images| {
                    images
                        .iter()
                        .map(|i| base64_from_data_url(i).to_string())
                        .collect()
                }),
        })
        .collect();

    if !settings.system_message.is_empty() {
        request.insert(
            0,
            ChatHistoryMessage::new(ChatRole::System, settings.system_message.clone()),
        );
    }

    request
}

/// Append a user message, send the chat to its host and append the reply.
///
/// Returns the assistant message that was appended.
pub async fn send_message(
    chats: &ChatStore,
    gateway: &dyn ModelGateway,
    chat_id: &str,
    content: &str,
    images: Vec<String>,
) -> Result<ChatMessage, ChatError> {
    let settings = chats
        .chat(chat_id)
        .ok_or_else(|| ChatStoreError::NotFound(chat_id.to_string()))?
        .chat_settings;

    let history =
        chats.append_chat_history(chat_id, ChatMessage::user(content).with_images(images))?;
    let request = build_request_history(&history, &settings);

    let response = gateway
        .fetch_chat_completion(&settings.host, &settings.model, &request)
        .await
        .map_err(|e| {
            log::error!("Problem getting chat response: {}", e);
            e
        })?;

    let Some(reply) = response.message else {
        log::error!("No message in response from {}", settings.host);
        return Err(ChatError::EmptyReply);
    };

    let message = ChatMessage::new(reply.role, reply.content);
    chats.append_chat_history(chat_id, message.clone())?;

    Ok(message)
}
