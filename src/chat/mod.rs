//! Chat module for conversations with a local LLM server
//!
//! Module structure:
//! - types.rs: Chat, ChatMessage, ChatSettings and defaults
//! - store.rs: ChatStore, the observable conversation container
//! - completion.rs: send_message with history windowing

pub mod types;
pub mod store;
pub mod completion;

pub use types::{Chat, ChatMessage, ChatSettings, ChatSettingsUpdate, DEFAULT_HOST};
pub use store::{ChatState, ChatStore, ChatStoreError, ChatSubscriber};
pub use completion::{build_request_history, send_message, ChatError};
