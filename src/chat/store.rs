//! Chat store - conversations and the currently open chat
//!
//! Same observable pattern as the catalog store, but subscribers receive both the
//! previous and the next state so they can diff them.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::chat::types::{Chat, ChatMessage, ChatSettings, ChatSettingsUpdate};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatStoreError {
    #[error("Chat with id does not exist: {0}")]
    NotFound(String),
}

/// Persisted chat state
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatState {
    #[serde(default)]
    pub chats: HashMap<String, Chat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_chat_id: Option<String>,
}

impl ChatState {
    /// Distinct hosts referenced by any chat, sorted
    pub fn distinct_hosts(&self) -> Vec<String> {
        self.chats
            .values()
            .map(|chat| chat.chat_settings.host.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Callback fired after every mutation with `(previous, next)`
pub type ChatSubscriber = Box<dyn Fn(&ChatState, &ChatState) + Send + Sync>;

pub struct ChatStore {
    state: Mutex<ChatState>,
    subscribers: Mutex<Vec<ChatSubscriber>>,
    /// Settings given to newly created chats
    default_settings: ChatSettings,
}

impl ChatStore {
    pub fn new(default_settings: ChatSettings) -> Self {
        Self {
            state: Mutex::new(ChatState::default()),
            subscribers: Mutex::new(Vec::new()),
            default_settings,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut ChatState) -> R) -> R {
        let mut state = self.lock();
        let previous = state.clone();
        let result = f(&mut *state);

        let subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for subscriber in subscribers.iter() {
            subscriber(&previous, &*state);
        }
        result
    }

    pub fn subscribe(&self, subscriber: ChatSubscriber) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(subscriber);
    }

    /// Install persisted state without notifying
    pub fn restore(&self, state: ChatState) {
        log::info!("Restored {} chats", state.chats.len());
        *self.lock() = state;
    }

    pub fn state(&self) -> ChatState {
        self.lock().clone()
    }

    pub fn chats(&self) -> HashMap<String, Chat> {
        self.lock().chats.clone()
    }

    pub fn chat(&self, id: &str) -> Option<Chat> {
        self.lock().chats.get(id).cloned()
    }

    pub fn distinct_hosts(&self) -> Vec<String> {
        self.lock().distinct_hosts()
    }

    pub fn set_current_chat_id(&self, id: Option<String>) {
        self.mutate(|state| state.current_chat_id = id)
    }

    pub fn current_chat(&self) -> Option<Chat> {
        let state = self.lock();
        let id = state.current_chat_id.as_ref()?;
        state.chats.get(id).cloned()
    }

    pub fn create_new_chat(&self) -> Chat {
        let chat = Chat::new(self.default_settings.clone());
        log::info!("Created new chat {}", chat.id);

        self.mutate(|state| {
            state.chats.insert(chat.id.clone(), chat.clone());
        });
        chat
    }

    /// Append a message and return the updated history
    pub fn append_chat_history(
        &self,
        id: &str,
        message: ChatMessage,
    ) -> Result<Vec<ChatMessage>, ChatStoreError> {
        // Checked up front so a missing chat does not notify subscribers
        if !self.lock().chats.contains_key(id) {
            return Err(ChatStoreError::NotFound(id.to_string()));
        }

        self.mutate(|state| {
            let chat = state
                .chats
                .get_mut(id)
                .ok_or_else(|| ChatStoreError::NotFound(id.to_string()))?;
            chat.chat_history.push(message);
            chat.touch();
            Ok(chat.chat_history.clone())
        })
    }

    pub fn update_chat_settings(
        &self,
        id: &str,
        update: ChatSettingsUpdate,
    ) -> Result<(), ChatStoreError> {
        if !self.lock().chats.contains_key(id) {
            return Err(ChatStoreError::NotFound(id.to_string()));
        }

        self.mutate(|state| {
            let chat = state
                .chats
                .get_mut(id)
                .ok_or_else(|| ChatStoreError::NotFound(id.to_string()))?;
            update.apply(&mut chat.chat_settings);
            chat.touch();
            Ok(())
        })
    }

    /// Remove a chat; clears the current chat when it was the one removed
    pub fn delete_chat(&self, id: &str) -> Option<Chat> {
        if !self.lock().chats.contains_key(id) {
            return None;
        }

        let removed = self.mutate(|state| {
            let removed = state.chats.remove(id);
            if state.current_chat_id.as_deref() == Some(id) {
                state.current_chat_id = None;
            }
            removed
        });

        if let Some(chat) = &removed {
            log::warn!("Removing chat: {} ({})", chat.id, chat.chat_settings.title);
        }
        removed
    }
}

impl Default for ChatStore {
    fn default() -> Self {
        Self::new(ChatSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::types::DEFAULT_HOST;
    use std::sync::Arc;

    #[test]
    fn test_create_and_update_chat() {
        let store = ChatStore::default();
        let chat = store.create_new_chat();
        assert_eq!(chat.chat_settings.host, DEFAULT_HOST);

        store
            .update_chat_settings(&chat.id, ChatSettingsUpdate::host("http://b"))
            .unwrap();

        let updated = store.chat(&chat.id).unwrap();
        assert_eq!(updated.chat_settings.host, "http://b");
        assert_eq!(updated.chat_settings.model, chat.chat_settings.model);
    }

    #[test]
    fn test_missing_chat_errors_without_notifying() {
        let store = ChatStore::default();
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        store.subscribe(Box::new(move |_: &ChatState, _: &ChatState| *counter.lock().unwrap() += 1));

        assert_eq!(
            store.append_chat_history("nope", ChatMessage::user("hi")),
            Err(ChatStoreError::NotFound("nope".into()))
        );
        assert!(store
            .update_chat_settings("nope", ChatSettingsUpdate::default())
            .is_err());
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_append_returns_history() {
        let store = ChatStore::default();
        let chat = store.create_new_chat();

        store.append_chat_history(&chat.id, ChatMessage::user("one")).unwrap();
        let history = store
            .append_chat_history(&chat.id, ChatMessage::assistant("two"))
            .unwrap();

        let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two"]);
    }

    #[test]
    fn test_delete_clears_current_chat() {
        let store = ChatStore::default();
        let chat = store.create_new_chat();
        store.set_current_chat_id(Some(chat.id.clone()));
        assert_eq!(store.current_chat().map(|c| c.id), Some(chat.id.clone()));

        let removed = store.delete_chat(&chat.id).unwrap();
        assert_eq!(removed.id, chat.id);
        assert!(store.state().current_chat_id.is_none());
        assert!(store.delete_chat(&chat.id).is_none());
    }

    #[test]
    fn test_deleting_missing_chat_does_not_notify() {
        let store = ChatStore::default();
        store.create_new_chat();
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        store.subscribe(Box::new(move |_: &ChatState, _: &ChatState| *counter.lock().unwrap() += 1));

        assert!(store.delete_chat("nope").is_none());
        assert_eq!(*calls.lock().unwrap(), 0);
        assert_eq!(store.chats().len(), 1);
    }

    #[test]
    fn test_distinct_hosts() {
        let store = ChatStore::default();
        let a = store.create_new_chat();
        let b = store.create_new_chat();
        store.create_new_chat();
        store
            .update_chat_settings(&a.id, ChatSettingsUpdate::host("http://a"))
            .unwrap();
        store
            .update_chat_settings(&b.id, ChatSettingsUpdate::host("http://a"))
            .unwrap();

        assert_eq!(
            store.distinct_hosts(),
            vec!["http://a".to_string(), DEFAULT_HOST.to_string()]
        );
    }

    #[test]
    fn test_subscribers_see_previous_and_next() {
        let store = ChatStore::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        store.subscribe(Box::new(move |prev: &ChatState, next: &ChatState| {
            log.lock().unwrap().push((prev.chats.len(), next.chats.len()));
        }));

        let chat = store.create_new_chat();
        store.delete_chat(&chat.id);

        assert_eq!(*seen.lock().unwrap(), vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let store = ChatStore::default();
        let chat = store.create_new_chat();
        store.set_current_chat_id(Some(chat.id.clone()));

        let json = serde_json::to_string(&store.state()).unwrap();
        assert!(json.contains("currentChatId"));

        let restored = ChatStore::default();
        restored.restore(serde_json::from_str(&json).unwrap());
        assert_eq!(restored.current_chat().map(|c| c.id), Some(chat.id));
    }
}
