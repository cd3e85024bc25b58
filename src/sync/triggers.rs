//! Chat-to-host trigger

use crate::chat::store::ChatState;

/// Whether a chat store mutation may have changed the set of hosts to sync.
///
/// Compared per chat rather than as a host set, so moving chat A onto a host
/// that chat B already uses still counts. A deleted chat counts too: removing
/// the last chat brings the default host back into play.
pub fn hosts_changed(prev: &ChatState, next: &ChatState) -> bool {
    let edited = next.chats.iter().any(|(id, chat)| match prev.chats.get(id) {
        Some(before) => before.chat_settings.host != chat.chat_settings.host,
        None => true,
    });

    edited || prev.chats.keys().any(|id| !next.chats.contains_key(id))
}
