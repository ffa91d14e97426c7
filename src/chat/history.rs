//! Conversation bootstrap: create-on-first-message and paired message saves.

use crate::storage::{ChatStore, StorageResult};

/// Number of characters of the first message kept in a conversation title.
pub const TITLE_MAX_CHARS: usize = 15;

/// Marker appended to truncated titles.
pub const TITLE_ELLIPSIS: &str = "...";

/// Derive a conversation title from its first message.
#[must_use]
pub fn derive_title(message: &str) -> String {
    match message.char_indices().nth(TITLE_MAX_CHARS) {
        Some((cut, _)) => format!("{}{TITLE_ELLIPSIS}", &message[..cut]),
        None => message.to_string(),
    }
}

/// Return `conversation_id` if given, otherwise create a conversation titled
/// after `message` and return its id.
///
/// # Errors
/// Returns an error if the conversation cannot be created.
pub async fn ensure_conversation(
    store: &dyn ChatStore,
    message: &str,
    conversation_id: Option<i64>,
) -> StorageResult<i64> {
    if let Some(id) = conversation_id {
        return Ok(id);
    }

    let conversation = store.create_conversation(&derive_title(message)).await?;
    tracing::info!(
        conversation_id = conversation.id,
        title = %conversation.title,
        "started conversation"
    );
    Ok(conversation.id)
}

/// Persist the user's text then the generated reply under one conversation.
///
/// # Errors
/// Returns an error if the exchange cannot be stored; neither row is kept then.
pub async fn save_echo_messages(
    store: &dyn ChatStore,
    user_text: &str,
    reply_text: &str,
    conversation_id: i64,
) -> StorageResult<()> {
    store
        .save_exchange(user_text, reply_text, conversation_id)
        .await?;
    Ok(())
}
