//! `SQLite`-backed conversation and message store.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use tokio_rusqlite::Connection;

use super::errors::{StorageError, StorageResult};
use super::types::{Conversation, Message, SavedMessage, Sender};

/// Boxed future type for store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Schema applied by [`SqliteChatStore::initialize`].
///
/// Foreign keys are off by default in `SQLite`; the cascade on
/// `messages.conversation_id` only fires with the pragma enabled.
const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;
    CREATE TABLE IF NOT EXISTS conversations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        conversation_id INTEGER NOT NULL,
        text TEXT NOT NULL,
        sender TEXT NOT NULL DEFAULT 'user',
        timestamp INTEGER NOT NULL,
        FOREIGN KEY (conversation_id) REFERENCES conversations (id) ON DELETE CASCADE
    );";

/// Conversation and message storage.
pub trait ChatStore: Send + Sync {
    /// Insert a new conversation with the given title.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn create_conversation(&self, title: &str) -> StoreFuture<'_, StorageResult<Conversation>>;

    /// Insert one message under an existing conversation.
    ///
    /// # Errors
    /// Returns an error if storage access fails or the conversation does not exist.
    fn save_message(
        &self,
        text: &str,
        sender: Sender,
        conversation_id: i64,
    ) -> StoreFuture<'_, StorageResult<SavedMessage>>;

    /// Insert a user message followed by its reply, atomically.
    ///
    /// # Errors
    /// Returns an error if either insert fails; nothing is persisted in that case.
    fn save_exchange(
        &self,
        user_text: &str,
        reply_text: &str,
        conversation_id: i64,
    ) -> StoreFuture<'_, StorageResult<(SavedMessage, SavedMessage)>>;

    /// List every conversation, newest first.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn get_conversations(&self) -> StoreFuture<'_, StorageResult<Vec<Conversation>>>;

    /// List the messages of one conversation in chronological order.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn get_messages_by_conversation_id(
        &self,
        conversation_id: i64,
    ) -> StoreFuture<'_, StorageResult<Vec<Message>>>;

    /// List the messages of the newest conversation, or nothing if there is none.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn get_latest_messages(&self) -> StoreFuture<'_, StorageResult<Vec<Message>>>;

    /// Delete a conversation and its messages. Returns the number of
    /// conversations removed; an unknown id removes nothing.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn delete_conversation(&self, conversation_id: i64) -> StoreFuture<'_, StorageResult<u64>>;

    /// Remove every message and every conversation.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn clear_messages(&self) -> StoreFuture<'_, StorageResult<()>>;
}

/// `SQLite` implementation of [`ChatStore`].
pub struct SqliteChatStore {
    conn: Connection,
}

impl SqliteChatStore {
    /// Open (or create) the database file at `path`.
    ///
    /// Missing parent directories are created. Call [`Self::initialize`]
    /// before any other operation.
    ///
    /// # Errors
    /// Returns an error if the directory or the database cannot be opened.
    pub async fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let conn = Connection::open(path).await?;
        tracing::debug!(path = %path.display(), "opened chat database");
        Ok(Self { conn })
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns an error if the connection thread cannot be started.
    pub async fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory().await?;
        Ok(Self { conn })
    }

    /// Create both tables if absent and enable foreign-key enforcement.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be applied.
    pub async fn initialize(&self) -> StorageResult<()> {
        self.conn
            .call(|conn| {
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Close the connection and stop its worker thread.
    ///
    /// # Errors
    /// Returns an error if `SQLite` refuses to close the handle.
    pub async fn close(self) -> StorageResult<()> {
        self.conn.close().await?;
        Ok(())
    }
}

fn timestamp_from_millis(millis: i64) -> StorageResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| StorageError::InvalidRow(format!("invalid timestamp: {millis}")))
}

type MessageRow = (i64, String, String, i64);

fn message_from_row((id, text, sender, ts): MessageRow) -> StorageResult<Message> {
    let sender = Sender::from_str(&sender)
        .map_err(|err| StorageError::InvalidRow(format!("invalid sender: {err}")))?;
    Ok(Message {
        id,
        text,
        sender,
        timestamp: timestamp_from_millis(ts)?,
    })
}

fn read_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

impl ChatStore for SqliteChatStore {
    fn create_conversation(&self, title: &str) -> StoreFuture<'_, StorageResult<Conversation>> {
        let title = title.to_string();
        Box::pin(async move {
            let created_at = Utc::now();
            let created_ms = created_at.timestamp_millis();
            let row_title = title.clone();
            let id = self
                .conn
                .call(move |conn| {
                    conn.execute(
                        "INSERT INTO conversations (title, created_at) VALUES (?1, ?2)",
                        rusqlite::params![row_title, created_ms],
                    )?;
                    Ok(conn.last_insert_rowid())
                })
                .await?;

            tracing::debug!(conversation_id = id, "created conversation");
            Ok(Conversation {
                id,
                title,
                created_at: timestamp_from_millis(created_ms)?,
            })
        })
    }

    fn save_message(
        &self,
        text: &str,
        sender: Sender,
        conversation_id: i64,
    ) -> StoreFuture<'_, StorageResult<SavedMessage>> {
        let text = text.to_string();
        Box::pin(async move {
            let ts = Utc::now().timestamp_millis();
            let row_text = text.clone();
            let id = self
                .conn
                .call(move |conn| {
                    conn.execute(
                        "INSERT INTO messages (conversation_id, text, sender, timestamp)
                         VALUES (?1, ?2, ?3, ?4)",
                        rusqlite::params![conversation_id, row_text, sender.as_str(), ts],
                    )?;
                    Ok(conn.last_insert_rowid())
                })
                .await?;
            Ok(SavedMessage { id, text })
        })
    }

    fn save_exchange(
        &self,
        user_text: &str,
        reply_text: &str,
        conversation_id: i64,
    ) -> StoreFuture<'_, StorageResult<(SavedMessage, SavedMessage)>> {
        let user_text = user_text.to_string();
        let reply_text = reply_text.to_string();
        Box::pin(async move {
            let ts = Utc::now().timestamp_millis();
            let rows = [(user_text.clone(), Sender::User), (reply_text.clone(), Sender::Echo)];
            let (user_id, reply_id) = self
                .conn
                .call(move |conn| {
                    let tx = conn.transaction()?;
                    let mut ids = [0_i64; 2];
                    {
                        let mut stmt = tx.prepare(
                            "INSERT INTO messages (conversation_id, text, sender, timestamp)
                             VALUES (?1, ?2, ?3, ?4)",
                        )?;
                        for (slot, (text, sender)) in ids.iter_mut().zip(rows) {
                            *slot = stmt.insert(rusqlite::params![
                                conversation_id,
                                text,
                                sender.as_str(),
                                ts
                            ])?;
                        }
                    }
                    tx.commit()?;
                    Ok((ids[0], ids[1]))
                })
                .await?;

            Ok((
                SavedMessage {
                    id: user_id,
                    text: user_text,
                },
                SavedMessage {
                    id: reply_id,
                    text: reply_text,
                },
            ))
        })
    }

    fn get_conversations(&self) -> StoreFuture<'_, StorageResult<Vec<Conversation>>> {
        Box::pin(async move {
            let rows = self
                .conn
                .call(|conn| {
                    let mut stmt = conn.prepare(
                        "SELECT id, title, created_at
                         FROM conversations
                         ORDER BY created_at DESC, id DESC",
                    )?;
                    let rows = stmt
                        .query_map([], |row| {
                            let id: i64 = row.get(0)?;
                            let title: String = row.get(1)?;
                            let created_at: i64 = row.get(2)?;
                            Ok((id, title, created_at))
                        })?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                    Ok(rows)
                })
                .await?;

            rows.into_iter()
                .map(|(id, title, created_at)| {
                    Ok(Conversation {
                        id,
                        title,
                        created_at: timestamp_from_millis(created_at)?,
                    })
                })
                .collect()
        })
    }

    fn get_messages_by_conversation_id(
        &self,
        conversation_id: i64,
    ) -> StoreFuture<'_, StorageResult<Vec<Message>>> {
        Box::pin(async move {
            let rows = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(
                        "SELECT id, text, sender, timestamp
                         FROM messages
                         WHERE conversation_id = ?1
                         ORDER BY timestamp ASC, id ASC",
                    )?;
                    let rows = stmt
                        .query_map(rusqlite::params![conversation_id], read_message_row)?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                    Ok(rows)
                })
                .await?;

            rows.into_iter().map(message_from_row).collect()
        })
    }

    fn get_latest_messages(&self) -> StoreFuture<'_, StorageResult<Vec<Message>>> {
        Box::pin(async move {
            let rows = self
                .conn
                .call(|conn| {
                    let mut stmt = conn.prepare(
                        "SELECT id, text, sender, timestamp
                         FROM messages
                         WHERE conversation_id = (
                             SELECT id FROM conversations
                             ORDER BY created_at DESC, id DESC
                             LIMIT 1
                         )
                         ORDER BY timestamp ASC, id ASC",
                    )?;
                    let rows = stmt
                        .query_map([], read_message_row)?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                    Ok(rows)
                })
                .await?;

            rows.into_iter().map(message_from_row).collect()
        })
    }

    fn delete_conversation(&self, conversation_id: i64) -> StoreFuture<'_, StorageResult<u64>> {
        Box::pin(async move {
            let removed = self
                .conn
                .call(move |conn| {
                    let removed = conn.execute(
                        "DELETE FROM conversations WHERE id = ?1",
                        rusqlite::params![conversation_id],
                    )?;
                    Ok(removed)
                })
                .await?;
            u64::try_from(removed)
                .map_err(|_| StorageError::InvalidRow("deleted row count exceeds u64".to_string()))
        })
    }

    fn clear_messages(&self) -> StoreFuture<'_, StorageResult<()>> {
        Box::pin(async move {
            self.conn
                .call(|conn| {
                    conn.execute_batch(
                        "DELETE FROM messages;
                         DELETE FROM conversations;",
                    )?;
                    Ok(())
                })
                .await?;
            tracing::info!("cleared all conversations");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteChatStore {
        let store = SqliteChatStore::open_in_memory().await.unwrap();
        store.initialize().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let store = store().await;
        store.initialize().await.unwrap();
        store.initialize().await.unwrap();
        assert!(store.get_conversations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_conversation_assigns_ids() {
        let store = store().await;
        let first = store.create_conversation("first").await.unwrap();
        let second = store.create_conversation("second").await.unwrap();

        assert_eq!(first.title, "first");
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn test_conversations_listed_newest_first() {
        let store = store().await;
        let older = store.create_conversation("older").await.unwrap();
        let newer = store.create_conversation("newer").await.unwrap();

        let listed = store.get_conversations().await.unwrap();
        let ids: Vec<i64> = listed.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[tokio::test]
    async fn test_messages_returned_in_insertion_order() {
        let store = store().await;
        let conv = store.create_conversation("chat").await.unwrap();
        for text in ["one", "two", "three"] {
            store.save_message(text, Sender::User, conv.id).await.unwrap();
        }

        let messages = store.get_messages_by_conversation_id(conv.id).await.unwrap();
        let texts: Vec<&str> = messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert!(messages.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test]
    async fn test_save_message_requires_existing_conversation() {
        let store = store().await;
        let result = store.save_message("orphan", Sender::User, 404).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_save_exchange_orders_user_then_echo() {
        let store = store().await;
        let conv = store.create_conversation("chat").await.unwrap();
        let (user, reply) = store.save_exchange("ping", "pong", conv.id).await.unwrap();
        assert!(reply.id > user.id);

        let messages = store.get_messages_by_conversation_id(conv.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].text, "ping");
        assert_eq!(messages[1].sender, Sender::Echo);
        assert_eq!(messages[1].text, "pong");
    }

    #[tokio::test]
    async fn test_save_exchange_rolls_back_on_failure() {
        let store = store().await;
        let result = store.save_exchange("ping", "pong", 99).await;
        assert!(result.is_err());

        let conv = store.create_conversation("chat").await.unwrap();
        assert!(store.get_messages_by_conversation_id(conv.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_messages_scoped_to_conversation() {
        let store = store().await;
        let a = store.create_conversation("a").await.unwrap();
        let b = store.create_conversation("b").await.unwrap();
        store.save_message("for a", Sender::User, a.id).await.unwrap();
        store.save_message("for b", Sender::Echo, b.id).await.unwrap();

        let messages = store.get_messages_by_conversation_id(b.id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "for b");
        assert!(store.get_messages_by_conversation_id(12345).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_latest_messages_follow_newest_conversation() {
        let store = store().await;
        assert!(store.get_latest_messages().await.unwrap().is_empty());

        let older = store.create_conversation("older").await.unwrap();
        store.save_exchange("old", "old", older.id).await.unwrap();
        let newer = store.create_conversation("newer").await.unwrap();
        assert!(store.get_latest_messages().await.unwrap().is_empty());

        store.save_exchange("new", "new", newer.id).await.unwrap();
        store.save_message("more", Sender::User, older.id).await.unwrap();

        let latest = store.get_latest_messages().await.unwrap();
        let texts: Vec<&str> = latest.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["new", "new"]);
        assert_eq!(latest[1].sender, Sender::Echo);
    }

    #[tokio::test]
    async fn test_delete_conversation_cascades() {
        let store = store().await;
        let keep = store.create_conversation("keep").await.unwrap();
        let gone = store.create_conversation("gone").await.unwrap();
        store.save_exchange("hi", "hi", keep.id).await.unwrap();
        store.save_exchange("bye", "bye", gone.id).await.unwrap();

        assert_eq!(store.delete_conversation(gone.id).await.unwrap(), 1);

        let listed = store.get_conversations().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, keep.id);
        assert!(store.get_messages_by_conversation_id(gone.id).await.unwrap().is_empty());
        assert_eq!(store.get_messages_by_conversation_id(keep.id).await.unwrap().len(), 2);

        let orphans: i64 = store
            .conn
            .call(|conn| {
                let count = conn.query_row(
                    "SELECT COUNT(*) FROM messages
                     WHERE conversation_id NOT IN (SELECT id FROM conversations)",
                    [],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn test_delete_missing_conversation_is_noop() {
        let store = store().await;
        store.create_conversation("stay").await.unwrap();
        assert_eq!(store.delete_conversation(777).await.unwrap(), 0);
        assert_eq!(store.get_conversations().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_messages_removes_everything() {
        let store = store().await;
        let conv = store.create_conversation("chat").await.unwrap();
        store.save_exchange("a", "a", conv.id).await.unwrap();

        store.clear_messages().await.unwrap();

        assert!(store.get_conversations().await.unwrap().is_empty());
        assert!(store.get_messages_by_conversation_id(conv.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_inaccessible_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("occupied");
        std::fs::write(&file, b"not a directory").unwrap();

        let result = SqliteChatStore::open(file.join("sub").join("conversation.db")).await;
        assert!(matches!(result, Err(StorageError::Io(_))));
    }

    #[tokio::test]
    async fn test_file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("conversation.db");

        let store = SqliteChatStore::open(&path).await.unwrap();
        store.initialize().await.unwrap();
        let conv = store.create_conversation("persisted").await.unwrap();
        store.save_message("kept", Sender::User, conv.id).await.unwrap();
        store.close().await.unwrap();

        let reopened = SqliteChatStore::open(&path).await.unwrap();
        reopened.initialize().await.unwrap();
        let listed = reopened.get_conversations().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "persisted");
        let messages = reopened.get_messages_by_conversation_id(conv.id).await.unwrap();
        assert_eq!(messages[0].text, "kept");
        reopened.close().await.unwrap();
    }
}
