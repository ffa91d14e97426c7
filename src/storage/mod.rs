//! Conversation and message persistence.
//!
//! Two tables live in one `SQLite` file:
//! - `conversations`: titled groupings, newest first when listed
//! - `messages`: one row per chat line, owned by a conversation and removed
//!   with it through `ON DELETE CASCADE`

pub mod errors;
pub mod store;
pub mod types;

pub use errors::{StorageError, StorageResult};
pub use store::{ChatStore, SqliteChatStore, StoreFuture};
pub use types::{Conversation, Message, SavedMessage, Sender};
