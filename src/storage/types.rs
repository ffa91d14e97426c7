//! Row models for conversations and messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Author of a stored message.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// Text typed by the person chatting.
    #[default]
    User,
    /// Reply produced by the server.
    Echo,
}

impl Sender {
    /// Stable string form for storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Echo => "echo",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Sender {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "echo" => Ok(Self::Echo),
            _ => Err(value.to_string()),
        }
    }
}

/// A conversation as listed in the sidebar.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Identifier assigned by the database.
    pub id: i64,
    /// Title derived from the first message.
    pub title: String,
    /// Creation time, immutable.
    pub created_at: DateTime<Utc>,
}

/// A message belonging to one conversation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier assigned by the database.
    pub id: i64,
    /// Message body, possibly empty.
    pub text: String,
    /// Author of the message.
    pub sender: Sender,
    /// Insertion time, used for ordering.
    pub timestamp: DateTime<Utc>,
}

/// Acknowledgement returned after a single insert.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SavedMessage {
    /// Identifier assigned by the database.
    pub id: i64,
    /// Stored text.
    pub text: String,
}
