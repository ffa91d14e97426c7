//! Application state shared across all request handlers.

use std::path::PathBuf;
use std::sync::Arc;

use crate::chat::CatFactClient;
use crate::storage::ChatStore;

/// Shared application state.
pub struct AppState {
    /// Conversation and message storage.
    pub store: Arc<dyn ChatStore>,
    /// Client for the cat-facts reply generator.
    pub cat_facts: CatFactClient,
    /// Directory served for non-API paths.
    pub static_dir: PathBuf,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        store: Arc<dyn ChatStore>,
        cat_facts: CatFactClient,
        static_dir: impl Into<PathBuf>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            cat_facts,
            static_dir: static_dir.into(),
        })
    }
}
