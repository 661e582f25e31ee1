//! Application state: configuration, the question repository (or its load error),
//! and the bookmark store.
//!
//! This module owns:
//!   - the repository, loaded once at startup and shared read-only by all sessions
//!   - the load error text when the repository could not be loaded
//!   - the key-value store that bookmark sets are written through to
//!
//! Sessions themselves are not stored here; each connection owns its own.

use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::bookmarks::{Bookmarks, JsonFileStore, KeyValueStore, MemoryStore};
use crate::config::AppConfig;
use crate::logic::ViewSettings;
use crate::repository::Repository;
use crate::session::Session;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    repository: Result<Arc<Repository>, String>,
    store: Arc<dyn KeyValueStore>,
}

impl AppState {
    /// Load the repository named by the config and open the bookmark store.
    /// A load failure is kept, not raised: sessions report it to the page.
    #[instrument(level = "info", skip_all)]
    pub async fn load(config: AppConfig) -> Self {
        let repository = match Repository::load(&config.data_path).await {
            Ok(repo) => {
                for (kind, count) in repo.counts_by_type() {
                    info!(target: "quizdeck", %kind, count, "Startup question inventory");
                }
                repo.audit_images(&config.static_dir);
                Ok(Arc::new(repo))
            }
            Err(e) => {
                error!(target: "quizdeck", path = %config.data_path.display(), error = %e, "Question repository failed to load");
                Err(e.to_string())
            }
        };
        Self::with_repository(config, repository)
    }

    pub fn with_repository(config: AppConfig, repository: Result<Arc<Repository>, String>) -> Self {
        let store: Arc<dyn KeyValueStore> = match &config.bookmarks_path {
            Some(path) => {
                info!(target: "quizdeck", path = %path.display(), key = %config.bookmark_key, "Bookmarks persisted to file");
                Arc::new(JsonFileStore::new(path.clone()))
            }
            None => {
                info!(target: "quizdeck", "Bookmarks kept in memory only");
                Arc::new(MemoryStore::default())
            }
        };
        Self { config, repository, store }
    }

    pub fn repository(&self) -> Result<&Arc<Repository>, &str> {
        self.repository.as_ref().map_err(String::as_str)
    }

    /// Current bookmark set, freshly read from the store.
    pub fn load_bookmarks(&self) -> Bookmarks {
        Bookmarks::load(self.store.clone(), &self.config.bookmark_key)
    }

    /// A fresh session over the full repository, or the load error text.
    pub fn new_session(&self) -> Result<Session, &str> {
        let repo = self.repository()?;
        Ok(Session::new(repo.clone(), self.load_bookmarks()))
    }

    pub fn view_settings(&self) -> ViewSettings {
        ViewSettings {
            swipe_threshold_px: self.config.swipe_threshold_px,
            jump_block: self.config.jump_block,
        }
    }
}
