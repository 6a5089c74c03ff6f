mod identity;
pub mod search;
mod sse;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::{catalog::CatalogClient, session_store::SessionStore},
    error::ServiceError,
};

pub use self::identity::IdentityRegistry;
pub use self::search::{SearchController, SearchRegistry};
pub use self::sse::{Audience, FeedEvent, SseHub};

pub type SharedState = Arc<AppState>;

/// Central application state: storage handle, catalog client, tokens, widgets and feed.
pub struct AppState {
    config: AppConfig,
    session_store: RwLock<Option<Arc<dyn SessionStore>>>,
    catalog: Arc<dyn CatalogClient>,
    feed: SseHub,
    identity: IdentityRegistry,
    searches: SearchRegistry,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig, catalog: Arc<dyn CatalogClient>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            feed: SseHub::new(config.feed.capacity),
            config,
            session_store: RwLock::new(None),
            catalog,
            identity: IdentityRegistry::new(),
            searches: SearchRegistry::new(),
            degraded: degraded_tx,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current session store, if one is installed.
    pub async fn session_store(&self) -> Option<Arc<dyn SessionStore>> {
        let guard = self.session_store.read().await;
        guard.as_ref().cloned()
    }

    /// Session store to serve a request with, or [`ServiceError::Degraded`].
    pub async fn require_session_store(&self) -> Result<Arc<dyn SessionStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.session_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new session store implementation and leave degraded mode.
    pub async fn set_session_store(&self, store: Arc<dyn SessionStore>) {
        {
            let mut guard = self.session_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    pub fn catalog(&self) -> Arc<dyn CatalogClient> {
        self.catalog.clone()
    }

    /// Broadcast hub backing every live feed stream.
    pub fn feed(&self) -> &SseHub {
        &self.feed
    }

    pub fn identity(&self) -> &IdentityRegistry {
        &self.identity
    }

    pub fn searches(&self) -> &SearchRegistry {
        &self.searches
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::memory_state;
    use super::*;
    use crate::dao::session_store::memory::MemorySessionStore;

    #[tokio::test]
    async fn starts_degraded_until_a_store_is_installed() {
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(test_support::FakeCatalog::default()),
        );
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_session_store().await,
            Err(ServiceError::Degraded)
        ));

        let mut watcher = state.degraded_watcher();
        state
            .set_session_store(Arc::new(MemorySessionStore::new()))
            .await;
        assert!(watcher.has_changed().unwrap());
        assert!(!*watcher.borrow_and_update());
        assert!(state.require_session_store().await.is_ok());
    }

    #[tokio::test]
    async fn degraded_flag_blocks_store_access() {
        let state = memory_state().await;
        state.update_degraded(true);
        assert!(matches!(
            state.require_session_store().await,
            Err(ServiceError::Degraded)
        ));
        state.update_degraded(false);
        assert!(state.require_session_store().await.is_ok());
    }
}
