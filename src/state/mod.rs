pub mod identity;
pub mod play;
pub mod question;
pub mod round;
mod sse;
pub mod state_machine;
pub mod timer;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, watch};
use uuid::Uuid;

use crate::{
    config::AppConfig, dao::trivia_store::TriviaStore, error::ServiceError,
    state::play::PlaySession,
};

pub use self::sse::{SESSION_EVENT_CAPACITY, SessionEvents};

/// Shared handle on the application state.
pub type SharedState = Arc<AppState>;

/// Central application state holding the backend handle and the live play sessions.
pub struct AppState {
    config: AppConfig,
    trivia_store: RwLock<Option<Arc<dyn TriviaStore>>>,
    sessions: DashMap<Uuid, Arc<PlaySession>>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            trivia_store: RwLock::new(None),
            sessions: DashMap::new(),
            degraded: degraded_tx,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current backend, if one is installed.
    pub async fn trivia_store(&self) -> Option<Arc<dyn TriviaStore>> {
        let guard = self.trivia_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current backend, or [`ServiceError::Degraded`] when none is installed.
    pub async fn require_trivia_store(&self) -> Result<Arc<dyn TriviaStore>, ServiceError> {
        self.trivia_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new backend implementation and leave degraded mode.
    pub async fn install_trivia_store(&self, store: Arc<dyn TriviaStore>) {
        {
            let mut guard = self.trivia_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current backend and enter degraded mode.
    pub async fn clear_trivia_store(&self) {
        {
            let mut guard = self.trivia_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Look up a play session and record client activity on it.
    pub fn session(&self, id: Uuid) -> Result<Arc<PlaySession>, ServiceError> {
        let session = self
            .sessions
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ServiceError::NotFound(format!("session `{id}` not found")))?;
        session.touch();
        Ok(session)
    }

    /// Register a freshly created play session.
    pub fn insert_session(&self, session: Arc<PlaySession>) {
        self.sessions.insert(session.id(), session);
    }

    /// Detach a play session. Its timer stops once the last handle is dropped.
    pub fn remove_session(&self, id: Uuid) -> Option<Arc<PlaySession>> {
        self.sessions.remove(&id).map(|(_, session)| session)
    }

    /// Registry of live play sessions.
    pub fn sessions(&self) -> &DashMap<Uuid, Arc<PlaySession>> {
        &self.sessions
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
}
