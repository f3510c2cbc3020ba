//! Identity context shared by everything attached to one play session.
//!
//! Holds the signed-in player (if any) and fans out sign-in, sign-out and token refresh
//! notifications. Listeners hold an [`IdentitySubscription`]; dropping it unsubscribes.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use tokio::sync::{
    broadcast::{self, error::RecvError},
    watch,
};

use crate::dao::models::UserEntity;

const EVENT_CAPACITY: usize = 8;

/// Player identity as far as the round is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    /// Opaque identifier used as the score key.
    pub id: String,
    /// Display name, when the player picked one.
    pub display_name: Option<String>,
}

impl From<UserEntity> for UserIdentity {
    fn from(value: UserEntity) -> Self {
        Self {
            id: value.id,
            display_name: value.username,
        }
    }
}

/// Change notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    /// A player signed in (or a different player replaced the previous one).
    SignedIn(UserIdentity),
    /// The same player presented a fresh token.
    TokenRefreshed(UserIdentity),
    /// The player signed out.
    SignedOut,
}

/// Current identity plus change stream.
pub struct IdentityContext {
    current: watch::Sender<Option<UserIdentity>>,
    events: broadcast::Sender<IdentityEvent>,
    subscribers: Arc<AtomicUsize>,
}

impl Default for IdentityContext {
    fn default() -> Self {
        Self::new(None)
    }
}

impl IdentityContext {
    /// Create a context, optionally already signed in.
    pub fn new(initial: Option<UserIdentity>) -> Self {
        let (current, _rx) = watch::channel(initial);
        let (events, _rx) = broadcast::channel(EVENT_CAPACITY);
        Self {
            current,
            events,
            subscribers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Identity right now.
    pub fn current(&self) -> Option<UserIdentity> {
        self.current.borrow().clone()
    }

    /// Record a successful token resolution and notify subscribers.
    pub fn sign_in(&self, identity: UserIdentity) -> IdentityEvent {
        let same_user = self
            .current
            .borrow()
            .as_ref()
            .is_some_and(|existing| existing.id == identity.id);
        let event = if same_user {
            IdentityEvent::TokenRefreshed(identity.clone())
        } else {
            IdentityEvent::SignedIn(identity.clone())
        };

        self.current.send_replace(Some(identity));
        let _ = self.events.send(event.clone());
        event
    }

    /// Forget the current identity. Returns `None` when nobody was signed in.
    pub fn sign_out(&self) -> Option<IdentityEvent> {
        self.current.send_replace(None)?;
        let _ = self.events.send(IdentityEvent::SignedOut);
        Some(IdentityEvent::SignedOut)
    }

    /// Register a listener. The returned guard unsubscribes when dropped.
    pub fn subscribe(&self) -> IdentitySubscription {
        self.subscribers.fetch_add(1, Ordering::SeqCst);
        IdentitySubscription {
            current: self.current.subscribe(),
            events: self.events.subscribe(),
            subscribers: self.subscribers.clone(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.load(Ordering::SeqCst)
    }
}

/// Live subscription to an [`IdentityContext`].
pub struct IdentitySubscription {
    current: watch::Receiver<Option<UserIdentity>>,
    events: broadcast::Receiver<IdentityEvent>,
    subscribers: Arc<AtomicUsize>,
}

impl IdentitySubscription {
    /// Identity at the time of the call.
    pub fn current(&self) -> Option<UserIdentity> {
        self.current.borrow().clone()
    }

    /// Wait for the next change. Returns `None` once the context is gone.
    ///
    /// Missed events are skipped; the latest identity is always available via
    /// [`IdentitySubscription::current`].
    pub async fn recv(&mut self) -> Option<IdentityEvent> {
        loop {
            match self.events.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for IdentitySubscription {
    fn drop(&mut self) {
        self.subscribers.fetch_sub(1, Ordering::SeqCst);
    }
}
