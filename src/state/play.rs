use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::{
    sync::{Mutex, MutexGuard},
    time::Instant,
};
use uuid::Uuid;

use crate::state::{
    identity::{IdentityContext, UserIdentity},
    round::{RoundController, SessionInstance},
    sse::{SESSION_EVENT_CAPACITY, SessionEvents},
    timer::RoundTimer,
};

/// One connected player: their round, its countdown, their identity and their event stream.
pub struct PlaySession {
    id: Uuid,
    controller: Mutex<RoundController>,
    timer: RoundTimer,
    identity: IdentityContext,
    events: SessionEvents,
    completions: CompletionMarker,
    last_seen: std::sync::Mutex<Instant>,
}

/// Latest session instance that completed, shared with in-flight score submissions.
#[derive(Clone, Default)]
pub struct CompletionMarker(Arc<AtomicU64>);

impl CompletionMarker {
    /// Note that `instance` completed. Older instances never move the marker back.
    pub fn record(&self, instance: SessionInstance) {
        self.0.fetch_max(instance.get(), Ordering::SeqCst);
    }

    /// Whether a later instance than `instance` has completed since.
    pub fn is_superseded(&self, instance: SessionInstance) -> bool {
        self.0.load(Ordering::SeqCst) > instance.get()
    }
}

impl PlaySession {
    /// Assemble a session around an already spawned timer.
    pub fn new(
        id: Uuid,
        question_time: u32,
        identity: Option<UserIdentity>,
        timer: RoundTimer,
    ) -> Self {
        Self {
            id,
            controller: Mutex::new(RoundController::new(question_time)),
            timer,
            identity: IdentityContext::new(identity),
            events: SessionEvents::new(SESSION_EVENT_CAPACITY),
            completions: CompletionMarker::default(),
            last_seen: std::sync::Mutex::new(Instant::now()),
        }
    }

    /// Session identifier handed to the client.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Lock the round controller. Every round mutation goes through this lock.
    pub async fn controller(&self) -> MutexGuard<'_, RoundController> {
        self.controller.lock().await
    }

    /// Countdown owner.
    pub fn timer(&self) -> &RoundTimer {
        &self.timer
    }

    /// Identity context of the player.
    pub fn identity(&self) -> &IdentityContext {
        &self.identity
    }

    /// Event hub feeding the session's SSE stream.
    pub fn events(&self) -> &SessionEvents {
        &self.events
    }

    /// Completion marker of the session's rounds.
    pub fn completions(&self) -> &CompletionMarker {
        &self.completions
    }

    /// Record client activity.
    pub fn touch(&self) {
        if let Ok(mut last_seen) = self.last_seen.lock() {
            *last_seen = Instant::now();
        }
    }

    /// Last time the client interacted with the session.
    pub fn last_seen(&self) -> Instant {
        self.last_seen
            .lock()
            .map(|last_seen| *last_seen)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }
}
