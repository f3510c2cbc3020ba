use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        identity::IdentityResponse,
        round::RoundSnapshot,
        sse::{
            AdvancedEvent, CompletedEvent, IdentityChangedEvent, PhaseChangedEvent, ServerEvent,
            SystemStatus, TickEvent,
        },
    },
    state::{
        SharedState,
        identity::IdentityEvent,
        play::PlaySession,
        round::{Completion, Step, TimerKey},
    },
};

/// Event name of the first message of a session stream.
pub const EVENT_HANDSHAKE: &str = "handshake";
const EVENT_TICK: &str = "round.tick";
const EVENT_ADVANCED: &str = "round.advanced";
const EVENT_COMPLETED: &str = "round.completed";
const EVENT_PHASE_CHANGED: &str = "round.phase";
const EVENT_IDENTITY_CHANGED: &str = "identity.changed";
const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Broadcast one second of countdown.
pub fn broadcast_tick(session: &PlaySession, key: TimerKey, time_remaining: u32) {
    let payload = TickEvent {
        round_instance: key.session.get(),
        question_index: key.question_index,
        time_remaining,
    };
    send_session_event(session, EVENT_TICK, &payload);
}

/// Broadcast the verdict on a question together with the resulting snapshot.
pub fn broadcast_advanced(session: &PlaySession, step: &Step, snapshot: RoundSnapshot) {
    let payload = AdvancedEvent {
        question_id: step.question_id,
        result: step.judgement.into(),
        points_awarded: step.judgement.points(),
        timed_out: step.timed_out,
        snapshot,
    };
    send_session_event(session, EVENT_ADVANCED, &payload);
}

/// Broadcast the final score of a round.
pub fn broadcast_completed(session: &PlaySession, completion: &Completion, submitted: bool) {
    let payload = CompletedEvent::now(
        completion.session.get(),
        completion.week,
        completion.score,
        submitted,
    );
    send_session_event(session, EVENT_COMPLETED, &payload);
}

/// Broadcast a phase change that did not come from answering a question.
pub fn broadcast_phase_changed(session: &PlaySession, snapshot: RoundSnapshot) {
    send_session_event(session, EVENT_PHASE_CHANGED, &PhaseChangedEvent(snapshot));
}

/// Build the identity notification for a change.
pub fn identity_changed_event(event: IdentityEvent) -> Option<ServerEvent> {
    let payload = IdentityChangedEvent(IdentityResponse::from(event));
    serialize(EVENT_IDENTITY_CHANGED, &payload)
}

/// Broadcast the degraded flag to every live session.
pub fn broadcast_system_status(state: &SharedState) {
    let payload = SystemStatus {
        degraded: state.is_degraded(),
    };
    let Some(event) = serialize(EVENT_SYSTEM_STATUS, &payload) else {
        return;
    };
    for entry in state.sessions().iter() {
        entry.value().events().publish(event.clone());
    }
}

fn send_session_event(session: &PlaySession, event: &str, payload: &impl Serialize) {
    if let Some(event) = serialize(event, payload) {
        session.events().publish(event);
    }
}

fn serialize(event: &str, payload: &impl Serialize) -> Option<ServerEvent> {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(event, error = %err, "failed to serialize SSE payload");
            None
        }
    }
}
