use std::time::SystemTime;

use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::{
    format_system_time,
    identity::IdentityResponse,
    round::{JudgementDto, RoundSnapshot},
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// First message of a session stream.
pub struct Handshake {
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
    pub snapshot: RoundSnapshot,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// One second elapsed on the question on screen.
pub struct TickEvent {
    pub round_instance: u64,
    pub question_index: usize,
    pub time_remaining: u32,
}

#[derive(Debug, Serialize, ToSchema)]
/// A question was answered or timed out.
pub struct AdvancedEvent {
    pub question_id: i64,
    pub result: JudgementDto,
    pub points_awarded: u32,
    pub timed_out: bool,
    pub snapshot: RoundSnapshot,
}

#[derive(Debug, Serialize, ToSchema)]
/// The last question was answered or timed out.
pub struct CompletedEvent {
    pub round_instance: u64,
    pub week: u32,
    pub score: u32,
    /// Whether the score is being sent to the leaderboard.
    pub submitted: bool,
    /// RFC 3339 timestamp.
    pub completed_at: String,
}

impl CompletedEvent {
    /// Stamp a completion with the current time.
    pub fn now(round_instance: u64, week: u32, score: u32, submitted: bool) -> Self {
        Self {
            round_instance,
            week,
            score,
            submitted,
            completed_at: format_system_time(SystemTime::now()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast whenever the round phase changes outside of a question step.
pub struct PhaseChangedEvent(pub RoundSnapshot);

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast when the player signs in, refreshes a token or signs out.
pub struct IdentityChangedEvent(pub IdentityResponse);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_event_carries_rfc3339_timestamp() {
        let event = CompletedEvent::now(2, 5, 21, true);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["score"], 21);
        let stamp = json["completed_at"].as_str().unwrap();
        assert!(stamp.contains('T'));
        assert!(stamp.ends_with('Z'));
    }

    #[test]
    fn server_event_serialises_payload() {
        let event = ServerEvent::json(
            Some("round.tick".to_string()),
            &TickEvent {
                round_instance: 1,
                question_index: 0,
                time_remaining: 19,
            },
        )
        .unwrap();
        assert_eq!(event.event.as_deref(), Some("round.tick"));
        assert_eq!(
            event.data,
            r#"{"round_instance":1,"question_index":0,"time_remaining":19}"#
        );
    }
}
