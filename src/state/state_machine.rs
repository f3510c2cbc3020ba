use thiserror::Error;

/// High-level phases a play session's round can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// No week chosen yet, or the player went back to week selection.
    Idle,
    /// Questions for the chosen week are being fetched.
    Loading {
        /// Week being fetched.
        week: u32,
    },
    /// A question is on screen and the countdown is running.
    Active,
    /// Every question has been answered or timed out.
    Complete,
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEvent {
    /// Player picked a week to play.
    SelectWeek(u32),
    /// Non-empty question list received.
    LoadSucceeded,
    /// Question source returned an error.
    LoadFailed,
    /// Question source has nothing for the week.
    LoadEmpty,
    /// Answer submitted or timed out with questions remaining.
    Advance,
    /// Answer submitted or timed out on the last question.
    Finish,
    /// Play the same week again.
    Replay,
    /// Discard the round and go back to week selection.
    LeaveRound,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: RoundPhase,
    /// The event that cannot be applied from this phase.
    pub event: RoundEvent,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase of the state machine.
    pub phase: RoundPhase,
    /// Version number (increments on each transition).
    pub version: usize,
}

/// Validates the round lifecycle `Idle -> Loading -> Active -> Complete`.
#[derive(Debug, Clone)]
pub struct RoundStateMachine {
    phase: RoundPhase,
    version: usize,
}

impl Default for RoundStateMachine {
    fn default() -> Self {
        Self {
            phase: RoundPhase::Idle,
            version: 0,
        }
    }
}

impl RoundStateMachine {
    /// Create a new state machine initialised in the idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
        }
    }

    /// Apply an event, returning the new phase.
    pub fn apply(&mut self, event: RoundEvent) -> Result<RoundPhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.phase = next;
        self.version += 1;
        Ok(next)
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: RoundEvent) -> Result<RoundPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (RoundPhase::Idle, RoundEvent::SelectWeek(week)) => RoundPhase::Loading { week },
            (RoundPhase::Loading { .. }, RoundEvent::LoadSucceeded) => RoundPhase::Active,
            (RoundPhase::Loading { .. }, RoundEvent::LoadFailed | RoundEvent::LoadEmpty) => {
                RoundPhase::Idle
            }
            (RoundPhase::Active, RoundEvent::Advance) => RoundPhase::Active,
            (RoundPhase::Active, RoundEvent::Finish) => RoundPhase::Complete,
            (RoundPhase::Complete, RoundEvent::Replay) => RoundPhase::Active,
            (_, RoundEvent::LeaveRound) => RoundPhase::Idle,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
