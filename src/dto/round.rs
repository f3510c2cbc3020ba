use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::identity::PlayerDto,
    state::{
        question::Difficulty,
        round::{Judgement, QuestionView, RoundView, Step},
        state_machine::RoundPhase,
    },
};

/// Longest answer accepted from a client.
pub const MAX_ANSWER_LEN: u64 = 200;

/// Round phase exposed to clients.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PhaseDto {
    /// Waiting for a week to be picked.
    Idle,
    /// Questions are being fetched.
    Loading,
    /// A question is on screen.
    Active,
    /// The round is over; the final score is shown.
    Complete,
}

impl From<RoundPhase> for PhaseDto {
    fn from(value: RoundPhase) -> Self {
        match value {
            RoundPhase::Idle => PhaseDto::Idle,
            RoundPhase::Loading { .. } => PhaseDto::Loading,
            RoundPhase::Active => PhaseDto::Active,
            RoundPhase::Complete => PhaseDto::Complete,
        }
    }
}

/// Difficulty label as stored by the question source.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyDto {
    Easy,
    Medium,
    Hard,
}

impl From<Difficulty> for DifficultyDto {
    fn from(value: Difficulty) -> Self {
        match value {
            Difficulty::Easy => DifficultyDto::Easy,
            Difficulty::Medium => DifficultyDto::Medium,
            Difficulty::Hard => DifficultyDto::Hard,
        }
    }
}

/// Question currently on screen. Accepted answers are never sent.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct QuestionDto {
    pub id: i64,
    pub text: String,
    pub difficulty: DifficultyDto,
    pub points: u32,
}

impl From<QuestionView> for QuestionDto {
    fn from(view: QuestionView) -> Self {
        Self {
            id: view.id,
            text: view.text,
            difficulty: view.difficulty.into(),
            points: view.points,
        }
    }
}

/// Everything a client needs to render a play session.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct RoundSnapshot {
    pub session_id: Uuid,
    pub phase: PhaseDto,
    /// Week selected or being played.
    pub week: Option<u32>,
    /// Incremented every time a round starts, including replays.
    pub round_instance: Option<u64>,
    /// Zero-based index of the question on screen; equals `question_count` once complete.
    pub current_index: Option<usize>,
    pub question_count: Option<usize>,
    pub question: Option<QuestionDto>,
    pub time_remaining: Option<u32>,
    pub score: Option<u32>,
    pub pending_answer: Option<String>,
    /// Message of the last failed load, shown on the week picker.
    pub error: Option<String>,
    pub player: Option<PlayerDto>,
}

impl RoundSnapshot {
    /// Build the snapshot of session `session_id`.
    pub fn new(session_id: Uuid, view: RoundView, player: Option<PlayerDto>) -> Self {
        Self {
            session_id,
            phase: view.phase.into(),
            week: view.week,
            round_instance: view.session.map(|session| session.get()),
            current_index: view.current_index,
            question_count: view.question_count,
            question: view.question.map(Into::into),
            time_remaining: view.time_remaining,
            score: view.score,
            pending_answer: view.pending_answer,
            error: view.load_error.map(|error| error.to_string()),
            player,
        }
    }
}

/// Optional access token presented when opening a session.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct CreateSessionRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 4096))]
    pub access_token: Option<String>,
}

/// Week picked on the week selector.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SelectWeekRequest {
    #[validate(range(min = 1))]
    pub week: u32,
}

/// Live edit of the answer box.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AnswerRequest {
    #[validate(length(max = MAX_ANSWER_LEN))]
    pub answer: String,
}

/// Submission of the pending answer, optionally replacing it first.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct SubmitAnswerRequest {
    #[serde(default)]
    #[validate(length(max = MAX_ANSWER_LEN))]
    pub answer: Option<String>,
}

/// Verdict on one question.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JudgementDto {
    Correct,
    Incorrect,
    Unanswered,
}

impl From<Judgement> for JudgementDto {
    fn from(value: Judgement) -> Self {
        match value {
            Judgement::Correct { .. } => JudgementDto::Correct,
            Judgement::Incorrect => JudgementDto::Incorrect,
            Judgement::Unanswered => JudgementDto::Unanswered,
        }
    }
}

/// Outcome of a submitted answer.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitAnswerResponse {
    pub question_id: i64,
    pub result: JudgementDto,
    pub points_awarded: u32,
    pub round_complete: bool,
    pub snapshot: RoundSnapshot,
}

impl SubmitAnswerResponse {
    /// Pair a step with the snapshot taken right after it.
    pub fn new(step: &Step, snapshot: RoundSnapshot) -> Self {
        Self {
            question_id: step.question_id,
            result: step.judgement.into(),
            points_awarded: step.judgement.points(),
            round_complete: step.completion.is_some(),
            snapshot,
        }
    }
}
