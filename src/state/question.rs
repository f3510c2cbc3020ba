//! Trivia questions and the answer matching rules applied during a round.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::dao::models::QuestionEntity;

/// Difficulty tier of a question; it fixes the points a correct answer is worth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Worth 2 points.
    Easy,
    /// Worth 6 points.
    Medium,
    /// Worth 15 points.
    Hard,
}

impl Difficulty {
    /// Points awarded for a correct answer at this difficulty.
    pub const fn points(self) -> u32 {
        match self {
            Difficulty::Easy => 2,
            Difficulty::Medium => 6,
            Difficulty::Hard => 15,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        f.write_str(label)
    }
}

/// Failure to interpret a stored question.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuestionError {
    /// The difficulty label is not one of `easy`, `medium`, `hard`.
    #[error("unknown difficulty `{0}`")]
    UnknownDifficulty(String),
    /// Question `{0}` lists no usable answer.
    #[error("question {0} has no accepted answer")]
    NoAnswers(i64),
}

impl FromStr for Difficulty {
    type Err = QuestionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(QuestionError::UnknownDifficulty(value.to_string())),
        }
    }
}

/// Normalize free-text input for comparison: trim surrounding whitespace and fold case.
///
/// Returns `None` when nothing but whitespace was typed, which counts as no answer.
pub fn normalize_answer(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// A question loaded into a round. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Unique identifier and ordering key.
    pub id: i64,
    /// Week this question belongs to.
    pub week: u32,
    /// Prompt shown to the player.
    pub text: String,
    /// Difficulty tier.
    pub difficulty: Difficulty,
    /// Normalized accepted answers.
    accepted: Vec<String>,
}

impl Question {
    /// Build a question, normalizing every accepted answer.
    ///
    /// Blank answers are dropped; a question left with none is rejected.
    pub fn new<I, S>(
        id: i64,
        week: u32,
        text: impl Into<String>,
        difficulty: Difficulty,
        correct_answers: I,
    ) -> Result<Self, QuestionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let accepted: Vec<String> = correct_answers
            .into_iter()
            .filter_map(|answer| normalize_answer(answer.as_ref()))
            .collect();

        if accepted.is_empty() {
            return Err(QuestionError::NoAnswers(id));
        }

        Ok(Self {
            id,
            week,
            text: text.into(),
            difficulty,
            accepted,
        })
    }

    /// Points a correct answer to this question is worth.
    pub fn points(&self) -> u32 {
        self.difficulty.points()
    }

    /// Whether `raw` matches one of the accepted answers after normalization.
    pub fn accepts(&self, raw: &str) -> bool {
        normalize_answer(raw).is_some_and(|answer| self.accepts_normalized(&answer))
    }

    /// Exact comparison of an already normalized answer.
    pub fn accepts_normalized(&self, answer: &str) -> bool {
        self.accepted.iter().any(|candidate| candidate == answer)
    }
}

impl TryFrom<QuestionEntity> for Question {
    type Error = QuestionError;

    fn try_from(value: QuestionEntity) -> Result<Self, Self::Error> {
        let difficulty = value.difficulty.parse()?;
        Question::new(
            value.id,
            value.week,
            value.text,
            difficulty,
            value.correct_answers,
        )
    }
}
