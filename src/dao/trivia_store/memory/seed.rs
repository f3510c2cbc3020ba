//! Seed data for the in-memory backend, read from JSON or baked into the binary.

use std::{fs, io::ErrorKind, path::Path};

use serde::Deserialize;
use tracing::{info, warn};

use crate::dao::models::{QuestionEntity, UserEntity};

/// Questions and users preloaded into a [`super::MemoryTriviaStore`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemorySeed {
    /// Question rows, in any order.
    #[serde(default)]
    pub questions: Vec<QuestionEntity>,
    /// Access tokens accepted by the in-memory identity provider.
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

/// A user reachable through a fixed access token, and by password when credentials are set.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    /// Token the client presents.
    pub access_token: String,
    /// Identifier used as the score key.
    pub id: String,
    /// Display name on the leaderboard.
    #[serde(default)]
    pub username: Option<String>,
    /// Sign-in email.
    #[serde(default)]
    pub email: Option<String>,
    /// Sign-in password.
    #[serde(default)]
    pub password: Option<String>,
}

impl From<&SeedUser> for UserEntity {
    fn from(value: &SeedUser) -> Self {
        Self {
            id: value.id.clone(),
            username: value.username.clone(),
        }
    }
}

impl MemorySeed {
    /// Read the seed at `path`, falling back to [`MemorySeed::builtin`] when absent or invalid.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            info!("no seed file configured; using built-in questions");
            return Self::builtin();
        };

        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<MemorySeed>(&contents) {
                Ok(seed) => {
                    info!(
                        path = %path.display(),
                        questions = seed.questions.len(),
                        users = seed.users.len(),
                        "loaded question seed"
                    );
                    seed
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse seed; using built-in questions"
                    );
                    Self::builtin()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "seed file not found; using built-in questions");
                Self::builtin()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read seed; using built-in questions"
                );
                Self::builtin()
            }
        }
    }

    /// Two short weeks of questions and a local demo account.
    pub fn builtin() -> Self {
        Self {
            questions: vec![
                question(
                    1,
                    1,
                    "Which quarterback has won the most Super Bowls?",
                    "easy",
                    &["Tom Brady", "Brady"],
                ),
                question(
                    2,
                    1,
                    "Which team won Super Bowl LVIII?",
                    "medium",
                    &["Kansas City Chiefs", "Chiefs", "Kansas City"],
                ),
                question(
                    3,
                    1,
                    "Which stadium hosted Super Bowl LVIII?",
                    "hard",
                    &["Allegiant Stadium"],
                ),
                question(
                    4,
                    2,
                    "How many points is a touchdown worth?",
                    "easy",
                    &["6", "six"],
                ),
                question(
                    5,
                    2,
                    "How many yards separate the two goal lines?",
                    "medium",
                    &["100", "one hundred"],
                ),
                question(
                    6,
                    2,
                    "Which team finished the NFL's only perfect season with a Super Bowl win?",
                    "hard",
                    &["Miami Dolphins", "Dolphins"],
                ),
            ],
            users: vec![SeedUser {
                access_token: "demo-token".into(),
                id: "demo-user".into(),
                username: Some("demo".into()),
                email: Some("demo@weeklyblitz.local".into()),
                password: Some("demo-password".into()),
            }],
        }
    }
}

fn question(id: i64, week: u32, text: &str, difficulty: &str, answers: &[&str]) -> QuestionEntity {
    QuestionEntity {
        id,
        week,
        text: text.into(),
        difficulty: difficulty.into(),
        correct_answers: answers.iter().map(|answer| answer.to_string()).collect(),
    }
}
