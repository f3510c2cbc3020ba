use serde::{Deserialize, Serialize};

/// Question row as stored by the question source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Unique identifier, also the ordering key inside a week.
    pub id: i64,
    /// Week the question belongs to.
    pub week: u32,
    /// Prompt shown to the player.
    #[serde(rename = "question")]
    pub text: String,
    /// Raw difficulty label (`easy`, `medium` or `hard`).
    pub difficulty: String,
    /// Accepted answers, compared case-insensitively.
    pub correct_answers: Vec<String>,
}

/// Score written once a signed-in player completes a round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreEntity {
    /// Opaque identifier of the player.
    pub user_id: String,
    /// Week the round was played for.
    pub week: u32,
    /// Final score of the round.
    pub score: u32,
}

/// Leaderboard row joined with the player's display name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardRowEntity {
    /// Display name of the player, when a profile exists.
    pub username: Option<String>,
    /// Recorded score for the week.
    pub score: u32,
}

/// Player identity resolved from an access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    /// Opaque identifier of the player.
    pub id: String,
    /// Display name picked at sign-up.
    pub username: Option<String>,
}

/// Email and password presented to the auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialsEntity {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Account returned by a successful sign-up or password sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSessionEntity {
    /// Bearer token for later requests. Absent while the account awaits email confirmation.
    pub access_token: Option<String>,
    /// The signed-in user.
    pub user: UserEntity,
}

/// How a score sink merges a new score with an existing `(user, week)` record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorePolicy {
    /// The latest completed round replaces the stored score.
    #[default]
    Overwrite,
    /// Only a higher score replaces the stored one.
    KeepBest,
}

impl ScorePolicy {
    /// Merge `incoming` into an optional stored score.
    pub fn merge(self, stored: Option<u32>, incoming: u32) -> u32 {
        match (self, stored) {
            (ScorePolicy::KeepBest, Some(previous)) => previous.max(incoming),
            _ => incoming,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrite_takes_latest_score() {
        assert_eq!(ScorePolicy::Overwrite.merge(Some(30), 12), 12);
        assert_eq!(ScorePolicy::Overwrite.merge(None, 12), 12);
    }

    #[test]
    fn keep_best_retains_maximum() {
        assert_eq!(ScorePolicy::KeepBest.merge(Some(30), 12), 30);
        assert_eq!(ScorePolicy::KeepBest.merge(Some(8), 12), 12);
        assert_eq!(ScorePolicy::KeepBest.merge(None, 12), 12);
    }

    #[test]
    fn question_entity_reads_hosted_column_names() {
        let raw = r#"{"id":7,"week":3,"question":"Who won?","difficulty":"hard","correct_answers":["Eagles"]}"#;
        let entity: QuestionEntity = serde_json::from_str(raw).unwrap();
        assert_eq!(entity.text, "Who won?");
        assert_eq!(entity.correct_answers, vec!["Eagles".to_string()]);
    }
}
