use serde::Serialize;
use utoipa::ToSchema;

use crate::dao::models::LeaderboardRowEntity;

/// Name shown for scores whose player has no profile.
pub const ANONYMOUS_PLAYER: &str = "Anonymous";

/// Weeks that currently have questions, most recent first.
#[derive(Debug, Serialize, ToSchema)]
pub struct WeeksResponse {
    pub weeks: Vec<u32>,
}

/// One ranked leaderboard line.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// 1-based position.
    pub rank: usize,
    pub player: String,
    pub score: u32,
}

/// Top scores of a week.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    pub week: u32,
    pub entries: Vec<LeaderboardEntry>,
}

impl LeaderboardResponse {
    /// Rank rows already ordered by score.
    pub fn ranked(week: u32, rows: Vec<LeaderboardRowEntity>) -> Self {
        let entries = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| LeaderboardEntry {
                rank: index + 1,
                player: row
                    .username
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| ANONYMOUS_PLAYER.to_string()),
                score: row.score,
            })
            .collect();
        Self { week, entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_ranked_and_named() {
        let response = LeaderboardResponse::ranked(
            2,
            vec![
                LeaderboardRowEntity {
                    username: Some("blitz".into()),
                    score: 21,
                },
                LeaderboardRowEntity {
                    username: None,
                    score: 6,
                },
            ],
        );
        assert_eq!(
            response.entries,
            vec![
                LeaderboardEntry {
                    rank: 1,
                    player: "blitz".into(),
                    score: 21
                },
                LeaderboardEntry {
                    rank: 2,
                    player: ANONYMOUS_PLAYER.into(),
                    score: 6
                },
            ]
        );
    }
}
