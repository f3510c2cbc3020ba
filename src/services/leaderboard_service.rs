use crate::{
    dto::leaderboard::{LeaderboardResponse, WeeksResponse},
    error::ServiceError,
    state::SharedState,
};

/// Weeks that can be played, most recent first.
pub async fn available_weeks(state: &SharedState) -> Result<WeeksResponse, ServiceError> {
    let store = state.require_trivia_store().await?;
    let weeks = store.available_weeks().await?;
    Ok(WeeksResponse { weeks })
}

/// Best scores recorded for `week`.
pub async fn leaderboard(
    state: &SharedState,
    week: u32,
) -> Result<LeaderboardResponse, ServiceError> {
    if week == 0 {
        return Err(ServiceError::InvalidInput("week must be at least 1".into()));
    }
    let store = state.require_trivia_store().await?;
    let rows = store
        .leaderboard(week, state.config().leaderboard_limit())
        .await?;
    Ok(LeaderboardResponse::ranked(week, rows))
}

/// Best scores of the most recent week that has questions.
pub async fn latest_leaderboard(state: &SharedState) -> Result<LeaderboardResponse, ServiceError> {
    let store = state.require_trivia_store().await?;
    let week = store
        .available_weeks()
        .await?
        .into_iter()
        .max()
        .ok_or_else(|| ServiceError::NotFound("no weeks have questions yet".into()))?;
    leaderboard(state, week).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{ScoreEntity, ScorePolicy},
            trivia_store::{
                ScoreSink,
                memory::{MemorySeed, MemoryTriviaStore},
            },
        },
        state::AppState,
    };

    #[tokio::test]
    async fn lists_weeks_and_limits_leaderboard() {
        let store = MemoryTriviaStore::from_seed(MemorySeed::builtin(), ScorePolicy::Overwrite);
        for index in 0..15u32 {
            store
                .submit_score(ScoreEntity {
                    user_id: format!("user-{index}"),
                    week: 1,
                    score: index,
                })
                .await
                .unwrap();
        }
        let state = AppState::new(AppConfig::default());
        state.install_trivia_store(Arc::new(store)).await;

        assert_eq!(available_weeks(&state).await.unwrap().weeks, vec![2, 1]);

        let board = leaderboard(&state, 1).await.unwrap();
        assert_eq!(board.entries.len(), 10);
        assert_eq!(board.entries[0].score, 14);
        assert_eq!(board.entries[0].rank, 1);
        assert_eq!(board.entries[9].score, 5);
    }

    #[tokio::test]
    async fn latest_leaderboard_uses_the_newest_week() {
        let store = MemoryTriviaStore::from_seed(MemorySeed::builtin(), ScorePolicy::Overwrite);
        for (week, score) in [(1, 30), (2, 12)] {
            store
                .submit_score(ScoreEntity {
                    user_id: "demo-user".into(),
                    week,
                    score,
                })
                .await
                .unwrap();
        }
        let state = AppState::new(AppConfig::default());
        state.install_trivia_store(Arc::new(store)).await;

        let board = latest_leaderboard(&state).await.unwrap();
        assert_eq!(board.week, 2);
        assert_eq!(board.entries[0].score, 12);
        assert_eq!(board.entries[0].player, "demo");
    }

    #[tokio::test]
    async fn latest_leaderboard_without_weeks_is_not_found() {
        let state = AppState::new(AppConfig::default());
        state
            .install_trivia_store(Arc::new(MemoryTriviaStore::new(ScorePolicy::Overwrite)))
            .await;
        assert!(matches!(
            latest_leaderboard(&state).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn degraded_and_invalid_requests_fail() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(
            leaderboard(&state, 1).await,
            Err(ServiceError::Degraded)
        ));
        assert!(matches!(
            leaderboard(&state, 0).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }
}
