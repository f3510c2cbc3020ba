use tracing::warn;

use crate::{
    dto::health::{BackendProbe, HealthResponse},
    state::SharedState,
};

/// Probe the installed backend and report it with the live session count.
///
/// A failed probe flips the degraded flag so the storage supervisor starts reconnecting.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let probe = match state.trivia_store().await {
        Some(store) => match store.health_check().await {
            Ok(()) => BackendProbe::Reachable,
            Err(err) => {
                warn!(error = %err, "trivia backend probe failed");
                state.update_degraded(true);
                BackendProbe::Unreachable
            }
        },
        None => BackendProbe::Missing,
    };

    HealthResponse::from_probe(probe, state.sessions().len())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{models::ScorePolicy, trivia_store::memory::MemoryTriviaStore},
        state::AppState,
    };

    #[tokio::test]
    async fn missing_backend_reports_degraded() {
        let state = AppState::new(AppConfig::default());
        let health = health_status(&state).await;
        assert_eq!(health.backend, BackendProbe::Missing);
        assert_eq!(health.status, "degraded");
    }

    #[tokio::test]
    async fn installed_backend_reports_ok() {
        let state = AppState::new(AppConfig::default());
        state
            .install_trivia_store(Arc::new(MemoryTriviaStore::new(ScorePolicy::Overwrite)))
            .await;
        let health = health_status(&state).await;
        assert_eq!(health.backend, BackendProbe::Reachable);
        assert_eq!(health.sessions, 0);
    }
}
