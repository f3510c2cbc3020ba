use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{storage::StorageError, trivia_store::TriviaStore},
    services::sse_events,
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Connect to the trivia backend and keep the shared state in degraded mode while it is unavailable.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn TriviaStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                state.install_trivia_store(store.clone()).await;
                sse_events::broadcast_system_status(&state);
                info!("backend connection established; leaving degraded mode");
                delay = INITIAL_DELAY;

                supervise(&state, store.as_ref()).await;

                state.clear_trivia_store().await;
                sse_events::broadcast_system_status(&state);
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                warn!(error = %err, "backend connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

/// Poll the installed backend until it fails and cannot be reconnected.
async fn supervise(state: &SharedState, store: &dyn TriviaStore) {
    loop {
        if store.health_check().await.is_ok() {
            if state.is_degraded() {
                info!("backend healthy again; leaving degraded mode");
                state.update_degraded(false);
                sse_events::broadcast_system_status(state);
            }
            sleep(HEALTH_POLL_INTERVAL).await;
            continue;
        }

        let mut reconnect_delay = INITIAL_DELAY;
        let mut reconnected = false;

        for attempt in 0..MAX_RECONNECT_ATTEMPTS {
            match store.try_reconnect().await {
                Ok(()) => {
                    info!("backend reconnection succeeded after health check failure");
                    reconnected = true;
                    break;
                }
                Err(reconnect_err) => {
                    if attempt == 0 {
                        warn!(
                            attempt, error = %reconnect_err,
                            "backend reconnect first attempt failed; entering degraded mode"
                        );
                        state.update_degraded(true);
                        sse_events::broadcast_system_status(state);
                    } else {
                        warn!(attempt, error = %reconnect_err, "backend reconnect attempt failed");
                    }
                    sleep(reconnect_delay).await;
                    reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
                }
            }
        }

        if !reconnected {
            warn!("exhausted backend reconnect attempts; staying in degraded mode");
            return;
        }

        state.update_degraded(false);
        sse_events::broadcast_system_status(state);
        sleep(HEALTH_POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{models::ScorePolicy, trivia_store::memory::MemoryTriviaStore},
        state::AppState,
    };

    #[tokio::test(start_paused = true)]
    async fn leaves_degraded_mode_once_connected() {
        let state = AppState::new(AppConfig::default());
        assert!(state.is_degraded());

        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let task = tokio::spawn(run(state.clone(), move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(StorageError::invalid_record("not yet"))
                } else {
                    let store: Arc<dyn TriviaStore> =
                        Arc::new(MemoryTriviaStore::new(ScorePolicy::Overwrite));
                    Ok(store)
                }
            }
        }));

        tokio::time::sleep(Duration::from_millis(1_500)).await;

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(!state.is_degraded());
        assert!(state.trivia_store().await.is_some());
        task.abort();
    }
}
