//! Weekly Blitz Back binary entrypoint wiring REST, SSE and the trivia backend.

use std::{env, net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weekly_blitz_back::{
    config::AppConfig,
    dao::{
        storage::StorageError,
        trivia_store::{
            TriviaStore,
            memory::{MemorySeed, MemoryTriviaStore},
        },
    },
    routes,
    services::{round_service, storage_supervisor},
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_state = AppState::new(AppConfig::load());

    spawn_backend_supervisor(app_state.clone());
    tokio::spawn(round_service::run_session_reaper(app_state.clone()));
    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Start the backend supervisor: the hosted backend when its environment is set, the
/// seeded in-memory backend otherwise.
fn spawn_backend_supervisor(state: SharedState) {
    if spawn_hosted_supervisor(&state) {
        return;
    }

    let seed = MemorySeed::load(state.config().seed_path().map(PathBuf::as_path));
    let policy = state.config().score_policy();
    info!(policy = ?policy, "using in-memory trivia backend");
    let store: Arc<dyn TriviaStore> = Arc::new(MemoryTriviaStore::from_seed(seed, policy));

    tokio::spawn(storage_supervisor::run(state, move || {
        let store = store.clone();
        async move { Ok::<_, StorageError>(store) }
    }));
}

#[cfg(feature = "rest-store")]
fn spawn_hosted_supervisor(state: &SharedState) -> bool {
    use weekly_blitz_back::dao::trivia_store::rest::RestConfig;

    if !RestConfig::is_configured() {
        return false;
    }
    info!("using hosted trivia backend");
    tokio::spawn(storage_supervisor::run(state.clone(), connect_hosted));
    true
}

#[cfg(not(feature = "rest-store"))]
fn spawn_hosted_supervisor(_state: &SharedState) -> bool {
    false
}

#[cfg(feature = "rest-store")]
async fn connect_hosted() -> Result<Arc<dyn TriviaStore>, StorageError> {
    use weekly_blitz_back::dao::trivia_store::rest::{RestConfig, RestTriviaStore};

    let config = RestConfig::from_env()?;
    let store = RestTriviaStore::connect(config).await?;
    Ok(Arc::new(store))
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
