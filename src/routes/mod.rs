use axum::{
    Router,
    http::{HeaderValue, header},
};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::state::SharedState;

pub mod auth;
pub mod docs;
pub mod health;
pub mod leaderboard;
pub mod sessions;
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
///
/// Every response forbids framing and MIME sniffing.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(auth::router())
        .merge(leaderboard::router())
        .merge(sessions::router())
        .merge(sse::router())
        .merge(docs::router());

    api_router
        .with_state(state)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
}
