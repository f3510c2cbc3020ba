use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Weekly Blitz Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::auth::sign_up,
        crate::routes::auth::sign_in,
        crate::routes::leaderboard::list_weeks,
        crate::routes::leaderboard::get_leaderboard,
        crate::routes::leaderboard::get_latest_leaderboard,
        crate::routes::sessions::create_session,
        crate::routes::sessions::get_session,
        crate::routes::sessions::delete_session,
        crate::routes::sessions::sign_in,
        crate::routes::sessions::sign_out,
        crate::routes::sessions::select_week,
        crate::routes::sessions::update_answer,
        crate::routes::sessions::submit_answer,
        crate::routes::sessions::replay,
        crate::routes::sessions::leave,
        crate::routes::sse::session_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::BackendProbe,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::TickEvent,
            crate::dto::sse::AdvancedEvent,
            crate::dto::sse::CompletedEvent,
            crate::dto::sse::PhaseChangedEvent,
            crate::dto::sse::IdentityChangedEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Account sign-up and password sign-in"),
        (name = "leaderboard", description = "Weeks and weekly leaderboards"),
        (name = "sessions", description = "Play sessions and their trivia round"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
