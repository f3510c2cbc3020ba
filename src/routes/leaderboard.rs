use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::leaderboard::{LeaderboardResponse, WeeksResponse},
    error::AppError,
    services::leaderboard_service,
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/weeks",
    tag = "leaderboard",
    responses(
        (status = 200, description = "Weeks with questions, most recent first", body = WeeksResponse),
        (status = 503, description = "Backend unavailable")
    )
)]
/// List the weeks that can be played.
pub async fn list_weeks(State(state): State<SharedState>) -> Result<Json<WeeksResponse>, AppError> {
    Ok(Json(leaderboard_service::available_weeks(&state).await?))
}

#[utoipa::path(
    get,
    path = "/leaderboard/{week}",
    tag = "leaderboard",
    params(("week" = u32, Path, description = "Week number")),
    responses(
        (status = 200, description = "Top scores of the week", body = LeaderboardResponse),
        (status = 400, description = "Invalid week"),
        (status = 503, description = "Backend unavailable")
    )
)]
/// Top scores recorded for a week.
pub async fn get_leaderboard(
    State(state): State<SharedState>,
    Path(week): Path<u32>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    Ok(Json(leaderboard_service::leaderboard(&state, week).await?))
}

#[utoipa::path(
    get,
    path = "/leaderboard",
    tag = "leaderboard",
    responses(
        (status = 200, description = "Top scores of the most recent week", body = LeaderboardResponse),
        (status = 404, description = "No week has questions yet"),
        (status = 503, description = "Backend unavailable")
    )
)]
/// Top scores of the most recent week.
pub async fn get_latest_leaderboard(
    State(state): State<SharedState>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    Ok(Json(leaderboard_service::latest_leaderboard(&state).await?))
}

/// Configure the leaderboard routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/weeks", get(list_weeks))
        .route("/leaderboard", get(get_latest_leaderboard))
        .route("/leaderboard/{week}", get(get_leaderboard))
}
