use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        identity::{IdentityResponse, SignInRequest},
        round::{
            AnswerRequest, CreateSessionRequest, RoundSnapshot, SelectWeekRequest,
            SubmitAnswerRequest, SubmitAnswerResponse,
        },
    },
    error::AppError,
    services::{identity_service, round_service},
    state::SharedState,
};

#[utoipa::path(
    post,
    path = "/sessions",
    tag = "sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Play session opened", body = RoundSnapshot),
        (status = 401, description = "Access token rejected")
    )
)]
/// Open a play session, signed in when an access token is supplied.
pub async fn create_session(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<RoundSnapshot>), AppError> {
    let snapshot = round_service::create_session(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

#[utoipa::path(
    get,
    path = "/sessions/{id}",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Play session identifier")),
    responses(
        (status = 200, description = "Round snapshot", body = RoundSnapshot),
        (status = 404, description = "Unknown session")
    )
)]
/// Fetch the round snapshot of a session.
pub async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoundSnapshot>, AppError> {
    Ok(Json(round_service::get_session(&state, id).await?))
}

#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Play session identifier")),
    responses(
        (status = 204, description = "Session closed"),
        (status = 404, description = "Unknown session")
    )
)]
/// Close a session; its countdown stops immediately.
pub async fn delete_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    round_service::delete_session(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/sessions/{id}/identity",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Play session identifier")),
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in or token refreshed", body = IdentityResponse),
        (status = 401, description = "Access token rejected")
    )
)]
/// Sign in, or refresh the token of the signed-in player.
pub async fn sign_in(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<SignInRequest>>,
) -> Result<Json<IdentityResponse>, AppError> {
    Ok(Json(identity_service::sign_in(&state, id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/sessions/{id}/identity",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Play session identifier")),
    responses((status = 200, description = "Signed out", body = IdentityResponse))
)]
/// Sign out; later completions are no longer submitted.
pub async fn sign_out(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<IdentityResponse>, AppError> {
    Ok(Json(identity_service::sign_out(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/week",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Play session identifier")),
    request_body = SelectWeekRequest,
    responses(
        (status = 200, description = "Round started", body = RoundSnapshot),
        (status = 404, description = "No questions for the week"),
        (status = 409, description = "A round is already in progress"),
        (status = 502, description = "Questions could not be loaded")
    )
)]
/// Pick a week and start its round.
pub async fn select_week(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<SelectWeekRequest>>,
) -> Result<Json<RoundSnapshot>, AppError> {
    Ok(Json(round_service::select_week(&state, id, payload).await?))
}

#[utoipa::path(
    put,
    path = "/sessions/{id}/answer",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Play session identifier")),
    request_body = AnswerRequest,
    responses(
        (status = 200, description = "Pending answer updated", body = RoundSnapshot),
        (status = 409, description = "No question on screen")
    )
)]
/// Update the pending answer of the question on screen.
pub async fn update_answer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<AnswerRequest>>,
) -> Result<Json<RoundSnapshot>, AppError> {
    Ok(Json(round_service::update_answer(&state, id, payload).await?))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/submit",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Play session identifier")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer judged", body = SubmitAnswerResponse),
        (status = 409, description = "No question on screen")
    )
)]
/// Submit the pending answer, optionally replacing it first.
pub async fn submit_answer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<SubmitAnswerRequest>>,
) -> Result<Json<SubmitAnswerResponse>, AppError> {
    Ok(Json(round_service::submit_answer(&state, id, payload).await?))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/replay",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Play session identifier")),
    responses(
        (status = 200, description = "Same week restarted", body = RoundSnapshot),
        (status = 409, description = "Round not complete")
    )
)]
/// Replay the completed week.
pub async fn replay(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoundSnapshot>, AppError> {
    Ok(Json(round_service::replay(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/leave",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Play session identifier")),
    responses((status = 200, description = "Back to week selection", body = RoundSnapshot))
)]
/// Abandon the round and go back to week selection.
pub async fn leave(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoundSnapshot>, AppError> {
    Ok(Json(round_service::leave(&state, id).await?))
}

/// Configure the play session routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/identity", put(sign_in).delete(sign_out))
        .route("/sessions/{id}/week", post(select_week))
        .route("/sessions/{id}/answer", put(update_answer))
        .route("/sessions/{id}/submit", post(submit_answer))
        .route("/sessions/{id}/replay", post(replay))
        .route("/sessions/{id}/leave", post(leave))
}
