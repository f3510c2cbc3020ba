use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use axum_valid::Valid;

use crate::{
    dto::identity::{AuthResponse, PasswordSignInRequest, SignUpRequest},
    error::AppError,
    services::identity_service,
    state::SharedState,
};

#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "auth",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Malformed form"),
        (status = 401, description = "Credentials rejected"),
        (status = 503, description = "Backend unavailable")
    )
)]
/// Create an account with an email, a password and a leaderboard name.
pub async fn sign_up(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SignUpRequest>>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let account = identity_service::sign_up(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = PasswordSignInRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Credentials rejected"),
        (status = 503, description = "Backend unavailable")
    )
)]
/// Sign in with an email and password.
pub async fn sign_in(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<PasswordSignInRequest>>,
) -> Result<Json<AuthResponse>, AppError> {
    Ok(Json(
        identity_service::sign_in_with_password(&state, payload).await?,
    ))
}

/// Account routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/login", post(sign_in))
}
