use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::CredentialsEntity,
    dto::identity::{
        AuthResponse, IdentityChange, IdentityResponse, PasswordSignInRequest, SignInRequest,
        SignUpRequest,
    },
    error::ServiceError,
    state::{SharedState, identity::UserIdentity},
};

/// Message shown whenever the auth provider rejects an email and password.
pub const INVALID_CREDENTIALS: &str = "Please Enter Valid Credentials";

/// Create an account. The username is what the leaderboard shows.
pub async fn sign_up(
    state: &SharedState,
    request: SignUpRequest,
) -> Result<AuthResponse, ServiceError> {
    let username = request.username.trim().to_string();
    if username.is_empty() {
        return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.into()));
    }
    let store = state.require_trivia_store().await?;
    let account = store
        .sign_up(credentials(request.email, request.password), username)
        .await?
        .ok_or_else(invalid_credentials)?;
    info!(
        user = %account.user.id,
        confirmed = account.access_token.is_some(),
        "account created"
    );
    Ok(account.into())
}

/// Exchange an email and password for an access token.
pub async fn sign_in_with_password(
    state: &SharedState,
    request: PasswordSignInRequest,
) -> Result<AuthResponse, ServiceError> {
    let store = state.require_trivia_store().await?;
    let account = store
        .sign_in_with_password(credentials(request.email, request.password))
        .await?
        .ok_or_else(invalid_credentials)?;
    info!(user = %account.user.id, "password sign-in");
    Ok(account.into())
}

fn credentials(email: String, password: String) -> CredentialsEntity {
    CredentialsEntity {
        email: email.trim().to_string(),
        password,
    }
}

fn invalid_credentials() -> ServiceError {
    ServiceError::Unauthorized(INVALID_CREDENTIALS.into())
}

/// Resolve an access token into a player identity.
pub async fn resolve(
    state: &SharedState,
    access_token: String,
) -> Result<UserIdentity, ServiceError> {
    let store = state.require_trivia_store().await?;
    store
        .resolve_user(access_token)
        .await?
        .map(UserIdentity::from)
        .ok_or_else(|| ServiceError::Unauthorized("access token rejected".into()))
}

/// Sign a session in, or refresh its token when the same player presents a new one.
///
/// The round in progress is untouched; the identity current when it completes decides
/// where the score goes.
pub async fn sign_in(
    state: &SharedState,
    id: Uuid,
    request: SignInRequest,
) -> Result<IdentityResponse, ServiceError> {
    let session = state.session(id)?;
    let identity = resolve(state, request.access_token).await?;
    let event = session.identity().sign_in(identity);
    info!(session = %id, event = ?event, "identity updated");
    Ok(event.into())
}

/// Sign a session out. Signing out twice is not an error.
pub async fn sign_out(state: &SharedState, id: Uuid) -> Result<IdentityResponse, ServiceError> {
    let session = state.session(id)?;
    if session.identity().sign_out().is_some() {
        info!(session = %id, "signed out");
    }
    Ok(IdentityResponse {
        change: IdentityChange::SignedOut,
        player: None,
    })
}
