use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::AuthSessionEntity,
    state::identity::{IdentityEvent, UserIdentity},
};

/// Access token obtained from the auth provider.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SignInRequest {
    #[validate(length(min = 1, max = 4096))]
    pub access_token: String,
}

/// Account creation form. The username becomes the leaderboard name.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SignUpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 256))]
    pub password: String,
    #[validate(length(min = 1, max = 32))]
    pub username: String,
}

/// Email and password sign-in.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PasswordSignInRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 256))]
    pub password: String,
}

/// Account returned by sign-up and sign-in.
///
/// Present `access_token` to `POST /sessions` or `PUT /sessions/{id}/identity`. It is
/// `null` after a sign-up that still needs email confirmation.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: Option<String>,
    pub player: PlayerDto,
}

impl From<AuthSessionEntity> for AuthResponse {
    fn from(account: AuthSessionEntity) -> Self {
        Self {
            access_token: account.access_token,
            player: UserIdentity::from(account.user).into(),
        }
    }
}

/// Signed-in player as exposed to clients.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct PlayerDto {
    pub id: String,
    pub display_name: Option<String>,
}

impl From<UserIdentity> for PlayerDto {
    fn from(identity: UserIdentity) -> Self {
        Self {
            id: identity.id,
            display_name: identity.display_name,
        }
    }
}

/// How the identity of a session last changed.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdentityChange {
    SignedIn,
    TokenRefreshed,
    SignedOut,
}

/// Identity of a play session after a sign-in or sign-out.
#[derive(Debug, Serialize, ToSchema)]
pub struct IdentityResponse {
    pub change: IdentityChange,
    pub player: Option<PlayerDto>,
}

impl From<IdentityEvent> for IdentityResponse {
    fn from(event: IdentityEvent) -> Self {
        match event {
            IdentityEvent::SignedIn(identity) => Self {
                change: IdentityChange::SignedIn,
                player: Some(identity.into()),
            },
            IdentityEvent::TokenRefreshed(identity) => Self {
                change: IdentityChange::TokenRefreshed,
                player: Some(identity.into()),
            },
            IdentityEvent::SignedOut => Self {
                change: IdentityChange::SignedOut,
                player: None,
            },
        }
    }
}
