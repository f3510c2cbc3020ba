use serde::{Deserialize, Serialize};

use crate::dao::models::{
    AuthSessionEntity, CredentialsEntity, LeaderboardRowEntity, ScoreEntity, UserEntity,
};

pub const QUESTIONS_PATH: &str = "rest/v1/questions";
pub const WEEKLY_SCORES_PATH: &str = "rest/v1/weekly_scores";
pub const UPDATE_SCORE_PATH: &str = "rest/v1/rpc/update_weekly_score";
pub const AUTH_USER_PATH: &str = "auth/v1/user";
pub const AUTH_SIGNUP_PATH: &str = "auth/v1/signup";
pub const AUTH_TOKEN_PATH: &str = "auth/v1/token";

/// Projection used to list weeks.
#[derive(Debug, Deserialize)]
pub struct WeekRow {
    pub week: u32,
}

#[derive(Debug, Deserialize)]
pub struct ProfileRow {
    #[serde(default)]
    pub username: Option<String>,
}

/// `weekly_scores` row with its embedded profile.
#[derive(Debug, Deserialize)]
pub struct WeeklyScoreRow {
    pub score: u32,
    #[serde(default)]
    pub profiles: Option<ProfileRow>,
}

impl From<WeeklyScoreRow> for LeaderboardRowEntity {
    fn from(row: WeeklyScoreRow) -> Self {
        Self {
            username: row.profiles.and_then(|profile| profile.username),
            score: row.score,
        }
    }
}

/// Arguments of the `update_weekly_score` procedure.
#[derive(Debug, Serialize)]
pub struct UpdateWeeklyScoreArgs {
    pub p_user_id: String,
    pub p_week: u32,
    pub p_new_score: u32,
}

impl From<ScoreEntity> for UpdateWeeklyScoreArgs {
    fn from(score: ScoreEntity) -> Self {
        Self {
            p_user_id: score.user_id,
            p_week: score.week,
            p_new_score: score.score,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub username: Option<String>,
}

/// Body of the auth user endpoint.
#[derive(Debug, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl From<AuthUser> for UserEntity {
    fn from(user: AuthUser) -> Self {
        Self {
            id: user.id,
            username: user.user_metadata.username,
        }
    }
}

/// Body of the password grant.
#[derive(Debug, Serialize)]
pub struct PasswordGrantBody<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

impl<'a> From<&'a CredentialsEntity> for PasswordGrantBody<'a> {
    fn from(credentials: &'a CredentialsEntity) -> Self {
        Self {
            email: &credentials.email,
            password: &credentials.password,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SignUpMetadata<'a> {
    pub username: &'a str,
    pub display_name: &'a str,
}

/// Body of the sign-up endpoint; the username lands in the user metadata.
#[derive(Debug, Serialize)]
pub struct SignUpBody<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub data: SignUpMetadata<'a>,
}

impl<'a> SignUpBody<'a> {
    pub fn new(credentials: &'a CredentialsEntity, username: &'a str) -> Self {
        Self {
            email: &credentials.email,
            password: &credentials.password,
            data: SignUpMetadata {
                username,
                display_name: username,
            },
        }
    }
}

/// Auth reply: a full session, or the bare user while email confirmation is pending.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AuthReply {
    Session { access_token: String, user: AuthUser },
    User(AuthUser),
}

impl From<AuthReply> for AuthSessionEntity {
    fn from(reply: AuthReply) -> Self {
        match reply {
            AuthReply::Session { access_token, user } => Self {
                access_token: Some(access_token),
                user: user.into(),
            },
            AuthReply::User(user) => Self {
                access_token: None,
                user: user.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaderboard_row_flattens_profile() {
        let rows: Vec<WeeklyScoreRow> = serde_json::from_str(
            r#"[
                {"score": 23, "week": 4, "profiles": {"username": "gridiron"}},
                {"score": 8, "week": 4, "profiles": null}
            ]"#,
        )
        .unwrap();
        let entities: Vec<LeaderboardRowEntity> = rows.into_iter().map(Into::into).collect();
        assert_eq!(entities[0].username.as_deref(), Some("gridiron"));
        assert_eq!(entities[0].score, 23);
        assert_eq!(entities[1].username, None);
    }

    #[test]
    fn score_maps_to_procedure_arguments() {
        let args = UpdateWeeklyScoreArgs::from(ScoreEntity {
            user_id: "u-1".into(),
            week: 3,
            score: 17,
        });
        let json = serde_json::to_value(args).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"p_user_id": "u-1", "p_week": 3, "p_new_score": 17})
        );
    }

    #[test]
    fn auth_user_without_metadata_has_no_username() {
        let user: AuthUser = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        let entity = UserEntity::from(user);
        assert_eq!(entity.id, "abc");
        assert_eq!(entity.username, None);
    }

    #[test]
    fn sign_up_body_carries_username_metadata() {
        let credentials = CredentialsEntity {
            email: "fan@example.com".into(),
            password: "hunter22".into(),
        };
        let json = serde_json::to_value(SignUpBody::new(&credentials, "gridiron")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "email": "fan@example.com",
                "password": "hunter22",
                "data": {"username": "gridiron", "display_name": "gridiron"}
            })
        );
    }

    #[test]
    fn auth_reply_with_or_without_session() {
        let session: AuthReply = serde_json::from_str(
            r#"{"access_token": "jwt", "token_type": "bearer",
                "user": {"id": "u-1", "user_metadata": {"username": "gridiron"}}}"#,
        )
        .unwrap();
        let entity = AuthSessionEntity::from(session);
        assert_eq!(entity.access_token.as_deref(), Some("jwt"));
        assert_eq!(entity.user.username.as_deref(), Some("gridiron"));

        let pending: AuthReply =
            serde_json::from_str(r#"{"id": "u-2", "email": "x@example.com"}"#).unwrap();
        let entity = AuthSessionEntity::from(pending);
        assert_eq!(entity.access_token, None);
        assert_eq!(entity.user.id, "u-2");
    }
}
