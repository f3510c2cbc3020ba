pub mod memory;
#[cfg(feature = "rest-store")]
pub mod rest;

use futures::future::BoxFuture;

use crate::dao::models::{
    AuthSessionEntity, CredentialsEntity, LeaderboardRowEntity, QuestionEntity, ScoreEntity,
    UserEntity,
};
use crate::dao::storage::StorageResult;

/// Read-only provider of the questions played each week.
pub trait QuestionSource: Send + Sync {
    /// Distinct weeks that have questions, most recent first.
    fn available_weeks(&self) -> BoxFuture<'static, StorageResult<Vec<u32>>>;
    /// Every question of `week`, ordered by id ascending.
    fn questions_for_week(
        &self,
        week: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>>;
}

/// Write-only recipient of completed round scores, upserting on `(user_id, week)`.
pub trait ScoreSink: Send + Sync {
    /// Record `score`, merging with any stored score of the same user and week.
    fn submit_score(&self, score: ScoreEntity) -> BoxFuture<'static, StorageResult<()>>;
}

/// Read path over recorded scores.
pub trait LeaderboardSource: Send + Sync {
    /// Top `limit` scores of `week`, highest first.
    fn leaderboard(
        &self,
        week: u32,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardRowEntity>>>;
}

/// Auth provider: account creation, password sign-in and token resolution.
pub trait IdentityProvider: Send + Sync {
    /// The user behind `access_token`, or `None` when the token is not valid.
    fn resolve_user(
        &self,
        access_token: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    /// Create an account whose leaderboard name is `username`.
    ///
    /// `None` when the provider rejects the credentials, for example a taken email.
    fn sign_up(
        &self,
        credentials: CredentialsEntity,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<AuthSessionEntity>>>;
    /// Exchange an email and password for an access token, `None` when they do not match.
    fn sign_in_with_password(
        &self,
        credentials: CredentialsEntity,
    ) -> BoxFuture<'static, StorageResult<Option<AuthSessionEntity>>>;
}

/// Everything the service needs from the hosted backend.
pub trait TriviaStore: QuestionSource + ScoreSink + LeaderboardSource + IdentityProvider {
    /// Cheap liveness probe.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after a failure.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
