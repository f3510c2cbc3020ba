use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, StatusCode, header::AUTHORIZATION};
use serde::{Serialize, de::DeserializeOwned};

use crate::dao::{
    models::{
        AuthSessionEntity, CredentialsEntity, LeaderboardRowEntity, QuestionEntity, ScoreEntity,
        UserEntity,
    },
    storage::StorageResult,
    trivia_store::{IdentityProvider, LeaderboardSource, QuestionSource, ScoreSink, TriviaStore},
};

use super::{
    config::RestConfig,
    error::{RestDaoError, RestResult},
    models::{
        AUTH_SIGNUP_PATH, AUTH_TOKEN_PATH, AUTH_USER_PATH, AuthReply, AuthUser,
        PasswordGrantBody, QUESTIONS_PATH, SignUpBody, UPDATE_SCORE_PATH, UpdateWeeklyScoreArgs,
        WEEKLY_SCORES_PATH, WeekRow, WeeklyScoreRow,
    },
};

const API_KEY_HEADER: &str = "apikey";

/// Client of a PostgREST/GoTrue style hosted backend.
#[derive(Clone)]
pub struct RestTriviaStore {
    client: Client,
    base_url: Arc<str>,
    api_key: Arc<str>,
}

impl RestTriviaStore {
    /// Build the client and check that the backend answers.
    pub async fn connect(config: RestConfig) -> RestResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| RestDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            base_url: Arc::<str>::from(config.base_url.trim_end_matches('/')),
            api_key: Arc::<str>::from(config.api_key),
        };

        store.ping().await?;
        Ok(store)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        self.client
            .request(method, url)
            .header(API_KEY_HEADER, self.api_key.as_ref())
    }

    async fn send(&self, builder: RequestBuilder, path: &str) -> RestResult<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|source| RestDaoError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(RestDaoError::RequestStatus {
                path: path.to_string(),
                status: response.status(),
            })
        }
    }

    async fn get_rows<T>(&self, path: &str, query: &[(&str, String)]) -> RestResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .send(self.request(Method::GET, path).query(query), path)
            .await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|source| RestDaoError::DecodeResponse {
                path: path.to_string(),
                source,
            })
    }

    /// POST to an auth endpoint. Rejected credentials yield `None`.
    async fn post_auth<B>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> RestResult<Option<AuthSessionEntity>>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .request(Method::POST, path)
            .query(query)
            .json(body)
            .send()
            .await
            .map_err(|source| RestDaoError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::BAD_REQUEST
            | StatusCode::UNAUTHORIZED
            | StatusCode::FORBIDDEN
            | StatusCode::UNPROCESSABLE_ENTITY => Ok(None),
            status if status.is_success() => {
                let reply = response.json::<AuthReply>().await.map_err(|source| {
                    RestDaoError::DecodeResponse {
                        path: path.to_string(),
                        source,
                    }
                })?;
                Ok(Some(reply.into()))
            }
            other => Err(RestDaoError::RequestStatus {
                path: path.to_string(),
                status: other,
            }),
        }
    }

    async fn ping(&self) -> RestResult<()> {
        let query = [("select", "id".to_string()), ("limit", "1".to_string())];
        self.send(
            self.request(Method::GET, QUESTIONS_PATH).query(&query),
            QUESTIONS_PATH,
        )
        .await
        .map(|_| ())
    }
}

impl QuestionSource for RestTriviaStore {
    fn available_weeks(&self) -> BoxFuture<'static, StorageResult<Vec<u32>>> {
        let store = self.clone();
        Box::pin(async move {
            let query = [
                ("select", "week".to_string()),
                ("order", "week.desc".to_string()),
            ];
            let rows = store.get_rows::<WeekRow>(QUESTIONS_PATH, &query).await?;
            let mut weeks: Vec<u32> = rows.into_iter().map(|row| row.week).collect();
            weeks.dedup();
            Ok(weeks)
        })
    }

    fn questions_for_week(
        &self,
        week: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let query = [
                ("select", "*".to_string()),
                ("week", format!("eq.{week}")),
                ("order", "id.asc".to_string()),
            ];
            store
                .get_rows::<QuestionEntity>(QUESTIONS_PATH, &query)
                .await
                .map_err(Into::into)
        })
    }
}

impl ScoreSink for RestTriviaStore {
    fn submit_score(&self, score: ScoreEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let args = UpdateWeeklyScoreArgs::from(score);
            store
                .send(
                    store.request(Method::POST, UPDATE_SCORE_PATH).json(&args),
                    UPDATE_SCORE_PATH,
                )
                .await?;
            Ok(())
        })
    }
}

impl LeaderboardSource for RestTriviaStore {
    fn leaderboard(
        &self,
        week: u32,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardRowEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let query = [
                ("select", "score,week,profiles(username)".to_string()),
                ("week", format!("eq.{week}")),
                ("order", "score.desc".to_string()),
                ("limit", limit.to_string()),
            ];
            let rows = store
                .get_rows::<WeeklyScoreRow>(WEEKLY_SCORES_PATH, &query)
                .await?;
            Ok(rows.into_iter().map(Into::into).collect())
        })
    }
}

impl IdentityProvider for RestTriviaStore {
    fn resolve_user(
        &self,
        access_token: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let response = store
                .request(Method::GET, AUTH_USER_PATH)
                .header(AUTHORIZATION, format!("Bearer {access_token}"))
                .send()
                .await
                .map_err(|source| RestDaoError::RequestSend {
                    path: AUTH_USER_PATH.to_string(),
                    source,
                })?;

            match response.status() {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
                status if status.is_success() => {
                    let user = response.json::<AuthUser>().await.map_err(|source| {
                        RestDaoError::DecodeResponse {
                            path: AUTH_USER_PATH.to_string(),
                            source,
                        }
                    })?;
                    if user.id.is_empty() {
                        return Err(RestDaoError::InvalidRow {
                            path: AUTH_USER_PATH.to_string(),
                            reason: "user without id".into(),
                        }
                        .into());
                    }
                    Ok(Some(user.into()))
                }
                other => Err(RestDaoError::RequestStatus {
                    path: AUTH_USER_PATH.to_string(),
                    status: other,
                }
                .into()),
            }
        })
    }

    fn sign_up(
        &self,
        credentials: CredentialsEntity,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<AuthSessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let body = SignUpBody::new(&credentials, &username);
            store
                .post_auth(AUTH_SIGNUP_PATH, &[], &body)
                .await
                .map_err(Into::into)
        })
    }

    fn sign_in_with_password(
        &self,
        credentials: CredentialsEntity,
    ) -> BoxFuture<'static, StorageResult<Option<AuthSessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let body = PasswordGrantBody::from(&credentials);
            store
                .post_auth(AUTH_TOKEN_PATH, &[("grant_type", "password")], &body)
                .await
                .map_err(Into::into)
        })
    }
}

impl TriviaStore for RestTriviaStore {
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}
