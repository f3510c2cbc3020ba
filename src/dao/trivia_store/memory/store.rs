use std::{
    collections::{BTreeSet, HashMap},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    models::{
        AuthSessionEntity, CredentialsEntity, LeaderboardRowEntity, QuestionEntity, ScoreEntity,
        ScorePolicy, UserEntity,
    },
    storage::StorageResult,
    trivia_store::{IdentityProvider, LeaderboardSource, QuestionSource, ScoreSink, TriviaStore},
};

use super::seed::MemorySeed;

/// Process-local backend used for local play and tests.
#[derive(Clone)]
pub struct MemoryTriviaStore {
    inner: Arc<RwLock<MemoryData>>,
    policy: ScorePolicy,
    submissions: Arc<AtomicUsize>,
}

struct Account {
    password: String,
    user: UserEntity,
}

#[derive(Default)]
struct MemoryData {
    questions: Vec<QuestionEntity>,
    tokens: HashMap<String, UserEntity>,
    profiles: HashMap<String, Option<String>>,
    // Keyed by normalised email. Local play only, passwords are kept as given.
    accounts: HashMap<String, Account>,
    // Insertion order breaks leaderboard ties.
    scores: IndexMap<(String, u32), u32>,
}

impl MemoryTriviaStore {
    /// Empty store merging scores with `policy`.
    pub fn new(policy: ScorePolicy) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryData::default())),
            policy,
            submissions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Store preloaded with `seed`.
    pub fn from_seed(seed: MemorySeed, policy: ScorePolicy) -> Self {
        let mut data = MemoryData {
            questions: seed.questions,
            ..MemoryData::default()
        };
        for user in &seed.users {
            let entity = UserEntity::from(user);
            data.profiles
                .insert(entity.id.clone(), entity.username.clone());
            if let (Some(email), Some(password)) = (&user.email, &user.password) {
                data.accounts.insert(
                    normalize_email(email),
                    Account {
                        password: password.clone(),
                        user: entity.clone(),
                    },
                );
            }
            data.tokens.insert(user.access_token.clone(), entity);
        }

        Self {
            inner: Arc::new(RwLock::new(data)),
            policy,
            submissions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Add a question row.
    pub async fn insert_question(&self, question: QuestionEntity) {
        self.inner.write().await.questions.push(question);
    }

    /// Accept `access_token` as `user`.
    pub async fn insert_user(&self, access_token: impl Into<String>, user: UserEntity) {
        let mut data = self.inner.write().await;
        data.profiles.insert(user.id.clone(), user.username.clone());
        data.tokens.insert(access_token.into(), user);
    }

    /// Stored score for `(user_id, week)`.
    pub async fn score_for(&self, user_id: &str, week: u32) -> Option<u32> {
        let data = self.inner.read().await;
        data.scores.get(&(user_id.to_string(), week)).copied()
    }

    /// Number of score writes accepted since startup.
    pub fn submission_count(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }
}

impl MemoryData {
    fn issue_token(&mut self, user: &UserEntity) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(token.clone(), user.clone());
        token
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl QuestionSource for MemoryTriviaStore {
    fn available_weeks(&self) -> BoxFuture<'static, StorageResult<Vec<u32>>> {
        let store = self.clone();
        Box::pin(async move {
            let data = store.inner.read().await;
            let weeks: BTreeSet<u32> = data.questions.iter().map(|q| q.week).collect();
            Ok(weeks.into_iter().rev().collect())
        })
    }

    fn questions_for_week(
        &self,
        week: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let data = store.inner.read().await;
            let mut questions: Vec<QuestionEntity> = data
                .questions
                .iter()
                .filter(|question| question.week == week)
                .cloned()
                .collect();
            questions.sort_by_key(|question| question.id);
            Ok(questions)
        })
    }
}

impl ScoreSink for MemoryTriviaStore {
    fn submit_score(&self, score: ScoreEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut data = store.inner.write().await;
            let key = (score.user_id, score.week);
            let merged = store.policy.merge(data.scores.get(&key).copied(), score.score);
            data.scores.insert(key, merged);
            store.submissions.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

impl LeaderboardSource for MemoryTriviaStore {
    fn leaderboard(
        &self,
        week: u32,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardRowEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let data = store.inner.read().await;
            let mut rows: Vec<LeaderboardRowEntity> = data
                .scores
                .iter()
                .filter(|((_, score_week), _)| *score_week == week)
                .map(|((user_id, _), score)| LeaderboardRowEntity {
                    username: data.profiles.get(user_id).cloned().flatten(),
                    score: *score,
                })
                .collect();
            rows.sort_by(|a, b| b.score.cmp(&a.score));
            rows.truncate(limit);
            Ok(rows)
        })
    }
}

impl IdentityProvider for MemoryTriviaStore {
    fn resolve_user(
        &self,
        access_token: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let data = store.inner.read().await;
            Ok(data.tokens.get(&access_token).cloned())
        })
    }

    fn sign_up(
        &self,
        credentials: CredentialsEntity,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<AuthSessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut data = store.inner.write().await;
            let email = normalize_email(&credentials.email);
            if data.accounts.contains_key(&email) {
                return Ok(None);
            }

            let user = UserEntity {
                id: Uuid::new_v4().to_string(),
                username: Some(username),
            };
            data.profiles.insert(user.id.clone(), user.username.clone());
            data.accounts.insert(
                email,
                Account {
                    password: credentials.password,
                    user: user.clone(),
                },
            );
            let access_token = data.issue_token(&user);
            Ok(Some(AuthSessionEntity {
                access_token: Some(access_token),
                user,
            }))
        })
    }

    fn sign_in_with_password(
        &self,
        credentials: CredentialsEntity,
    ) -> BoxFuture<'static, StorageResult<Option<AuthSessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut data = store.inner.write().await;
            let user = match data.accounts.get(&normalize_email(&credentials.email)) {
                Some(account) if account.password == credentials.password => account.user.clone(),
                _ => return Ok(None),
            };
            let access_token = data.issue_token(&user);
            Ok(Some(AuthSessionEntity {
                access_token: Some(access_token),
                user,
            }))
        })
    }
}

impl TriviaStore for MemoryTriviaStore {
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
