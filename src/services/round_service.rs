use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{models::ScoreEntity, storage::StorageError, trivia_store::TriviaStore},
    dto::round::{
        AnswerRequest, CreateSessionRequest, RoundSnapshot, SelectWeekRequest,
        SubmitAnswerRequest, SubmitAnswerResponse,
    },
    error::ServiceError,
    services::{identity_service, sse_events},
    state::{
        AppState, SharedState,
        identity::UserIdentity,
        play::{CompletionMarker, PlaySession},
        question::{Question, QuestionError},
        round::{
            Completion, LoadError, RoundController, SessionInstance, Step, TickOutcome, TimerKey,
        },
        timer::{RoundTimer, TICK_PERIOD},
    },
};

const SUBMIT_RETRY_DELAY: Duration = Duration::from_millis(500);
const SUBMIT_MAX_DELAY: Duration = Duration::from_secs(10);
const REAP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
enum FetchError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("question fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Question(#[from] QuestionError),
}

/// Open a play session, optionally signed in with an access token.
pub async fn create_session(
    state: &SharedState,
    request: CreateSessionRequest,
) -> Result<RoundSnapshot, ServiceError> {
    let identity = match request.access_token {
        Some(token) => Some(identity_service::resolve(state, token).await?),
        None => None,
    };

    let session = spawn_session(state, identity);
    state.insert_session(session.clone());
    info!(
        session = %session.id(),
        signed_in = session.identity().current().is_some(),
        "play session created"
    );

    let controller = session.controller().await;
    Ok(snapshot(&session, &controller))
}

/// Current snapshot of a play session.
pub async fn get_session(state: &SharedState, id: Uuid) -> Result<RoundSnapshot, ServiceError> {
    let session = state.session(id)?;
    let controller = session.controller().await;
    Ok(snapshot(&session, &controller))
}

/// Tear down a play session and stop its countdown.
pub async fn delete_session(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    let session = state
        .remove_session(id)
        .ok_or_else(|| ServiceError::NotFound(format!("session `{id}` not found")))?;
    session.timer().disarm();
    info!(session = %id, "play session closed");
    Ok(())
}

/// Pick a week and load its questions. The round becomes active on success and goes back
/// to week selection with an error message otherwise.
pub async fn select_week(
    state: &SharedState,
    id: Uuid,
    request: SelectWeekRequest,
) -> Result<RoundSnapshot, ServiceError> {
    let session = state.session(id)?;
    let store = state.require_trivia_store().await?;

    let ticket = {
        let mut controller = session.controller().await;
        let ticket = controller.select_week(request.week)?;
        session.timer().sync(controller.timer_key());
        sse_events::broadcast_phase_changed(&session, snapshot(&session, &controller));
        ticket
    };
    debug!(session = %id, week = ticket.week(), "loading questions");

    let fetched = fetch_questions(store.as_ref(), ticket.week(), state.config().fetch_timeout())
        .await
        .inspect_err(|err| {
            warn!(session = %id, week = ticket.week(), error = %err, "failed to load questions");
        });

    let mut controller = session.controller().await;
    match controller.finish_load(ticket, fetched) {
        Ok(instance) => {
            session.timer().sync(controller.timer_key());
            info!(
                session = %id,
                week = ticket.week(),
                round = %instance,
                "round started"
            );
            let snapshot = snapshot(&session, &controller);
            sse_events::broadcast_phase_changed(&session, snapshot.clone());
            Ok(snapshot)
        }
        Err(LoadError::Stale) => {
            debug!(session = %id, week = ticket.week(), "discarding superseded question load");
            Err(LoadError::Stale.into())
        }
        Err(err) => {
            session.timer().sync(controller.timer_key());
            sse_events::broadcast_phase_changed(&session, snapshot(&session, &controller));
            Err(err.into())
        }
    }
}

/// Replace the pending answer of the question on screen.
pub async fn update_answer(
    state: &SharedState,
    id: Uuid,
    request: AnswerRequest,
) -> Result<RoundSnapshot, ServiceError> {
    let session = state.session(id)?;
    let mut controller = session.controller().await;
    controller.set_pending_answer(request.answer)?;
    Ok(snapshot(&session, &controller))
}

/// Judge the pending answer and move to the next question.
pub async fn submit_answer(
    state: &SharedState,
    id: Uuid,
    request: SubmitAnswerRequest,
) -> Result<SubmitAnswerResponse, ServiceError> {
    let session = state.session(id)?;
    let (step, snapshot) = {
        let mut controller = session.controller().await;
        if let Some(answer) = request.answer {
            controller.set_pending_answer(answer)?;
        }
        let step = controller.submit_answer()?;
        session.timer().sync(controller.timer_key());
        (step, snapshot(&session, &controller))
    };

    after_step(state, &session, &step, snapshot.clone());
    Ok(SubmitAnswerResponse::new(&step, snapshot))
}

/// Play the completed week again from its first question.
pub async fn replay(state: &SharedState, id: Uuid) -> Result<RoundSnapshot, ServiceError> {
    let session = state.session(id)?;
    let mut controller = session.controller().await;
    let instance = controller.restart_same_week()?;
    session.timer().sync(controller.timer_key());
    info!(session = %id, round = %instance, "round replayed");

    let snapshot = snapshot(&session, &controller);
    sse_events::broadcast_phase_changed(&session, snapshot.clone());
    Ok(snapshot)
}

/// Drop the current round and return to week selection.
pub async fn leave(state: &SharedState, id: Uuid) -> Result<RoundSnapshot, ServiceError> {
    let session = state.session(id)?;
    let mut controller = session.controller().await;
    controller.choose_new_week()?;
    session.timer().sync(controller.timer_key());

    let snapshot = snapshot(&session, &controller);
    sse_events::broadcast_phase_changed(&session, snapshot.clone());
    Ok(snapshot)
}

/// Discard sessions idle for longer than the configured timeout and without listeners.
pub fn reap_idle_sessions(state: &SharedState) -> usize {
    let idle_timeout = state.config().session_idle_timeout();
    let expired: Vec<Uuid> = state
        .sessions()
        .iter()
        .filter(|entry| {
            let session = entry.value();
            session.events().listener_count() == 0 && session.last_seen().elapsed() >= idle_timeout
        })
        .map(|entry| *entry.key())
        .collect();

    for id in &expired {
        if let Some(session) = state.remove_session(*id) {
            session.timer().disarm();
            debug!(session = %id, "reaped idle play session");
        }
    }

    if !expired.is_empty() {
        info!(count = expired.len(), "reaped idle play sessions");
    }
    expired.len()
}

/// Periodically reap idle sessions until the task is aborted.
pub async fn run_session_reaper(state: SharedState) {
    let period = REAP_INTERVAL.min(state.config().session_idle_timeout());
    let mut ticker = tokio::time::interval(period);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        reap_idle_sessions(&state);
    }
}

fn spawn_session(state: &SharedState, identity: Option<UserIdentity>) -> Arc<PlaySession> {
    let id = Uuid::new_v4();
    let question_time = state.config().question_time_secs();
    let weak_state = Arc::downgrade(state);

    Arc::new_cyclic(|weak_session: &Weak<PlaySession>| {
        let weak_session = weak_session.clone();
        let timer = RoundTimer::spawn(TICK_PERIOD, move |key| {
            let state = weak_state.clone();
            let session = weak_session.clone();
            async move {
                if let (Some(state), Some(session)) = (state.upgrade(), session.upgrade()) {
                    handle_timer_tick(&state, &session, key).await;
                }
            }
        });
        PlaySession::new(id, question_time, identity, timer)
    })
}

async fn handle_timer_tick(state: &SharedState, session: &PlaySession, key: TimerKey) {
    let (step, snapshot) = {
        let mut controller = session.controller().await;
        if controller.timer_key() != Some(key) {
            return;
        }

        match controller.tick() {
            Ok(TickOutcome::Counting { time_remaining }) => {
                sse_events::broadcast_tick(session, key, time_remaining);
                return;
            }
            Ok(TickOutcome::TimedOut(step)) => {
                session.timer().sync(controller.timer_key());
                (step, snapshot(session, &controller))
            }
            Err(err) => {
                debug!(session = %session.id(), error = %err, "ignoring tick");
                return;
            }
        }
    };

    after_step(state, session, &step, snapshot);
}

fn after_step(state: &SharedState, session: &PlaySession, step: &Step, snapshot: RoundSnapshot) {
    sse_events::broadcast_advanced(session, step, snapshot);
    if let Some(completion) = step.completion {
        dispatch_completion(state, session, completion);
    }
}

fn dispatch_completion(state: &SharedState, session: &PlaySession, completion: Completion) {
    session.completions().record(completion.session);
    let identity = session.identity().current();
    sse_events::broadcast_completed(session, &completion, identity.is_some());

    let Some(identity) = identity else {
        info!(
            session = %session.id(),
            week = completion.week,
            score = completion.score,
            "round completed without a signed-in player; score not submitted"
        );
        return;
    };

    info!(
        session = %session.id(),
        round = %completion.session,
        week = completion.week,
        score = completion.score,
        "round completed; submitting score"
    );
    let score = ScoreEntity {
        user_id: identity.id,
        week: completion.week,
        score: completion.score,
    };
    let submission = Submission {
        score,
        instance: completion.session,
        completions: session.completions().clone(),
    };
    let retries = state.config().score_submit_retries();
    tokio::spawn(submit_with_retry(state.clone(), submission, retries));
}

/// Score of one completed session instance on its way to the score sink.
struct Submission {
    score: ScoreEntity,
    instance: SessionInstance,
    completions: CompletionMarker,
}

/// Submit a score, retrying with backoff. A later completion of the same play session
/// cancels the remaining attempts so an old score never overwrites a newer one.
async fn submit_with_retry(state: Arc<AppState>, submission: Submission, retries: u32) {
    let Submission {
        score,
        instance,
        completions,
    } = submission;
    let Some(store) = state.trivia_store().await else {
        warn!(
            user = %score.user_id,
            week = score.week,
            "score not submitted: backend unavailable (degraded mode)"
        );
        return;
    };

    let mut delay = SUBMIT_RETRY_DELAY;
    for attempt in 0..=retries {
        if completions.is_superseded(instance) {
            debug!(
                user = %score.user_id,
                week = score.week,
                round = %instance,
                "dropping score of a superseded round"
            );
            return;
        }
        match store.submit_score(score.clone()).await {
            Ok(()) => {
                debug!(
                    user = %score.user_id,
                    week = score.week,
                    score = score.score,
                    "score submitted"
                );
                return;
            }
            Err(err) => {
                warn!(
                    attempt,
                    user = %score.user_id,
                    week = score.week,
                    error = %err,
                    "failed to submit score"
                );
                if attempt < retries {
                    sleep(delay).await;
                    delay = (delay * 2).min(SUBMIT_MAX_DELAY);
                }
            }
        }
    }
}

async fn fetch_questions(
    store: &dyn TriviaStore,
    week: u32,
    limit: Duration,
) -> Result<Vec<Question>, FetchError> {
    let entities = timeout(limit, store.questions_for_week(week))
        .await
        .map_err(|_| FetchError::Timeout(limit))??;

    entities
        .into_iter()
        .map(Question::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(Into::into)
}

fn snapshot(session: &PlaySession, controller: &RoundController) -> RoundSnapshot {
    RoundSnapshot::new(
        session.id(),
        controller.view(),
        session.identity().current().map(Into::into),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{
                AuthSessionEntity, CredentialsEntity, LeaderboardRowEntity, QuestionEntity,
                ScorePolicy, UserEntity,
            },
            storage::StorageResult,
            trivia_store::{
                IdentityProvider, LeaderboardSource, QuestionSource, ScoreSink,
                memory::MemoryTriviaStore,
            },
        },
        dto::round::{JudgementDto, PhaseDto},
    };

    const TOKEN: &str = "token-1";

    fn entity(id: i64, week: u32, difficulty: &str, answer: &str) -> QuestionEntity {
        QuestionEntity {
            id,
            week,
            text: format!("question {id}"),
            difficulty: difficulty.into(),
            correct_answers: vec![answer.into()],
        }
    }

    async fn memory_store() -> MemoryTriviaStore {
        let store = MemoryTriviaStore::new(ScorePolicy::Overwrite);
        store.insert_question(entity(2, 1, "medium", "Chiefs")).await;
        store.insert_question(entity(1, 1, "easy", "42")).await;
        store.insert_question(entity(3, 2, "hard", "x")).await;
        store.insert_question(entity(4, 3, "legendary", "x")).await;
        store
            .insert_user(
                TOKEN,
                UserEntity {
                    id: "fan-1".into(),
                    username: Some("fan".into()),
                },
            )
            .await;
        store
    }

    async fn app_with(store: Arc<dyn TriviaStore>, config: AppConfig) -> SharedState {
        let state = AppState::new(config);
        state.install_trivia_store(store).await;
        state
    }

    async fn signed_in(state: &SharedState) -> Uuid {
        create_session(
            state,
            CreateSessionRequest {
                access_token: Some(TOKEN.into()),
            },
        )
        .await
        .unwrap()
        .session_id
    }

    async fn anonymous(state: &SharedState) -> Uuid {
        create_session(state, CreateSessionRequest::default())
            .await
            .unwrap()
            .session_id
    }

    async fn answer(state: &SharedState, id: Uuid, text: &str) -> SubmitAnswerResponse {
        submit_answer(
            state,
            id,
            SubmitAnswerRequest {
                answer: Some(text.into()),
            },
        )
        .await
        .unwrap()
    }

    /// Let spawned submissions run to completion.
    async fn settle() {
        sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn full_round_submits_score_once() {
        let store = memory_store().await;
        let state = app_with(Arc::new(store.clone()), AppConfig::default()).await;
        let id = signed_in(&state).await;

        let snapshot = select_week(&state, id, SelectWeekRequest { week: 1 }).await.unwrap();
        assert_eq!(snapshot.phase, PhaseDto::Active);
        assert_eq!(snapshot.question.as_ref().map(|q| q.id), Some(1));

        let first = answer(&state, id, " 42 ").await;
        assert_eq!(first.result, JudgementDto::Correct);
        assert_eq!(first.points_awarded, 2);
        let last = answer(&state, id, "chiefs").await;
        assert!(last.round_complete);
        assert_eq!(last.snapshot.phase, PhaseDto::Complete);
        assert_eq!(last.snapshot.score, Some(8));

        settle().await;
        assert_eq!(store.submission_count(), 1);
        assert_eq!(store.score_for("fan-1", 1).await, Some(8));

        assert!(submit_answer(&state, id, SubmitAnswerRequest::default()).await.is_err());
        settle().await;
        assert_eq!(store.submission_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn replay_allows_one_more_submission() {
        let store = memory_store().await;
        let state = app_with(Arc::new(store.clone()), AppConfig::default()).await;
        let id = signed_in(&state).await;

        select_week(&state, id, SelectWeekRequest { week: 1 }).await.unwrap();
        answer(&state, id, "42").await;
        answer(&state, id, "chiefs").await;

        let replayed = replay(&state, id).await.unwrap();
        assert_eq!(replayed.phase, PhaseDto::Active);
        assert_eq!(replayed.score, Some(0));
        assert_eq!(replayed.round_instance, Some(2));

        answer(&state, id, "41").await;
        answer(&state, id, "").await;
        settle().await;

        assert_eq!(store.submission_count(), 2);
        assert_eq!(store.score_for("fan-1", 1).await, Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn anonymous_round_reports_score_without_submitting() {
        let store = memory_store().await;
        let state = app_with(Arc::new(store.clone()), AppConfig::default()).await;
        let id = anonymous(&state).await;

        select_week(&state, id, SelectWeekRequest { week: 1 }).await.unwrap();
        answer(&state, id, "42").await;
        let last = answer(&state, id, "Chiefs").await;
        settle().await;

        assert_eq!(last.snapshot.score, Some(8));
        assert_eq!(store.submission_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_expiry_advances_unanswered() {
        let store = memory_store().await;
        let config = AppConfig::default().with_question_time(2);
        let state = app_with(Arc::new(store), config).await;
        let id = anonymous(&state).await;

        select_week(&state, id, SelectWeekRequest { week: 1 }).await.unwrap();
        update_answer(
            &state,
            id,
            AnswerRequest {
                answer: "41".into(),
            },
        )
        .await
        .unwrap();

        sleep(Duration::from_millis(1_500)).await;
        let counting = get_session(&state, id).await.unwrap();
        assert_eq!(counting.time_remaining, Some(1));

        sleep(Duration::from_secs(1)).await;
        let advanced = get_session(&state, id).await.unwrap();
        assert_eq!(advanced.current_index, Some(1));
        assert_eq!(advanced.time_remaining, Some(2));
        assert_eq!(advanced.score, Some(0));
        assert_eq!(advanced.pending_answer.as_deref(), Some(""));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_final_question_completes_and_submits() {
        let store = memory_store().await;
        let config = AppConfig::default().with_question_time(1);
        let state = app_with(Arc::new(store.clone()), config).await;
        let id = signed_in(&state).await;

        select_week(&state, id, SelectWeekRequest { week: 1 }).await.unwrap();
        answer(&state, id, "42").await;
        sleep(Duration::from_millis(1_500)).await;

        let done = get_session(&state, id).await.unwrap();
        assert_eq!(done.phase, PhaseDto::Complete);
        assert_eq!(done.score, Some(2));
        assert_eq!(store.score_for("fan-1", 1).await, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_week_returns_to_selection() {
        let store = memory_store().await;
        let state = app_with(Arc::new(store), AppConfig::default()).await;
        let id = anonymous(&state).await;

        let err = select_week(&state, id, SelectWeekRequest { week: 9 }).await.unwrap_err();
        assert!(matches!(err, ServiceError::NoQuestions(9)));

        let snapshot = get_session(&state, id).await.unwrap();
        assert_eq!(snapshot.phase, PhaseDto::Idle);
        assert_eq!(snapshot.error.as_deref(), Some("No questions available for week 9."));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_difficulty_fails_the_load() {
        let store = memory_store().await;
        let state = app_with(Arc::new(store), AppConfig::default()).await;
        let id = anonymous(&state).await;

        let err = select_week(&state, id, SelectWeekRequest { week: 3 }).await.unwrap_err();
        assert!(matches!(err, ServiceError::LoadFailed));
        let snapshot = get_session(&state, id).await.unwrap();
        assert_eq!(snapshot.error.as_deref(), Some("Failed to load questions."));
    }

    #[tokio::test(start_paused = true)]
    async fn backend_failure_returns_to_selection() {
        let state = app_with(Arc::new(BrokenStore::default()), AppConfig::default()).await;
        let id = anonymous(&state).await;

        let err = select_week(&state, id, SelectWeekRequest { week: 1 }).await.unwrap_err();
        assert!(matches!(err, ServiceError::LoadFailed));
        assert_eq!(get_session(&state, id).await.unwrap().phase, PhaseDto::Idle);

        // A new selection is allowed after a failure and reaches the backend again.
        assert!(matches!(
            select_week(&state, id, SelectWeekRequest { week: 2 }).await,
            Err(ServiceError::LoadFailed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_times_out() {
        let store = BrokenStore {
            hang: true,
            ..BrokenStore::default()
        };
        let config = AppConfig::default().with_fetch_timeout(Duration::from_secs(2));
        let state = app_with(Arc::new(store), config).await;
        let id = anonymous(&state).await;

        let err = select_week(&state, id, SelectWeekRequest { week: 1 }).await.unwrap_err();
        assert!(matches!(err, ServiceError::LoadFailed));
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_during_load_discards_the_result() {
        let store = BrokenStore {
            hang: true,
            ..BrokenStore::default()
        };
        let config = AppConfig::default().with_fetch_timeout(Duration::from_secs(5));
        let state = app_with(Arc::new(store), config).await;
        let id = anonymous(&state).await;

        let loading = {
            let state = state.clone();
            tokio::spawn(async move { select_week(&state, id, SelectWeekRequest { week: 1 }).await })
        };
        sleep(Duration::from_secs(1)).await;
        assert_eq!(get_session(&state, id).await.unwrap().phase, PhaseDto::Loading);

        leave(&state, id).await.unwrap();
        let outcome = loading.await.unwrap();

        assert!(matches!(outcome, Err(ServiceError::InvalidState(_))));
        let snapshot = get_session(&state, id).await.unwrap();
        assert_eq!(snapshot.phase, PhaseDto::Idle);
        assert_eq!(snapshot.error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_submission_is_retried_when_configured() {
        let store = BrokenStore {
            questions: vec![entity(1, 1, "easy", "a")],
            ..BrokenStore::default()
        };
        let config = AppConfig::default().with_score_submit_retries(2);
        let submissions = store.submissions.clone();
        let state = app_with(Arc::new(store), config).await;
        let id = signed_in(&state).await;

        select_week(&state, id, SelectWeekRequest { week: 1 }).await.unwrap();
        let last = answer(&state, id, "a").await;
        assert!(last.round_complete);

        sleep(Duration::from_secs(5)).await;
        assert_eq!(submissions.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_retry_never_overwrites_a_newer_round() {
        let memory = memory_store().await;
        let store = FlakyScores {
            inner: memory.clone(),
            failures: Arc::new(AtomicUsize::new(1)),
        };
        let config = AppConfig::default().with_score_submit_retries(1);
        let state = app_with(Arc::new(store), config).await;
        let id = signed_in(&state).await;

        select_week(&state, id, SelectWeekRequest { week: 1 }).await.unwrap();
        answer(&state, id, "42").await;
        let first = answer(&state, id, "chiefs").await;
        assert_eq!(first.snapshot.score, Some(8));
        settle().await;
        assert_eq!(memory.score_for("fan-1", 1).await, None);

        replay(&state, id).await.unwrap();
        answer(&state, id, "41").await;
        let second = answer(&state, id, "").await;
        assert!(second.round_complete);
        settle().await;
        assert_eq!(memory.score_for("fan-1", 1).await, Some(0));

        sleep(Duration::from_secs(2)).await;
        assert_eq!(memory.score_for("fan-1", 1).await, Some(0));
        assert_eq!(memory.submission_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn degraded_mode_rejects_week_selection() {
        let state = AppState::new(AppConfig::default());
        let id = anonymous(&state).await;

        let err = select_week(&state, id, SelectWeekRequest { week: 1 }).await.unwrap_err();
        assert!(matches!(err, ServiceError::Degraded));
        assert_eq!(get_session(&state, id).await.unwrap().phase, PhaseDto::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_are_reaped_and_timers_stop() {
        let store = memory_store().await;
        let config = AppConfig::default().with_session_idle_timeout(Duration::from_secs(60));
        let state = app_with(Arc::new(store), config).await;
        let stale = anonymous(&state).await;
        select_week(&state, stale, SelectWeekRequest { week: 1 }).await.unwrap();

        sleep(Duration::from_secs(45)).await;
        let fresh = anonymous(&state).await;
        sleep(Duration::from_secs(30)).await;

        assert_eq!(reap_idle_sessions(&state), 1);
        assert!(get_session(&state, stale).await.is_err());
        assert!(get_session(&state, fresh).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn deleting_unknown_session_is_not_found() {
        let state = AppState::new(AppConfig::default());
        let err = delete_session(&state, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    /// In-memory backend whose first `failures` score writes fail.
    #[derive(Clone)]
    struct FlakyScores {
        inner: MemoryTriviaStore,
        failures: Arc<AtomicUsize>,
    }

    impl QuestionSource for FlakyScores {
        fn available_weeks(&self) -> BoxFuture<'static, StorageResult<Vec<u32>>> {
            self.inner.available_weeks()
        }

        fn questions_for_week(
            &self,
            week: u32,
        ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
            self.inner.questions_for_week(week)
        }
    }

    impl ScoreSink for FlakyScores {
        fn submit_score(&self, score: ScoreEntity) -> BoxFuture<'static, StorageResult<()>> {
            let failing = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();
            if failing {
                Box::pin(async { Err(unavailable()) })
            } else {
                self.inner.submit_score(score)
            }
        }
    }

    impl LeaderboardSource for FlakyScores {
        fn leaderboard(
            &self,
            week: u32,
            limit: usize,
        ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardRowEntity>>> {
            self.inner.leaderboard(week, limit)
        }
    }

    impl IdentityProvider for FlakyScores {
        fn resolve_user(
            &self,
            access_token: String,
        ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
            self.inner.resolve_user(access_token)
        }

        fn sign_up(
            &self,
            credentials: CredentialsEntity,
            username: String,
        ) -> BoxFuture<'static, StorageResult<Option<AuthSessionEntity>>> {
            self.inner.sign_up(credentials, username)
        }

        fn sign_in_with_password(
            &self,
            credentials: CredentialsEntity,
        ) -> BoxFuture<'static, StorageResult<Option<AuthSessionEntity>>> {
            self.inner.sign_in_with_password(credentials)
        }
    }

    impl TriviaStore for FlakyScores {
        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.health_check()
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.try_reconnect()
        }
    }

    /// Backend whose question reads fail (or hang) and whose writes always fail.
    #[derive(Clone, Default)]
    struct BrokenStore {
        hang: bool,
        questions: Vec<QuestionEntity>,
        submissions: Arc<AtomicUsize>,
    }

    fn unavailable() -> StorageError {
        StorageError::unavailable(
            "backend offline".into(),
            std::io::Error::other("connection refused"),
        )
    }

    impl QuestionSource for BrokenStore {
        fn available_weeks(&self) -> BoxFuture<'static, StorageResult<Vec<u32>>> {
            Box::pin(async { Err(unavailable()) })
        }

        fn questions_for_week(
            &self,
            _week: u32,
        ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
            let store = self.clone();
            Box::pin(async move {
                if store.hang {
                    std::future::pending::<()>().await;
                }
                if store.questions.is_empty() {
                    Err(unavailable())
                } else {
                    Ok(store.questions)
                }
            })
        }
    }

    impl ScoreSink for BrokenStore {
        fn submit_score(&self, _score: ScoreEntity) -> BoxFuture<'static, StorageResult<()>> {
            let submissions = self.submissions.clone();
            Box::pin(async move {
                submissions.fetch_add(1, Ordering::SeqCst);
                Err(unavailable())
            })
        }
    }

    impl LeaderboardSource for BrokenStore {
        fn leaderboard(
            &self,
            _week: u32,
            _limit: usize,
        ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardRowEntity>>> {
            Box::pin(async { Err(unavailable()) })
        }
    }

    impl IdentityProvider for BrokenStore {
        fn resolve_user(
            &self,
            access_token: String,
        ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
            Box::pin(async move {
                Ok((access_token == TOKEN).then(|| UserEntity {
                    id: "fan-1".into(),
                    username: None,
                }))
            })
        }

        fn sign_up(
            &self,
            _credentials: CredentialsEntity,
            _username: String,
        ) -> BoxFuture<'static, StorageResult<Option<AuthSessionEntity>>> {
            Box::pin(async { Err(unavailable()) })
        }

        fn sign_in_with_password(
            &self,
            _credentials: CredentialsEntity,
        ) -> BoxFuture<'static, StorageResult<Option<AuthSessionEntity>>> {
            Box::pin(async { Err(unavailable()) })
        }
    }

    impl TriviaStore for BrokenStore {
        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Err(unavailable()) })
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Err(unavailable()) })
        }
    }
}
