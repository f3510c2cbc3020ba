//! Round controller: the per-player trivia lifecycle.
//!
//! The controller is synchronous and owns no timers or network handles. Callers feed it
//! discrete events (week selected, questions loaded, tick, answer submitted) and act on
//! what it returns, most importantly the [`Completion`] emitted exactly once per session
//! instance when the last question is answered or times out.

use std::{fmt, sync::Arc};

use thiserror::Error;

use crate::state::{
    question::{Difficulty, Question, normalize_answer},
    state_machine::{InvalidTransition, RoundEvent, RoundPhase, RoundStateMachine},
};

/// Seconds a player gets for each question unless configured otherwise.
pub const DEFAULT_QUESTION_TIME_SECS: u32 = 20;

/// Identifies one play-through of a round. Replaying the same week yields a new instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionInstance(u64);

impl SessionInstance {
    /// Raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key of the countdown that is allowed to tick: one per session instance and question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerKey {
    /// Session instance the countdown belongs to.
    pub session: SessionInstance,
    /// Question index the countdown belongs to.
    pub question_index: usize,
}

/// Proof that a question fetch was started for a given week.
///
/// A ticket is invalidated by any later selection or by leaving the round, so a slow fetch
/// cannot start a round the player no longer wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    week: u32,
    generation: u64,
}

impl LoadTicket {
    /// Week the fetch is for.
    pub fn week(&self) -> u32 {
        self.week
    }
}

/// Why a load did not start a round.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The ticket was superseded before the fetch resolved.
    #[error("question load was superseded")]
    Stale,
    /// The question source failed.
    #[error("Failed to load questions.")]
    Failed,
    /// The week has no questions.
    #[error("No questions available for week {week}.")]
    NoQuestions {
        /// Week that was requested.
        week: u32,
    },
}

/// Errors raised by round operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoundError {
    /// The phase machine refused the event.
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
    /// The operation needs an active question.
    #[error("no question is active")]
    NotActive,
}

/// How the active question was judged when the round advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Judgement {
    /// Matched an accepted answer.
    Correct {
        /// Points added to the score.
        points: u32,
    },
    /// Something was typed but it did not match.
    Incorrect,
    /// Nothing (or only whitespace) was typed.
    Unanswered,
}

impl Judgement {
    /// Points this judgement adds to the score.
    pub fn points(self) -> u32 {
        match self {
            Judgement::Correct { points } => points,
            Judgement::Incorrect | Judgement::Unanswered => 0,
        }
    }
}

/// Terminal result of a session instance, emitted once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// Session instance that completed.
    pub session: SessionInstance,
    /// Week that was played.
    pub week: u32,
    /// Final score of that instance.
    pub score: u32,
}

/// Outcome of leaving a question, by submission or by timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Identifier of the question that was left.
    pub question_id: i64,
    /// Verdict on the pending answer.
    pub judgement: Judgement,
    /// True when the countdown forced the advance.
    pub timed_out: bool,
    /// Present when this step finished the round.
    pub completion: Option<Completion>,
}

/// Result of a one-second tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Countdown still running.
    Counting {
        /// Seconds left on the active question.
        time_remaining: u32,
    },
    /// Countdown hit zero and the round advanced.
    TimedOut(Step),
}

/// Mutable state of a round in progress.
#[derive(Debug, Clone)]
pub struct RoundState {
    questions: Arc<[Question]>,
    week: u32,
    current_index: usize,
    score: u32,
    time_remaining: u32,
    pending_answer: String,
    session: SessionInstance,
    completion_reported: bool,
}

impl RoundState {
    fn start(
        questions: Arc<[Question]>,
        week: u32,
        session: SessionInstance,
        time: u32,
    ) -> Self {
        Self {
            questions,
            week,
            current_index: 0,
            score: 0,
            time_remaining: time,
            pending_answer: String::new(),
            session,
            completion_reported: false,
        }
    }

    fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    fn is_finished(&self) -> bool {
        self.current_index > 0 && self.current_index >= self.questions.len()
    }

    /// Hand out the completion once; later calls return `None`.
    fn take_completion(&mut self) -> Option<Completion> {
        if !self.is_finished() || self.completion_reported {
            return None;
        }
        self.completion_reported = true;
        Some(Completion {
            session: self.session,
            week: self.week,
            score: self.score,
        })
    }
}

/// Read-only projection of the active question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    /// Question identifier.
    pub id: i64,
    /// Prompt text.
    pub text: String,
    /// Difficulty tier.
    pub difficulty: Difficulty,
    /// Points a correct answer is worth.
    pub points: u32,
}

/// Read-only projection of the controller, suitable for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundView {
    /// Current phase.
    pub phase: RoundPhase,
    /// Week selected or being played.
    pub week: Option<u32>,
    /// Session instance of the loaded round.
    pub session: Option<SessionInstance>,
    /// 0-based index of the active question (equals `question_count` once complete).
    pub current_index: Option<usize>,
    /// Number of questions in the loaded round.
    pub question_count: Option<usize>,
    /// Active question, absent once complete.
    pub question: Option<QuestionView>,
    /// Seconds left on the active question.
    pub time_remaining: Option<u32>,
    /// Score accumulated so far.
    pub score: Option<u32>,
    /// Text typed for the active question.
    pub pending_answer: Option<String>,
    /// Last load error, kept until the next selection.
    pub load_error: Option<LoadError>,
}

/// Owns one player's trivia round and validates every transition.
#[derive(Debug, Clone)]
pub struct RoundController {
    machine: RoundStateMachine,
    question_time: u32,
    selected_week: Option<u32>,
    round: Option<RoundState>,
    load_error: Option<LoadError>,
    load_generation: u64,
    next_session: u64,
}

impl Default for RoundController {
    fn default() -> Self {
        Self::new(DEFAULT_QUESTION_TIME_SECS)
    }
}

impl RoundController {
    /// Create an idle controller giving `question_time` seconds per question.
    pub fn new(question_time: u32) -> Self {
        Self {
            machine: RoundStateMachine::new(),
            question_time: question_time.max(1),
            selected_week: None,
            round: None,
            load_error: None,
            load_generation: 0,
            next_session: 0,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> RoundPhase {
        self.machine.phase()
    }

    /// Session instance of the loaded round, if any.
    pub fn session(&self) -> Option<SessionInstance> {
        self.round.as_ref().map(|round| round.session)
    }

    /// Key of the countdown that should be running, `None` when no question is active.
    pub fn timer_key(&self) -> Option<TimerKey> {
        if self.phase() != RoundPhase::Active {
            return None;
        }
        self.round.as_ref().map(|round| TimerKey {
            session: round.session,
            question_index: round.current_index,
        })
    }

    /// Start fetching questions for `week`.
    pub fn select_week(&mut self, week: u32) -> Result<LoadTicket, RoundError> {
        self.machine.apply(RoundEvent::SelectWeek(week))?;
        self.selected_week = Some(week);
        self.round = None;
        self.load_error = None;
        self.load_generation += 1;
        Ok(LoadTicket {
            week,
            generation: self.load_generation,
        })
    }

    /// Resolve a fetch started by [`RoundController::select_week`].
    ///
    /// Questions are ordered by id before the round starts. Failed and empty fetches
    /// return to idle and keep the error for display; a stale ticket changes nothing.
    pub fn finish_load<E>(
        &mut self,
        ticket: LoadTicket,
        fetched: Result<Vec<Question>, E>,
    ) -> Result<SessionInstance, LoadError> {
        if ticket.generation != self.load_generation
            || self.phase() != (RoundPhase::Loading { week: ticket.week })
        {
            return Err(LoadError::Stale);
        }

        let mut questions = match fetched {
            Ok(questions) => questions,
            Err(_) => return Err(self.fail_load(RoundEvent::LoadFailed, LoadError::Failed)),
        };

        if questions.is_empty() {
            let error = LoadError::NoQuestions { week: ticket.week };
            return Err(self.fail_load(RoundEvent::LoadEmpty, error));
        }

        questions.sort_by_key(|question| question.id);
        self.machine
            .apply(RoundEvent::LoadSucceeded)
            .map_err(|_| LoadError::Stale)?;

        let session = self.next_session_instance();
        self.round = Some(RoundState::start(
            questions.into(),
            ticket.week,
            session,
            self.question_time,
        ));
        Ok(session)
    }

    fn fail_load(&mut self, event: RoundEvent, error: LoadError) -> LoadError {
        if self.machine.apply(event).is_err() {
            return LoadError::Stale;
        }
        self.load_error = Some(error.clone());
        error
    }

    /// Replace the text typed for the active question.
    pub fn set_pending_answer(&mut self, text: impl Into<String>) -> Result<(), RoundError> {
        let round = self.active_round_mut()?;
        round.pending_answer = text.into();
        Ok(())
    }

    /// Judge the pending answer and move to the next question.
    pub fn submit_answer(&mut self) -> Result<Step, RoundError> {
        self.advance(false)
    }

    /// Count the active question down by one second, advancing when it reaches zero.
    pub fn tick(&mut self) -> Result<TickOutcome, RoundError> {
        let round = self.active_round_mut()?;
        round.time_remaining = round.time_remaining.saturating_sub(1);
        if round.time_remaining > 0 {
            return Ok(TickOutcome::Counting {
                time_remaining: round.time_remaining,
            });
        }
        self.advance(true).map(TickOutcome::TimedOut)
    }

    /// Play the completed week again with the same questions under a new session instance.
    pub fn restart_same_week(&mut self) -> Result<SessionInstance, RoundError> {
        let (questions, week) = match (&self.round, self.phase()) {
            (Some(round), RoundPhase::Complete) => (round.questions.clone(), round.week),
            (_, from) => {
                return Err(InvalidTransition {
                    from,
                    event: RoundEvent::Replay,
                }
                .into());
            }
        };

        self.machine.apply(RoundEvent::Replay)?;
        let session = self.next_session_instance();
        self.round = Some(RoundState::start(questions, week, session, self.question_time));
        Ok(session)
    }

    /// Discard the loaded questions and return to week selection.
    pub fn choose_new_week(&mut self) -> Result<(), RoundError> {
        self.machine.apply(RoundEvent::LeaveRound)?;
        self.round = None;
        self.selected_week = None;
        self.load_error = None;
        // Invalidates any fetch still in flight.
        self.load_generation += 1;
        Ok(())
    }

    /// Project the controller state for rendering.
    pub fn view(&self) -> RoundView {
        let round = self.round.as_ref();
        let active = self.phase() == RoundPhase::Active;
        RoundView {
            phase: self.phase(),
            week: round.map(|round| round.week).or(self.selected_week),
            session: round.map(|round| round.session),
            current_index: round.map(|round| round.current_index),
            question_count: round.map(|round| round.questions.len()),
            question: round
                .and_then(RoundState::current_question)
                .filter(|_| active)
                .map(|question| QuestionView {
                    id: question.id,
                    text: question.text.clone(),
                    difficulty: question.difficulty,
                    points: question.points(),
                }),
            time_remaining: round.filter(|_| active).map(|round| round.time_remaining),
            score: round.map(|round| round.score),
            pending_answer: round
                .filter(|_| active)
                .map(|round| round.pending_answer.clone()),
            load_error: self.load_error.clone(),
        }
    }

    fn active_round_mut(&mut self) -> Result<&mut RoundState, RoundError> {
        if self.machine.phase() != RoundPhase::Active {
            return Err(RoundError::NotActive);
        }
        self.round
            .as_mut()
            .filter(|round| round.current_index < round.questions.len())
            .ok_or(RoundError::NotActive)
    }

    fn advance(&mut self, timed_out: bool) -> Result<Step, RoundError> {
        let question_time = self.question_time;
        let round = self.active_round_mut()?;
        let question = round
            .current_question()
            .ok_or(RoundError::NotActive)?;
        let question_id = question.id;
        let judgement = judge(question, &round.pending_answer);

        round.score += judgement.points();
        round.current_index += 1;
        round.pending_answer.clear();
        round.time_remaining = question_time;

        let finished = round.is_finished();
        let event = if finished {
            RoundEvent::Finish
        } else {
            RoundEvent::Advance
        };
        self.machine.apply(event)?;

        let completion = self.round.as_mut().and_then(RoundState::take_completion);
        Ok(Step {
            question_id,
            judgement,
            timed_out,
            completion,
        })
    }

    fn next_session_instance(&mut self) -> SessionInstance {
        self.next_session += 1;
        SessionInstance(self.next_session)
    }
}

fn judge(question: &Question, pending: &str) -> Judgement {
    match normalize_answer(pending) {
        None => Judgement::Unanswered,
        Some(answer) if question.accepts_normalized(&answer) => Judgement::Correct {
            points: question.points(),
        },
        Some(_) => Judgement::Incorrect,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: i64, difficulty: Difficulty, answer: &str) -> Question {
        Question::new(id, 1, format!("Question {id}"), difficulty, [answer]).unwrap()
    }

    fn active(questions: Vec<Question>) -> RoundController {
        let mut controller = RoundController::default();
        let ticket = controller.select_week(1).unwrap();
        controller.finish_load::<()>(ticket, Ok(questions)).unwrap();
        controller
    }

    fn assert_bounds(controller: &RoundController) {
        let view = controller.view();
        if let (Some(index), Some(count)) = (view.current_index, view.question_count) {
            assert!(index <= count);
        }
    }

    #[test]
    fn trimmed_correct_answer_scores_and_completes() {
        let mut controller = active(vec![question(1, Difficulty::Easy, "42")]);
        controller.set_pending_answer(" 42 ").unwrap();

        let step = controller.submit_answer().unwrap();

        assert_eq!(step.judgement, Judgement::Correct { points: 2 });
        assert_eq!(controller.phase(), RoundPhase::Complete);
        assert_eq!(controller.view().score, Some(2));
        assert_eq!(
            step.completion,
            Some(Completion {
                session: controller.session().unwrap(),
                week: 1,
                score: 2,
            })
        );
    }

    #[test]
    fn wrong_answer_scores_nothing_but_still_advances() {
        let mut controller = active(vec![question(1, Difficulty::Easy, "42")]);
        controller.set_pending_answer("41").unwrap();

        let step = controller.submit_answer().unwrap();

        assert_eq!(step.judgement, Judgement::Incorrect);
        assert_eq!(controller.view().score, Some(0));
        assert_eq!(controller.phase(), RoundPhase::Complete);
        assert!(step.completion.is_some());
    }

    #[test]
    fn blank_answer_is_unanswered_and_advances() {
        let mut controller = active(vec![
            question(1, Difficulty::Hard, "a"),
            question(2, Difficulty::Hard, "b"),
        ]);
        controller.set_pending_answer("   ").unwrap();

        let step = controller.submit_answer().unwrap();

        assert_eq!(step.judgement, Judgement::Unanswered);
        assert_eq!(controller.view().current_index, Some(1));
        assert_eq!(controller.view().pending_answer.as_deref(), Some(""));
        assert_eq!(controller.phase(), RoundPhase::Active);
    }

    #[test]
    fn timeout_without_answer_matches_empty_submission() {
        let mut by_timeout = active(vec![
            question(1, Difficulty::Medium, "x"),
            question(2, Difficulty::Medium, "y"),
        ]);
        let mut by_submit = by_timeout.clone();

        let mut outcome = by_timeout.tick().unwrap();
        for _ in 1..DEFAULT_QUESTION_TIME_SECS {
            outcome = by_timeout.tick().unwrap();
        }
        let submitted = by_submit.submit_answer().unwrap();

        let TickOutcome::TimedOut(step) = outcome else {
            panic!("expected timeout, got {outcome:?}");
        };
        assert!(step.timed_out);
        assert_eq!(step.judgement, submitted.judgement);
        assert_eq!(by_timeout.view().current_index, by_submit.view().current_index);
        assert_eq!(by_timeout.view().score, by_submit.view().score);
        assert_eq!(
            by_timeout.view().time_remaining,
            Some(DEFAULT_QUESTION_TIME_SECS)
        );
    }

    #[test]
    fn timeout_keeps_a_correct_pending_answer() {
        let mut controller = active(vec![question(1, Difficulty::Medium, "Packers")]);
        controller.set_pending_answer("packers").unwrap();

        for _ in 0..DEFAULT_QUESTION_TIME_SECS {
            controller.tick().unwrap();
        }

        assert_eq!(controller.view().score, Some(6));
        assert_eq!(controller.phase(), RoundPhase::Complete);
    }

    #[test]
    fn ticks_count_down_and_reset_on_advance() {
        let mut controller = active(vec![
            question(1, Difficulty::Easy, "a"),
            question(2, Difficulty::Easy, "b"),
        ]);

        assert_eq!(
            controller.tick().unwrap(),
            TickOutcome::Counting { time_remaining: 19 }
        );
        controller.submit_answer().unwrap();
        assert_eq!(controller.view().time_remaining, Some(20));
    }

    #[test]
    fn score_is_monotonic_and_index_bounded() {
        let mut controller = active(vec![
            question(1, Difficulty::Easy, "a"),
            question(2, Difficulty::Medium, "b"),
            question(3, Difficulty::Hard, "c"),
        ]);
        let answers = ["a", "wrong", "c"];
        let mut last_score = 0;

        for answer in answers {
            controller.set_pending_answer(answer).unwrap();
            controller.submit_answer().unwrap();
            let score = controller.view().score.unwrap();
            assert!(score >= last_score);
            last_score = score;
            assert_bounds(&controller);
        }

        assert_eq!(last_score, 17);
        assert_eq!(controller.view().current_index, Some(3));
        assert!(matches!(
            controller.submit_answer(),
            Err(RoundError::NotActive)
        ));
        assert!(matches!(controller.tick(), Err(RoundError::NotActive)));
        assert_bounds(&controller);
    }

    #[test]
    fn completion_fires_once_and_again_after_replay() {
        let mut controller = active(vec![question(1, Difficulty::Easy, "a")]);

        let first = controller.submit_answer().unwrap().completion.unwrap();
        assert!(controller.submit_answer().is_err());

        let replayed = controller.restart_same_week().unwrap();
        assert_ne!(replayed, first.session);
        assert_eq!(controller.view().score, Some(0));
        assert_eq!(controller.view().current_index, Some(0));

        controller.set_pending_answer("A").unwrap();
        let second = controller.submit_answer().unwrap().completion.unwrap();
        assert_eq!(second.session, replayed);
        assert_eq!(second.score, 2);
    }

    #[test]
    fn empty_week_never_becomes_active() {
        let mut controller = RoundController::default();
        let ticket = controller.select_week(7).unwrap();

        let err = controller.finish_load::<()>(ticket, Ok(Vec::new())).unwrap_err();

        assert_eq!(err, LoadError::NoQuestions { week: 7 });
        assert_eq!(controller.phase(), RoundPhase::Idle);
        assert_eq!(controller.view().load_error, Some(err));
        assert!(controller.timer_key().is_none());
    }

    #[test]
    fn fetch_failure_returns_to_idle_and_can_retry() {
        let mut controller = RoundController::default();
        let ticket = controller.select_week(2).unwrap();

        let err = controller
            .finish_load(ticket, Err::<Vec<Question>, _>("offline"))
            .unwrap_err();
        assert_eq!(err, LoadError::Failed);
        assert_eq!(controller.phase(), RoundPhase::Idle);
        assert_eq!(controller.view().week, Some(2));

        let retry = controller.select_week(2).unwrap();
        assert_eq!(controller.view().load_error, None);
        controller
            .finish_load::<()>(retry, Ok(vec![question(1, Difficulty::Easy, "a")]))
            .unwrap();
        assert_eq!(controller.phase(), RoundPhase::Active);
    }

    #[test]
    fn stale_ticket_is_ignored_after_leaving() {
        let mut controller = RoundController::default();
        let ticket = controller.select_week(3).unwrap();
        controller.choose_new_week().unwrap();

        let err = controller
            .finish_load::<()>(ticket, Ok(vec![question(1, Difficulty::Easy, "a")]))
            .unwrap_err();

        assert_eq!(err, LoadError::Stale);
        assert_eq!(controller.phase(), RoundPhase::Idle);
        assert_eq!(controller.view().week, None);
    }

    #[test]
    fn questions_are_played_in_id_order() {
        let controller = active(vec![
            question(9, Difficulty::Easy, "late"),
            question(3, Difficulty::Easy, "early"),
        ]);
        assert_eq!(controller.view().question.unwrap().id, 3);
    }

    #[test]
    fn timer_key_changes_with_question_and_session() {
        let mut controller = active(vec![
            question(1, Difficulty::Easy, "a"),
            question(2, Difficulty::Easy, "b"),
        ]);
        let first = controller.timer_key().unwrap();
        controller.submit_answer().unwrap();
        let second = controller.timer_key().unwrap();
        assert_ne!(first, second);
        assert_eq!(second.question_index, 1);

        controller.submit_answer().unwrap();
        assert!(controller.timer_key().is_none());

        controller.restart_same_week().unwrap();
        let replayed = controller.timer_key().unwrap();
        assert_eq!(replayed.question_index, 0);
        assert_ne!(replayed.session, first.session);
    }

    #[test]
    fn choose_new_week_discards_questions() {
        let mut controller = active(vec![question(1, Difficulty::Easy, "a")]);
        controller.submit_answer().unwrap();

        controller.choose_new_week().unwrap();

        let view = controller.view();
        assert_eq!(view.phase, RoundPhase::Idle);
        assert_eq!(view.question_count, None);
        assert!(controller.restart_same_week().is_err());
    }

    #[test]
    fn pending_answer_requires_active_round() {
        let mut controller = RoundController::default();
        assert_eq!(
            controller.set_pending_answer("early"),
            Err(RoundError::NotActive)
        );
    }
}
