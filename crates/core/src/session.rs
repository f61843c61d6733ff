//! Exercise flow state machine.
//!
//! One `ExerciseSession` drives a single learner through one activity:
//!
//! ```text
//! NotStarted --start--> ExerciseIntro --reveal_question--> AwaitingAnswer
//!     ^                      ^                                 |  select_option (loop)
//!     |                      |                          submit_answer
//!   reset                 advance (more left)                  v
//!  (any phase)               +------------------------------ Feedback
//!                                                              | advance (last)
//!                                                              v
//!                                                          Finished
//! ```
//!
//! Score only changes in `submit_answer`; wrong answers cost nothing.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{
    Activity, ActivityId, Exercise, ExerciseId, OptionId, SessionSummary, SessionSummaryError,
};

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Current state of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    #[default]
    NotStarted,
    /// Scenario shown, question still hidden.
    ExerciseIntro,
    /// Question and options visible; a pick may or may not be made.
    AwaitingAnswer,
    /// Answer submitted; correctness and explanation visible.
    Feedback,
    Finished,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::NotStarted => "not started",
            Phase::ExerciseIntro => "exercise intro",
            Phase::AwaitingAnswer => "awaiting answer",
            Phase::Feedback => "feedback",
            Phase::Finished => "finished",
        };
        f.write_str(name)
    }
}

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Local, recoverable transition failures. A presentation layer that
/// disables controls correctly never triggers these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("option {option} does not belong to exercise {exercise}")]
    InvalidOption {
        exercise: ExerciseId,
        option: OptionId,
    },

    #[error("no option selected")]
    NoSelection,

    #[error("exercise {0} was already answered")]
    AlreadyAnswered(ExerciseId),

    #[error("cannot {operation} while {phase}")]
    WrongPhase {
        operation: &'static str,
        phase: Phase,
    },

    #[error(transparent)]
    Summary(#[from] SessionSummaryError),
}

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

/// What happened when an answer was submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub exercise_id: ExerciseId,
    pub option_id: OptionId,
    pub correct: bool,
    pub points_awarded: u32,
    pub score: u32,
}

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub correct: usize,
    /// 1-based position of the current exercise, 0 before `start`.
    pub position: usize,
    pub is_finished: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Run-time state of one learner's pass through an activity.
///
/// The activity is shared read-only; all mutation goes through the
/// transition methods.
#[derive(Clone, Default)]
pub struct ExerciseSession {
    activity: Option<Arc<Activity>>,
    phase: Phase,
    current: usize,
    selected: Option<OptionId>,
    answered_correctly: Option<bool>,
    score: u32,
    answers: Vec<AnswerOutcome>,
}

impl ExerciseSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for `new()` followed by `start(activity)`.
    #[must_use]
    pub fn started(activity: Arc<Activity>) -> Self {
        let mut session = Self::new();
        session.begin(activity);
        session
    }

    /// Begin the activity at its first exercise.
    ///
    /// Constructed activities are never empty, so the only failure is
    /// calling this on a session that is already running; `reset` first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongPhase` unless the phase is `NotStarted`.
    pub fn start(&mut self, activity: Arc<Activity>) -> Result<Phase, SessionError> {
        self.expect_phase("start", Phase::NotStarted)?;
        self.begin(activity);
        Ok(self.phase())
    }

    fn begin(&mut self, activity: Arc<Activity>) {
        *self = Self {
            activity: Some(activity),
            phase: Phase::ExerciseIntro,
            ..Self::default()
        };
    }

    /// Show the question of the current exercise.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongPhase` outside `ExerciseIntro`.
    pub fn reveal_question(&mut self) -> Result<Phase, SessionError> {
        self.expect_phase("reveal question", Phase::ExerciseIntro)?;
        self.phase = Phase::AwaitingAnswer;
        Ok(self.phase())
    }

    /// Pick (or re-pick) an option for the current exercise.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongPhase` outside `AwaitingAnswer` and
    /// `SessionError::InvalidOption` if the option is not part of the
    /// current exercise.
    pub fn select_option(&mut self, option_id: &OptionId) -> Result<(), SessionError> {
        self.expect_phase("select an option", Phase::AwaitingAnswer)?;
        let exercise = self.require_exercise("select an option")?;
        if exercise.option(option_id).is_none() {
            return Err(SessionError::InvalidOption {
                exercise: exercise.id().clone(),
                option: option_id.clone(),
            });
        }
        self.selected = Some(option_id.clone());
        Ok(())
    }

    /// Lock in the selected option and score it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyAnswered` in `Feedback`,
    /// `SessionError::NoSelection` if nothing is selected, and
    /// `SessionError::WrongPhase` in any other phase.
    pub fn submit_answer(&mut self) -> Result<AnswerOutcome, SessionError> {
        if self.phase() == Phase::Feedback {
            let exercise = self.require_exercise("submit an answer")?;
            return Err(SessionError::AlreadyAnswered(exercise.id().clone()));
        }
        self.expect_phase("submit an answer", Phase::AwaitingAnswer)?;
        let selected = self.selected.clone().ok_or(SessionError::NoSelection)?;

        let (exercise_id, correct, point_value) = {
            let activity = self.require_activity("submit an answer")?;
            let exercise = self.require_exercise("submit an answer")?;
            let correct = exercise
                .option(&selected)
                .is_some_and(|o| o.is_correct());
            (exercise.id().clone(), correct, activity.point_value())
        };

        let points_awarded = if correct { point_value } else { 0 };
        self.score = self.score.saturating_add(points_awarded);
        self.answered_correctly = Some(correct);
        self.phase = Phase::Feedback;

        let outcome = AnswerOutcome {
            exercise_id,
            option_id: selected,
            correct,
            points_awarded,
            score: self.score,
        };
        self.answers.push(outcome.clone());
        Ok(outcome)
    }

    /// Move past feedback to the next exercise, or finish on the last one.
    ///
    /// On finish the index stays on the last exercise so it can still be
    /// shown in a review.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongPhase` outside `Feedback`.
    pub fn advance(&mut self) -> Result<Phase, SessionError> {
        self.expect_phase("advance", Phase::Feedback)?;
        let len = self.require_activity("advance")?.len();

        if self.current + 1 < len {
            self.current += 1;
            self.selected = None;
            self.answered_correctly = None;
            self.phase = Phase::ExerciseIntro;
        } else {
            self.phase = Phase::Finished;
        }
        Ok(self.phase())
    }

    /// Drop all progress; the session behaves as if `start` was never called.
    pub fn reset(&mut self) -> Phase {
        *self = Self::default();
        self.phase()
    }

    // ─── Accessors ─────────────────────────────────────────────────────────────

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn selected_option(&self) -> Option<&OptionId> {
        self.selected.as_ref()
    }

    /// Result of the last submission; only set during `Feedback`.
    #[must_use]
    pub fn answered_correctly(&self) -> Option<bool> {
        match self.phase() {
            Phase::Feedback => self.answered_correctly,
            _ => None,
        }
    }

    #[must_use]
    pub fn activity(&self) -> Option<&Arc<Activity>> {
        self.activity.as_ref()
    }

    #[must_use]
    pub fn activity_id(&self) -> Option<&ActivityId> {
        self.activity.as_deref().map(Activity::id)
    }

    #[must_use]
    pub fn current_exercise(&self) -> Option<&Exercise> {
        self.activity.as_deref()?.exercise(self.current)
    }

    /// Every submitted answer in order.
    #[must_use]
    pub fn answers(&self) -> &[AnswerOutcome] {
        &self.answers
    }

    #[must_use]
    pub fn max_score(&self) -> u32 {
        self.activity.as_deref().map_or(0, Activity::max_score)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase() == Phase::Finished
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.activity.as_deref().map_or(0, Activity::len);
        let position = if self.phase() == Phase::NotStarted {
            0
        } else {
            self.current + 1
        };
        SessionProgress {
            total,
            answered: self.answers.len(),
            correct: self.answers.iter().filter(|a| a.correct).count(),
            position,
            is_finished: self.is_finished(),
        }
    }

    /// Build the summary record for a finished session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongPhase` unless finished, or
    /// `SessionError::Summary` if the timestamps are reversed.
    pub fn summarize(
        &self,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Result<SessionSummary, SessionError> {
        self.expect_phase("summarize", Phase::Finished)?;
        let activity = self.require_activity("summarize")?;
        let progress = self.progress();

        Ok(SessionSummary::from_persisted(
            activity.id().clone(),
            self.score,
            activity.max_score(),
            u32::try_from(progress.correct).unwrap_or(u32::MAX),
            u32::try_from(progress.total).unwrap_or(u32::MAX),
            started_at,
            completed_at,
        )?)
    }

    fn expect_phase(&self, operation: &'static str, expected: Phase) -> Result<(), SessionError> {
        if self.phase() == expected {
            Ok(())
        } else {
            Err(SessionError::WrongPhase {
                operation,
                phase: self.phase(),
            })
        }
    }

    fn require_activity(&self, operation: &'static str) -> Result<&Activity, SessionError> {
        self.activity.as_deref().ok_or(SessionError::WrongPhase {
            operation,
            phase: self.phase(),
        })
    }

    fn require_exercise(&self, operation: &'static str) -> Result<&Exercise, SessionError> {
        self.current_exercise().ok_or(SessionError::WrongPhase {
            operation,
            phase: self.phase(),
        })
    }
}

impl fmt::Debug for ExerciseSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExerciseSession")
            .field("activity", &self.activity_id())
            .field("phase", &self.phase())
            .field("current", &self.current)
            .field("selected", &self.selected)
            .field("score", &self.score)
            .field("answers_len", &self.answers.len())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
