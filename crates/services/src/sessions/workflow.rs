use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rng;
use rand::seq::SliceRandom;
use storage::repository::{SessionSummaryRepository, StorageError};
use tea_core::model::{Activity, ActivityId, Exercise, OptionId};
use tea_core::{AnswerOutcome, ExerciseSession, Phase};
use tracing::{debug, info, warn};

use super::deadline::{DeadlineStatus, SessionDeadline};
use crate::Clock;
use crate::catalog::ActivityCatalog;
use crate::error::SessionLoopError;
use crate::narration::{NarrationService, Priority, VoiceStyle};
use crate::navigation::{Navigator, Route};

/// One learner's pass through an activity, plus the bookkeeping the
/// engine itself does not track.
#[derive(Debug, Clone)]
pub struct ActivityRun {
    session: ExerciseSession,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    deadline: Option<SessionDeadline>,
    summary_id: Option<i64>,
}

impl ActivityRun {
    fn new(
        session: ExerciseSession,
        started_at: DateTime<Utc>,
        deadline: Option<SessionDeadline>,
    ) -> Self {
        Self {
            session,
            started_at: Some(started_at),
            completed_at: None,
            deadline,
            summary_id: None,
        }
    }

    #[must_use]
    pub fn session(&self) -> &ExerciseSession {
        &self.session
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn deadline(&self) -> Option<SessionDeadline> {
        self.deadline
    }

    /// Storage id of the persisted summary, once saved.
    #[must_use]
    pub fn summary_id(&self) -> Option<i64> {
        self.summary_id
    }

    fn clear(&mut self) {
        self.session.reset();
        self.started_at = None;
        self.completed_at = None;
        self.summary_id = None;
    }
}

/// Result of moving past feedback.
#[derive(Debug)]
pub struct AdvanceResult {
    pub phase: Phase,
    pub summary_id: Option<i64>,
    /// Set when the run finished but its summary could not be saved.
    /// The run stays finished; call `finalize_summary` to retry.
    pub persist_error: Option<StorageError>,
}

impl AdvanceResult {
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }
}

/// Orchestrates activity runs: narration, navigation and summary persistence
/// around the `ExerciseSession` engine.
#[derive(Clone)]
pub struct SessionLoopService {
    clock: Clock,
    catalog: Arc<ActivityCatalog>,
    summaries: Arc<dyn SessionSummaryRepository>,
    narrator: NarrationService,
    navigator: Arc<dyn Navigator>,
    shuffle: bool,
    deadline: Option<SessionDeadline>,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<ActivityCatalog>,
        summaries: Arc<dyn SessionSummaryRepository>,
        narrator: NarrationService,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            clock,
            catalog,
            summaries,
            narrator,
            navigator,
            shuffle: false,
            deadline: None,
        }
    }

    /// Shuffle exercise and option order for each new run.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Apply a time limit to every new run.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<SessionDeadline>) -> Self {
        self.deadline = deadline;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn catalog(&self) -> &ActivityCatalog {
        &self.catalog
    }

    /// Start a run of the given activity at its first exercise.
    ///
    /// # Errors
    ///
    /// Returns `SessionLoopError::UnknownActivity` if the catalog has no such
    /// activity, or `SessionLoopError::Activity` if shuffling produced an
    /// invalid activity.
    pub fn start_session(&self, activity_id: &ActivityId) -> Result<ActivityRun, SessionLoopError> {
        let activity = self
            .catalog
            .get(activity_id)
            .ok_or_else(|| SessionLoopError::UnknownActivity(activity_id.clone()))?;
        let activity = self.prepare(activity)?;

        let mut session = ExerciseSession::new();
        session.start(Arc::clone(&activity))?;
        let run = ActivityRun::new(session, self.clock.now(), self.deadline);

        info!(activity = %activity_id, exercises = activity.len(), "activity started");
        self.navigator.navigate(Route::Activity(activity_id.clone()));
        self.narrator.interrupt();
        self.narrate_intro(&run);
        Ok(run)
    }

    /// # Errors
    ///
    /// Returns `SessionLoopError::Transition` outside `ExerciseIntro`.
    pub fn reveal_question(&self, run: &mut ActivityRun) -> Result<Phase, SessionLoopError> {
        let phase = run.session.reveal_question()?;
        if let Some(exercise) = run.session.current_exercise() {
            self.narrator.speak(question_line(exercise), VoiceStyle::Calm);
        }
        Ok(phase)
    }

    /// # Errors
    ///
    /// Returns `SessionLoopError::Transition` for a wrong phase or an option
    /// outside the current exercise.
    pub fn select_option(
        &self,
        run: &mut ActivityRun,
        option_id: &OptionId,
    ) -> Result<(), SessionLoopError> {
        run.session.select_option(option_id)?;
        debug!(option = %option_id, "option selected");
        Ok(())
    }

    /// Score the selected option and narrate feedback.
    ///
    /// # Errors
    ///
    /// Returns `SessionLoopError::Transition` with `NoSelection`,
    /// `AlreadyAnswered` or a wrong-phase error.
    pub fn submit_answer(&self, run: &mut ActivityRun) -> Result<AnswerOutcome, SessionLoopError> {
        let outcome = run.session.submit_answer()?;
        info!(
            exercise = %outcome.exercise_id,
            correct = outcome.correct,
            score = outcome.score,
            "answer submitted"
        );
        if let Some(exercise) = run.session.current_exercise() {
            let (line, voice) = feedback_line(exercise, outcome.correct);
            self.narrator.speak_with_priority(line, voice, Priority::High);
        }
        Ok(outcome)
    }

    /// Move to the next exercise, or finish and persist the summary.
    ///
    /// A failed save never fails the transition; it is reported in
    /// `AdvanceResult::persist_error`.
    ///
    /// # Errors
    ///
    /// Returns `SessionLoopError::Transition` outside `Feedback`.
    pub async fn advance(&self, run: &mut ActivityRun) -> Result<AdvanceResult, SessionLoopError> {
        let phase = run.session.advance()?;
        if phase != Phase::Finished {
            self.narrate_intro(run);
            return Ok(AdvanceResult {
                phase,
                summary_id: None,
                persist_error: None,
            });
        }

        let now = self.clock.now();
        // Never stamp a completion before the start, even if the wall clock stepped back.
        run.completed_at = Some(run.started_at.map_or(now, |started| now.max(started)));
        self.narrator.speak(
            format!(
                "All done! You scored {} out of {} points.",
                run.session.score(),
                run.session.max_score()
            ),
            VoiceStyle::Cheerful,
        );

        let persist_error = match self.finalize_summary(run).await {
            Ok(_) => None,
            Err(SessionLoopError::Storage(err)) => {
                warn!(error = %err, "failed to save session summary");
                Some(err)
            }
            Err(err) => return Err(err),
        };

        self.navigator.navigate(Route::Dashboard);
        Ok(AdvanceResult {
            phase,
            summary_id: run.summary_id,
            persist_error,
        })
    }

    /// Persist the summary of a finished run. Idempotent once saved.
    ///
    /// # Errors
    ///
    /// Returns `SessionLoopError::NotFinished` before the run finishes and
    /// `SessionLoopError::Storage` if the repository fails.
    pub async fn finalize_summary(&self, run: &mut ActivityRun) -> Result<i64, SessionLoopError> {
        if let Some(id) = run.summary_id {
            return Ok(id);
        }
        let (Some(started_at), Some(completed_at)) = (run.started_at, run.completed_at) else {
            return Err(SessionLoopError::NotFinished);
        };
        if !run.session.is_finished() {
            return Err(SessionLoopError::NotFinished);
        }

        let summary = run.session.summarize(started_at, completed_at)?;
        let id = self.summaries.append_summary(&summary).await?;
        info!(
            summary_id = id,
            activity = %summary.activity_id(),
            score = summary.score(),
            max_score = summary.max_score(),
            "session summary saved"
        );
        run.summary_id = Some(id);
        Ok(id)
    }

    /// Drop all progress and go back to `NotStarted`.
    pub fn reset(&self, run: &mut ActivityRun) -> Phase {
        self.narrator.interrupt();
        run.clear();
        run.phase()
    }

    /// Leave the activity: reset the run and return to the dashboard.
    pub fn exit(&self, run: &mut ActivityRun) -> Phase {
        let phase = self.reset(run);
        self.navigator.navigate(Route::Dashboard);
        phase
    }

    /// Reset the run if its time limit has passed.
    pub fn enforce_deadline(&self, run: &mut ActivityRun) -> DeadlineStatus {
        let Some(deadline) = run.deadline else {
            return DeadlineStatus::Unlimited;
        };
        let Some(started_at) = run.started_at else {
            return DeadlineStatus::Inactive;
        };
        if run.session.is_finished() {
            return DeadlineStatus::Inactive;
        }

        let status = deadline.status_at(started_at, self.clock.now());
        if status.is_expired() {
            info!(
                activity = ?run.session.activity_id(),
                limit_secs = deadline.limit().num_seconds(),
                "time limit reached; resetting run"
            );
            self.reset(run);
            self.narrator.speak_with_priority(
                "Time is up. Let's try again later.",
                VoiceStyle::Calm,
                Priority::High,
            );
        }
        status
    }

    fn prepare(&self, activity: Arc<Activity>) -> Result<Arc<Activity>, SessionLoopError> {
        if !self.shuffle {
            return Ok(activity);
        }
        let mut rng = rng();
        let mut exercises: Vec<Exercise> = activity
            .exercises()
            .iter()
            .map(|exercise| {
                let mut order: Vec<usize> = (0..exercise.options().len()).collect();
                order.shuffle(&mut rng);
                exercise.with_option_order(&order)
            })
            .collect();
        exercises.shuffle(&mut rng);
        Ok(Arc::new(activity.with_exercises(exercises)?))
    }

    fn narrate_intro(&self, run: &ActivityRun) {
        if let Some(exercise) = run.session.current_exercise() {
            self.narrator.speak(intro_line(exercise), VoiceStyle::Calm);
        }
    }
}

fn intro_line(exercise: &Exercise) -> String {
    match exercise.scenario() {
        Some(scenario) => format!("{}. {}", exercise.title(), scenario),
        None => exercise.title().to_owned(),
    }
}

fn question_line(exercise: &Exercise) -> String {
    let options: Vec<&str> = exercise.options().iter().map(|o| o.text()).collect();
    format!("{} {}", exercise.question(), options.join(", "))
}

fn feedback_line(exercise: &Exercise, correct: bool) -> (String, VoiceStyle) {
    let mut line = if correct {
        String::from("Great job! That's right.")
    } else {
        match exercise.correct_option() {
            Some(option) => format!("Nice try. The answer is {}.", option.text()),
            None => String::from("Nice try."),
        }
    };
    if !exercise.explanation().is_empty() {
        line.push(' ');
        line.push_str(exercise.explanation());
    }
    let voice = if correct {
        VoiceStyle::Cheerful
    } else {
        VoiceStyle::Calm
    };
    (line, voice)
}
