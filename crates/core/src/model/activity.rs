use std::collections::HashSet;

use serde::Deserialize;
use thiserror::Error;

use crate::model::exercise::{AnswerOption, Exercise, ExerciseError};
use crate::model::ids::{ActivityId, ExerciseId, OptionId, ParseIdError};

/// Points awarded per correct answer in every built-in activity.
pub const DEFAULT_POINT_VALUE: u32 = 10;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ActivityError {
    #[error("activity title cannot be empty")]
    EmptyTitle,

    #[error("activity must contain at least one exercise")]
    Empty,

    #[error("point value must be > 0")]
    InvalidPointValue,

    #[error("exercise id {0} is used more than once")]
    DuplicateExercise(ExerciseId),

    #[error("invalid exercise {id}: {source}")]
    Exercise {
        id: String,
        #[source]
        source: ExerciseError,
    },

    #[error(transparent)]
    InvalidId(#[from] ParseIdError),
}

//
// ─── ACTIVITY ──────────────────────────────────────────────────────────────────
//

/// A named, ordered collection of exercises presented as one mini-game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    id: ActivityId,
    title: String,
    description: Option<String>,
    point_value: u32,
    exercises: Vec<Exercise>,
}

impl Activity {
    /// Creates a validated activity.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if the title is blank, there are no exercises,
    /// the point value is zero, or two exercises share an id.
    pub fn new(
        id: ActivityId,
        title: impl Into<String>,
        description: Option<String>,
        point_value: u32,
        exercises: Vec<Exercise>,
    ) -> Result<Self, ActivityError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(ActivityError::EmptyTitle);
        }
        if point_value == 0 {
            return Err(ActivityError::InvalidPointValue);
        }
        validate_exercises(&exercises)?;

        let description = description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        Ok(Self {
            id,
            title,
            description,
            point_value,
            exercises,
        })
    }

    /// Same activity with a different exercise list (e.g. a shuffled order).
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if the new list fails validation.
    pub fn with_exercises(&self, exercises: Vec<Exercise>) -> Result<Self, ActivityError> {
        validate_exercises(&exercises)?;
        Ok(Self {
            exercises,
            ..self.clone()
        })
    }

    #[must_use]
    pub fn id(&self) -> &ActivityId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn point_value(&self) -> u32 {
        self.point_value
    }

    #[must_use]
    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    #[must_use]
    pub fn exercise(&self, index: usize) -> Option<&Exercise> {
        self.exercises.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    /// Always false for a constructed activity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    /// Highest attainable score: every exercise answered correctly.
    #[must_use]
    pub fn max_score(&self) -> u32 {
        u32::try_from(self.exercises.len())
            .unwrap_or(u32::MAX)
            .saturating_mul(self.point_value)
    }
}

fn validate_exercises(exercises: &[Exercise]) -> Result<(), ActivityError> {
    if exercises.is_empty() {
        return Err(ActivityError::Empty);
    }
    let mut seen = HashSet::with_capacity(exercises.len());
    for exercise in exercises {
        if !seen.insert(exercise.id()) {
            return Err(ActivityError::DuplicateExercise(exercise.id().clone()));
        }
    }
    Ok(())
}

//
// ─── DEFINITIONS ───────────────────────────────────────────────────────────────
//

/// Exercise ids appear as numbers or strings in catalog files.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(u32),
    Text(String),
}

impl std::fmt::Display for RawId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawId::Number(n) => write!(f, "{n}"),
            RawId::Text(s) => f.write_str(s),
        }
    }
}

/// Serialized shape of an activity as written in catalog files.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityDefinition {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub point_value: Option<u32>,
    pub exercises: Vec<ExerciseDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExerciseDefinition {
    pub id: RawId,
    pub title: String,
    #[serde(default)]
    pub scenario: Option<String>,
    pub question: String,
    pub options: Vec<OptionDefinition>,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptionDefinition {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub correct: bool,
}

impl ExerciseDefinition {
    /// Validate into a domain `Exercise`.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError::Exercise` with the offending id on failure.
    pub fn validate(self) -> Result<Exercise, ActivityError> {
        let raw_id = self.id.to_string();
        let id = match self.id {
            RawId::Number(n) => ExerciseId::from(n),
            RawId::Text(s) => ExerciseId::new(s)?,
        };
        let options = self
            .options
            .into_iter()
            .map(|o| Ok(AnswerOption::new(OptionId::new(o.id)?, o.text, o.correct)))
            .collect::<Result<Vec<_>, ParseIdError>>()?;

        Exercise::new(
            id,
            self.title,
            self.scenario,
            self.question,
            options,
            self.explanation,
        )
        .map_err(|source| ActivityError::Exercise { id: raw_id, source })
    }
}

impl ActivityDefinition {
    /// Validate into a domain `Activity`, defaulting the point value.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` for any invalid activity or exercise.
    pub fn validate(self) -> Result<Activity, ActivityError> {
        let exercises = self
            .exercises
            .into_iter()
            .map(ExerciseDefinition::validate)
            .collect::<Result<Vec<_>, _>>()?;

        Activity::new(
            ActivityId::new(self.id)?,
            self.title,
            self.description,
            self.point_value.unwrap_or(DEFAULT_POINT_VALUE),
            exercises,
        )
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(id: u32) -> Exercise {
        Exercise::new(
            ExerciseId::from(id),
            format!("Exercise {id}"),
            None,
            "Which one?",
            vec![
                AnswerOption::new(OptionId::new("a").unwrap(), "Yes", true),
                AnswerOption::new(OptionId::new("b").unwrap(), "No", false),
            ],
            "",
        )
        .unwrap()
    }

    fn activity_id() -> ActivityId {
        ActivityId::new("feelings").unwrap()
    }

    #[test]
    fn activity_rejects_empty_exercise_list() {
        let err = Activity::new(activity_id(), "Feelings", None, 10, Vec::new()).unwrap_err();
        assert_eq!(err, ActivityError::Empty);
    }

    #[test]
    fn activity_rejects_zero_point_value() {
        let err = Activity::new(activity_id(), "Feelings", None, 0, vec![exercise(1)]).unwrap_err();
        assert_eq!(err, ActivityError::InvalidPointValue);
    }

    #[test]
    fn activity_rejects_duplicate_exercise_ids() {
        let err = Activity::new(
            activity_id(),
            "Feelings",
            None,
            10,
            vec![exercise(1), exercise(1)],
        )
        .unwrap_err();
        assert_eq!(err, ActivityError::DuplicateExercise(ExerciseId::from(1)));
    }

    #[test]
    fn max_score_is_count_times_points() {
        let activity = Activity::new(
            activity_id(),
            "  Feelings ",
            Some("   ".into()),
            10,
            vec![exercise(1), exercise(2), exercise(3)],
        )
        .unwrap();
        assert_eq!(activity.title(), "Feelings");
        assert_eq!(activity.description(), None);
        assert_eq!(activity.max_score(), 30);
    }

    #[test]
    fn definition_parses_numeric_and_text_ids() {
        let json = r#"{
            "id": "routines",
            "title": "Morning routine",
            "exercises": [
                {"id": 1, "title": "Wake up", "question": "First step?",
                 "options": [{"id": "a", "text": "Brush teeth", "correct": true},
                             {"id": "b", "text": "Go to bed"}]},
                {"id": "two", "title": "Dress", "question": "Next?",
                 "options": [{"id": "a", "text": "Socks", "correct": true}]}
            ]
        }"#;
        let def: ActivityDefinition = serde_json::from_str(json).unwrap();
        let activity = def.validate().unwrap();

        assert_eq!(activity.point_value(), DEFAULT_POINT_VALUE);
        assert_eq!(activity.exercises()[0].id().as_str(), "1");
        assert_eq!(activity.exercises()[1].id().as_str(), "two");
    }

    #[test]
    fn definition_reports_failing_exercise() {
        let json = r#"{
            "id": "routines",
            "title": "Morning routine",
            "exercises": [
                {"id": 7, "title": "Wake up", "question": "First step?",
                 "options": [{"id": "a", "text": "Brush teeth"}]}
            ]
        }"#;
        let def: ActivityDefinition = serde_json::from_str(json).unwrap();
        let err = def.validate().unwrap_err();
        assert!(matches!(
            err,
            ActivityError::Exercise { ref id, source: ExerciseError::NoCorrectOption } if id == "7"
        ));
    }
}
