use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ExerciseId, OptionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExerciseError {
    #[error("exercise title cannot be empty")]
    EmptyTitle,

    #[error("exercise question cannot be empty")]
    EmptyQuestion,

    #[error("option text cannot be empty (option {0})")]
    EmptyOptionText(OptionId),

    #[error("exercise has no options")]
    NoOptions,

    #[error("option id {0} is used more than once")]
    DuplicateOption(OptionId),

    #[error("exercise has no correct option")]
    NoCorrectOption,

    #[error("exercise has {0} correct options, expected exactly one")]
    MultipleCorrectOptions(usize),
}

//
// ─── ANSWER OPTION ─────────────────────────────────────────────────────────────
//

/// One selectable answer for an exercise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    id: OptionId,
    text: String,
    correct: bool,
}

impl AnswerOption {
    #[must_use]
    pub fn new(id: OptionId, text: impl Into<String>, correct: bool) -> Self {
        Self {
            id,
            text: text.into().trim().to_owned(),
            correct,
        }
    }

    #[must_use]
    pub fn id(&self) -> &OptionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.correct
    }
}

//
// ─── EXERCISE ──────────────────────────────────────────────────────────────────
//

/// One scenario/question/options/explanation unit.
///
/// Immutable once built. Construction enforces that exactly one option is
/// correct, so scoring never has to deal with zero or several right answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exercise {
    id: ExerciseId,
    title: String,
    scenario: Option<String>,
    question: String,
    options: Vec<AnswerOption>,
    explanation: String,
}

impl Exercise {
    /// Creates a validated exercise.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError` if title/question are blank, option ids repeat,
    /// an option has no text, or the number of correct options is not one.
    pub fn new(
        id: ExerciseId,
        title: impl Into<String>,
        scenario: Option<String>,
        question: impl Into<String>,
        options: Vec<AnswerOption>,
        explanation: impl Into<String>,
    ) -> Result<Self, ExerciseError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(ExerciseError::EmptyTitle);
        }
        let question = question.into().trim().to_owned();
        if question.is_empty() {
            return Err(ExerciseError::EmptyQuestion);
        }
        validate_options(&options)?;

        let scenario = scenario
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty());

        Ok(Self {
            id,
            title,
            scenario,
            question,
            options,
            explanation: explanation.into().trim().to_owned(),
        })
    }

    #[must_use]
    pub fn id(&self) -> &ExerciseId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn scenario(&self) -> Option<&str> {
        self.scenario.as_deref()
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn option(&self, id: &OptionId) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.id() == id)
    }

    /// The single correct option. Always present for a constructed exercise.
    #[must_use]
    pub fn correct_option(&self) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.is_correct())
    }

    /// Returns a copy with options rearranged by `order` (indices into the
    /// current option list). Indices that are out of range or repeated are
    /// ignored and missing options keep their relative order at the end.
    #[must_use]
    pub fn with_option_order(&self, order: &[usize]) -> Self {
        let mut taken = vec![false; self.options.len()];
        let mut options = Vec::with_capacity(self.options.len());
        for &idx in order {
            if let Some(slot) = taken.get_mut(idx) {
                if !*slot {
                    *slot = true;
                    options.push(self.options[idx].clone());
                }
            }
        }
        for (idx, option) in self.options.iter().enumerate() {
            if !taken[idx] {
                options.push(option.clone());
            }
        }

        Self {
            options,
            ..self.clone()
        }
    }
}

fn validate_options(options: &[AnswerOption]) -> Result<(), ExerciseError> {
    if options.is_empty() {
        return Err(ExerciseError::NoOptions);
    }

    let mut seen = HashSet::with_capacity(options.len());
    for option in options {
        if option.text().is_empty() {
            return Err(ExerciseError::EmptyOptionText(option.id().clone()));
        }
        if !seen.insert(option.id()) {
            return Err(ExerciseError::DuplicateOption(option.id().clone()));
        }
    }

    match options.iter().filter(|o| o.is_correct()).count() {
        0 => Err(ExerciseError::NoCorrectOption),
        1 => Ok(()),
        n => Err(ExerciseError::MultipleCorrectOptions(n)),
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(id: &str, correct: bool) -> AnswerOption {
        AnswerOption::new(OptionId::new(id).unwrap(), format!("option {id}"), correct)
    }

    fn build(options: Vec<AnswerOption>) -> Result<Exercise, ExerciseError> {
        Exercise::new(
            ExerciseId::from(1),
            "At the park",
            Some("A child takes your ball.".into()),
            "What could you say?",
            options,
            "Asking calmly helps.",
        )
    }

    #[test]
    fn valid_exercise_builds() {
        let ex = build(vec![opt("a", false), opt("b", true), opt("c", false)]).unwrap();
        assert_eq!(ex.options().len(), 3);
        assert_eq!(ex.correct_option().unwrap().id().as_str(), "b");
        assert_eq!(ex.scenario(), Some("A child takes your ball."));
    }

    #[test]
    fn rejects_zero_correct_options() {
        let err = build(vec![opt("a", false), opt("b", false)]).unwrap_err();
        assert_eq!(err, ExerciseError::NoCorrectOption);
    }

    #[test]
    fn rejects_multiple_correct_options() {
        let err = build(vec![opt("a", true), opt("b", true)]).unwrap_err();
        assert_eq!(err, ExerciseError::MultipleCorrectOptions(2));
    }

    #[test]
    fn rejects_duplicate_option_ids() {
        let err = build(vec![opt("a", true), opt("a", false)]).unwrap_err();
        assert!(matches!(err, ExerciseError::DuplicateOption(id) if id.as_str() == "a"));
    }

    #[test]
    fn rejects_empty_options_and_text() {
        assert_eq!(build(Vec::new()).unwrap_err(), ExerciseError::NoOptions);

        let blank = AnswerOption::new(OptionId::new("a").unwrap(), "  ", true);
        assert!(matches!(
            build(vec![blank]).unwrap_err(),
            ExerciseError::EmptyOptionText(_)
        ));
    }

    #[test]
    fn blank_scenario_is_dropped() {
        let ex = Exercise::new(
            ExerciseId::from(2),
            "Title",
            Some("   ".into()),
            "Question?",
            vec![opt("a", true)],
            "",
        )
        .unwrap();
        assert_eq!(ex.scenario(), None);
    }

    #[test]
    fn option_order_keeps_every_option_once() {
        let ex = build(vec![opt("a", false), opt("b", true), opt("c", false)]).unwrap();
        let reordered = ex.with_option_order(&[2, 2, 9, 0]);
        let ids: Vec<_> = reordered.options().iter().map(|o| o.id().as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
        assert_eq!(reordered.correct_option().unwrap().id().as_str(), "b");
    }
}
