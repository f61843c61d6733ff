mod activity;
mod exercise;
mod ids;
mod summary;

pub use activity::{
    Activity, ActivityDefinition, ActivityError, DEFAULT_POINT_VALUE, ExerciseDefinition,
    OptionDefinition, RawId,
};
pub use exercise::{AnswerOption, Exercise, ExerciseError};
pub use ids::{ActivityId, ExerciseId, OptionId, ParseIdError};
pub use summary::{SessionSummary, SessionSummaryError};
