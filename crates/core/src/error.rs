use thiserror::Error;

use crate::model::{ActivityError, ExerciseError, ParseIdError, SessionSummaryError};
use crate::session::SessionError;

/// Umbrella error for callers that do not care which domain rule failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Activity(#[from] ActivityError),
    #[error(transparent)]
    Exercise(#[from] ExerciseError),
    #[error(transparent)]
    Id(#[from] ParseIdError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Summary(#[from] SessionSummaryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ActivityId;

    #[test]
    fn wraps_domain_errors_transparently() {
        let err: Error = ActivityId::new("  ").unwrap_err().into();
        assert!(matches!(err, Error::Id(_)));
        assert_eq!(err.to_string(), "ActivityId cannot be blank");
    }
}
