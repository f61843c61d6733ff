use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ActivityId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionSummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("score ({score}) exceeds max score ({max_score})")]
    ScoreOutOfRange { score: u32, max_score: u32 },

    #[error("correct answers ({correct}) exceed total exercises ({total})")]
    CountMismatch { correct: u32, total: u32 },
}

/// Record handed to the persistence collaborator when a session finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    activity_id: ActivityId,
    score: u32,
    max_score: u32,
    correct: u32,
    total: u32,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
}

impl SessionSummary {
    /// Rehydrate a session summary from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError` if timestamps or counts are inconsistent.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        activity_id: ActivityId,
        score: u32,
        max_score: u32,
        correct: u32,
        total: u32,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, SessionSummaryError> {
        if completed_at < started_at {
            return Err(SessionSummaryError::InvalidTimeRange);
        }
        if score > max_score {
            return Err(SessionSummaryError::ScoreOutOfRange { score, max_score });
        }
        if correct > total {
            return Err(SessionSummaryError::CountMismatch { correct, total });
        }

        Ok(Self {
            activity_id,
            score,
            max_score,
            correct,
            total,
            started_at,
            completed_at,
        })
    }

    #[must_use]
    pub fn activity_id(&self) -> &ActivityId {
        &self.activity_id
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn max_score(&self) -> u32 {
        self.max_score
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// Score as a whole percentage of the max score, rounded down.
    #[must_use]
    pub fn percentage(&self) -> u32 {
        if self.max_score == 0 {
            return 0;
        }
        let pct = u64::from(self.score) * 100 / u64::from(self.max_score);
        u32::try_from(pct).unwrap_or(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn activity() -> ActivityId {
        ActivityId::new("feelings").unwrap()
    }

    #[test]
    fn summary_accepts_consistent_values() {
        let now = fixed_now();
        let summary = SessionSummary::from_persisted(
            activity(),
            20,
            30,
            2,
            3,
            now,
            now + Duration::minutes(4),
        )
        .unwrap();
        assert_eq!(summary.score(), 20);
        assert_eq!(summary.percentage(), 66);
    }

    #[test]
    fn summary_rejects_reversed_time_range() {
        let now = fixed_now();
        let err = SessionSummary::from_persisted(
            activity(),
            0,
            30,
            0,
            3,
            now,
            now - Duration::seconds(1),
        )
        .unwrap_err();
        assert_eq!(err, SessionSummaryError::InvalidTimeRange);
    }

    #[test]
    fn summary_rejects_score_above_max() {
        let now = fixed_now();
        let err = SessionSummary::from_persisted(activity(), 40, 30, 3, 3, now, now).unwrap_err();
        assert_eq!(
            err,
            SessionSummaryError::ScoreOutOfRange {
                score: 40,
                max_score: 30
            }
        );
    }

    #[test]
    fn summary_rejects_correct_above_total() {
        let now = fixed_now();
        let err = SessionSummary::from_persisted(activity(), 10, 30, 4, 3, now, now).unwrap_err();
        assert!(matches!(err, SessionSummaryError::CountMismatch { .. }));
    }
}
