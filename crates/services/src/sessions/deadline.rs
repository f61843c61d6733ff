use chrono::{DateTime, Duration, Utc};

/// Longest accepted time limit: one year.
pub const MAX_LIMIT_SECS: i64 = 365 * 24 * 60 * 60;

/// Optional time limit for one activity run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionDeadline {
    limit: Duration,
}

impl SessionDeadline {
    /// Returns `None` for a zero or negative limit.
    #[must_use]
    pub fn new(limit: Duration) -> Option<Self> {
        (limit > Duration::zero()).then_some(Self { limit })
    }

    /// Limits above `MAX_LIMIT_SECS` are clamped to it.
    #[must_use]
    pub fn from_secs(secs: u64) -> Option<Self> {
        let secs = i64::try_from(secs)
            .unwrap_or(MAX_LIMIT_SECS)
            .min(MAX_LIMIT_SECS);
        Self::new(Duration::try_seconds(secs)?)
    }

    #[must_use]
    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// Status of a run started at `started_at`, as seen at `now`.
    #[must_use]
    pub fn status_at(&self, started_at: DateTime<Utc>, now: DateTime<Utc>) -> DeadlineStatus {
        let elapsed = (now - started_at).max(Duration::zero());
        if elapsed >= self.limit {
            DeadlineStatus::Expired
        } else {
            DeadlineStatus::Remaining(self.limit - elapsed)
        }
    }
}

/// Result of checking a run against its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineStatus {
    /// The run has no time limit.
    Unlimited,
    Remaining(Duration),
    /// Time ran out; the run was reset.
    Expired,
    /// The run already finished or was reset, so the limit no longer applies.
    Inactive,
}

impl DeadlineStatus {
    #[must_use]
    pub fn is_expired(self) -> bool {
        matches!(self, DeadlineStatus::Expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tea_core::time::fixed_now;

    #[test]
    fn rejects_non_positive_limits() {
        assert!(SessionDeadline::new(Duration::zero()).is_none());
        assert!(SessionDeadline::from_secs(0).is_none());
        assert!(SessionDeadline::from_secs(30).is_some());
    }

    #[test]
    fn huge_limits_are_clamped() {
        let max = Duration::seconds(MAX_LIMIT_SECS);
        for secs in [10_000_000_000_000_000, u64::MAX] {
            let deadline = SessionDeadline::from_secs(secs).unwrap();
            assert_eq!(deadline.limit(), max);
        }

        let start = fixed_now();
        let deadline = SessionDeadline::from_secs(u64::MAX).unwrap();
        assert_eq!(
            deadline.status_at(start, start + Duration::seconds(1)),
            DeadlineStatus::Remaining(max - Duration::seconds(1))
        );
    }

    #[test]
    fn counts_down_then_expires() {
        let deadline = SessionDeadline::from_secs(60).unwrap();
        let start = fixed_now();

        assert_eq!(
            deadline.status_at(start, start + Duration::seconds(20)),
            DeadlineStatus::Remaining(Duration::seconds(40))
        );
        assert!(deadline.status_at(start, start + Duration::seconds(60)).is_expired());
        // Clock skew backwards never expires a run.
        assert_eq!(
            deadline.status_at(start, start - Duration::seconds(5)),
            DeadlineStatus::Remaining(Duration::seconds(60))
        );
    }
}
