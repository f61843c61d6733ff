use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tea_core::model::{ActivityId, SessionSummary};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A persisted summary together with its storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummaryRow {
    pub id: i64,
    pub summary: SessionSummary,
}

impl SessionSummaryRow {
    #[must_use]
    pub fn new(id: i64, summary: SessionSummary) -> Self {
        Self { id, summary }
    }
}

/// Repository contract for finished-session summaries.
#[async_trait]
pub trait SessionSummaryRepository: Send + Sync {
    /// Append a summary and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the summary cannot be stored.
    async fn append_summary(&self, summary: &SessionSummary) -> Result<i64, StorageError>;

    /// Fetch a summary by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_summary(&self, id: i64) -> Result<SessionSummary, StorageError>;

    /// List summaries for one activity, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn list_summaries(
        &self,
        activity_id: &ActivityId,
        limit: u32,
    ) -> Result<Vec<SessionSummaryRow>, StorageError>;

    /// The newest summary of every activity that has one, ordered by activity id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn list_latest_per_activity(&self) -> Result<Vec<SessionSummaryRow>, StorageError>;

    /// Highest-scoring summary for an activity; the earliest wins ties.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn best_summary(
        &self,
        activity_id: &ActivityId,
    ) -> Result<Option<SessionSummaryRow>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    summaries: Arc<Mutex<Vec<SessionSummaryRow>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> Result<std::sync::MutexGuard<'_, Vec<SessionSummaryRow>>, StorageError> {
        self.summaries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

/// Newest first: completion time, then id for rows finished at the same instant.
fn newest_first(a: &SessionSummaryRow, b: &SessionSummaryRow) -> std::cmp::Ordering {
    b.summary
        .completed_at()
        .cmp(&a.summary.completed_at())
        .then(b.id.cmp(&a.id))
}

#[async_trait]
impl SessionSummaryRepository for InMemoryRepository {
    async fn append_summary(&self, summary: &SessionSummary) -> Result<i64, StorageError> {
        let mut guard = self.rows()?;
        let id = i64::try_from(guard.len() + 1)
            .map_err(|_| StorageError::Serialization("summary id overflow".into()))?;
        guard.push(SessionSummaryRow::new(id, summary.clone()));
        Ok(id)
    }

    async fn get_summary(&self, id: i64) -> Result<SessionSummary, StorageError> {
        let guard = self.rows()?;
        guard
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.summary.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn list_summaries(
        &self,
        activity_id: &ActivityId,
        limit: u32,
    ) -> Result<Vec<SessionSummaryRow>, StorageError> {
        let guard = self.rows()?;
        let mut rows: Vec<_> = guard
            .iter()
            .filter(|row| row.summary.activity_id() == activity_id)
            .cloned()
            .collect();
        rows.sort_by(newest_first);
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn list_latest_per_activity(&self) -> Result<Vec<SessionSummaryRow>, StorageError> {
        let guard = self.rows()?;
        let mut latest: HashMap<&ActivityId, &SessionSummaryRow> = HashMap::new();
        for row in guard.iter() {
            let entry = latest.entry(row.summary.activity_id()).or_insert(row);
            if newest_first(row, *entry).is_lt() {
                *entry = row;
            }
        }
        let mut rows: Vec<_> = latest.into_values().cloned().collect();
        rows.sort_by(|a, b| a.summary.activity_id().cmp(b.summary.activity_id()));
        Ok(rows)
    }

    async fn best_summary(
        &self,
        activity_id: &ActivityId,
    ) -> Result<Option<SessionSummaryRow>, StorageError> {
        let guard = self.rows()?;
        let best = guard
            .iter()
            .filter(|row| row.summary.activity_id() == activity_id)
            .min_by(|a, b| {
                b.summary
                    .score()
                    .cmp(&a.summary.score())
                    .then(a.summary.completed_at().cmp(&b.summary.completed_at()))
                    .then(a.id.cmp(&b.id))
            })
            .cloned();
        Ok(best)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub session_summaries: Arc<dyn SessionSummaryRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let summaries: Arc<dyn SessionSummaryRepository> = Arc::new(InMemoryRepository::new());
        Self {
            session_summaries: summaries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tea_core::time::fixed_now;

    fn summary(activity: &str, score: u32, minutes: i64) -> SessionSummary {
        let now = fixed_now();
        SessionSummary::from_persisted(
            ActivityId::new(activity).unwrap(),
            score,
            30,
            score / 10,
            3,
            now,
            now + Duration::minutes(minutes),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn append_and_get_round_trip() {
        let repo = InMemoryRepository::new();
        let id = repo.append_summary(&summary("feelings", 20, 1)).await.unwrap();
        let fetched = repo.get_summary(id).await.unwrap();
        assert_eq!(fetched.score(), 20);
        assert!(matches!(
            repo.get_summary(id + 1).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn list_is_newest_first_and_limited() {
        let repo = InMemoryRepository::new();
        repo.append_summary(&summary("feelings", 10, 1)).await.unwrap();
        repo.append_summary(&summary("feelings", 20, 3)).await.unwrap();
        repo.append_summary(&summary("routines", 30, 2)).await.unwrap();
        repo.append_summary(&summary("feelings", 0, 2)).await.unwrap();

        let feelings = ActivityId::new("feelings").unwrap();
        let rows = repo.list_summaries(&feelings, 2).await.unwrap();
        let scores: Vec<_> = rows.iter().map(|r| r.summary.score()).collect();
        assert_eq!(scores, [20, 0]);
    }

    #[tokio::test]
    async fn latest_per_activity_picks_newest() {
        let repo = InMemoryRepository::new();
        repo.append_summary(&summary("routines", 30, 2)).await.unwrap();
        repo.append_summary(&summary("feelings", 10, 5)).await.unwrap();
        repo.append_summary(&summary("feelings", 20, 1)).await.unwrap();

        let rows = repo.list_latest_per_activity().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].summary.activity_id().as_str(), "feelings");
        assert_eq!(rows[0].summary.score(), 10);
        assert_eq!(rows[1].summary.activity_id().as_str(), "routines");
    }

    #[tokio::test]
    async fn best_summary_prefers_highest_then_earliest() {
        let repo = InMemoryRepository::new();
        let feelings = ActivityId::new("feelings").unwrap();
        assert!(repo.best_summary(&feelings).await.unwrap().is_none());

        repo.append_summary(&summary("feelings", 20, 4)).await.unwrap();
        let early = repo.append_summary(&summary("feelings", 20, 2)).await.unwrap();
        repo.append_summary(&summary("feelings", 10, 1)).await.unwrap();

        let best = repo.best_summary(&feelings).await.unwrap().unwrap();
        assert_eq!(best.id, early);
    }
}
