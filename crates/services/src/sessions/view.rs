use chrono::{DateTime, Utc};
use std::sync::Arc;

use storage::repository::{SessionSummaryRepository, SessionSummaryRow};
use tea_core::model::{ActivityId, SessionSummary};

use crate::catalog::ActivityCatalog;
use crate::error::SummaryQueryError;

/// Storage identifier for a persisted session summary.
pub type SessionSummaryId = i64;

/// Presentation-agnostic list item for a finished run.
///
/// The UI formats timestamps and percentages as it likes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummaryListItem {
    pub id: SessionSummaryId,
    pub completed_at: DateTime<Utc>,
    pub score: u32,
    pub max_score: u32,
    pub correct: u32,
    pub total: u32,
}

impl SessionSummaryListItem {
    #[must_use]
    pub fn from_summary(id: SessionSummaryId, summary: &SessionSummary) -> Self {
        Self {
            id,
            completed_at: summary.completed_at(),
            score: summary.score(),
            max_score: summary.max_score(),
            correct: summary.correct(),
            total: summary.total(),
        }
    }

    #[must_use]
    pub fn from_row(row: &SessionSummaryRow) -> Self {
        Self::from_summary(row.id, &row.summary)
    }
}

/// One dashboard tile: an activity with its latest and best results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardEntry {
    pub activity_id: ActivityId,
    pub title: String,
    pub max_score: u32,
    pub latest: Option<SessionSummaryListItem>,
    pub best_score: Option<u32>,
}

/// Read-side facade over stored summaries.
#[derive(Clone)]
pub struct SessionSummaryService {
    summaries: Arc<dyn SessionSummaryRepository>,
}

impl SessionSummaryService {
    #[must_use]
    pub fn new(summaries: Arc<dyn SessionSummaryRepository>) -> Self {
        Self { summaries }
    }

    /// Most recent runs of one activity, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SummaryQueryError::Storage` on repository failures.
    pub async fn recent_for_activity(
        &self,
        activity_id: &ActivityId,
        limit: u32,
    ) -> Result<Vec<SessionSummaryListItem>, SummaryQueryError> {
        let rows = self.summaries.list_summaries(activity_id, limit).await?;
        Ok(rows.iter().map(SessionSummaryListItem::from_row).collect())
    }

    /// One entry per catalog activity, in catalog order. Activities never
    /// played have no `latest` and no `best_score`.
    ///
    /// # Errors
    ///
    /// Returns `SummaryQueryError::Storage` on repository failures.
    pub async fn dashboard(
        &self,
        catalog: &ActivityCatalog,
    ) -> Result<Vec<DashboardEntry>, SummaryQueryError> {
        let latest_rows = self.summaries.list_latest_per_activity().await?;

        let mut entries = Vec::with_capacity(catalog.len());
        for activity in catalog.iter() {
            let latest = latest_rows
                .iter()
                .find(|row| row.summary.activity_id() == activity.id())
                .map(SessionSummaryListItem::from_row);
            let best_score = match latest {
                Some(_) => self
                    .summaries
                    .best_summary(activity.id())
                    .await?
                    .map(|row| row.summary.score()),
                None => None,
            };
            entries.push(DashboardEntry {
                activity_id: activity.id().clone(),
                title: activity.title().to_owned(),
                max_score: activity.max_score(),
                latest,
                best_score,
            });
        }
        Ok(entries)
    }

    /// Fetch a session summary by id.
    ///
    /// # Errors
    ///
    /// Returns `SummaryQueryError::Storage` when repository access fails.
    pub async fn get_summary(&self, id: SessionSummaryId) -> Result<SessionSummary, SummaryQueryError> {
        Ok(self.summaries.get_summary(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use storage::repository::InMemoryRepository;
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

    #[test]
    fn list_item_copies_scores() {
        let item = SessionSummaryListItem::from_summary(42, &summary("emotion-faces", 20, 1));
        assert_eq!(item.id, 42);
        assert_eq!(item.score, 20);
        assert_eq!(item.max_score, 30);
        assert_eq!(item.correct, 2);
        assert_eq!(item.total, 3);
    }

    #[tokio::test]
    async fn recent_for_activity_is_newest_first() {
        let repo = InMemoryRepository::new();
        repo.append_summary(&summary("emotion-faces", 10, 1)).await.unwrap();
        let newest = repo.append_summary(&summary("emotion-faces", 30, 5)).await.unwrap();
        repo.append_summary(&summary("daily-routines", 20, 9)).await.unwrap();

        let svc = SessionSummaryService::new(Arc::new(repo));
        let items = svc
            .recent_for_activity(&ActivityId::new("emotion-faces").unwrap(), 10)
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, newest);
    }

    #[tokio::test]
    async fn get_summary_reports_missing_rows() {
        let repo = InMemoryRepository::new();
        let id = repo.append_summary(&summary("emotion-faces", 20, 1)).await.unwrap();

        let svc = SessionSummaryService::new(Arc::new(repo));
        assert_eq!(svc.get_summary(id).await.unwrap().score(), 20);
        assert!(matches!(
            svc.get_summary(id + 1).await,
            Err(SummaryQueryError::Storage(storage::repository::StorageError::NotFound))
        ));
    }

    #[tokio::test]
    async fn dashboard_covers_every_catalog_activity() {
        let repo = InMemoryRepository::new();
        repo.append_summary(&summary("emotion-faces", 30, 1)).await.unwrap();
        let latest = repo.append_summary(&summary("emotion-faces", 10, 2)).await.unwrap();

        let catalog = ActivityCatalog::builtin().unwrap();
        let svc = SessionSummaryService::new(Arc::new(repo));
        let entries = svc.dashboard(&catalog).await.unwrap();

        assert_eq!(entries.len(), catalog.len());
        let faces = &entries[0];
        assert_eq!(faces.activity_id.as_str(), "emotion-faces");
        assert_eq!(faces.latest.as_ref().map(|l| l.id), Some(latest));
        assert_eq!(faces.best_score, Some(30));

        assert!(entries[1..].iter().all(|e| e.latest.is_none() && e.best_score.is_none()));
    }
}
