use sqlx::Row;
use std::collections::HashSet;
use tea_core::model::{ActivityId, SessionSummary};
use tracing::debug;

use super::SqliteRepository;
use super::mapping::{activity_id_from_text, conn, map_summary_row, map_summary_row_with_id, ser};
use crate::repository::{SessionSummaryRepository, SessionSummaryRow, StorageError};

const SUMMARY_COLUMNS: &str =
    "id, activity_id, score, max_score, correct, total, started_at, completed_at";

#[async_trait::async_trait]
impl SessionSummaryRepository for SqliteRepository {
    async fn append_summary(&self, summary: &SessionSummary) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO session_summaries (
                    activity_id, score, max_score, correct, total,
                    started_at, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(summary.activity_id().as_str())
        .bind(i64::from(summary.score()))
        .bind(i64::from(summary.max_score()))
        .bind(i64::from(summary.correct()))
        .bind(i64::from(summary.total()))
        .bind(summary.started_at())
        .bind(summary.completed_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        let id = res.last_insert_rowid();
        debug!(id, activity = %summary.activity_id(), score = summary.score(), "stored session summary");
        Ok(id)
    }

    async fn get_summary(&self, id: i64) -> Result<SessionSummary, StorageError> {
        let sql = format!("SELECT {SUMMARY_COLUMNS} FROM session_summaries WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        map_summary_row(&row)
    }

    async fn list_summaries(
        &self,
        activity_id: &ActivityId,
        limit: u32,
    ) -> Result<Vec<SessionSummaryRow>, StorageError> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM session_summaries
             WHERE activity_id = ?1
             ORDER BY completed_at DESC, id DESC
             LIMIT ?2"
        );
        let rows = sqlx::query(&sql)
            .bind(activity_id.as_str())
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_summary_row_with_id).collect()
    }

    async fn list_latest_per_activity(&self) -> Result<Vec<SessionSummaryRow>, StorageError> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM session_summaries
             ORDER BY activity_id ASC, completed_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for row in rows {
            let activity_id =
                activity_id_from_text(row.try_get::<String, _>("activity_id").map_err(ser)?)?;
            if !seen.insert(activity_id) {
                continue;
            }
            out.push(map_summary_row_with_id(&row)?);
        }

        Ok(out)
    }

    async fn best_summary(
        &self,
        activity_id: &ActivityId,
    ) -> Result<Option<SessionSummaryRow>, StorageError> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM session_summaries
             WHERE activity_id = ?1
             ORDER BY score DESC, completed_at ASC, id ASC
             LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(activity_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_summary_row_with_id).transpose()
    }
}
