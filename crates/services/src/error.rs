//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use tea_core::SessionError;
use tea_core::model::{ActivityError, ActivityId};

/// Errors emitted while building or loading an `ActivityCatalog`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("activity {0} is defined more than once")]
    DuplicateActivity(ActivityId),
    #[error("catalog contains no activities")]
    Empty,
    #[error("unsupported catalog format: {0}")]
    UnsupportedFormat(String),
    #[error(transparent)]
    Activity(#[from] ActivityError),
    #[error("invalid TOML catalog: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid JSON catalog: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors emitted by `SessionLoopService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionLoopError {
    #[error("unknown activity: {0}")]
    UnknownActivity(ActivityId),
    #[error("session is not finished")]
    NotFinished,
    #[error(transparent)]
    Transition(#[from] SessionError),
    #[error(transparent)]
    Activity(#[from] ActivityError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SessionSummaryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SummaryQueryError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
