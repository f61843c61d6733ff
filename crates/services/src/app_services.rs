use std::path::PathBuf;
use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::catalog::ActivityCatalog;
use crate::error::AppServicesError;
use crate::narration::{NarrationService, TracingSpeechBackend};
use crate::navigation::RecordingNavigator;
use crate::sessions::{SessionDeadline, SessionLoopService, SessionSummaryService};

/// Startup options resolved by the binary.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub db_url: String,
    /// Custom catalog file; the built-in activities are used when `None`.
    pub catalog_path: Option<PathBuf>,
    pub narration: bool,
    pub shuffle: bool,
    pub time_limit_secs: Option<u64>,
    pub clock: Clock,
}

/// Assembles app-facing services.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<ActivityCatalog>,
    narration: NarrationService,
    navigator: RecordingNavigator,
    session_summaries: Arc<SessionSummaryService>,
    session_loop: Arc<SessionLoopService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// Must run inside a tokio runtime when narration is enabled.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the catalog or storage cannot be initialized.
    pub async fn new_sqlite(config: &AppConfig) -> Result<Self, AppServicesError> {
        let catalog = load_catalog(config)?;
        let storage = Storage::sqlite(&config.db_url).await?;
        Ok(Self::assemble(config, catalog, storage))
    }

    /// Build services over in-memory storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the catalog cannot be loaded.
    pub fn in_memory(config: &AppConfig) -> Result<Self, AppServicesError> {
        let catalog = load_catalog(config)?;
        Ok(Self::assemble(config, catalog, Storage::in_memory()))
    }

    fn assemble(config: &AppConfig, catalog: ActivityCatalog, storage: Storage) -> Self {
        let catalog = Arc::new(catalog);
        let narration = if config.narration {
            NarrationService::spawn(Arc::new(TracingSpeechBackend))
        } else {
            NarrationService::disabled()
        };
        let navigator = RecordingNavigator::new();

        let session_summaries = Arc::new(SessionSummaryService::new(Arc::clone(
            &storage.session_summaries,
        )));
        let session_loop = Arc::new(
            SessionLoopService::new(
                config.clock,
                Arc::clone(&catalog),
                Arc::clone(&storage.session_summaries),
                narration.clone(),
                Arc::new(navigator.clone()),
            )
            .with_shuffle(config.shuffle)
            .with_deadline(config.time_limit_secs.and_then(SessionDeadline::from_secs)),
        );

        Self {
            catalog,
            narration,
            navigator,
            session_summaries,
            session_loop,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<ActivityCatalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn narration(&self) -> NarrationService {
        self.narration.clone()
    }

    #[must_use]
    pub fn navigator(&self) -> RecordingNavigator {
        self.navigator.clone()
    }

    #[must_use]
    pub fn session_summaries(&self) -> Arc<SessionSummaryService> {
        Arc::clone(&self.session_summaries)
    }

    #[must_use]
    pub fn session_loop(&self) -> Arc<SessionLoopService> {
        Arc::clone(&self.session_loop)
    }
}

fn load_catalog(config: &AppConfig) -> Result<ActivityCatalog, AppServicesError> {
    let catalog = match &config.catalog_path {
        Some(path) => ActivityCatalog::load(path)?,
        None => ActivityCatalog::builtin()?,
    };
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tea_core::time::fixed_clock;

    #[test]
    fn in_memory_uses_builtin_catalog() {
        let config = AppConfig {
            clock: fixed_clock(),
            ..AppConfig::default()
        };
        let services = AppServices::in_memory(&config).unwrap();
        assert_eq!(services.catalog().len(), 4);
        assert!(!services.narration().is_enabled());
    }

    #[test]
    fn oversized_time_limit_is_accepted() {
        let config = AppConfig {
            time_limit_secs: Some(u64::MAX),
            clock: fixed_clock(),
            ..AppConfig::default()
        };
        let services = AppServices::in_memory(&config).unwrap();
        let loop_service = services.session_loop();
        let run = loop_service
            .start_session(&tea_core::model::ActivityId::new("emotion-faces").unwrap())
            .unwrap();
        let limit = run.deadline().unwrap().limit();
        assert_eq!(limit.num_seconds(), crate::sessions::MAX_LIMIT_SECS);
    }

    #[test]
    fn missing_catalog_file_fails() {
        let config = AppConfig {
            catalog_path: Some(PathBuf::from("/nonexistent/catalog.toml")),
            ..AppConfig::default()
        };
        let err = AppServices::in_memory(&config).err().unwrap();
        assert!(matches!(
            err,
            AppServicesError::Catalog(crate::error::CatalogError::Io(_))
        ));
    }

    #[tokio::test]
    async fn sqlite_services_share_one_repository() {
        let config = AppConfig {
            db_url: "sqlite:file:app_services_test?mode=memory&cache=shared".into(),
            narration: true,
            clock: fixed_clock(),
            ..AppConfig::default()
        };
        let services = AppServices::new_sqlite(&config).await.unwrap();
        assert!(services.narration().is_enabled());

        let entries = services
            .session_summaries()
            .dashboard(&services.catalog())
            .await
            .unwrap();
        assert_eq!(entries.len(), 4);
        services.narration().shutdown();
    }
}
