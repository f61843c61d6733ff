#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog;
pub mod error;
pub mod narration;
pub mod navigation;
pub mod sessions;

pub use tea_core::Clock;

pub use app_services::{AppConfig, AppServices};
pub use catalog::ActivityCatalog;
pub use error::{AppServicesError, CatalogError, SessionLoopError, SummaryQueryError};
pub use narration::{
    NarrationService, Priority, SpeechBackend, SpeechError, TracingSpeechBackend, Utterance,
    VoiceStyle,
};
pub use navigation::{Navigator, RecordingNavigator, Route};
pub use sessions::{
    ActivityRun, AdvanceResult, DashboardEntry, DeadlineStatus, SessionDeadline,
    SessionLoopService, SessionSummaryId, SessionSummaryListItem, SessionSummaryService,
};
