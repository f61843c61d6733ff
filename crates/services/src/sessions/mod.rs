mod deadline;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use deadline::{DeadlineStatus, MAX_LIMIT_SECS, SessionDeadline};
pub use view::{DashboardEntry, SessionSummaryId, SessionSummaryListItem, SessionSummaryService};
pub use workflow::{ActivityRun, AdvanceResult, SessionLoopService};
