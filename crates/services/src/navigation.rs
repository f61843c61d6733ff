//! Screen routing seam between the session loop and the presentation layer.

use std::fmt;
use std::sync::{Arc, Mutex};

use tea_core::model::ActivityId;

/// Screens the app can show.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Dashboard,
    Activity(ActivityId),
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Dashboard => f.write_str("/dashboard"),
            Route::Activity(id) => write!(f, "/activity/{id}"),
        }
    }
}

/// Receives navigation requests. Implementations must not block.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Keeps every requested route; the last one is the current screen.
#[derive(Clone, Default)]
pub struct RecordingNavigator {
    history: Arc<Mutex<Vec<Route>>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn current(&self) -> Option<Route> {
        self.history().last().cloned()
    }

    #[must_use]
    pub fn history(&self) -> Vec<Route> {
        match self.history.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        tracing::debug!(%route, "navigate");
        match self.history.lock() {
            Ok(mut guard) => guard.push(route),
            Err(poisoned) => poisoned.into_inner().push(route),
        }
    }
}

impl fmt::Debug for RecordingNavigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingNavigator")
            .field("current", &self.current())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_routes_in_order() {
        let nav = RecordingNavigator::new();
        assert_eq!(nav.current(), None);

        let id = ActivityId::new("emotion-faces").unwrap();
        nav.navigate(Route::Activity(id.clone()));
        nav.navigate(Route::Dashboard);

        assert_eq!(nav.history(), vec![Route::Activity(id), Route::Dashboard]);
        assert_eq!(nav.current(), Some(Route::Dashboard));
    }

    #[test]
    fn route_display() {
        let id = ActivityId::new("daily-routines").unwrap();
        assert_eq!(Route::Activity(id).to_string(), "/activity/daily-routines");
        assert_eq!(Route::Dashboard.to_string(), "/dashboard");
    }
}
