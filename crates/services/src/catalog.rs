//! Registry of playable activities.
//!
//! Activity content is static data. The built-in set is embedded at compile
//! time; a custom catalog can be loaded from a TOML or JSON file with the same
//! schema. Every activity is validated on load so a bad definition fails
//! before any learner sees it.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tea_core::model::{Activity, ActivityDefinition, ActivityId};
use tracing::debug;

use crate::error::CatalogError;

const BUILTIN_CATALOG: &str = include_str!("../catalog/builtin.toml");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    activities: Vec<ActivityDefinition>,
}

/// Ordered, validated set of activities keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ActivityCatalog {
    order: Vec<ActivityId>,
    activities: HashMap<ActivityId, Arc<Activity>>,
}

impl ActivityCatalog {
    /// Build a catalog from already-validated activities.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateActivity` if two activities share an id.
    pub fn new(activities: impl IntoIterator<Item = Activity>) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();
        for activity in activities {
            catalog.insert(activity)?;
        }
        Ok(catalog)
    }

    /// The activities shipped with the app.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the embedded data is invalid.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    /// Parse a TOML catalog (`[[activities]]` tables).
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` on parse or validation failures.
    pub fn from_toml_str(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(raw)?;
        Self::from_definitions(file.activities)
    }

    /// Parse a JSON catalog (`{"activities": [...]}`).
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` on parse or validation failures.
    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        Self::from_definitions(file.activities)
    }

    /// Load a catalog file, picking the format from its extension.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::UnsupportedFormat` for unknown extensions, or
    /// I/O, parse and validation errors.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let raw = match ext.as_str() {
            "toml" | "json" => std::fs::read_to_string(path)?,
            _ => return Err(CatalogError::UnsupportedFormat(path.display().to_string())),
        };
        let catalog = if ext == "toml" {
            Self::from_toml_str(&raw)?
        } else {
            Self::from_json_str(&raw)?
        };
        debug!(path = %path.display(), activities = catalog.len(), "loaded activity catalog");
        Ok(catalog)
    }

    fn from_definitions(definitions: Vec<ActivityDefinition>) -> Result<Self, CatalogError> {
        if definitions.is_empty() {
            return Err(CatalogError::Empty);
        }
        let activities = definitions
            .into_iter()
            .map(ActivityDefinition::validate)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(activities)
    }

    fn insert(&mut self, activity: Activity) -> Result<(), CatalogError> {
        let id = activity.id().clone();
        if self.activities.contains_key(&id) {
            return Err(CatalogError::DuplicateActivity(id));
        }
        self.order.push(id.clone());
        self.activities.insert(id, Arc::new(activity));
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &ActivityId) -> Option<Arc<Activity>> {
        self.activities.get(id).cloned()
    }

    /// Activities in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Activity>> + '_ {
        self.order.iter().filter_map(|id| self.activities.get(id))
    }

    #[must_use]
    pub fn ids(&self) -> &[ActivityId] {
        &self.order
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
