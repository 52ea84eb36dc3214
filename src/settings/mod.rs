//! Client-local preferences (view mode, sort order, status filter), kept
//! apart from the catalog backend.

use crate::pipeline::{SortSpec, StatusFilter};
use crate::store::ViewMode;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const VIEW_MODE_KEY: &str = "viewMode";
pub const SORT_BY_KEY: &str = "sortBy";
pub const FILTER_KEY: &str = "filter";

/// String-valued key/value storage.
pub trait SettingsStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemorySettings {
    values: BTreeMap<String, String>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Settings persisted as a flat JSON object; the whole file is rewritten on
/// every change.
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileSettings {
    /// Opens the settings file. A missing file starts out empty; an
    /// unreadable one is logged and replaced on the next write.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring malformed settings file {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("Could not read settings file {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };
        Self { path, values }
    }
}

impl SettingsStore for JsonFileSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        let content = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))?;
        debug!("Saved setting {}", key);
        Ok(())
    }
}

/// Preferences read once at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preferences {
    pub view_mode: Option<ViewMode>,
    pub sort_by: Option<SortSpec>,
    pub filter: Option<StatusFilter>,
}

impl Preferences {
    pub fn load(settings: &dyn SettingsStore) -> Self {
        let view_mode = settings.get(VIEW_MODE_KEY).and_then(|raw| {
            raw.parse()
                .map_err(|e| warn!("Ignoring stored view mode: {}", e))
                .ok()
        });

        let sort_by = settings.get(SORT_BY_KEY).and_then(|raw| {
            serde_json::from_str(&raw)
                .map_err(|e| warn!("Ignoring stored sort order: {}", e))
                .ok()
        });

        let filter = settings.get(FILTER_KEY).and_then(|raw| {
            raw.parse()
                .map_err(|e| warn!("Ignoring stored filter: {}", e))
                .ok()
        });

        Self {
            view_mode,
            sort_by,
            filter,
        }
    }
}
