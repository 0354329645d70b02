use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, warn};

pub const TOKEN_KEY: &str = "erp-token";
pub const SETTINGS_KEY: &str = "erp_settings_v2";
pub const ROLE_KEY: &str = "user-role";
pub const SESSION_ID_KEY: &str = "active_session_id";
pub const BRANCH_ID_KEY: &str = "active_branch_id";
pub const STUDENT_ID_KEY: &str = "student-id";
pub const THEME_KEY: &str = "ui-theme";

/// String key/value store persisted as one JSON object on disk.
///
/// Plays the role of the browser's `localStorage`: every write is flushed
/// immediately, reads never touch the disk after load.
pub struct LocalStore {
    path: Option<PathBuf>,
    values: Mutex<BTreeMap<String, String>>,
}

impl LocalStore {
    pub fn open(path: PathBuf) -> Self {
        let values = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(path = %path.display(), %err, "local store is corrupt, starting empty");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        debug!(path = %path.display(), keys = values.len(), "local store opened");
        Self { path: Some(path), values: Mutex::new(values) }
    }

    /// Store that is never written to disk.
    pub fn in_memory() -> Self {
        Self { path: None, values: Mutex::new(BTreeMap::new()) }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: impl Into<String>) {
        let mut values = self.lock();
        values.insert(key.to_string(), value.into());
        self.flush(&values);
    }

    pub fn remove(&self, key: &str) {
        let mut values = self.lock();
        if values.remove(key).is_some() {
            self.flush(&values);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn flush(&self, values: &BTreeMap<String, String>) {
        let Some(path) = &self.path else { return };
        let result = serde_json::to_string_pretty(values)
            .map_err(std::io::Error::from)
            .and_then(|json| {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, json)
            });
        if let Err(err) = result {
            warn!(path = %path.display(), %err, "failed to persist local store");
        }
    }
}
