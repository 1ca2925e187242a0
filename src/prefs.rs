use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
    #[error("failed to write preferences {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to encode preferences: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredPrefs {
    #[serde(rename = "isArabic", default, skip_serializing_if = "Option::is_none")]
    is_arabic: Option<bool>,
}

/// Language preference kept on disk between runs.
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when nothing was saved yet. Unreadable files count as unsaved.
    pub fn load_is_arabic(&self) -> Option<bool> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to read preferences");
                return None;
            }
        };
        match serde_json::from_str::<StoredPrefs>(&content) {
            Ok(prefs) => prefs.is_arabic,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "ignoring corrupt preferences");
                None
            }
        }
    }

    pub fn save_is_arabic(&self, is_arabic: bool) -> Result<(), PrefsError> {
        let io_err = |source| PrefsError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(&StoredPrefs {
            is_arabic: Some(is_arabic),
        })?;
        fs::write(&self.path, content).map_err(io_err)?;
        debug!(path = %self.path.display(), is_arabic, "saved language preference");
        Ok(())
    }
}
