//! File-based goal storage for nudge.
//!
//! The goal collection is stored as one JSON array in
//! `~/.nudge/goals.json`. Atomic writes are achieved via temp file +
//! rename pattern.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::{nudge_home, Config};
use crate::core::Goal;
use crate::error::{NudgeError, Result};
use crate::storage::GoalRepository;
use crate::util::{is_not_found, read_to_string_limited};

/// File-based goal storage.
///
/// Stores the whole goal collection in a single JSON file.
/// Uses atomic writes via temp file + rename pattern.
#[derive(Debug, Clone)]
pub struct FileGoalRepository {
    /// Path of the goals file.
    path: PathBuf,
}

impl FileGoalRepository {
    /// Create a repository at the configured location.
    ///
    /// Uses `~/.nudge/goals.json` or `$NUDGE_HOME/<storage.file_name>`.
    pub fn new(config: &Config) -> Result<Self> {
        let home = nudge_home().ok_or_else(|| {
            NudgeError::config("Could not determine nudge home (no home directory)")
        })?;
        Ok(Self::with_path(config.goals_path(&home)))
    }

    /// Create a repository backed by an explicit file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the goals file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the path for a temp file used during atomic writes.
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "goals.json".to_string());
        self.path.with_file_name(format!(".{}.tmp", name))
    }

    /// Write the collection atomically using temp file + rename.
    fn atomic_write(&self, goals: &[Goal]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| NudgeError::storage(parent, e))?;
            }
        }

        let temp_path = self.temp_path();
        let json = serde_json::to_string_pretty(goals)?;

        {
            let mut file =
                fs::File::create(&temp_path).map_err(|e| NudgeError::storage(&temp_path, e))?;
            file.write_all(json.as_bytes())
                .map_err(|e| NudgeError::storage(&temp_path, e))?;
            file.sync_all()
                .map_err(|e| NudgeError::storage(&temp_path, e))?;
        }

        // Rename temp file to final path (atomic on POSIX)
        fs::rename(&temp_path, &self.path).map_err(|e| NudgeError::storage(&self.path, e))?;

        Ok(())
    }
}

impl GoalRepository for FileGoalRepository {
    fn load(&self) -> Result<Vec<Goal>> {
        let content = match read_to_string_limited(&self.path) {
            Ok(content) => content,
            Err(e) if is_not_found(&e) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let goals: Vec<Goal> = serde_json::from_str(&content)?;
        Ok(goals)
    }

    fn save(&self, goals: &[Goal]) -> Result<()> {
        self.atomic_write(goals)
    }
}
