//! In-memory goal storage for testing.
//!
//! This module provides a thread-safe in-memory implementation of the
//! GoalRepository trait. It keeps the serialized form rather than the
//! goals themselves, so decoding behaves exactly as it does on disk.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::core::Goal;
use crate::error::{NudgeError, Result};
use crate::storage::GoalRepository;

/// In-memory goal repository for testing.
///
/// Thread-safe implementation using `RwLock<Option<String>>`.
/// Data is lost when the repository is dropped.
#[derive(Debug, Default)]
pub struct MemoryGoalRepository {
    /// Serialized goal collection, `None` when nothing was stored.
    raw: RwLock<Option<String>>,
    saves: AtomicUsize,
    fail: AtomicBool,
}

impl MemoryGoalRepository {
    /// Create a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository holding an arbitrary stored value.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: RwLock::new(Some(raw.into())),
            ..Self::default()
        }
    }

    /// The stored value, as written by the last save.
    pub fn raw(&self) -> Option<String> {
        self.raw
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make every following save fail.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl GoalRepository for MemoryGoalRepository {
    fn load(&self) -> Result<Vec<Goal>> {
        match self.raw() {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, goals: &[Goal]) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NudgeError::serde("storage unavailable"));
        }

        let json = serde_json::to_string(goals)?;
        *self.raw.write().unwrap_or_else(PoisonError::into_inner) = Some(json);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
