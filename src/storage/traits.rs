//! Goal storage traits for nudge.
//!
//! This module defines the `GoalRepository` trait for goal persistence.

use std::sync::Arc;

use crate::core::Goal;
use crate::error::Result;

/// Trait for goal storage backends.
///
/// Persistence is whole-collection: `save` replaces everything stored and
/// `load` returns everything stored. There are no incremental updates.
pub trait GoalRepository: Send + Sync {
    /// Load the stored goal collection.
    ///
    /// Returns `Ok(vec![])` if nothing has been stored yet. A stored value
    /// that cannot be decoded is an error; callers decide whether to fail
    /// open.
    fn load(&self) -> Result<Vec<Goal>>;

    /// Replace the stored goal collection.
    fn save(&self, goals: &[Goal]) -> Result<()>;
}

/// Blanket implementation of GoalRepository for Arc-wrapped repositories.
///
/// This allows a test to keep a handle on the repository it hands to a
/// store.
impl<T: GoalRepository + ?Sized> GoalRepository for Arc<T> {
    fn load(&self) -> Result<Vec<Goal>> {
        (**self).load()
    }

    fn save(&self, goals: &[Goal]) -> Result<()> {
        (**self).save(goals)
    }
}
