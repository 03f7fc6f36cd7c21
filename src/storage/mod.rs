//! Goal storage for nudge.
//!
//! This module provides persistence for the goal collection,
//! supporting file-based and in-memory backends.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileGoalRepository;
pub use memory::MemoryGoalRepository;
pub use traits::GoalRepository;
