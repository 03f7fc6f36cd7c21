//! nudge - recurring yes/no check-ins for habit goals
//!
//! A goal fires a check-in at a fixed interval while it is active. Answers
//! accumulate in an append-only log per goal; pausing closes the current
//! session. Sessions, their yes-ratios against the goal's success threshold
//! and a timeline with inferred missed check-ins are derived from the log
//! on every read.
//!
//! The [`store::GoalStore`] owns all goals and is the only thing that
//! changes them. Delivering notifications and persisting bytes are left to
//! the [`trigger::TriggerScheduler`] and [`storage::GoalRepository`]
//! implementations it is given.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod store;
pub mod trigger;
pub mod util;

pub use config::Config;
pub use core::{
    Answer, Goal, GoalDraft, GoalId, GoalSchedule, Response, ScheduleState, SessionDetail,
    SessionOutcome, SessionOverview, SessionSummary, TimelineEntry,
};
pub use error::{FailOpen, NudgeError, Result};
pub use storage::{FileGoalRepository, GoalRepository, MemoryGoalRepository};
pub use store::{Clock, GoalStore, ManualClock, StoreChange, SystemClock};
pub use trigger::{
    LogTriggerScheduler, RecordingTriggerScheduler, SignalDispatcher, SignalHandler,
    SignalOutcome, TriggerRequest, TriggerScheduler, TriggerSignal,
};

// CLI commands
pub use cli::{GoalCommand, ListCommand, SessionsCommand, ShowCommand, SignalCommand};
