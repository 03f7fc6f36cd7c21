//! Core types and logic for nudge.
//!
//! Goals and their response log, the session partitioner and analyzer, and
//! the scheduling state machine. Nothing in here performs I/O.

pub mod analysis;
pub mod goal;
pub mod schedule;
pub mod sessions;

pub use analysis::{
    classify, default_session_title, format_duration, session_heading, timeline, yes_ratio,
    SessionDetail, SessionOutcome, SessionOverview, SessionStats, SessionSummary, TimelineEntry,
};
pub use goal::{
    Answer, Goal, GoalDraft, GoalId, Response, DEFAULT_SUCCESS_THRESHOLD, NO_ACTION, YES_ACTION,
};
pub use schedule::{GoalSchedule, ScheduleState, TriggerEffect};
pub use sessions::{partition, session_at, session_count, Session};
