//! Trigger scheduler boundary.
//!
//! Delivering notifications is someone else's job (the OS notification
//! center on a phone). The core only asks for a repeating trigger per goal
//! and for its cancellation, and treats both as fire-and-forget.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::core::{Goal, GoalId};
use crate::error::{NudgeError, Result};

/// Shortest repeat period notification systems accept, in seconds.
pub const MIN_REPEAT_SECONDS: u64 = 60;

/// Body text of every check-in notification.
pub const CHECK_IN_BODY: &str = "Time to check in on this goal.";

/// Notification category that carries the Yes/No actions.
pub const CHECK_IN_CATEGORY: &str = "YES_NO_CATEGORY";

/// A request for a repeating check-in trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRequest {
    /// Goal the trigger belongs to; also its identifier and payload.
    pub goal_id: GoalId,
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
    /// Notification category (carries the Yes/No actions).
    pub category: String,
    /// Seconds between firings.
    pub interval_seconds: u64,
    /// Always true for check-ins.
    pub repeating: bool,
}

impl TriggerRequest {
    /// Build the check-in trigger for a goal.
    pub fn for_goal(goal: &Goal) -> Self {
        let seconds = u64::from(goal.interval_minutes) * 60;
        Self {
            goal_id: goal.id(),
            title: goal.title.clone(),
            body: CHECK_IN_BODY.to_string(),
            category: CHECK_IN_CATEGORY.to_string(),
            interval_seconds: seconds.max(MIN_REPEAT_SECONDS),
            repeating: true,
        }
    }

    /// Identifier of the pending trigger (the goal id as a string).
    pub fn identifier(&self) -> String {
        self.goal_id.to_string()
    }
}

/// External trigger scheduling capability.
pub trait TriggerScheduler: Send + Sync {
    /// Schedule a repeating trigger. Replaces any pending trigger with the
    /// same identifier.
    fn schedule(&self, request: &TriggerRequest) -> Result<()>;

    /// Cancel pending triggers for a goal. Idempotent; cancelling an id
    /// that was never scheduled succeeds.
    fn cancel(&self, goal_id: GoalId) -> Result<()>;
}

impl<T: TriggerScheduler + ?Sized> TriggerScheduler for Arc<T> {
    fn schedule(&self, request: &TriggerRequest) -> Result<()> {
        (**self).schedule(request)
    }

    fn cancel(&self, goal_id: GoalId) -> Result<()> {
        (**self).cancel(goal_id)
    }
}

/// Scheduler that only logs. Used when no notification system is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTriggerScheduler;

impl TriggerScheduler for LogTriggerScheduler {
    fn schedule(&self, request: &TriggerRequest) -> Result<()> {
        tracing::info!(
            goal_id = %request.goal_id,
            interval_seconds = request.interval_seconds,
            "scheduled check-in trigger"
        );
        Ok(())
    }

    fn cancel(&self, goal_id: GoalId) -> Result<()> {
        tracing::info!(goal_id = %goal_id, "cancelled check-in trigger");
        Ok(())
    }
}

/// A call made against a [`RecordingTriggerScheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerCall {
    Schedule(TriggerRequest),
    Cancel(GoalId),
}

/// Scheduler that records calls, for tests and embedders.
#[derive(Debug, Default)]
pub struct RecordingTriggerScheduler {
    calls: Mutex<Vec<TriggerCall>>,
    fail: AtomicBool,
}

impl RecordingTriggerScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail (after recording it).
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<TriggerCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recent call.
    pub fn last_call(&self) -> Option<TriggerCall> {
        self.calls().pop()
    }

    /// Forget recorded calls.
    pub fn clear(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Goals whose latest call was a schedule, i.e. with a pending trigger.
    pub fn pending(&self) -> Vec<GoalId> {
        let mut pending: Vec<GoalId> = Vec::new();
        for call in self.calls() {
            match call {
                TriggerCall::Schedule(request) => {
                    if !pending.contains(&request.goal_id) {
                        pending.push(request.goal_id);
                    }
                }
                TriggerCall::Cancel(goal_id) => pending.retain(|id| *id != goal_id),
            }
        }
        pending
    }

    fn record(&self, call: TriggerCall) -> Result<()> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);

        if self.fail.load(Ordering::SeqCst) {
            return Err(NudgeError::scheduler("notification permission denied"));
        }
        Ok(())
    }
}

impl TriggerScheduler for RecordingTriggerScheduler {
    fn schedule(&self, request: &TriggerRequest) -> Result<()> {
        self.record(TriggerCall::Schedule(request.clone()))
    }

    fn cancel(&self, goal_id: GoalId) -> Result<()> {
        self.record(TriggerCall::Cancel(goal_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_for_goal() {
        let goal = Goal::new("Hydrate", 15);
        let request = TriggerRequest::for_goal(&goal);

        assert_eq!(request.goal_id, goal.id());
        assert_eq!(request.title, "Hydrate");
        assert_eq!(request.body, CHECK_IN_BODY);
        assert_eq!(request.category, CHECK_IN_CATEGORY);
        assert_eq!(request.interval_seconds, 900);
        assert!(request.repeating);
        assert_eq!(request.identifier(), goal.id().to_string());
    }

    #[test]
    fn test_request_interval_floor() {
        let goal = Goal::new("Blink", 0);
        assert_eq!(
            TriggerRequest::for_goal(&goal).interval_seconds,
            MIN_REPEAT_SECONDS
        );

        let goal = Goal::new("Blink", 1);
        assert_eq!(TriggerRequest::for_goal(&goal).interval_seconds, 60);
    }

    #[test]
    fn test_log_scheduler_never_fails() {
        let goal = Goal::new("Hydrate", 15);
        let scheduler = LogTriggerScheduler;
        assert!(scheduler.schedule(&TriggerRequest::for_goal(&goal)).is_ok());
        assert!(scheduler.cancel(goal.id()).is_ok());
    }

    #[test]
    fn test_recording_scheduler_records_calls() {
        let goal = Goal::new("Hydrate", 15);
        let scheduler = RecordingTriggerScheduler::new();
        let request = TriggerRequest::for_goal(&goal);

        scheduler.schedule(&request).unwrap();
        scheduler.cancel(goal.id()).unwrap();

        assert_eq!(
            scheduler.calls(),
            vec![
                TriggerCall::Schedule(request),
                TriggerCall::Cancel(goal.id())
            ]
        );
        assert!(scheduler.pending().is_empty());
    }

    #[test]
    fn test_recording_scheduler_pending() {
        let a = Goal::new("A", 5);
        let b = Goal::new("B", 5);
        let scheduler = RecordingTriggerScheduler::new();

        scheduler.schedule(&TriggerRequest::for_goal(&a)).unwrap();
        scheduler.schedule(&TriggerRequest::for_goal(&b)).unwrap();
        scheduler.schedule(&TriggerRequest::for_goal(&a)).unwrap();
        scheduler.cancel(b.id()).unwrap();

        assert_eq!(scheduler.pending(), vec![a.id()]);
    }

    #[test]
    fn test_cancel_unknown_id_is_ok() {
        let scheduler = RecordingTriggerScheduler::new();
        assert!(scheduler.cancel(GoalId::new_v4()).is_ok());
    }

    #[test]
    fn test_failing_scheduler() {
        let goal = Goal::new("Hydrate", 15);
        let scheduler = RecordingTriggerScheduler::new();
        scheduler.set_failing(true);

        let err = scheduler
            .schedule(&TriggerRequest::for_goal(&goal))
            .unwrap_err();
        assert!(matches!(err, NudgeError::Scheduler { .. }));
        assert_eq!(scheduler.calls().len(), 1);
    }

    #[test]
    fn test_arc_scheduler() {
        let scheduler = Arc::new(RecordingTriggerScheduler::new());
        let shared: Arc<RecordingTriggerScheduler> = Arc::clone(&scheduler);
        shared.cancel(GoalId::nil()).unwrap();
        assert_eq!(scheduler.last_call(), Some(TriggerCall::Cancel(GoalId::nil())));
    }
}
