//! Goal scheduling state machine.
//!
//! A goal is either `Inactive` (no pending trigger, no next-fire time) or
//! `Active` (trigger pending, next-fire time set). Transitions mutate the
//! goal and return the trigger call the caller must make; they never talk
//! to the outside world themselves.

use chrono::{DateTime, Utc};

use crate::core::goal::{Answer, Goal, GoalDraft, GoalId, Response};
use crate::error::{NudgeError, Result};
use crate::trigger::TriggerRequest;

/// Scheduling state of a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    Inactive,
    Active { next_fire_at: DateTime<Utc> },
}

impl ScheduleState {
    /// Read the state of a goal.
    ///
    /// A goal flagged active without a next-fire time reads as inactive.
    pub fn of(goal: &Goal) -> Self {
        match (goal.is_active, goal.next_fire_at) {
            (true, Some(next_fire_at)) => ScheduleState::Active { next_fire_at },
            _ => ScheduleState::Inactive,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ScheduleState::Active { .. })
    }
}

/// External trigger call required by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerEffect {
    /// Nothing to tell the scheduler.
    None,
    /// Schedule a new repeating trigger.
    Schedule(TriggerRequest),
    /// Cancel the goal's pending trigger.
    Cancel(GoalId),
    /// Cancel the pending trigger, then schedule this one.
    Reschedule(TriggerRequest),
}

/// Transition manager for one goal.
///
/// All scheduling mutations go through this struct so the next-fire time is
/// set in the same step that sets the active flag, and cleared in the same
/// step that clears it.
#[derive(Debug)]
pub struct GoalSchedule<'a> {
    goal: &'a mut Goal,
    now: DateTime<Utc>,
}

impl<'a> GoalSchedule<'a> {
    /// Create a transition manager for a goal at the given wall-clock time.
    pub fn new(goal: &'a mut Goal, now: DateTime<Utc>) -> Self {
        Self { goal, now }
    }

    pub fn state(&self) -> ScheduleState {
        ScheduleState::of(self.goal)
    }

    /// The goal, for edits that leave the scheduling fields alone.
    pub(crate) fn goal_mut(&mut self) -> &mut Goal {
        self.goal
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Transition: Inactive → Active (start or resume).
    pub fn start(&mut self) -> Result<TriggerEffect> {
        if self.goal.is_active {
            return Err(NudgeError::invalid_state(format!(
                "goal '{}' is already active",
                self.goal.title
            )));
        }

        self.goal.is_active = true;
        self.goal.next_fire_at = Some(self.now + self.goal.interval());
        Ok(TriggerEffect::Schedule(TriggerRequest::for_goal(self.goal)))
    }

    /// Transition: Active → Inactive (pause).
    ///
    /// Always appends a session-end marker, even when nothing was answered
    /// since the last start. The partitioner treats such a lone marker as a
    /// no-op.
    pub fn pause(&mut self) -> Result<TriggerEffect> {
        if !self.goal.is_active {
            return Err(NudgeError::invalid_state(format!(
                "goal '{}' is already paused",
                self.goal.title
            )));
        }

        self.goal
            .responses
            .push(Response::new(Answer::SessionEnd, self.now));
        self.goal.is_active = false;
        self.goal.next_fire_at = None;
        Ok(TriggerEffect::Cancel(self.goal.id()))
    }

    /// Start if paused, pause if running.
    pub fn toggle(&mut self) -> Result<TriggerEffect> {
        if self.goal.is_active {
            self.pause()
        } else {
            self.start()
        }
    }

    /// Transition: Active → Active (trigger fired).
    ///
    /// Advances the next-fire time by one interval from the previous
    /// next-fire time, or from now if there was none. Returns the new
    /// next-fire time, or `None` when the goal is paused: a fired signal
    /// that raced a pause must not re-arm the goal.
    pub fn fire(&mut self) -> Option<DateTime<Utc>> {
        if !self.goal.is_active {
            return None;
        }

        let base = self.goal.next_fire_at.unwrap_or(self.now);
        let next = base + self.goal.interval();
        self.goal.next_fire_at = Some(next);
        Some(next)
    }

    /// Record an answer. Valid in both states; a late answer to a paused
    /// goal still counts.
    pub fn record(&mut self, answer: Answer, at: DateTime<Utc>) -> Result<()> {
        if answer.is_session_end() {
            return Err(NudgeError::invalid_input(
                "answer",
                "session ends are only recorded by pausing",
            ));
        }

        self.goal.responses.push(Response::new(answer, at));
        Ok(())
    }

    /// Apply edited fields.
    ///
    /// An active goal restarts its cadence from now with the new interval;
    /// time left on the old cadence is discarded.
    pub fn edit(&mut self, draft: &GoalDraft) -> TriggerEffect {
        self.goal.title = draft.title.trim().to_string();
        self.goal.interval_minutes = draft.interval_minutes;
        self.goal.success_threshold = draft.success_threshold;

        if !self.goal.is_active {
            return TriggerEffect::None;
        }

        self.goal.next_fire_at = Some(self.now + self.goal.interval());
        TriggerEffect::Reschedule(TriggerRequest::for_goal(self.goal))
    }

    /// Trigger call for deleting the goal. Cancels regardless of state.
    pub fn retire(&self) -> TriggerEffect {
        TriggerEffect::Cancel(self.goal.id())
    }
}
