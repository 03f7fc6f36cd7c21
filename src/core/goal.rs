//! Goal and response types for nudge.
//!
//! A goal is a recurring check-in question. Its responses form an
//! append-only log that is the ground truth for every derived view.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::GoalsConfig;
use crate::core::sessions::session_count;
use crate::error::{NudgeError, Result};

/// Stable goal identifier. Also the payload of the goal's trigger.
pub type GoalId = Uuid;

/// Default minimum yes-percentage for a session to count as a success.
pub const DEFAULT_SUCCESS_THRESHOLD: u8 = 80;

/// Notification action identifier for a "Yes" answer.
pub const YES_ACTION: &str = "YES_ACTION";

/// Notification action identifier for a "No" answer.
pub const NO_ACTION: &str = "NO_ACTION";

fn default_success_threshold() -> u8 {
    DEFAULT_SUCCESS_THRESHOLD
}

/// What a single response records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    /// The user did the thing.
    Yes,
    /// The user did not.
    No,
    /// The notification was opened without picking an answer.
    None,
    /// Boundary marker appended when the goal is paused.
    SessionEnd,
}

impl Answer {
    /// Map a notification action identifier to an answer.
    ///
    /// Anything other than the two yes/no actions (a plain tap on the
    /// notification body) records `None`.
    pub fn from_action_id(action_id: &str) -> Self {
        match action_id {
            YES_ACTION => Answer::Yes,
            NO_ACTION => Answer::No,
            _ => Answer::None,
        }
    }

    /// Check if this is a session boundary rather than a check-in.
    pub fn is_session_end(&self) -> bool {
        matches!(self, Answer::SessionEnd)
    }

    /// Short lowercase name, as used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Answer::Yes => "yes",
            Answer::No => "no",
            Answer::None => "none",
            Answer::SessionEnd => "session_end",
        }
    }
}

/// One recorded answer (or session-end marker). Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Unique id, only used for disambiguation.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// The answer given.
    pub answer: Answer,
    /// Wall-clock time of the event.
    pub timestamp: DateTime<Utc>,
}

impl Response {
    /// Create a response with a fresh id.
    pub fn new(answer: Answer, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            answer,
            timestamp,
        }
    }
}

/// A recurring check-in goal.
///
/// Scheduling fields are only changed through
/// [`GoalSchedule`](crate::core::GoalSchedule), which keeps `next_fire_at`
/// present exactly when the goal is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    id: GoalId,
    /// Display title, never empty.
    pub title: String,
    /// Minutes between check-ins.
    pub interval_minutes: u32,
    #[serde(default)]
    pub(crate) is_active: bool,
    #[serde(default)]
    pub(crate) next_fire_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) responses: Vec<Response>,
    /// Minimum yes-percentage (0-100) for a successful session.
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u8,
    /// User-assigned session titles keyed by chronological session index.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) session_titles: BTreeMap<usize, String>,
}

impl Goal {
    /// Create a new inactive goal with no responses.
    pub fn new(title: impl Into<String>, interval_minutes: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            interval_minutes,
            is_active: false,
            next_fire_at: None,
            responses: Vec::new(),
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            session_titles: BTreeMap::new(),
        }
    }

    /// Create a goal from a validated draft.
    pub fn from_draft(draft: &GoalDraft) -> Self {
        let mut goal = Self::new(draft.title.trim(), draft.interval_minutes);
        goal.success_threshold = draft.success_threshold;
        goal
    }

    /// Set the success threshold.
    pub fn with_threshold(mut self, success_threshold: u8) -> Self {
        self.success_threshold = success_threshold;
        self
    }

    pub fn id(&self) -> GoalId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn next_fire_at(&self) -> Option<DateTime<Utc>> {
        self.next_fire_at
    }

    /// The response log in insertion order.
    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    /// The check-in interval as a duration.
    pub fn interval(&self) -> Duration {
        Duration::minutes(i64::from(self.interval_minutes))
    }

    /// User-assigned title for a session, if any.
    pub fn session_title(&self, index: usize) -> Option<&str> {
        self.session_titles.get(&index).map(String::as_str)
    }

    /// All user-assigned session titles.
    pub fn session_titles(&self) -> &BTreeMap<usize, String> {
        &self.session_titles
    }

    /// Name a session by chronological index, or remove its name when the
    /// title is blank. The index must refer to an existing session.
    pub fn set_session_title(&mut self, index: usize, title: &str) -> Result<()> {
        let count = session_count(&self.responses);
        if index >= count {
            return Err(NudgeError::invalid_input(
                "session",
                format!("index {} out of range ({} sessions)", index, count),
            ));
        }

        let title = title.trim();
        if title.is_empty() {
            self.session_titles.remove(&index);
        } else {
            self.session_titles.insert(index, title.to_string());
        }
        Ok(())
    }

    /// Current draft of the editable fields, for pre-filling an edit form.
    pub fn to_draft(&self) -> GoalDraft {
        GoalDraft {
            title: self.title.clone(),
            interval_minutes: self.interval_minutes,
            success_threshold: self.success_threshold,
        }
    }

    /// Check the next-fire invariant.
    pub fn is_consistent(&self) -> bool {
        self.is_active == self.next_fire_at.is_some()
    }

    /// Repair a goal decoded from storage that breaks the next-fire
    /// invariant. Returns true if anything changed.
    pub fn normalize(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_consistent() {
            return false;
        }

        if self.is_active {
            self.next_fire_at = Some(now + self.interval());
        } else {
            self.next_fire_at = None;
        }
        true
    }
}

/// Editable goal fields, as entered in a create/edit form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalDraft {
    pub title: String,
    pub interval_minutes: u32,
    pub success_threshold: u8,
}

impl GoalDraft {
    /// Create a draft with the default success threshold.
    pub fn new(title: impl Into<String>, interval_minutes: u32) -> Self {
        Self {
            title: title.into(),
            interval_minutes,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
        }
    }

    /// Set the success threshold.
    pub fn with_threshold(mut self, success_threshold: u8) -> Self {
        self.success_threshold = success_threshold;
        self
    }

    /// Check the draft against the configured rules.
    ///
    /// The title must contain something other than whitespace, the interval
    /// must come from the allowed set and the threshold must be a percentage.
    pub fn validate(&self, rules: &GoalsConfig) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(NudgeError::invalid_input("title", "must not be empty"));
        }

        if !rules.is_allowed_interval(self.interval_minutes) {
            return Err(NudgeError::invalid_input(
                "interval",
                format!(
                    "{} minutes is not one of {:?}",
                    self.interval_minutes, rules.allowed_intervals
                ),
            ));
        }

        if !GoalsConfig::is_valid_threshold(self.success_threshold) {
            return Err(NudgeError::invalid_input(
                "success_threshold",
                format!("{} is outside 0-100", self.success_threshold),
            ));
        }

        Ok(())
    }
}
