//! Goal commands for nudge.
//!
//! Create, edit, start, pause, toggle, delete and session naming. Each runs
//! one store mutation and reports the goal as it looks afterwards.

use serde::Serialize;

use crate::cli::list::GoalRow;
use crate::core::{GoalDraft, GoalId};
use crate::error::{NudgeError, Result};
use crate::store::GoalStore;

/// Options for goal commands.
#[derive(Debug, Clone, Default)]
pub struct GoalOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Changes requested by `nudge edit`. Unset fields keep their value.
#[derive(Debug, Clone, Default)]
pub struct GoalEdit {
    pub title: Option<String>,
    pub interval_minutes: Option<u32>,
    pub success_threshold: Option<u8>,
}

/// A goal mutation.
#[derive(Debug, Clone)]
pub enum GoalAction {
    Add(GoalDraft),
    Edit(GoalId, GoalEdit),
    Start(GoalId),
    Pause(GoalId),
    Toggle(GoalId),
    Delete(GoalId),
    /// Name session `number` (oldest = 1); a blank title clears the name.
    Title {
        goal_id: GoalId,
        number: usize,
        title: String,
    },
}

impl GoalAction {
    /// Past-tense verb for messages.
    fn verb(&self) -> &'static str {
        match self {
            GoalAction::Add(_) => "added",
            GoalAction::Edit(..) => "updated",
            GoalAction::Start(_) => "started",
            GoalAction::Pause(_) => "paused",
            GoalAction::Toggle(_) => "toggled",
            GoalAction::Delete(_) => "deleted",
            GoalAction::Title { .. } => "session renamed",
        }
    }
}

/// Output format for goal commands.
#[derive(Debug, Clone, Serialize)]
pub struct GoalOutput {
    /// Whether the action was applied.
    pub success: bool,
    /// What was done.
    pub action: String,
    /// Goal the action applied to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_id: Option<GoalId>,
    /// The goal after the action (absent after delete).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<GoalRow>,
    /// Error message if the action was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GoalOutput {
    /// Create a successful output.
    pub fn success(action: &str, goal_id: GoalId, goal: Option<GoalRow>) -> Self {
        Self {
            success: true,
            action: action.to_string(),
            goal_id: Some(goal_id),
            goal,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(action: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            action: action.to_string(),
            goal_id: None,
            goal: None,
            error: Some(error.into()),
        }
    }

    /// Format as human-readable text.
    pub fn format_text(&self) -> String {
        if !self.success {
            return format!(
                "Failed: {}",
                self.error.as_deref().unwrap_or("unknown error")
            );
        }

        match (&self.goal, self.goal_id) {
            (Some(goal), _) => format!("Goal {}: {}", self.action, goal.describe()),
            (None, Some(id)) => format!("Goal {}: {}", self.action, id),
            (None, None) => format!("Goal {}.", self.action),
        }
    }
}

/// The goal command implementation.
pub struct GoalCommand<'a> {
    store: &'a GoalStore,
}

impl<'a> GoalCommand<'a> {
    /// Create a new goal command.
    pub fn new(store: &'a GoalStore) -> Self {
        Self { store }
    }

    /// Run a goal action.
    pub fn run(&self, action: &GoalAction) -> GoalOutput {
        let verb = action.verb();
        match self.apply(action) {
            Ok(goal_id) => {
                let row = self.store.goal(goal_id).as_ref().map(GoalRow::from);
                GoalOutput::success(verb, goal_id, row)
            }
            Err(e) => GoalOutput::failure(verb, e.to_string()),
        }
    }

    fn apply(&self, action: &GoalAction) -> Result<GoalId> {
        match action {
            GoalAction::Add(draft) => self.store.add_goal(draft),
            GoalAction::Edit(goal_id, edit) => {
                let mut draft = self.store.edit_draft(*goal_id)?;
                if let Some(title) = &edit.title {
                    draft.title = title.clone();
                }
                if let Some(interval) = edit.interval_minutes {
                    draft.interval_minutes = interval;
                }
                if let Some(threshold) = edit.success_threshold {
                    draft.success_threshold = threshold;
                }
                self.store.update_goal(*goal_id, &draft)?;
                Ok(*goal_id)
            }
            GoalAction::Start(goal_id) => self.store.start(*goal_id).map(|_| *goal_id),
            GoalAction::Pause(goal_id) => self.store.pause(*goal_id).map(|_| *goal_id),
            GoalAction::Toggle(goal_id) => self.store.toggle_active(*goal_id).map(|_| *goal_id),
            GoalAction::Delete(goal_id) => self.store.delete(*goal_id).map(|_| *goal_id),
            GoalAction::Title {
                goal_id,
                number,
                title,
            } => {
                let index = number.checked_sub(1).ok_or_else(|| {
                    NudgeError::invalid_input("session", "session numbers start at 1")
                })?;
                self.store.set_session_title(*goal_id, index, title)?;
                Ok(*goal_id)
            }
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &GoalOutput, options: &GoalOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            output.format_text()
        }
    }
}
