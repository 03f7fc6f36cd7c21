//! List command for nudge.
//!
//! Lists all goals with their cadence, state and next check-in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{session_count, Goal, GoalId};
use crate::store::GoalStore;

/// Options for the list command.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Show only active goals.
    pub active_only: bool,
}

/// One goal row, as shown on the goal list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalRow {
    /// Goal ID.
    pub id: GoalId,
    /// Goal title.
    pub title: String,
    /// Minutes between check-ins.
    pub interval_minutes: u32,
    /// "Every N min".
    pub cadence: String,
    /// Whether check-ins are running.
    pub active: bool,
    /// Next check-in time, when active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_check_in: Option<DateTime<Utc>>,
    /// Minimum yes-percentage for a successful session.
    pub success_threshold: u8,
    /// Number of sessions so far.
    pub sessions: usize,
}

impl From<&Goal> for GoalRow {
    fn from(goal: &Goal) -> Self {
        Self {
            id: goal.id(),
            title: goal.title.clone(),
            interval_minutes: goal.interval_minutes,
            cadence: format!("Every {} min", goal.interval_minutes),
            active: goal.is_active(),
            next_check_in: goal.next_fire_at(),
            success_threshold: goal.success_threshold,
            sessions: session_count(goal.responses()),
        }
    }
}

impl GoalRow {
    /// Single-line description used by several commands.
    pub fn describe(&self) -> String {
        let state = if self.active { "active" } else { "paused" };
        let next = self
            .next_check_in
            .map(|t| format!(", next check-in {}", t.format("%Y-%m-%d %H:%M")))
            .unwrap_or_default();
        format!("{} ({}, {}{})", self.title, self.cadence, state, next)
    }
}

/// Output format for the list command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOutput {
    /// Whether the list was successful.
    pub success: bool,
    /// Number of goals.
    pub count: usize,
    /// The goals, in creation order.
    pub goals: Vec<GoalRow>,
    /// Error message if listing failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ListOutput {
    /// Create a successful output.
    pub fn success(goals: Vec<GoalRow>) -> Self {
        Self {
            success: true,
            count: goals.len(),
            goals,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            count: 0,
            goals: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The list command implementation.
pub struct ListCommand<'a> {
    store: &'a GoalStore,
}

impl<'a> ListCommand<'a> {
    /// Create a new list command.
    pub fn new(store: &'a GoalStore) -> Self {
        Self { store }
    }

    /// Run the list command.
    pub fn run(&self, options: &ListOptions) -> ListOutput {
        let rows: Vec<GoalRow> = self
            .store
            .goals()
            .iter()
            .filter(|g| !options.active_only || g.is_active())
            .map(GoalRow::from)
            .collect();
        ListOutput::success(rows)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ListOutput, options: &ListOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output, options)
        }
    }

    /// Format output as human-readable text.
    fn format_human_readable(&self, output: &ListOutput, options: &ListOptions) -> String {
        if !output.success {
            return format!(
                "List failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        if output.goals.is_empty() {
            return if options.active_only {
                "No active goals.\n".to_string()
            } else {
                "No goals yet. Add one with `nudge add`.\n".to_string()
            };
        }

        let mut lines = vec![format!("Found {} goal(s):\n", output.count)];

        for (i, goal) in output.goals.iter().enumerate() {
            let state = if goal.active { "● active" } else { "○ paused" };
            lines.push(format!("{}. {}  [{}]", i + 1, goal.title, state));
            lines.push(format!(
                "   {} | threshold {}% | {} session(s)",
                goal.cadence, goal.success_threshold, goal.sessions
            ));
            if let Some(next) = goal.next_check_in {
                lines.push(format!("   Next check-in: {}", next.format("%Y-%m-%d %H:%M")));
            }
            lines.push(format!("   ID: {}", goal.id));
            lines.push(String::new());
        }

        lines.join("\n")
    }
}
