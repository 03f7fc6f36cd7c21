//! Show command for nudge.
//!
//! Shows one session in full: heading, counts and the reconstructed
//! timeline with inferred missed check-ins.

use serde::Serialize;

use crate::core::{format_duration, GoalId, SessionDetail, TimelineEntry};
use crate::store::GoalStore;

/// Options for the show command.
#[derive(Debug, Clone, Default)]
pub struct ShowOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the show command.
#[derive(Debug, Clone, Serialize)]
pub struct ShowOutput {
    /// Whether the command was successful.
    pub success: bool,
    /// The session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionDetail>,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ShowOutput {
    /// Create a successful output.
    pub fn success(session: SessionDetail) -> Self {
        Self {
            success: true,
            session: Some(session),
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            session: None,
            error: Some(error.into()),
        }
    }

    /// Format as human-readable text.
    pub fn format_text(&self) -> String {
        let session = match (&self.session, self.success) {
            (Some(session), true) => session,
            _ => {
                return format!(
                    "Show failed: {}",
                    self.error.as_deref().unwrap_or("unknown error")
                )
            }
        };

        let summary = &session.summary;
        let mut lines = vec![session.heading.clone(), String::new()];

        lines.push(format!(
            "Started:   {}",
            summary.start.format("%Y-%m-%d %H:%M:%S")
        ));
        lines.push(format!(
            "Ended:     {}{}",
            summary.end.format("%Y-%m-%d %H:%M:%S"),
            if summary.is_active { " (active)" } else { "" }
        ));
        lines.push(format!("Duration:  {}", format_duration(summary.duration())));
        lines.push(format!(
            "Responses: {} ({} yes, {} no, {} none, {} missed)",
            summary.total_responses,
            summary.yes_count,
            summary.no_count,
            summary.none_count,
            session.missed_count
        ));
        lines.push(format!("Threshold: {}%", summary.success_threshold));
        lines.push(String::new());
        lines.push("Timeline:".to_string());

        for entry in &session.timeline {
            let label = match entry {
                TimelineEntry::Response { answer, .. } => answer.as_str(),
                TimelineEntry::Missed { .. } => "missed",
            };
            lines.push(format!(
                "  {}  {}",
                entry.timestamp().format("%Y-%m-%d %H:%M:%S"),
                label
            ));
        }

        lines.join("\n")
    }
}

/// The show command implementation.
pub struct ShowCommand<'a> {
    store: &'a GoalStore,
}

impl<'a> ShowCommand<'a> {
    /// Create a new show command.
    pub fn new(store: &'a GoalStore) -> Self {
        Self { store }
    }

    /// Show a session by display number (oldest = 1).
    pub fn run(&self, goal_id: GoalId, number: usize) -> ShowOutput {
        let Some(index) = number.checked_sub(1) else {
            return ShowOutput::failure("session numbers start at 1");
        };

        match self.store.session_detail(goal_id, index) {
            Ok(detail) => ShowOutput::success(detail),
            Err(e) => ShowOutput::failure(e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ShowOutput, options: &ShowOptions) -> String {
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
