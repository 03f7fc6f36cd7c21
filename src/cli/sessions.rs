//! Sessions command for nudge.
//!
//! Lists a goal's sessions, newest first, with their yes-ratio against the
//! goal's success threshold. Session numbers are what `nudge show` and
//! `nudge title` take.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{format_duration, GoalId, SessionOutcome, SessionOverview, SessionSummary};
use crate::store::GoalStore;

/// Options for the sessions command.
#[derive(Debug, Clone, Default)]
pub struct SessionsOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Maximum number of sessions to show.
    pub limit: Option<usize>,
}

/// One session row for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRow {
    /// Display number (oldest = 1).
    pub number: usize,
    /// Session title.
    pub title: String,
    /// First response.
    pub started: DateTime<Utc>,
    /// Formatted duration.
    pub duration: String,
    /// Number of responses.
    pub responses: usize,
    /// Rounded yes-percentage, if there is yes/no data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yes_percent: Option<u32>,
    /// Met, not met or no data.
    pub outcome: SessionOutcome,
    /// Newest session of a running goal.
    pub active: bool,
}

impl From<&SessionSummary> for SessionRow {
    fn from(summary: &SessionSummary) -> Self {
        Self {
            number: summary.number,
            title: summary.title.clone(),
            started: summary.start,
            duration: format_duration(summary.duration()),
            responses: summary.total_responses,
            yes_percent: summary.yes_percent(),
            outcome: summary.outcome,
            active: summary.is_active,
        }
    }
}

/// Output format for the sessions command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsOutput {
    /// Whether the command was successful.
    pub success: bool,
    /// Goal ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_id: Option<GoalId>,
    /// Goal title.
    pub goal_title: String,
    /// Whether the goal is running.
    pub goal_active: bool,
    /// Session rows, newest first.
    pub sessions: Vec<SessionRow>,
    /// Total number of sessions for the goal.
    pub count: usize,
    /// The goal is running but nothing has been answered yet.
    pub awaiting_first_response: bool,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SessionsOutput {
    /// Create a successful output.
    pub fn success(overview: &SessionOverview, limit: Option<usize>) -> Self {
        let sessions: Vec<SessionRow> = overview
            .newest_first()
            .take(limit.unwrap_or(usize::MAX))
            .map(SessionRow::from)
            .collect();

        Self {
            success: true,
            goal_id: Some(overview.goal_id),
            goal_title: overview.goal_title.clone(),
            goal_active: overview.goal_active,
            sessions,
            count: overview.sessions.len(),
            awaiting_first_response: overview.awaiting_first_response,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            goal_id: None,
            goal_title: String::new(),
            goal_active: false,
            sessions: vec![],
            count: 0,
            awaiting_first_response: false,
            error: Some(error.into()),
        }
    }

    /// Format as human-readable text.
    pub fn format_text(&self) -> String {
        if !self.success {
            return format!(
                "Sessions failed: {}",
                self.error.as_deref().unwrap_or("unknown error")
            );
        }

        let state = if self.goal_active { "active" } else { "paused" };
        let mut lines = vec![format!(
            "{} ({}, {} session(s))",
            self.goal_title, state, self.count
        )];
        lines.push(String::new());

        if self.awaiting_first_response {
            lines.push("Current session: 0 responses (active)".to_string());
            return lines.join("\n");
        }

        if self.sessions.is_empty() {
            lines.push("No sessions yet.".to_string());
            return lines.join("\n");
        }

        // Header
        lines.push(format!(
            "{:>3}  {:<20}  {:<16}  {:>11}  {:>4}  {:>5}  {}",
            "#", "TITLE", "STARTED", "DURATION", "RESP", "YES", "RESULT"
        ));
        lines.push("-".repeat(80));

        for session in &self.sessions {
            let yes = session
                .yes_percent
                .map(|p| format!("{}%", p))
                .unwrap_or_else(|| "-".to_string());
            let result = match session.outcome {
                SessionOutcome::Met => "met",
                SessionOutcome::NotMet => "not met",
                SessionOutcome::NoData => "no data",
            };
            let marker = if session.active { " (active)" } else { "" };
            let title: String = session.title.chars().take(20).collect();

            lines.push(format!(
                "{:>3}  {:<20}  {:<16}  {:>11}  {:>4}  {:>5}  {}{}",
                session.number,
                title,
                session.started.format("%Y-%m-%d %H:%M"),
                session.duration,
                session.responses,
                yes,
                result,
                marker
            ));
        }

        lines.join("\n")
    }
}

/// The sessions command implementation.
pub struct SessionsCommand<'a> {
    store: &'a GoalStore,
}

impl<'a> SessionsCommand<'a> {
    /// Create a new sessions command.
    pub fn new(store: &'a GoalStore) -> Self {
        Self { store }
    }

    /// Run the sessions command.
    pub fn run(&self, goal_id: GoalId, options: &SessionsOptions) -> SessionsOutput {
        match self.store.overview(goal_id) {
            Ok(overview) => SessionsOutput::success(&overview, options.limit),
            Err(e) => SessionsOutput::failure(e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &SessionsOutput, options: &SessionsOptions) -> String {
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
