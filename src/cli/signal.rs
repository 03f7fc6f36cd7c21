//! Signal commands for nudge.
//!
//! `nudge answer` and `nudge fire` stand in for the notification system:
//! they build the signal it would deliver and hand it to the dispatcher.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::{Answer, GoalId};
use crate::trigger::{SignalDispatcher, SignalOutcome, TriggerSignal};

/// Options for signal commands.
#[derive(Debug, Clone, Default)]
pub struct SignalOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Parse an answer given on the command line.
///
/// Accepts `yes`/`y`, `no`/`n` and `none`. Anything else is treated as a
/// notification action identifier, so `YES_ACTION` works too and an
/// unrecognized action records `none`.
pub fn parse_answer(input: &str) -> Answer {
    match input.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" => Answer::Yes,
        "no" | "n" => Answer::No,
        "none" => Answer::None,
        _ => Answer::from_action_id(input.trim()),
    }
}

/// Output format for signal commands.
#[derive(Debug, Clone, Serialize)]
pub struct SignalOutput {
    /// Whether the signal was applied.
    pub success: bool,
    /// The delivered signal.
    pub signal: TriggerSignal,
    /// What the store did with it.
    pub outcome: SignalOutcome,
}

impl SignalOutput {
    /// Format as human-readable text.
    pub fn format_text(&self) -> String {
        let what = match &self.signal {
            TriggerSignal::Fired { .. } => "fired".to_string(),
            TriggerSignal::Answered { answer, .. } => format!("answered {}", answer.as_str()),
        };

        match self.outcome {
            SignalOutcome::Applied => format!("Signal {}: applied.", what),
            SignalOutcome::Ignored => format!(
                "Signal {}: ignored (goal {} is unknown or paused).",
                what,
                self.signal.goal_id()
            ),
            SignalOutcome::Dropped => format!("Signal {}: dropped (no store attached).", what),
        }
    }
}

/// The signal command implementation.
pub struct SignalCommand<'a> {
    dispatcher: &'a SignalDispatcher,
}

impl<'a> SignalCommand<'a> {
    /// Create a new signal command.
    pub fn new(dispatcher: &'a SignalDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Deliver a "trigger fired" signal.
    pub fn fire(&self, goal_id: GoalId) -> SignalOutput {
        self.deliver(TriggerSignal::fired(goal_id))
    }

    /// Deliver a "user answered" signal stamped `at`.
    ///
    /// Callers pass the store's clock so answers given here and answers
    /// recorded directly on the store share one time source.
    pub fn answer(&self, goal_id: GoalId, answer: Answer, at: DateTime<Utc>) -> SignalOutput {
        self.deliver(TriggerSignal::answered(goal_id, answer, at))
    }

    /// Deliver any signal.
    pub fn deliver(&self, signal: TriggerSignal) -> SignalOutput {
        let outcome = self.dispatcher.dispatch(signal.clone());
        SignalOutput {
            success: outcome == SignalOutcome::Applied,
            signal,
            outcome,
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &SignalOutput, options: &SignalOptions) -> String {
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
