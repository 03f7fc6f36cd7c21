//! Session statistics and timeline reconstruction.
//!
//! Everything here is derived from a goal's response log on demand. The
//! read-models are plain serializable structs for the display layer.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::core::goal::{Answer, Goal, GoalId, Response};
use crate::core::sessions::{partition, Session};
use crate::error::{NudgeError, Result};

/// How a session scored against the goal's success threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    /// Rounded yes-percentage reached the threshold.
    Met,
    /// Rounded yes-percentage fell short.
    NotMet,
    /// No yes/no answers at all.
    NoData,
}

/// Counts and time bounds of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    pub total: usize,
    pub yes: usize,
    pub no: usize,
    pub none: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// `end - start`, never negative.
    pub duration: Duration,
}

impl SessionStats {
    /// Compute stats for a session.
    pub fn from_session(session: &Session<'_>) -> Self {
        let start = session.first().timestamp;
        let end = session.last().timestamp;

        Self {
            total: session.len(),
            yes: session.count(Answer::Yes),
            no: session.count(Answer::No),
            none: session.count(Answer::None),
            start,
            end,
            duration: (end - start).max(Duration::zero()),
        }
    }

    /// Number of answers that count towards the ratio.
    pub fn yes_no_total(&self) -> usize {
        self.yes + self.no
    }

    /// `yes / (yes + no)`, or 0 when there were no yes/no answers.
    pub fn yes_ratio(&self) -> f64 {
        yes_ratio(self.yes, self.no)
    }

    /// Classify against a success threshold (percent).
    pub fn outcome(&self, success_threshold: u8) -> SessionOutcome {
        classify(self.yes, self.no, success_threshold)
    }
}

/// `yes / (yes + no)`, or 0 when both are zero.
pub fn yes_ratio(yes: usize, no: usize) -> f64 {
    let denominator = yes + no;
    if denominator == 0 {
        return 0.0;
    }
    yes as f64 / denominator as f64
}

/// Classify a session by its rounded yes-percentage.
pub fn classify(yes: usize, no: usize, success_threshold: u8) -> SessionOutcome {
    if yes + no == 0 {
        return SessionOutcome::NoData;
    }

    let percent = (yes_ratio(yes, no) * 100.0).round() as u32;
    if percent >= u32::from(success_threshold) {
        SessionOutcome::Met
    } else {
        SessionOutcome::NotMet
    }
}

/// One point on a reconstructed session timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineEntry {
    /// A response that was actually recorded.
    Response {
        answer: Answer,
        timestamp: DateTime<Utc>,
    },
    /// A check-in inferred from a gap between responses.
    Missed { timestamp: DateTime<Utc> },
}

impl TimelineEntry {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            TimelineEntry::Response { timestamp, .. } | TimelineEntry::Missed { timestamp } => {
                *timestamp
            }
        }
    }

    pub fn is_missed(&self) -> bool {
        matches!(self, TimelineEntry::Missed { .. })
    }
}

/// Interleave a session's responses with inferred missed check-ins.
///
/// Whenever two consecutive responses are at least two intervals apart, one
/// `Missed` entry is placed one interval after the earlier response. Longer
/// gaps still yield a single marker: a five-interval silence shows up as one
/// miss, not four. A non-positive interval infers nothing.
pub fn timeline(responses: &[&Response], interval: Duration) -> Vec<TimelineEntry> {
    let mut entries = Vec::with_capacity(responses.len());
    let infer = interval > Duration::zero();

    for (i, response) in responses.iter().enumerate() {
        entries.push(TimelineEntry::Response {
            answer: response.answer,
            timestamp: response.timestamp,
        });

        if let Some(next) = responses.get(i + 1) {
            if infer && next.timestamp - response.timestamp >= interval * 2 {
                entries.push(TimelineEntry::Missed {
                    timestamp: response.timestamp + interval,
                });
            }
        }
    }

    entries
}

/// Display row for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Identity of the session, oldest = 0.
    pub chronological_index: usize,
    /// Display number, oldest = 1.
    pub number: usize,
    /// Title shown for the session: user-assigned or "Session N".
    pub title: String,
    /// Whether `title` came from the user.
    pub custom_title: bool,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_seconds: i64,
    pub total_responses: usize,
    pub yes_count: usize,
    pub no_count: usize,
    pub none_count: usize,
    pub yes_ratio: f64,
    pub success_threshold: u8,
    pub outcome: SessionOutcome,
    /// Newest session of an active goal.
    pub is_active: bool,
    /// No closing marker after this session yet.
    pub is_open: bool,
}

impl SessionSummary {
    fn build(goal: &Goal, session: &Session<'_>, session_count: usize) -> Self {
        let stats = SessionStats::from_session(session);
        let is_newest = session.index + 1 == session_count;
        let custom = goal.session_title(session.index);

        Self {
            chronological_index: session.index,
            number: session.index + 1,
            title: custom
                .map(str::to_string)
                .unwrap_or_else(|| default_session_title(session.index)),
            custom_title: custom.is_some(),
            start: stats.start,
            end: stats.end,
            duration_seconds: stats.duration.num_seconds(),
            total_responses: stats.total,
            yes_count: stats.yes,
            no_count: stats.no,
            none_count: stats.none,
            yes_ratio: stats.yes_ratio(),
            success_threshold: goal.success_threshold,
            outcome: stats.outcome(goal.success_threshold),
            is_active: goal.is_active() && is_newest,
            is_open: session.open,
        }
    }

    /// Rounded yes-percentage, if there is any yes/no data.
    pub fn yes_percent(&self) -> Option<u32> {
        if self.yes_count + self.no_count == 0 {
            None
        } else {
            Some((self.yes_ratio * 100.0).round() as u32)
        }
    }

    /// Duration as a chrono value.
    pub fn duration(&self) -> Duration {
        Duration::seconds(self.duration_seconds)
    }
}

/// Default display title for a session.
pub fn default_session_title(index: usize) -> String {
    format!("Session {}", index + 1)
}

/// All sessions of one goal, as shown on the goal's sessions screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOverview {
    pub goal_id: GoalId,
    pub goal_title: String,
    pub goal_active: bool,
    /// Oldest first.
    pub sessions: Vec<SessionSummary>,
    /// The goal is running but has no sessions yet.
    pub awaiting_first_response: bool,
}

impl SessionOverview {
    /// Build the overview for a goal.
    pub fn for_goal(goal: &Goal) -> Self {
        let sessions = partition(goal.responses());
        let count = sessions.len();
        let summaries: Vec<SessionSummary> = sessions
            .iter()
            .map(|s| SessionSummary::build(goal, s, count))
            .collect();

        Self {
            goal_id: goal.id(),
            goal_title: goal.title.clone(),
            goal_active: goal.is_active(),
            awaiting_first_response: goal.is_active() && summaries.is_empty(),
            sessions: summaries,
        }
    }

    /// Sessions newest first, the display order.
    pub fn newest_first(&self) -> impl Iterator<Item = &SessionSummary> {
        self.sessions.iter().rev()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// One session in full: summary, heading and reconstructed timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDetail {
    pub goal_id: GoalId,
    pub heading: String,
    pub summary: SessionSummary,
    pub timeline: Vec<TimelineEntry>,
    pub missed_count: usize,
}

impl SessionDetail {
    /// Build the detail view for a session index.
    ///
    /// An index past the last session is rejected rather than clamped.
    pub fn for_goal(goal: &Goal, index: usize) -> Result<Self> {
        let sessions = partition(goal.responses());
        let session = sessions.get(index).ok_or_else(|| {
            NudgeError::invalid_input(
                "session index",
                format!("{} is out of range ({} sessions)", index, sessions.len()),
            )
        })?;

        let summary = SessionSummary::build(goal, session, sessions.len());
        let timeline = timeline(&session.responses, goal.interval());
        let missed_count = timeline.iter().filter(|e| e.is_missed()).count();

        Ok(Self {
            goal_id: goal.id(),
            heading: session_heading(&goal.title, &summary),
            summary,
            timeline,
            missed_count,
        })
    }
}

/// Heading for a session detail screen.
pub fn session_heading(goal_title: &str, summary: &SessionSummary) -> String {
    match summary.yes_percent() {
        Some(percent) => format!("{} — {} ({}% Yes)", goal_title, summary.title, percent),
        None => format!("{} — {}", goal_title, summary.title),
    }
}

/// Format a duration the way session rows show it.
///
/// `1h 05m 09s`, `4m 07s` or `12s`. Negative durations show as `0s`.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
