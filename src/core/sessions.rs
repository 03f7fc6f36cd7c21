//! Session partitioning.
//!
//! Sessions are never stored. They are cut out of a goal's response log on
//! every read by sorting it by timestamp and splitting on `SessionEnd`
//! markers. The re-sort costs O(n log n) per read, which is fine for the
//! handful of responses a goal collects, and there is no cache to go stale.

use crate::core::goal::{Answer, Response};

/// A maximal run of check-in responses between two session-end markers.
///
/// Only [`partition`] builds sessions, so every session holds at least one
/// response and [`Session::first`] / [`Session::last`] always have
/// something to return. Sessions cannot be assembled by hand:
///
/// ```compile_fail
/// let empty = nudge::core::Session {
///     index: 0,
///     responses: Vec::new(),
///     open: true,
/// };
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Session<'a> {
    /// Position among all sessions of the goal, oldest = 0.
    pub(crate) index: usize,
    /// Responses in chronological order. Never contains `SessionEnd`.
    pub(crate) responses: Vec<&'a Response>,
    /// Whether the log ended without a closing marker after this run.
    pub(crate) open: bool,
}

impl<'a> Session<'a> {
    /// Position among all sessions of the goal, oldest = 0.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Responses in chronological order.
    pub fn responses(&self) -> &[&'a Response] {
        &self.responses
    }

    /// Whether this run was still open when the log ended.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// First response. Sessions are never empty.
    pub fn first(&self) -> &'a Response {
        self.responses[0]
    }

    /// Last response.
    pub fn last(&self) -> &'a Response {
        self.responses[self.responses.len() - 1]
    }

    /// Number of responses in the session.
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// Always false for partitioner output; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Count responses with the given answer.
    pub fn count(&self, answer: Answer) -> usize {
        self.responses.iter().filter(|r| r.answer == answer).count()
    }
}

/// Split a response log into sessions, oldest first.
///
/// The log may be in any order. Responses are stable-sorted by timestamp so
/// colliding timestamps keep their insertion order. A `SessionEnd` closes the
/// current run if it has anything in it and is ignored otherwise, so
/// duplicate markers never produce empty sessions. A trailing run without a
/// marker becomes the final, open session.
pub fn partition(responses: &[Response]) -> Vec<Session<'_>> {
    let mut ordered: Vec<&Response> = responses.iter().collect();
    ordered.sort_by_key(|r| r.timestamp);

    let mut sessions = Vec::new();
    let mut current: Vec<&Response> = Vec::new();

    for response in ordered {
        if response.answer.is_session_end() {
            if !current.is_empty() {
                sessions.push(Session {
                    index: sessions.len(),
                    responses: std::mem::take(&mut current),
                    open: false,
                });
            }
        } else {
            current.push(response);
        }
    }

    if !current.is_empty() {
        sessions.push(Session {
            index: sessions.len(),
            responses: current,
            open: true,
        });
    }

    sessions
}

/// Number of sessions in a response log.
pub fn session_count(responses: &[Response]) -> usize {
    partition(responses).len()
}

/// The session at a chronological index, if it exists.
pub fn session_at(responses: &[Response], index: usize) -> Option<Session<'_>> {
    partition(responses).into_iter().nth(index)
}
