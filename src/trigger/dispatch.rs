//! Routing of external trigger signals to the goal store.
//!
//! Notification callbacks arrive on whatever thread the platform picks and
//! may arrive before the store exists or after it is gone. The dispatcher
//! holds only a weak handle to the live handler; with no live handler,
//! signals are dropped. That is an ordinary startup race, not an error.

use std::sync::{Arc, PoisonError, RwLock, Weak};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{Answer, GoalId};

/// A signal delivered by the trigger scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum TriggerSignal {
    /// A goal's trigger went off.
    Fired { goal_id: GoalId },
    /// The user answered a check-in notification.
    Answered {
        goal_id: GoalId,
        answer: Answer,
        at: DateTime<Utc>,
    },
}

impl TriggerSignal {
    pub fn fired(goal_id: GoalId) -> Self {
        Self::Fired { goal_id }
    }

    pub fn answered(goal_id: GoalId, answer: Answer, at: DateTime<Utc>) -> Self {
        Self::Answered {
            goal_id,
            answer,
            at,
        }
    }

    /// Build an answered signal from a notification action identifier.
    pub fn from_action(goal_id: GoalId, action_id: &str, at: DateTime<Utc>) -> Self {
        Self::answered(goal_id, Answer::from_action_id(action_id), at)
    }

    pub fn goal_id(&self) -> GoalId {
        match self {
            Self::Fired { goal_id } | Self::Answered { goal_id, .. } => *goal_id,
        }
    }
}

/// What became of a dispatched signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalOutcome {
    /// The handler applied it.
    Applied,
    /// The handler looked at it and did nothing (unknown or paused goal).
    Ignored,
    /// No live handler was registered.
    Dropped,
}

/// Receiver of trigger signals.
pub trait SignalHandler: Send + Sync {
    fn handle_signal(&self, signal: TriggerSignal) -> SignalOutcome;
}

/// Process-wide entry point for trigger callbacks.
///
/// Owned by the composition root and shared with platform callbacks; never
/// keeps the handler alive.
#[derive(Default)]
pub struct SignalDispatcher {
    handler: RwLock<Option<Weak<dyn SignalHandler>>>,
}

impl SignalDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the live handler, replacing any previous one.
    pub fn register<H: SignalHandler + 'static>(&self, handler: &Arc<H>) {
        let handler: Arc<dyn SignalHandler> = handler.clone();
        *self
            .handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::downgrade(&handler));
    }

    /// Remove the registered handler.
    pub fn unregister(&self) {
        *self
            .handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Whether a live handler is registered.
    pub fn is_connected(&self) -> bool {
        self.live_handler().is_some()
    }

    /// Forward a signal to the live handler, or drop it.
    pub fn dispatch(&self, signal: TriggerSignal) -> SignalOutcome {
        match self.live_handler() {
            Some(handler) => handler.handle_signal(signal),
            None => {
                tracing::debug!(
                    goal_id = %signal.goal_id(),
                    "no live signal handler, dropping trigger signal"
                );
                SignalOutcome::Dropped
            }
        }
    }

    fn live_handler(&self) -> Option<Arc<dyn SignalHandler>> {
        self.handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
    }
}

impl std::fmt::Debug for SignalDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalDispatcher")
            .field("connected", &self.is_connected())
            .finish()
    }
}
