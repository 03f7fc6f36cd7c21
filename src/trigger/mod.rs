//! Trigger scheduling boundary for nudge.
//!
//! Outbound: requests to schedule or cancel a goal's repeating check-in
//! trigger. Inbound: "fired" and "answered" signals routed to the store.

pub mod dispatch;
pub mod scheduler;

pub use dispatch::{SignalDispatcher, SignalHandler, SignalOutcome, TriggerSignal};
pub use scheduler::{
    LogTriggerScheduler, RecordingTriggerScheduler, TriggerCall, TriggerRequest,
    TriggerScheduler, CHECK_IN_BODY, CHECK_IN_CATEGORY, MIN_REPEAT_SECONDS,
};
