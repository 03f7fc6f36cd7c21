//! CLI commands for nudge.
//!
//! This module provides the commands behind the `nudge` binary, organized
//! into:
//! - **Read commands**: list, sessions, show
//! - **Goal commands**: add, edit, start, pause, toggle, delete, title
//! - **Signal commands**: answer, fire (stand-ins for the notification system)

// Read commands
pub mod list;
pub mod sessions;
pub mod show;

// Mutations
pub mod goal;
pub mod signal;

pub use goal::{GoalAction, GoalCommand, GoalEdit};
pub use list::ListCommand;
pub use sessions::SessionsCommand;
pub use show::ShowCommand;
pub use signal::SignalCommand;

use uuid::Uuid;

use crate::core::GoalId;
use crate::error::{NudgeError, Result};
use crate::store::GoalStore;

/// Shortest id prefix accepted as a goal reference.
pub const MIN_ID_PREFIX: usize = 4;

/// Resolve a goal reference typed on the command line.
///
/// Accepts a full id, a goal title (case-insensitive, must be unique), or a
/// unique id prefix of at least four characters. A title wins over an id
/// prefix, so a goal called "cafe" is never shadowed by an id starting with
/// those letters.
pub fn resolve_goal(store: &GoalStore, reference: &str) -> Result<GoalId> {
    let reference = reference.trim();
    let goals = store.goals();

    if let Ok(id) = Uuid::parse_str(reference) {
        return goals
            .iter()
            .find(|g| g.id() == id)
            .map(|g| g.id())
            .ok_or_else(|| NudgeError::goal_not_found(id));
    }

    let pick = |matches: Vec<GoalId>, kind: &str| -> Option<Result<GoalId>> {
        match matches.len() {
            0 => None,
            1 => Some(Ok(matches[0])),
            n => Some(Err(NudgeError::invalid_input(
                "goal",
                format!("{} '{}' matches {} goals", kind, reference, n),
            ))),
        }
    };

    let by_title: Vec<GoalId> = goals
        .iter()
        .filter(|g| g.title.eq_ignore_ascii_case(reference))
        .map(|g| g.id())
        .collect();
    if let Some(result) = pick(by_title, "title") {
        return result;
    }

    if reference.len() >= MIN_ID_PREFIX {
        let prefix = reference.to_ascii_lowercase();
        let by_prefix: Vec<GoalId> = goals
            .iter()
            .filter(|g| g.id().to_string().starts_with(&prefix))
            .map(|g| g.id())
            .collect();
        if let Some(result) = pick(by_prefix, "id prefix") {
            return result;
        }
    }

    Err(NudgeError::invalid_input(
        "goal",
        format!("no goal matches '{}'", reference),
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::GoalsConfig;
    use crate::core::GoalDraft;
    use crate::storage::MemoryGoalRepository;
    use crate::store::ManualClock;
    use crate::trigger::RecordingTriggerScheduler;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    /// A store over in-memory fakes, with the clock at 2024-03-01 09:00 UTC.
    pub fn test_store() -> (GoalStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        ));
        let store = GoalStore::open(
            MemoryGoalRepository::new(),
            RecordingTriggerScheduler::new(),
            Arc::clone(&clock),
            GoalsConfig::default(),
        );
        (store, clock)
    }

    #[test]
    fn test_resolve_by_full_id() {
        let (store, _clock) = test_store();
        let id = store.add_goal(&GoalDraft::new("Stretch", 30)).unwrap();

        assert_eq!(resolve_goal(&store, &id.to_string()).unwrap(), id);

        let missing = Uuid::new_v4().to_string();
        assert!(matches!(
            resolve_goal(&store, &missing),
            Err(NudgeError::GoalNotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_by_prefix() {
        let (store, _clock) = test_store();
        let id = store.add_goal(&GoalDraft::new("Stretch", 30)).unwrap();
        let prefix = &id.to_string()[..8];

        assert_eq!(resolve_goal(&store, prefix).unwrap(), id);
        assert_eq!(
            resolve_goal(&store, &prefix.to_ascii_uppercase()).unwrap(),
            id
        );
    }

    #[test]
    fn test_resolve_title_wins_over_id_prefix() {
        let (store, _clock) = test_store();
        let other = store.add_goal(&GoalDraft::new("Stretch", 30)).unwrap();
        let prefix = other.to_string()[..MIN_ID_PREFIX].to_string();
        let titled = store.add_goal(&GoalDraft::new(prefix.clone(), 15)).unwrap();

        assert_eq!(resolve_goal(&store, &prefix).unwrap(), titled);
        assert_eq!(
            resolve_goal(&store, &other.to_string()[..8]).unwrap(),
            other
        );
    }

    #[test]
    fn test_resolve_by_title() {
        let (store, _clock) = test_store();
        let id = store.add_goal(&GoalDraft::new("Stretch", 30)).unwrap();
        store.add_goal(&GoalDraft::new("Walk", 30)).unwrap();

        assert_eq!(resolve_goal(&store, "stretch").unwrap(), id);
        assert!(resolve_goal(&store, "Run").is_err());
    }

    #[test]
    fn test_resolve_ambiguous_title() {
        let (store, _clock) = test_store();
        store.add_goal(&GoalDraft::new("Walk", 30)).unwrap();
        store.add_goal(&GoalDraft::new("walk", 60)).unwrap();

        let err = resolve_goal(&store, "Walk").unwrap_err();
        assert!(err.to_string().contains("matches 2 goals"));
    }
}
