//! The goal store: sole owner and mutator of the goal collection.
//!
//! Every mutation runs inside one critical section: look up the goal, apply
//! the transition, make the trigger call, persist the whole collection.
//! Observers are told afterwards, outside every lock, so they may read the
//! store again or register further observers.
//!
//! Trigger and persistence failures are logged and swallowed. The in-memory
//! state always reflects what the user asked for.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};

use crate::config::GoalsConfig;
use crate::core::{
    Answer, Goal, GoalDraft, GoalId, GoalSchedule, SessionDetail, SessionOverview, TriggerEffect,
};
use crate::error::{FailOpen, NudgeError, Result};
use crate::storage::GoalRepository;
use crate::trigger::{SignalHandler, SignalOutcome, TriggerScheduler, TriggerSignal};

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// What changed in the store. Sent to observers after each mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreChange {
    Added(GoalId),
    Updated(GoalId),
    Removed(GoalId),
}

impl StoreChange {
    pub fn goal_id(&self) -> GoalId {
        match self {
            Self::Added(id) | Self::Updated(id) | Self::Removed(id) => *id,
        }
    }
}

type Observer = Arc<dyn Fn(&StoreChange) + Send + Sync>;

/// Owner of the goal collection.
pub struct GoalStore {
    goals: Mutex<Vec<Goal>>,
    repository: Box<dyn GoalRepository>,
    scheduler: Box<dyn TriggerScheduler>,
    clock: Box<dyn Clock>,
    rules: GoalsConfig,
    observers: RwLock<Vec<Observer>>,
}

impl GoalStore {
    /// Open a store over a repository.
    ///
    /// A repository that cannot be read yields an empty collection. Goals
    /// whose active flag disagrees with their next-fire time are repaired
    /// and the repaired collection is written back.
    pub fn open<R, S, C>(repository: R, scheduler: S, clock: C, rules: GoalsConfig) -> Self
    where
        R: GoalRepository + 'static,
        S: TriggerScheduler + 'static,
        C: Clock + 'static,
    {
        let mut goals = repository.load().fail_open_default("loading goals");

        let now = clock.now();
        let mut repaired = 0usize;
        for goal in goals.iter_mut() {
            if goal.normalize(now) {
                tracing::warn!(
                    goal_id = %goal.id(),
                    active = goal.is_active(),
                    "repaired goal with inconsistent next-fire time"
                );
                repaired += 1;
            }
        }

        let store = Self {
            goals: Mutex::new(goals),
            repository: Box::new(repository),
            scheduler: Box::new(scheduler),
            clock: Box::new(clock),
            rules,
            observers: RwLock::new(Vec::new()),
        };

        if repaired > 0 {
            store.persist(&store.lock());
        }

        tracing::debug!(goals = store.lock().len(), "goal store opened");
        store
    }

    /// Validation rules in effect.
    pub fn rules(&self) -> &GoalsConfig {
        &self.rules
    }

    /// Current time according to the store's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Register a callback run after every mutation.
    pub fn subscribe<F>(&self, observer: F)
    where
        F: Fn(&StoreChange) + Send + Sync + 'static,
    {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(observer));
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Snapshot of all goals in insertion order.
    pub fn goals(&self) -> Vec<Goal> {
        self.lock().clone()
    }

    /// Snapshot of one goal.
    pub fn goal(&self, goal_id: GoalId) -> Option<Goal> {
        self.lock().iter().find(|g| g.id() == goal_id).cloned()
    }

    /// Number of goals.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Pre-filled edit form for a goal, with the interval snapped to the
    /// closest allowed choice.
    pub fn edit_draft(&self, goal_id: GoalId) -> Result<GoalDraft> {
        let goal = self.require(goal_id)?;
        let mut draft = goal.to_draft();
        draft.interval_minutes = self.rules.nearest_interval(draft.interval_minutes);
        Ok(draft)
    }

    /// Sessions of a goal, recomputed from its response log.
    pub fn overview(&self, goal_id: GoalId) -> Result<SessionOverview> {
        let goal = self.require(goal_id)?;
        Ok(SessionOverview::for_goal(&goal))
    }

    /// One session of a goal with its reconstructed timeline.
    pub fn session_detail(&self, goal_id: GoalId, index: usize) -> Result<SessionDetail> {
        let goal = self.require(goal_id)?;
        SessionDetail::for_goal(&goal, index)
    }

    // =========================================================================
    // User mutations
    // =========================================================================

    /// Create a new, inactive goal.
    pub fn add_goal(&self, draft: &GoalDraft) -> Result<GoalId> {
        draft.validate(&self.rules)?;

        let goal = Goal::from_draft(draft);
        let goal_id = goal.id();
        {
            let mut goals = self.lock();
            goals.push(goal);
            self.persist(&goals);
        }

        tracing::info!(goal_id = %goal_id, title = %draft.title.trim(), "added goal");
        self.notify(StoreChange::Added(goal_id));
        Ok(goal_id)
    }

    /// Apply edited fields. An active goal is rescheduled from now.
    pub fn update_goal(&self, goal_id: GoalId, draft: &GoalDraft) -> Result<()> {
        draft.validate(&self.rules)?;

        self.mutate(goal_id, |schedule| Ok(((), schedule.edit(draft))))?;
        tracing::info!(goal_id = %goal_id, interval = draft.interval_minutes, "edited goal");
        Ok(())
    }

    /// Start (or resume) check-ins.
    pub fn start(&self, goal_id: GoalId) -> Result<()> {
        self.mutate(goal_id, |schedule| Ok(((), schedule.start()?)))?;
        tracing::info!(goal_id = %goal_id, "started goal");
        Ok(())
    }

    /// Pause check-ins, closing the current session.
    pub fn pause(&self, goal_id: GoalId) -> Result<()> {
        self.mutate(goal_id, |schedule| Ok(((), schedule.pause()?)))?;
        tracing::info!(goal_id = %goal_id, "paused goal");
        Ok(())
    }

    /// Start if paused, pause if running. Returns whether the goal is now
    /// active.
    pub fn toggle_active(&self, goal_id: GoalId) -> Result<bool> {
        let active = self.mutate(goal_id, |schedule| {
            let effect = schedule.toggle()?;
            Ok((schedule.state().is_active(), effect))
        })?;
        tracing::info!(goal_id = %goal_id, active, "toggled goal");
        Ok(active)
    }

    /// Record an answer at the current time.
    pub fn record_answer(&self, goal_id: GoalId, answer: Answer) -> Result<()> {
        let at = self.clock.now();
        self.mutate(goal_id, |schedule| {
            schedule.record(answer, at)?;
            Ok(((), TriggerEffect::None))
        })?;
        tracing::debug!(goal_id = %goal_id, answer = answer.as_str(), "recorded answer");
        Ok(())
    }

    /// Name a session, or clear its name with a blank title.
    pub fn set_session_title(&self, goal_id: GoalId, index: usize, title: &str) -> Result<()> {
        self.mutate(goal_id, |schedule| {
            schedule.goal_mut().set_session_title(index, title)?;
            Ok(((), TriggerEffect::None))
        })
    }

    /// Remove a goal, cancelling its trigger whatever its state.
    pub fn delete(&self, goal_id: GoalId) -> Result<()> {
        {
            let mut goals = self.lock();
            let position = goals
                .iter()
                .position(|g| g.id() == goal_id)
                .ok_or_else(|| NudgeError::goal_not_found(goal_id))?;

            let effect = GoalSchedule::new(&mut goals[position], self.clock.now()).retire();
            self.apply_effect(&effect);
            goals.remove(position);
            self.persist(&goals);
        }

        tracing::info!(goal_id = %goal_id, "deleted goal");
        self.notify(StoreChange::Removed(goal_id));
        Ok(())
    }

    // =========================================================================
    // External signals
    // =========================================================================

    /// The goal's trigger fired: advance its next-fire time.
    ///
    /// Unknown and paused goals are ignored.
    pub fn handle_fired(&self, goal_id: GoalId) -> SignalOutcome {
        let result = self.mutate(goal_id, |schedule| match schedule.fire() {
            Some(next) => Ok((Some(next), TriggerEffect::None)),
            None => Err(NudgeError::invalid_state("goal is paused")),
        });

        match result {
            Ok(next) => {
                tracing::debug!(goal_id = %goal_id, next_fire_at = ?next, "advanced next fire");
                SignalOutcome::Applied
            }
            Err(NudgeError::InvalidState { .. }) => {
                tracing::debug!(goal_id = %goal_id, "ignoring fired signal for paused goal");
                SignalOutcome::Ignored
            }
            Err(e) => {
                tracing::warn!(goal_id = %goal_id, error = %e, "ignoring fired signal");
                SignalOutcome::Ignored
            }
        }
    }

    /// The user answered a check-in notification.
    pub fn handle_answered(
        &self,
        goal_id: GoalId,
        answer: Answer,
        at: DateTime<Utc>,
    ) -> SignalOutcome {
        let result = self.mutate(goal_id, |schedule| {
            schedule.record(answer, at)?;
            Ok(((), TriggerEffect::None))
        });

        match result {
            Ok(()) => {
                tracing::debug!(goal_id = %goal_id, answer = answer.as_str(), "recorded answer");
                SignalOutcome::Applied
            }
            Err(e) => {
                tracing::warn!(goal_id = %goal_id, error = %e, "ignoring answered signal");
                SignalOutcome::Ignored
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn lock(&self) -> MutexGuard<'_, Vec<Goal>> {
        self.goals.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn require(&self, goal_id: GoalId) -> Result<Goal> {
        self.goal(goal_id)
            .ok_or_else(|| NudgeError::goal_not_found(goal_id))
    }

    /// Run one transition against a goal inside the critical section, then
    /// make its trigger call, persist and notify.
    ///
    /// Nothing is persisted or notified when the transition fails.
    fn mutate<T, F>(&self, goal_id: GoalId, transition: F) -> Result<T>
    where
        F: FnOnce(&mut GoalSchedule<'_>) -> Result<(T, TriggerEffect)>,
    {
        let value = {
            let mut goals = self.lock();
            let now = self.clock.now();
            let goal = goals
                .iter_mut()
                .find(|g| g.id() == goal_id)
                .ok_or_else(|| NudgeError::goal_not_found(goal_id))?;

            let (value, effect) = transition(&mut GoalSchedule::new(goal, now))?;
            self.apply_effect(&effect);
            self.persist(&goals);
            value
        };

        self.notify(StoreChange::Updated(goal_id));
        Ok(value)
    }

    fn apply_effect(&self, effect: &TriggerEffect) {
        match effect {
            TriggerEffect::None => {}
            TriggerEffect::Schedule(request) => {
                self.scheduler
                    .schedule(request)
                    .fail_open_default("scheduling check-in trigger");
            }
            TriggerEffect::Cancel(goal_id) => {
                self.scheduler
                    .cancel(*goal_id)
                    .fail_open_default("cancelling check-in trigger");
            }
            TriggerEffect::Reschedule(request) => {
                self.scheduler
                    .cancel(request.goal_id)
                    .fail_open_default("cancelling check-in trigger");
                self.scheduler
                    .schedule(request)
                    .fail_open_default("rescheduling check-in trigger");
            }
        }
    }

    fn persist(&self, goals: &[Goal]) {
        self.repository
            .save(goals)
            .fail_open_default("saving goals");
    }

    fn notify(&self, change: StoreChange) {
        // Snapshot so callbacks run unlocked and may subscribe themselves.
        let observers: Vec<Observer> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in &observers {
            observer(&change);
        }
    }
}

impl SignalHandler for GoalStore {
    fn handle_signal(&self, signal: TriggerSignal) -> SignalOutcome {
        match signal {
            TriggerSignal::Fired { goal_id } => self.handle_fired(goal_id),
            TriggerSignal::Answered {
                goal_id,
                answer,
                at,
            } => self.handle_answered(goal_id, answer, at),
        }
    }
}

impl std::fmt::Debug for GoalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoalStore")
            .field("goals", &self.len())
            .field("rules", &self.rules)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{session_count, ScheduleState, SessionOutcome, TimelineEntry};
    use crate::storage::MemoryGoalRepository;
    use crate::trigger::{
        RecordingTriggerScheduler, SignalDispatcher, TriggerCall, TriggerRequest,
    };
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    struct Harness {
        store: Arc<GoalStore>,
        repo: Arc<MemoryGoalRepository>,
        scheduler: Arc<RecordingTriggerScheduler>,
        clock: Arc<ManualClock>,
    }

    fn harness_with(repo: MemoryGoalRepository) -> Harness {
        let repo = Arc::new(repo);
        let scheduler = Arc::new(RecordingTriggerScheduler::new());
        let clock = Arc::new(ManualClock::new(t0()));
        let store = Arc::new(GoalStore::open(
            Arc::clone(&repo),
            Arc::clone(&scheduler),
            Arc::clone(&clock),
            GoalsConfig::default(),
        ));
        Harness {
            store,
            repo,
            scheduler,
            clock,
        }
    }

    fn harness() -> Harness {
        harness_with(MemoryGoalRepository::new())
    }

    fn add(h: &Harness, title: &str, interval: u32) -> GoalId {
        h.store.add_goal(&GoalDraft::new(title, interval)).unwrap()
    }

    #[test]
    fn test_add_goal_starts_inactive_and_persists() {
        let h = harness();
        let id = add(&h, "  Drink water ", 15);

        let goal = h.store.goal(id).unwrap();
        assert_eq!(goal.title, "Drink water");
        assert!(!goal.is_active());
        assert!(goal.next_fire_at().is_none());
        assert_eq!(goal.success_threshold, 80);

        assert_eq!(h.repo.save_count(), 1);
        assert_eq!(h.repo.load().unwrap(), vec![goal]);
        assert!(h.scheduler.calls().is_empty());
    }

    #[test]
    fn test_add_goal_rejects_invalid_draft() {
        let h = harness();

        let err = h.store.add_goal(&GoalDraft::new("", 15)).unwrap_err();
        assert!(err.is_user_facing());
        let err = h.store.add_goal(&GoalDraft::new("Walk", 7)).unwrap_err();
        assert!(matches!(err, NudgeError::InvalidInput { .. }));

        assert!(h.store.is_empty());
        assert_eq!(h.repo.save_count(), 0);
    }

    #[test]
    fn test_start_schedules_trigger() {
        let h = harness();
        let id = add(&h, "Stand up", 15);

        h.store.start(id).unwrap();

        let goal = h.store.goal(id).unwrap();
        assert_eq!(goal.next_fire_at(), Some(t0() + Duration::minutes(15)));
        assert_eq!(
            h.scheduler.calls(),
            vec![TriggerCall::Schedule(TriggerRequest::for_goal(&goal))]
        );
        assert_eq!(h.scheduler.pending(), vec![id]);
        assert!(h.repo.load().unwrap()[0].is_active());
    }

    #[test]
    fn test_start_twice_is_rejected_without_side_effects() {
        let h = harness();
        let id = add(&h, "Stand up", 15);
        h.store.start(id).unwrap();
        let saves = h.repo.save_count();

        let err = h.store.start(id).unwrap_err();
        assert!(matches!(err, NudgeError::InvalidState { .. }));
        assert_eq!(h.scheduler.calls().len(), 1);
        assert_eq!(h.repo.save_count(), saves);
    }

    #[test]
    fn test_pause_with_no_responses() {
        let h = harness();
        let id = add(&h, "Stand up", 15);
        h.store.start(id).unwrap();
        h.clock.advance(Duration::minutes(3));

        h.store.pause(id).unwrap();

        let goal = h.store.goal(id).unwrap();
        assert!(!goal.is_active());
        assert!(goal.next_fire_at().is_none());
        assert_eq!(goal.responses().len(), 1);
        assert_eq!(goal.responses()[0].answer, Answer::SessionEnd);
        assert_eq!(session_count(goal.responses()), 0);
        assert_eq!(h.scheduler.last_call(), Some(TriggerCall::Cancel(id)));
        assert!(h.scheduler.pending().is_empty());
    }

    #[test]
    fn test_pause_inactive_is_rejected() {
        let h = harness();
        let id = add(&h, "Stand up", 15);
        assert!(matches!(
            h.store.pause(id),
            Err(NudgeError::InvalidState { .. })
        ));
        assert!(h.store.goal(id).unwrap().responses().is_empty());
    }

    #[test]
    fn test_toggle_active() {
        let h = harness();
        let id = add(&h, "Stand up", 15);

        assert!(h.store.toggle_active(id).unwrap());
        assert!(!h.store.toggle_active(id).unwrap());
        assert!(h.store.toggle_active(id).unwrap());
        assert!(h.store.goal(id).unwrap().is_consistent());
    }

    #[test]
    fn test_unknown_goal_is_not_found() {
        let h = harness();
        let missing = GoalId::new_v4();

        assert!(matches!(
            h.store.start(missing),
            Err(NudgeError::GoalNotFound { .. })
        ));
        assert!(matches!(
            h.store.delete(missing),
            Err(NudgeError::GoalNotFound { .. })
        ));
        assert!(matches!(
            h.store.overview(missing),
            Err(NudgeError::GoalNotFound { .. })
        ));
        assert!(h.scheduler.calls().is_empty());
    }

    #[test]
    fn test_sessions_scenario() {
        let h = harness();
        let id = add(&h, "Posture", 15);
        h.store.start(id).unwrap();

        h.store.record_answer(id, Answer::Yes).unwrap();
        h.clock.advance(Duration::minutes(15));
        h.store.record_answer(id, Answer::No).unwrap();
        h.clock.advance(Duration::minutes(15));
        h.store.pause(id).unwrap();
        h.clock.advance(Duration::minutes(15));
        h.store.start(id).unwrap();
        h.store.record_answer(id, Answer::Yes).unwrap();

        let overview = h.store.overview(id).unwrap();
        assert_eq!(overview.sessions.len(), 2);
        assert_eq!(overview.sessions[0].yes_ratio, 0.5);
        assert_eq!(overview.sessions[0].outcome, SessionOutcome::NotMet);
        assert!(!overview.sessions[0].is_active);
        assert_eq!(overview.sessions[1].yes_ratio, 1.0);
        assert!(overview.sessions[1].is_active);

        h.store.pause(id).unwrap();
        let overview = h.store.overview(id).unwrap();
        assert!(!overview.sessions[1].is_active);
    }

    #[test]
    fn test_active_goal_without_sessions() {
        let h = harness();
        let id = add(&h, "Posture", 15);
        h.store.start(id).unwrap();

        let overview = h.store.overview(id).unwrap();
        assert!(overview.is_empty());
        assert!(overview.awaiting_first_response);
    }

    #[test]
    fn test_session_detail_infers_missed_check_in() {
        let h = harness();
        let id = add(&h, "Blink", 5);
        h.store.start(id).unwrap();
        h.store.record_answer(id, Answer::Yes).unwrap();
        h.clock.advance(Duration::minutes(20));
        h.store.record_answer(id, Answer::Yes).unwrap();

        let detail = h.store.session_detail(id, 0).unwrap();
        assert_eq!(detail.missed_count, 1);
        assert_eq!(
            detail.timeline[1],
            TimelineEntry::Missed {
                timestamp: t0() + Duration::minutes(5)
            }
        );

        assert!(matches!(
            h.store.session_detail(id, 1),
            Err(NudgeError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_edit_active_goal_restarts_cadence() {
        let h = harness();
        let id = add(&h, "Stand up", 15);
        h.store.start(id).unwrap();
        h.clock.advance(Duration::minutes(10));
        h.scheduler.clear();

        h.store
            .update_goal(id, &GoalDraft::new("Stand up often", 30).with_threshold(60))
            .unwrap();

        let goal = h.store.goal(id).unwrap();
        assert_eq!(goal.title, "Stand up often");
        assert_eq!(goal.success_threshold, 60);
        assert_eq!(
            goal.next_fire_at(),
            Some(t0() + Duration::minutes(10) + Duration::minutes(30))
        );
        assert_eq!(
            h.scheduler.calls(),
            vec![
                TriggerCall::Cancel(id),
                TriggerCall::Schedule(TriggerRequest::for_goal(&goal)),
            ]
        );
    }

    #[test]
    fn test_edit_inactive_goal_makes_no_trigger_call() {
        let h = harness();
        let id = add(&h, "Stand up", 15);

        h.store.update_goal(id, &GoalDraft::new("Sit down", 60)).unwrap();

        assert_eq!(h.store.goal(id).unwrap().interval_minutes, 60);
        assert!(h.scheduler.calls().is_empty());
    }

    #[test]
    fn test_edit_rejects_invalid_draft() {
        let h = harness();
        let id = add(&h, "Stand up", 15);

        assert!(h.store.update_goal(id, &GoalDraft::new(" ", 15)).is_err());
        assert_eq!(h.store.goal(id).unwrap().title, "Stand up");
    }

    #[test]
    fn test_edit_draft_snaps_interval() {
        let repo = MemoryGoalRepository::new();
        repo.save(&[Goal::new("Legacy", 45)]).unwrap();
        let h = harness_with(repo);
        let id = h.store.goals()[0].id();

        let draft = h.store.edit_draft(id).unwrap();
        assert_eq!(draft.title, "Legacy");
        assert_eq!(draft.interval_minutes, 30);
    }

    #[test]
    fn test_delete_cancels_even_when_inactive() {
        let h = harness();
        let id = add(&h, "Stand up", 15);

        h.store.delete(id).unwrap();

        assert!(h.store.goal(id).is_none());
        assert_eq!(h.scheduler.calls(), vec![TriggerCall::Cancel(id)]);
        assert!(h.repo.load().unwrap().is_empty());
    }

    #[test]
    fn test_fired_advances_from_previous_next_fire() {
        let h = harness();
        let id = add(&h, "Stand up", 15);
        h.store.start(id).unwrap();
        h.clock.advance(Duration::minutes(16));

        assert_eq!(h.store.handle_fired(id), SignalOutcome::Applied);

        let goal = h.store.goal(id).unwrap();
        assert_eq!(goal.next_fire_at(), Some(t0() + Duration::minutes(30)));
        assert!(goal.responses().is_empty());
    }

    #[test]
    fn test_late_fired_signal_for_paused_goal_is_noop() {
        let h = harness();
        let id = add(&h, "Stand up", 15);
        h.store.start(id).unwrap();
        h.store.pause(id).unwrap();
        let before = h.store.goal(id).unwrap();
        let saves = h.repo.save_count();

        assert_eq!(h.store.handle_fired(id), SignalOutcome::Ignored);

        assert_eq!(h.store.goal(id).unwrap(), before);
        assert_eq!(
            ScheduleState::of(&before),
            ScheduleState::Inactive
        );
        assert_eq!(h.repo.save_count(), saves);
    }

    #[test]
    fn test_signals_for_deleted_goal_are_ignored() {
        let h = harness();
        let id = add(&h, "Stand up", 15);
        h.store.delete(id).unwrap();

        assert_eq!(h.store.handle_fired(id), SignalOutcome::Ignored);
        assert_eq!(
            h.store.handle_answered(id, Answer::Yes, t0()),
            SignalOutcome::Ignored
        );
    }

    #[test]
    fn test_late_answer_on_paused_goal_is_recorded() {
        let h = harness();
        let id = add(&h, "Stand up", 15);
        h.store.start(id).unwrap();
        h.store.pause(id).unwrap();
        h.clock.advance(Duration::minutes(1));

        let outcome = h.store.handle_answered(id, Answer::No, h.store.now());
        assert_eq!(outcome, SignalOutcome::Applied);

        let goal = h.store.goal(id).unwrap();
        assert_eq!(goal.responses().last().unwrap().answer, Answer::No);
        assert!(!goal.is_active());
    }

    #[test]
    fn test_answered_session_end_is_ignored() {
        let h = harness();
        let id = add(&h, "Stand up", 15);
        assert_eq!(
            h.store.handle_answered(id, Answer::SessionEnd, t0()),
            SignalOutcome::Ignored
        );
        assert!(h.store.goal(id).unwrap().responses().is_empty());
    }

    #[test]
    fn test_signals_through_dispatcher() {
        let h = harness();
        let id = add(&h, "Stand up", 15);
        h.store.start(id).unwrap();

        let dispatcher = SignalDispatcher::new();
        dispatcher.register(&h.store);

        assert_eq!(
            dispatcher.dispatch(TriggerSignal::from_action(id, "YES_ACTION", t0())),
            SignalOutcome::Applied
        );
        assert_eq!(
            dispatcher.dispatch(TriggerSignal::fired(id)),
            SignalOutcome::Applied
        );

        let goal = h.store.goal(id).unwrap();
        assert_eq!(goal.responses()[0].answer, Answer::Yes);
        assert_eq!(goal.next_fire_at(), Some(t0() + Duration::minutes(30)));

        let Harness { store, .. } = h;
        drop(store);
        assert_eq!(
            dispatcher.dispatch(TriggerSignal::fired(id)),
            SignalOutcome::Dropped
        );
    }

    #[test]
    fn test_scheduler_failure_keeps_user_intent() {
        let h = harness();
        let id = add(&h, "Stand up", 15);
        h.scheduler.set_failing(true);

        h.store.start(id).unwrap();

        let goal = h.store.goal(id).unwrap();
        assert!(goal.is_active());
        assert!(goal.next_fire_at().is_some());
        assert!(h.repo.load().unwrap()[0].is_active());
    }

    #[test]
    fn test_persistence_failure_keeps_memory_authoritative() {
        let h = harness();
        let id = add(&h, "Stand up", 15);
        h.repo.set_failing(true);

        h.store.start(id).unwrap();

        assert!(h.store.goal(id).unwrap().is_active());
        assert!(!h.repo.load().unwrap()[0].is_active());
    }

    #[test]
    fn test_open_with_malformed_storage_starts_empty() {
        let h = harness_with(MemoryGoalRepository::with_raw("definitely not json"));
        assert!(h.store.is_empty());

        add(&h, "Fresh start", 15);
        assert_eq!(h.repo.load().unwrap().len(), 1);
    }

    #[test]
    fn test_open_repairs_inconsistent_goals() {
        let raw = r#"[
            {"id": "6f1c1a44-9a8e-4a3e-9f5e-2d1b7c0e4a11", "title": "Read",
             "interval_minutes": 30, "is_active": true},
            {"id": "7a2d2b55-0b9f-4b4f-8a6f-3e2c8d1f5b22", "title": "Walk",
             "interval_minutes": 60, "next_fire_at": "2024-03-01T08:00:00Z"}
        ]"#;
        let h = harness_with(MemoryGoalRepository::with_raw(raw));

        let goals = h.store.goals();
        assert_eq!(goals[0].next_fire_at(), Some(t0() + Duration::minutes(30)));
        assert!(goals[1].next_fire_at().is_none());
        assert!(goals.iter().all(Goal::is_consistent));
        assert_eq!(h.repo.save_count(), 1);
    }

    #[test]
    fn test_open_consistent_goals_does_not_write() {
        let repo = MemoryGoalRepository::new();
        repo.save(&[Goal::new("Read", 30)]).unwrap();
        let h = harness_with(repo);

        assert_eq!(h.store.len(), 1);
        assert_eq!(h.repo.save_count(), 1);
    }

    #[test]
    fn test_set_session_title() {
        let h = harness();
        let id = add(&h, "Posture", 15);
        h.store.start(id).unwrap();
        h.store.record_answer(id, Answer::Yes).unwrap();
        h.store.pause(id).unwrap();

        h.store.set_session_title(id, 0, "  Monday  ").unwrap();
        let overview = h.store.overview(id).unwrap();
        assert_eq!(overview.sessions[0].title, "Monday");
        assert!(overview.sessions[0].custom_title);

        h.store.set_session_title(id, 0, "   ").unwrap();
        assert!(h.store.goal(id).unwrap().session_title(0).is_none());
        assert_eq!(h.store.overview(id).unwrap().sessions[0].title, "Session 1");

        let err = h.store.set_session_title(id, 1, "Tuesday").unwrap_err();
        assert!(matches!(err, NudgeError::InvalidInput { ref field, .. } if field == "session"));
    }

    #[test]
    fn test_observers_are_notified_after_mutations() {
        let h = harness();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        h.store
            .subscribe(move |change| sink.lock().unwrap().push(*change));

        let id = add(&h, "Stand up", 15);
        h.store.start(id).unwrap();
        let _ = h.store.pause(id);
        let _ = h.store.pause(id);
        h.store.delete(id).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                StoreChange::Added(id),
                StoreChange::Updated(id),
                StoreChange::Updated(id),
                StoreChange::Removed(id),
            ]
        );
    }

    #[test]
    fn test_observer_may_read_store() {
        let h = harness();
        let reads = Arc::new(AtomicUsize::new(0));
        let store = Arc::downgrade(&h.store);
        let counter = Arc::clone(&reads);
        h.store.subscribe(move |_| {
            if let Some(store) = store.upgrade() {
                counter.fetch_add(store.len(), Ordering::SeqCst);
            }
        });

        add(&h, "Stand up", 15);
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_observer_may_subscribe_from_callback() {
        let h = harness();
        let late_calls = Arc::new(AtomicUsize::new(0));
        let store = Arc::downgrade(&h.store);
        let counter = Arc::clone(&late_calls);
        h.store.subscribe(move |_| {
            if let Some(store) = store.upgrade() {
                let counter = Arc::clone(&counter);
                store.subscribe(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        add(&h, "Stand up", 15);
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);

        add(&h, "Drink water", 15);
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_signals_are_serialized() {
        let h = harness();
        let id = add(&h, "Stand up", 1);
        h.store.start(id).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&h.store);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        if i % 2 == 0 {
                            store.handle_fired(id);
                        } else {
                            store.handle_answered(id, Answer::Yes, t0());
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let goal = h.store.goal(id).unwrap();
        assert_eq!(goal.responses().len(), 100);
        assert_eq!(
            goal.next_fire_at(),
            Some(t0() + Duration::minutes(1) + Duration::minutes(100))
        );
    }
}
