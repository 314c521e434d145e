//! Timer engine for the Flow timer.
//!
//! This module provides the core timer functionality:
//! - Work / short break / long break sequencing
//! - Countdown with a 1 Hz `tokio::time::interval_at` task
//! - Change notifications for collaborators via [`TimerEngine::subscribe`]
//!
//! The engine never starts itself. Resuming after a phase completes is the
//! job of the completion listener (see `daemon::completion`).

use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use crate::settings::SharedSettings;
use crate::types::{TimerPhase, TimerSetup, TimerSnapshot, TimerState};

/// Interval between countdown ticks.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

// ============================================================================
// TimerEvent
// ============================================================================

/// Observable fields of the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateField {
    Phase,
    TimeRemaining,
    Running,
    CompletedSessions,
}

impl StateField {
    /// Returns the fields that differ between two states.
    pub fn changed_between(before: &TimerState, after: &TimerState) -> Vec<StateField> {
        let mut changed = Vec::new();
        if before.phase != after.phase {
            changed.push(StateField::Phase);
        }
        if before.remaining_seconds != after.remaining_seconds {
            changed.push(StateField::TimeRemaining);
        }
        if before.is_running != after.is_running {
            changed.push(StateField::Running);
        }
        if before.completed_sessions != after.completed_sessions {
            changed.push(StateField::CompletedSessions);
        }
        changed
    }
}

/// Details of a phase transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseCompletion {
    /// Phase that just ended
    pub finished: TimerPhase,
    /// Phase the timer moved to
    pub next: TimerPhase,
    /// Completed work sessions after the transition
    pub completed_sessions: u32,
    /// True when the countdown ran out, false for a skip
    pub natural: bool,
    /// True when the completion sound should play
    pub chime: bool,
    /// Engine revision right after the transition
    pub revision: u64,
}

/// Timer events delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum TimerEvent {
    /// One or more observable fields changed
    StateChanged {
        /// Fields that changed
        changed: Vec<StateField>,
        /// State after the change
        snapshot: TimerSnapshot,
    },
    /// A phase ended and the next one was entered
    PhaseCompleted(PhaseCompletion),
}

/// Selects which events a subscriber receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFilter {
    /// Every event
    All,
    /// State changes touching any of the given fields
    Fields(Vec<StateField>),
    /// Phase completions only
    PhaseCompleted,
}

impl EventFilter {
    /// Returns true if `event` passes the filter.
    pub fn accepts(&self, event: &TimerEvent) -> bool {
        match (self, event) {
            (EventFilter::All, _) => true,
            (EventFilter::Fields(fields), TimerEvent::StateChanged { changed, .. }) => {
                changed.iter().any(|field| fields.contains(field))
            }
            (EventFilter::PhaseCompleted, TimerEvent::PhaseCompleted(_)) => true,
            _ => false,
        }
    }
}

// ============================================================================
// TimerEngine
// ============================================================================

struct Subscriber {
    filter: EventFilter,
    tx: mpsc::UnboundedSender<TimerEvent>,
}

struct EngineCore {
    state: TimerState,
    ticker: Option<JoinHandle<()>>,
    /// Bumped whenever the tick task is replaced or cancelled.
    generation: u64,
    /// Bumped by every operation that may mutate the state.
    revision: u64,
    subscribers: Vec<Subscriber>,
}

impl EngineCore {
    fn publish(&mut self, event: TimerEvent) {
        self.subscribers.retain(|subscriber| {
            if subscriber.tx.is_closed() {
                return false;
            }
            if !subscriber.filter.accepts(&event) {
                return true;
            }
            subscriber.tx.send(event.clone()).is_ok()
        });
    }

    fn publish_changes(&mut self, before: &TimerState, setup: &TimerSetup) {
        let changed = StateField::changed_between(before, &self.state);
        if changed.is_empty() {
            return;
        }
        let snapshot = TimerSnapshot::capture(&self.state, setup);
        self.publish(TimerEvent::StateChanged { changed, snapshot });
    }

    fn bump_revision(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn cancel_ticker(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

/// Settings the engine consults on each operation.
struct Tunables {
    setup: TimerSetup,
    play_sound_on_complete: bool,
}

struct Shared {
    core: Mutex<EngineCore>,
    settings: SharedSettings,
    tick_period: Duration,
}

/// Handle to the timer state machine.
///
/// Cloning is cheap; all clones drive the same timer.
#[derive(Clone)]
pub struct TimerEngine {
    shared: Arc<Shared>,
}

impl TimerEngine {
    /// Creates a paused engine in the Work phase with a full countdown.
    pub async fn new(settings: SharedSettings) -> Self {
        Self::with_tick_period(settings, TICK_PERIOD).await
    }

    /// Creates an engine whose countdown ticks every `tick_period`.
    pub async fn with_tick_period(settings: SharedSettings, tick_period: Duration) -> Self {
        let setup = settings.read().await.current_setup();

        Self {
            shared: Arc::new(Shared {
                core: Mutex::new(EngineCore {
                    state: TimerState::new(&setup),
                    ticker: None,
                    generation: 0,
                    revision: 0,
                    subscribers: Vec::new(),
                }),
                settings,
                tick_period,
            }),
        }
    }

    /// Returns the settings handle the engine reads durations from.
    pub fn settings(&self) -> &SharedSettings {
        &self.shared.settings
    }

    /// Registers a subscriber and returns its event stream.
    ///
    /// The subscription ends when the receiver is dropped.
    pub async fn subscribe(&self, filter: EventFilter) -> mpsc::UnboundedReceiver<TimerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared
            .core
            .lock()
            .await
            .subscribers
            .push(Subscriber { filter, tx });
        rx
    }

    /// Returns the current state with derived values.
    pub async fn snapshot(&self) -> TimerSnapshot {
        let core = self.shared.core.lock().await;
        let tunables = self.tunables().await;
        TimerSnapshot::capture(&core.state, &tunables.setup)
    }

    /// Returns a copy of the raw state.
    pub async fn state(&self) -> TimerState {
        self.shared.core.lock().await.state.clone()
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    /// Starts the countdown. Does nothing if already running.
    pub async fn start(&self) {
        let mut core = self.shared.core.lock().await;
        let tunables = self.tunables().await;
        core.bump_revision();
        self.start_locked(&mut core, &tunables);
    }

    /// Pauses the countdown. Does nothing if already paused.
    pub async fn pause(&self) {
        let mut core = self.shared.core.lock().await;
        let tunables = self.tunables().await;
        core.bump_revision();
        Self::pause_locked(&mut core, &tunables);
    }

    /// Pauses if running, otherwise starts.
    pub async fn toggle(&self) {
        let mut core = self.shared.core.lock().await;
        let tunables = self.tunables().await;
        core.bump_revision();
        if core.state.is_running {
            Self::pause_locked(&mut core, &tunables);
        } else {
            self.start_locked(&mut core, &tunables);
        }
    }

    /// Pauses and refills the current phase. Phase and session count are kept.
    pub async fn reset(&self) {
        let mut core = self.shared.core.lock().await;
        let tunables = self.tunables().await;

        core.bump_revision();
        let before = core.state.clone();
        core.cancel_ticker();
        core.state.is_running = false;
        core.state.reset_countdown(&tunables.setup);

        tracing::info!(phase = core.state.phase.as_str(), "timer reset");
        core.publish_changes(&before, &tunables.setup);
    }

    /// Pauses and moves to the next phase without the completion sound.
    pub async fn skip(&self) {
        let mut core = self.shared.core.lock().await;
        let tunables = self.tunables().await;
        core.bump_revision();
        let before = core.state.clone();
        Self::complete_phase(&mut core, &tunables, before, false);
    }

    /// Advances the countdown by one second if running.
    ///
    /// Reaching zero completes the phase and leaves the timer paused.
    pub async fn tick(&self) {
        let mut core = self.shared.core.lock().await;
        if !core.state.is_running {
            return;
        }
        let tunables = self.tunables().await;
        core.bump_revision();
        Self::tick_locked(&mut core, &tunables);
    }

    /// Recomputes a paused countdown from the current durations.
    ///
    /// A running countdown is left untouched so changes never cut a session
    /// short.
    pub async fn update_from_settings(&self) {
        let mut core = self.shared.core.lock().await;
        if core.state.is_running {
            return;
        }
        let tunables = self.tunables().await;

        core.bump_revision();
        let before = core.state.clone();
        core.state.reset_countdown(&tunables.setup);
        core.publish_changes(&before, &tunables.setup);
    }

    /// Starts the phase announced by `completion` if nothing happened since.
    ///
    /// Returns false when any operation ran after the transition, the phase
    /// differs or the timer is already running.
    pub async fn start_after(&self, completion: &PhaseCompletion) -> bool {
        let mut core = self.shared.core.lock().await;
        if core.revision != completion.revision
            || core.state.phase != completion.next
            || core.state.is_running
        {
            return false;
        }
        let tunables = self.tunables().await;
        core.bump_revision();
        self.start_locked(&mut core, &tunables);
        true
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    async fn tunables(&self) -> Tunables {
        let settings = self.shared.settings.read().await;
        Tunables {
            setup: settings.current_setup(),
            play_sound_on_complete: settings.play_sound_on_complete(),
        }
    }

    fn start_locked(&self, core: &mut EngineCore, tunables: &Tunables) {
        if core.state.is_running {
            return;
        }

        let before = core.state.clone();
        core.cancel_ticker();
        core.state.is_running = true;
        core.ticker = Some(spawn_ticker(
            Arc::downgrade(&self.shared),
            core.generation,
            self.shared.tick_period,
        ));

        tracing::info!(
            phase = core.state.phase.as_str(),
            remaining = core.state.remaining_seconds,
            "timer started"
        );
        core.publish_changes(&before, &tunables.setup);
    }

    fn pause_locked(core: &mut EngineCore, tunables: &Tunables) {
        core.cancel_ticker();
        if !core.state.is_running {
            return;
        }

        let before = core.state.clone();
        core.state.is_running = false;

        tracing::info!(remaining = core.state.remaining_seconds, "timer paused");
        core.publish_changes(&before, &tunables.setup);
    }

    fn tick_locked(core: &mut EngineCore, tunables: &Tunables) {
        let before = core.state.clone();
        if core.state.tick() {
            Self::complete_phase(core, tunables, before, true);
        } else {
            core.publish_changes(&before, &tunables.setup);
        }
    }

    fn complete_phase(core: &mut EngineCore, tunables: &Tunables, before: TimerState, natural: bool) {
        core.cancel_ticker();
        core.state.is_running = false;

        let finished = core.state.advance(&tunables.setup);
        let completion = PhaseCompletion {
            finished,
            next: core.state.phase,
            completed_sessions: core.state.completed_sessions,
            natural,
            chime: natural && tunables.play_sound_on_complete,
            revision: core.revision,
        };

        tracing::info!(
            finished = finished.as_str(),
            next = completion.next.as_str(),
            completed_sessions = completion.completed_sessions,
            natural,
            "phase completed"
        );

        core.publish_changes(&before, &tunables.setup);
        core.publish(TimerEvent::PhaseCompleted(completion));
    }

    /// Runs one scheduled tick. Returns false once the task should stop.
    async fn scheduled_tick(&self, generation: u64) -> bool {
        let mut core = self.shared.core.lock().await;
        if core.generation != generation || !core.state.is_running {
            return false;
        }
        let tunables = self.tunables().await;
        core.bump_revision();
        // Completing a phase aborts this task, so nothing below may await.
        Self::tick_locked(&mut core, &tunables);
        core.state.is_running
    }
}

fn spawn_ticker(shared: Weak<Shared>, generation: u64, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let Some(shared) = shared.upgrade() else {
                break;
            };
            if !(TimerEngine { shared }).scheduled_tick(generation).await {
                break;
            }
        }

        tracing::debug!(generation, "tick task finished");
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingsStore;
    use crate::types::TimerSetup;
    use tokio::time::sleep;

    async fn create_engine() -> TimerEngine {
        TimerEngine::new(SettingsStore::in_memory().into_shared()).await
    }

    /// Drives the running countdown to zero through direct ticks.
    async fn run_out(engine: &TimerEngine) {
        engine.start().await;
        let phase = engine.state().await.phase;
        while engine.state().await.phase == phase {
            engine.tick().await;
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<TimerEvent>) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    // ------------------------------------------------------------------------
    // EventFilter Tests
    // ------------------------------------------------------------------------

    mod event_filter_tests {
        use super::*;

        fn state_changed(changed: Vec<StateField>) -> TimerEvent {
            let setup = TimerSetup::new(25, 5, 15, 4);
            TimerEvent::StateChanged {
                changed,
                snapshot: TimerSnapshot::capture(&TimerState::new(&setup), &setup),
            }
        }

        fn completion() -> TimerEvent {
            TimerEvent::PhaseCompleted(PhaseCompletion {
                finished: TimerPhase::Work,
                next: TimerPhase::ShortBreak,
                completed_sessions: 1,
                natural: true,
                chime: true,
                revision: 1,
            })
        }

        #[test]
        fn test_all_accepts_everything() {
            assert!(EventFilter::All.accepts(&completion()));
            assert!(EventFilter::All.accepts(&state_changed(vec![StateField::Running])));
        }

        #[test]
        fn test_fields_filter() {
            let filter = EventFilter::Fields(vec![StateField::Phase, StateField::Running]);

            assert!(filter.accepts(&state_changed(vec![StateField::Running])));
            assert!(filter.accepts(&state_changed(vec![
                StateField::TimeRemaining,
                StateField::Phase
            ])));
            assert!(!filter.accepts(&state_changed(vec![StateField::TimeRemaining])));
            assert!(!filter.accepts(&completion()));
        }

        #[test]
        fn test_phase_completed_filter() {
            assert!(EventFilter::PhaseCompleted.accepts(&completion()));
            assert!(!EventFilter::PhaseCompleted.accepts(&state_changed(vec![StateField::Phase])));
        }

        #[test]
        fn test_changed_between() {
            let setup = TimerSetup::new(25, 5, 15, 4);
            let before = TimerState::new(&setup);
            let mut after = before.clone();
            assert!(StateField::changed_between(&before, &after).is_empty());

            after.advance(&setup);
            assert_eq!(
                StateField::changed_between(&before, &after),
                vec![
                    StateField::Phase,
                    StateField::TimeRemaining,
                    StateField::CompletedSessions
                ]
            );
        }
    }

    // ------------------------------------------------------------------------
    // TimerEngine Tests
    // ------------------------------------------------------------------------

    mod timer_engine_tests {
        use super::*;

        #[tokio::test]
        async fn test_initial_state() {
            let engine = create_engine().await;
            let snapshot = engine.snapshot().await;

            assert_eq!(snapshot.phase, TimerPhase::Work);
            assert_eq!(snapshot.remaining_seconds, 1500);
            assert!(!snapshot.is_running);
            assert_eq!(snapshot.completed_sessions, 0);
            assert_eq!(snapshot.formatted_time, "25:00");
            assert_eq!(snapshot.progress, 0.0);
        }

        #[tokio::test]
        async fn test_initial_state_uses_stored_durations() {
            let mut store = SettingsStore::in_memory();
            store.set_work_duration(50).unwrap();

            let engine = TimerEngine::new(store.into_shared()).await;

            assert_eq!(engine.state().await.remaining_seconds, 3000);
        }

        #[tokio::test(start_paused = true)]
        async fn test_start_and_pause() {
            let engine = create_engine().await;

            engine.start().await;
            assert!(engine.state().await.is_running);

            engine.pause().await;
            assert!(!engine.state().await.is_running);

            engine.pause().await;
            assert!(!engine.state().await.is_running);
        }

        #[tokio::test(start_paused = true)]
        async fn test_start_is_idempotent() {
            let engine = create_engine().await;
            let mut rx = engine.subscribe(EventFilter::All).await;

            engine.start().await;
            engine.start().await;

            assert_eq!(drain(&mut rx).len(), 1);

            sleep(Duration::from_millis(3500)).await;
            assert_eq!(engine.state().await.remaining_seconds, 1497);
        }

        #[tokio::test(start_paused = true)]
        async fn test_toggle() {
            let engine = create_engine().await;

            engine.toggle().await;
            assert!(engine.state().await.is_running);

            engine.toggle().await;
            assert!(!engine.state().await.is_running);
        }

        #[tokio::test]
        async fn test_tick_while_paused_is_noop() {
            let engine = create_engine().await;

            engine.tick().await;

            assert_eq!(engine.state().await.remaining_seconds, 1500);
        }

        #[tokio::test(start_paused = true)]
        async fn test_tick_decrements() {
            let engine = create_engine().await;
            engine.start().await;

            engine.tick().await;
            engine.tick().await;

            let snapshot = engine.snapshot().await;
            assert_eq!(snapshot.remaining_seconds, 1498);
            assert_eq!(snapshot.formatted_time, "24:58");
        }

        #[tokio::test(start_paused = true)]
        async fn test_reset_keeps_phase_and_sessions() {
            let engine = create_engine().await;
            run_out(&engine).await;
            engine.start().await;
            engine.tick().await;

            engine.reset().await;

            let state = engine.state().await;
            assert_eq!(state.phase, TimerPhase::ShortBreak);
            assert_eq!(state.completed_sessions, 1);
            assert_eq!(state.remaining_seconds, 300);
            assert!(!state.is_running);
        }

        #[tokio::test(start_paused = true)]
        async fn test_skip_leaves_timer_paused() {
            let engine = create_engine().await;
            engine.start().await;

            engine.skip().await;

            let state = engine.state().await;
            assert_eq!(state.phase, TimerPhase::ShortBreak);
            assert_eq!(state.completed_sessions, 1);
            assert_eq!(state.remaining_seconds, 300);
            assert!(!state.is_running);
        }

        #[tokio::test(start_paused = true)]
        async fn test_natural_completion_pauses() {
            let engine = create_engine().await;

            run_out(&engine).await;

            let state = engine.state().await;
            assert_eq!(state.phase, TimerPhase::ShortBreak);
            assert_eq!(state.remaining_seconds, 300);
            assert!(!state.is_running);
        }

        #[tokio::test(start_paused = true)]
        async fn test_four_session_cycle() {
            let engine = create_engine().await;

            for _ in 0..3 {
                run_out(&engine).await;
                assert_eq!(engine.state().await.phase, TimerPhase::ShortBreak);
                run_out(&engine).await;
                assert_eq!(engine.state().await.phase, TimerPhase::Work);
            }
            assert_eq!(engine.state().await.completed_sessions, 3);

            run_out(&engine).await;
            let state = engine.state().await;
            assert_eq!(state.phase, TimerPhase::LongBreak);
            assert_eq!(state.completed_sessions, 0);
            assert_eq!(state.remaining_seconds, 900);

            run_out(&engine).await;
            let state = engine.state().await;
            assert_eq!(state.phase, TimerPhase::Work);
            assert_eq!(state.remaining_seconds, 1500);
        }

        #[tokio::test(start_paused = true)]
        async fn test_update_from_settings_while_paused() {
            let engine = create_engine().await;

            engine
                .settings()
                .write()
                .await
                .apply_setup(&TimerSetup::new(50, 10, 20, 3))
                .unwrap();
            engine.update_from_settings().await;

            let snapshot = engine.snapshot().await;
            assert_eq!(snapshot.remaining_seconds, 3000);
            assert_eq!(snapshot.sessions_before_long_break, 3);
        }

        #[tokio::test(start_paused = true)]
        async fn test_update_from_settings_while_running_is_ignored() {
            let engine = create_engine().await;
            engine.start().await;
            engine.tick().await;

            engine.settings().write().await.set_work_duration(50).unwrap();
            engine.update_from_settings().await;

            assert_eq!(engine.state().await.remaining_seconds, 1499);

            engine.reset().await;
            assert_eq!(engine.state().await.remaining_seconds, 3000);
        }

        #[tokio::test(start_paused = true)]
        async fn test_new_duration_applies_on_next_phase_entry() {
            let engine = create_engine().await;
            engine.start().await;

            engine.settings().write().await.set_short_break_duration(10).unwrap();
            engine.skip().await;

            assert_eq!(engine.state().await.remaining_seconds, 600);
        }
    }

    // ------------------------------------------------------------------------
    // Ticker Tests
    // ------------------------------------------------------------------------

    mod ticker_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_ticker_counts_down() {
            let engine = create_engine().await;
            engine.start().await;

            sleep(Duration::from_millis(5500)).await;

            assert_eq!(engine.state().await.remaining_seconds, 1495);
        }

        #[tokio::test(start_paused = true)]
        async fn test_pause_stops_ticker() {
            let engine = create_engine().await;
            engine.start().await;
            sleep(Duration::from_millis(2500)).await;

            engine.pause().await;
            sleep(Duration::from_secs(10)).await;

            assert_eq!(engine.state().await.remaining_seconds, 1498);
        }

        #[tokio::test(start_paused = true)]
        async fn test_restart_runs_single_ticker() {
            let engine = create_engine().await;

            engine.start().await;
            engine.pause().await;
            engine.start().await;
            sleep(Duration::from_millis(3500)).await;

            assert_eq!(engine.state().await.remaining_seconds, 1497);
        }

        #[tokio::test(start_paused = true)]
        async fn test_ticker_completes_phase() {
            let mut store = SettingsStore::in_memory();
            store.set_work_duration(1).unwrap();
            let engine = TimerEngine::new(store.into_shared()).await;
            let mut rx = engine.subscribe(EventFilter::PhaseCompleted).await;

            engine.start().await;
            sleep(Duration::from_secs(90)).await;

            let state = engine.state().await;
            assert_eq!(state.phase, TimerPhase::ShortBreak);
            assert_eq!(state.remaining_seconds, 300);
            assert!(!state.is_running);
            assert_eq!(drain(&mut rx).len(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_custom_tick_period() {
            let engine =
                TimerEngine::with_tick_period(SettingsStore::in_memory().into_shared(), Duration::from_millis(10))
                    .await;
            engine.start().await;

            sleep(Duration::from_millis(105)).await;

            assert_eq!(engine.state().await.remaining_seconds, 1490);
        }
    }

    // ------------------------------------------------------------------------
    // Subscription Tests
    // ------------------------------------------------------------------------

    mod subscription_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_state_changed_lists_fields() {
            let engine = create_engine().await;
            let mut rx = engine.subscribe(EventFilter::All).await;

            engine.start().await;
            engine.tick().await;

            let events = drain(&mut rx);
            assert_eq!(events.len(), 2);
            match &events[0] {
                TimerEvent::StateChanged { changed, snapshot } => {
                    assert_eq!(changed, &vec![StateField::Running]);
                    assert!(snapshot.is_running);
                }
                other => panic!("unexpected event: {other:?}"),
            }
            match &events[1] {
                TimerEvent::StateChanged { changed, snapshot } => {
                    assert_eq!(changed, &vec![StateField::TimeRemaining]);
                    assert_eq!(snapshot.remaining_seconds, 1499);
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_noop_operations_publish_nothing() {
            let engine = create_engine().await;
            let mut rx = engine.subscribe(EventFilter::All).await;

            engine.pause().await;
            engine.tick().await;
            engine.update_from_settings().await;

            assert!(drain(&mut rx).is_empty());
        }

        #[tokio::test(start_paused = true)]
        async fn test_natural_completion_chimes() {
            let engine = create_engine().await;
            let mut rx = engine.subscribe(EventFilter::All).await;

            run_out(&engine).await;

            let events = drain(&mut rx);
            match events.last() {
                Some(TimerEvent::PhaseCompleted(completion)) => {
                    assert_eq!(completion.finished, TimerPhase::Work);
                    assert_eq!(completion.next, TimerPhase::ShortBreak);
                    assert_eq!(completion.completed_sessions, 1);
                    assert!(completion.natural);
                    assert!(completion.chime);
                }
                other => panic!("expected a phase completion, got {other:?}"),
            }
            assert!(matches!(
                &events[events.len() - 2],
                TimerEvent::StateChanged { changed, .. } if changed.contains(&StateField::Phase)
            ));
        }

        #[tokio::test(start_paused = true)]
        async fn test_skip_does_not_chime() {
            let engine = create_engine().await;
            let mut rx = engine.subscribe(EventFilter::PhaseCompleted).await;

            engine.skip().await;

            let events = drain(&mut rx);
            assert_eq!(events.len(), 1);
            match events[0] {
                TimerEvent::PhaseCompleted(completion) => {
                    assert!(!completion.natural);
                    assert!(!completion.chime);
                }
                ref other => panic!("unexpected event: {other:?}"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_sound_disabled_does_not_chime() {
            let mut store = SettingsStore::in_memory();
            store.set_play_sound_on_complete(false);
            let engine = TimerEngine::new(store.into_shared()).await;
            let mut rx = engine.subscribe(EventFilter::PhaseCompleted).await;

            run_out(&engine).await;

            match rx.try_recv() {
                Ok(TimerEvent::PhaseCompleted(completion)) => {
                    assert!(completion.natural);
                    assert!(!completion.chime);
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_field_filter() {
            let engine = create_engine().await;
            let mut rx = engine
                .subscribe(EventFilter::Fields(vec![StateField::Running]))
                .await;

            engine.start().await;
            engine.tick().await;
            engine.tick().await;
            engine.pause().await;

            assert_eq!(drain(&mut rx).len(), 2);
        }

        #[tokio::test(start_paused = true)]
        async fn test_dropped_receiver_is_removed() {
            let engine = create_engine().await;
            let rx = engine.subscribe(EventFilter::All).await;
            drop(rx);

            engine.start().await;

            assert!(engine.shared.core.lock().await.subscribers.is_empty());
        }
    }

    // ------------------------------------------------------------------------
    // Start After Completion Tests
    // ------------------------------------------------------------------------

    mod start_after_tests {
        use super::*;

        async fn completed(engine: &TimerEngine) -> PhaseCompletion {
            let mut rx = engine.subscribe(EventFilter::PhaseCompleted).await;
            run_out(engine).await;
            match rx.try_recv() {
                Ok(TimerEvent::PhaseCompleted(completion)) => completion,
                other => panic!("expected a phase completion, got {other:?}"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_starts_untouched_phase() {
            let engine = create_engine().await;
            let completion = completed(&engine).await;

            assert!(engine.start_after(&completion).await);

            let state = engine.state().await;
            assert_eq!(state.phase, TimerPhase::ShortBreak);
            assert!(state.is_running);
            engine.pause().await;
        }

        #[tokio::test(start_paused = true)]
        async fn test_refuses_after_skip() {
            let engine = create_engine().await;
            let completion = completed(&engine).await;
            engine.skip().await;

            assert!(!engine.start_after(&completion).await);

            let state = engine.state().await;
            assert_eq!(state.phase, TimerPhase::Work);
            assert!(!state.is_running);
        }

        #[tokio::test(start_paused = true)]
        async fn test_refuses_after_reset() {
            let engine = create_engine().await;
            let completion = completed(&engine).await;
            engine.reset().await;

            assert!(!engine.start_after(&completion).await);
            assert!(!engine.state().await.is_running);
        }

        #[tokio::test(start_paused = true)]
        async fn test_refuses_twice() {
            let engine = create_engine().await;
            let completion = completed(&engine).await;

            assert!(engine.start_after(&completion).await);
            engine.pause().await;

            assert!(!engine.start_after(&completion).await);
            assert!(!engine.state().await.is_running);
        }
    }
}
