//! Settings store for the Flow timer.
//!
//! Owns the phase durations, the long-break threshold, the behaviour flags
//! and the saved timer setups. Every write is persisted immediately through a
//! [`KeyValueStore`]:
//!
//! ```text
//! ┌──────────────────┐  set/apply   ┌──────────────────┐
//! │  SettingsStore   │─────────────▶│  KeyValueStore   │
//! │  (live values)   │◀─────────────│  JsonFileStore / │
//! └──────────────────┘    load      │  MemoryStore     │
//!                                   └──────────────────┘
//! ```
//!
//! Loading never fails: absent or malformed entries fall back to defaults.
//! Changing a duration does not touch a running timer; callers reconcile with
//! `TimerEngine::update_from_settings`.

pub mod error;
pub mod storage;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::types::{Setting, SettingsSnapshot, TimerPhase, TimerSetup};

pub use error::{Result, SettingsError};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};

/// Settings handle shared between the engine and its collaborators.
pub type SharedSettings = Arc<RwLock<SettingsStore>>;

/// Longest accepted phase duration in minutes (one day).
pub const MAX_DURATION_MINUTES: u32 = 24 * 60;

/// Storage keys, one per durable entry.
pub mod keys {
    pub const WORK_DURATION: &str = "workDuration";
    pub const SHORT_BREAK_DURATION: &str = "shortBreakDuration";
    pub const LONG_BREAK_DURATION: &str = "longBreakDuration";
    pub const SESSIONS_BEFORE_LONG_BREAK: &str = "sessionsBeforeLongBreak";
    pub const AUTO_START_BREAK: &str = "autoStartBreak";
    pub const AUTO_START_WORK: &str = "autoStartWork";
    pub const PLAY_SOUND_ON_COMPLETE: &str = "playSoundOnComplete";
    pub const SHOW_WINDOW_AT_LAUNCH: &str = "showWindowAtLaunch";
    pub const SAVED_TIMER_SETUPS: &str = "savedTimerSetups";
}

/// Quick-pick values offered for each numeric setting.
pub mod presets {
    pub const WORK_DURATIONS: &[u32] = &[25, 50, 80, 90];
    pub const SHORT_BREAK_DURATIONS: &[u32] = &[5, 10, 15, 20];
    pub const LONG_BREAK_DURATIONS: &[u32] = &[10, 15, 20, 30, 60];
    pub const SESSION_COUNTS: &[u32] = &[2, 3, 4, 5, 6];
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self {
            work_duration: 25,
            short_break_duration: 5,
            long_break_duration: 15,
            sessions_before_long_break: 4,
            auto_start_break: false,
            auto_start_work: false,
            play_sound_on_complete: true,
            show_window_at_launch: true,
        }
    }
}

// ============================================================================
// Setting
// ============================================================================

impl Setting {
    /// Returns the storage key of this setting.
    pub fn key(&self) -> &'static str {
        match self {
            Setting::WorkDuration(_) => keys::WORK_DURATION,
            Setting::ShortBreakDuration(_) => keys::SHORT_BREAK_DURATION,
            Setting::LongBreakDuration(_) => keys::LONG_BREAK_DURATION,
            Setting::SessionsBeforeLongBreak(_) => keys::SESSIONS_BEFORE_LONG_BREAK,
            Setting::AutoStartBreak(_) => keys::AUTO_START_BREAK,
            Setting::AutoStartWork(_) => keys::AUTO_START_WORK,
            Setting::PlaySoundOnComplete(_) => keys::PLAY_SOUND_ON_COMPLETE,
            Setting::ShowWindowAtLaunch(_) => keys::SHOW_WINDOW_AT_LAUNCH,
        }
    }

    /// Returns the value as stored.
    pub fn value(&self) -> Value {
        match *self {
            Setting::WorkDuration(v)
            | Setting::ShortBreakDuration(v)
            | Setting::LongBreakDuration(v)
            | Setting::SessionsBeforeLongBreak(v) => json!(v),
            Setting::AutoStartBreak(b)
            | Setting::AutoStartWork(b)
            | Setting::PlaySoundOnComplete(b)
            | Setting::ShowWindowAtLaunch(b) => json!(b),
        }
    }

    /// Returns true if a paused countdown should be recomputed after this write.
    pub fn affects_timer(&self) -> bool {
        matches!(
            self,
            Setting::WorkDuration(_) | Setting::ShortBreakDuration(_) | Setting::LongBreakDuration(_)
        )
    }

    /// Returns the preset values for numeric settings.
    pub fn presets(&self) -> Option<&'static [u32]> {
        match self {
            Setting::WorkDuration(_) => Some(presets::WORK_DURATIONS),
            Setting::ShortBreakDuration(_) => Some(presets::SHORT_BREAK_DURATIONS),
            Setting::LongBreakDuration(_) => Some(presets::LONG_BREAK_DURATIONS),
            Setting::SessionsBeforeLongBreak(_) => Some(presets::SESSION_COUNTS),
            _ => None,
        }
    }

    /// Returns true for numeric values not among the presets.
    pub fn is_custom(&self) -> bool {
        match (self.presets(), self.value().as_u64()) {
            (Some(presets), Some(value)) => !presets.iter().any(|p| u64::from(*p) == value),
            _ => false,
        }
    }

    /// Validates the value.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` for zero counts and out-of-range durations.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Setting::WorkDuration(v)
            | Setting::ShortBreakDuration(v)
            | Setting::LongBreakDuration(v) => validate_minutes(self.key(), v),
            Setting::SessionsBeforeLongBreak(v) => {
                if v < 1 {
                    return Err(SettingsError::invalid(self.key(), "must be at least 1"));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

fn validate_minutes(key: &'static str, minutes: u32) -> Result<()> {
    if minutes < 1 {
        return Err(SettingsError::invalid(key, "must be at least 1 minute"));
    }
    if minutes > MAX_DURATION_MINUTES {
        return Err(SettingsError::invalid(
            key,
            format!("must be at most {MAX_DURATION_MINUTES} minutes"),
        ));
    }
    Ok(())
}

fn setup_settings(setup: &TimerSetup) -> [Setting; 4] {
    [
        Setting::WorkDuration(setup.work_duration),
        Setting::ShortBreakDuration(setup.short_break_duration),
        Setting::LongBreakDuration(setup.long_break_duration),
        Setting::SessionsBeforeLongBreak(setup.sessions_before_long_break),
    ]
}

// ============================================================================
// SettingsStore
// ============================================================================

/// Live settings backed by a durable key-value store.
pub struct SettingsStore {
    storage: Box<dyn KeyValueStore>,
    values: SettingsSnapshot,
    saved_setups: Vec<TimerSetup>,
}

impl SettingsStore {
    /// Loads all settings from `storage`, substituting defaults for anything
    /// absent or malformed.
    pub fn load(storage: impl KeyValueStore + 'static) -> Self {
        let defaults = SettingsSnapshot::default();

        let values = SettingsSnapshot {
            work_duration: read_setting(&storage, Setting::WorkDuration, defaults.work_duration),
            short_break_duration: read_setting(
                &storage,
                Setting::ShortBreakDuration,
                defaults.short_break_duration,
            ),
            long_break_duration: read_setting(
                &storage,
                Setting::LongBreakDuration,
                defaults.long_break_duration,
            ),
            sessions_before_long_break: read_setting(
                &storage,
                Setting::SessionsBeforeLongBreak,
                defaults.sessions_before_long_break,
            ),
            auto_start_break: read_value(&storage, keys::AUTO_START_BREAK)
                .unwrap_or(defaults.auto_start_break),
            auto_start_work: read_value(&storage, keys::AUTO_START_WORK)
                .unwrap_or(defaults.auto_start_work),
            play_sound_on_complete: read_value(&storage, keys::PLAY_SOUND_ON_COMPLETE)
                .unwrap_or(defaults.play_sound_on_complete),
            show_window_at_launch: read_value(&storage, keys::SHOW_WINDOW_AT_LAUNCH)
                .unwrap_or(defaults.show_window_at_launch),
        };

        let saved_setups = read_setups(&storage);

        tracing::debug!(
            setup = %TimerSetup::new(
                values.work_duration,
                values.short_break_duration,
                values.long_break_duration,
                values.sessions_before_long_break
            )
            .display_name(),
            saved = saved_setups.len(),
            "settings loaded"
        );

        Self {
            storage: Box::new(storage),
            values,
            saved_setups,
        }
    }

    /// Creates a store with default values and no durable backing.
    pub fn in_memory() -> Self {
        Self::load(MemoryStore::new())
    }

    /// Wraps the store in a shareable handle.
    pub fn into_shared(self) -> SharedSettings {
        Arc::new(RwLock::new(self))
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn work_duration(&self) -> u32 {
        self.values.work_duration
    }

    pub fn short_break_duration(&self) -> u32 {
        self.values.short_break_duration
    }

    pub fn long_break_duration(&self) -> u32 {
        self.values.long_break_duration
    }

    pub fn sessions_before_long_break(&self) -> u32 {
        self.values.sessions_before_long_break
    }

    pub fn auto_start_break(&self) -> bool {
        self.values.auto_start_break
    }

    pub fn auto_start_work(&self) -> bool {
        self.values.auto_start_work
    }

    pub fn play_sound_on_complete(&self) -> bool {
        self.values.play_sound_on_complete
    }

    pub fn show_window_at_launch(&self) -> bool {
        self.values.show_window_at_launch
    }

    /// Returns all scalar settings.
    pub fn snapshot(&self) -> SettingsSnapshot {
        self.values.clone()
    }

    /// Returns true if entering `next` should start the countdown on its own.
    pub fn should_auto_start(&self, next: TimerPhase) -> bool {
        if next.is_break() {
            self.values.auto_start_break
        } else {
            self.values.auto_start_work
        }
    }

    // ------------------------------------------------------------------------
    // Mutators
    // ------------------------------------------------------------------------

    /// Validates and writes one setting, persisting it immediately.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` if the value is out of range; nothing is
    /// changed in that case.
    pub fn apply(&mut self, setting: Setting) -> Result<()> {
        setting.validate()?;

        match setting {
            Setting::WorkDuration(v) => self.values.work_duration = v,
            Setting::ShortBreakDuration(v) => self.values.short_break_duration = v,
            Setting::LongBreakDuration(v) => self.values.long_break_duration = v,
            Setting::SessionsBeforeLongBreak(v) => self.values.sessions_before_long_break = v,
            Setting::AutoStartBreak(b) => self.values.auto_start_break = b,
            Setting::AutoStartWork(b) => self.values.auto_start_work = b,
            Setting::PlaySoundOnComplete(b) => self.values.play_sound_on_complete = b,
            Setting::ShowWindowAtLaunch(b) => self.values.show_window_at_launch = b,
        }

        self.persist(setting.key(), setting.value());
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `InvalidValue` for durations outside `1..=MAX_DURATION_MINUTES`.
    pub fn set_work_duration(&mut self, minutes: u32) -> Result<()> {
        self.apply(Setting::WorkDuration(minutes))
    }

    /// # Errors
    ///
    /// Returns `InvalidValue` for durations outside `1..=MAX_DURATION_MINUTES`.
    pub fn set_short_break_duration(&mut self, minutes: u32) -> Result<()> {
        self.apply(Setting::ShortBreakDuration(minutes))
    }

    /// # Errors
    ///
    /// Returns `InvalidValue` for durations outside `1..=MAX_DURATION_MINUTES`.
    pub fn set_long_break_duration(&mut self, minutes: u32) -> Result<()> {
        self.apply(Setting::LongBreakDuration(minutes))
    }

    /// # Errors
    ///
    /// Returns `InvalidValue` for zero.
    pub fn set_sessions_before_long_break(&mut self, count: u32) -> Result<()> {
        self.apply(Setting::SessionsBeforeLongBreak(count))
    }

    pub fn set_auto_start_break(&mut self, enabled: bool) {
        self.apply_flag(Setting::AutoStartBreak(enabled));
    }

    pub fn set_auto_start_work(&mut self, enabled: bool) {
        self.apply_flag(Setting::AutoStartWork(enabled));
    }

    pub fn set_play_sound_on_complete(&mut self, enabled: bool) {
        self.apply_flag(Setting::PlaySoundOnComplete(enabled));
    }

    pub fn set_show_window_at_launch(&mut self, enabled: bool) {
        self.apply_flag(Setting::ShowWindowAtLaunch(enabled));
    }

    fn apply_flag(&mut self, setting: Setting) {
        // Flags carry no range.
        if let Err(e) = self.apply(setting) {
            tracing::warn!(key = setting.key(), error = %e, "flag rejected");
        }
    }

    // ------------------------------------------------------------------------
    // Saved setups
    // ------------------------------------------------------------------------

    /// Returns the saved setups in insertion order.
    pub fn saved_setups(&self) -> &[TimerSetup] {
        &self.saved_setups
    }

    /// Returns a snapshot of the four tunable values.
    pub fn current_setup(&self) -> TimerSetup {
        TimerSetup::new(
            self.values.work_duration,
            self.values.short_break_duration,
            self.values.long_break_duration,
            self.values.sessions_before_long_break,
        )
    }

    /// Looks up a saved setup by identity.
    pub fn find_setup(&self, id: Uuid) -> Option<&TimerSetup> {
        self.saved_setups.iter().find(|s| s.id == id)
    }

    /// Saves the current values unless an equal setup is already saved.
    ///
    /// Returns true if a new entry was appended.
    pub fn save_current_setup(&mut self) -> bool {
        let current = self.current_setup();
        if self.saved_setups.iter().any(|s| s.same_values(&current)) {
            return false;
        }

        tracing::info!(setup = %current.display_name(), "saving timer setup");
        self.saved_setups.push(current);
        self.persist_setups();
        true
    }

    /// Copies the four tunable values of `setup` into the live settings.
    ///
    /// Either all four values are written or none is.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` if any of the values is out of range.
    pub fn apply_setup(&mut self, setup: &TimerSetup) -> Result<()> {
        let settings = setup_settings(setup);
        for setting in &settings {
            setting.validate()?;
        }
        for setting in settings {
            self.apply(setting)?;
        }

        tracing::info!(setup = %setup.display_name(), "applied timer setup");
        Ok(())
    }

    /// Removes a saved setup by identity.
    ///
    /// Returns true if an entry was removed.
    pub fn delete_setup(&mut self, id: Uuid) -> bool {
        let before = self.saved_setups.len();
        self.saved_setups.retain(|s| s.id != id);
        if self.saved_setups.len() == before {
            return false;
        }

        self.persist_setups();
        true
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    fn persist(&mut self, key: &str, value: Value) {
        if let Err(e) = self.storage.set(key, value) {
            tracing::warn!(key, error = %e, "failed to persist setting");
        }
    }

    fn persist_setups(&mut self) {
        match serde_json::to_value(&self.saved_setups) {
            Ok(value) => self.persist(keys::SAVED_TIMER_SETUPS, value),
            Err(e) => tracing::warn!(error = %e, "failed to encode saved setups"),
        }
    }
}

fn read_value<T: DeserializeOwned>(storage: &dyn KeyValueStore, key: &str) -> Option<T> {
    let value = storage.get(key)?;
    match serde_json::from_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(key, error = %e, "ignoring malformed setting");
            None
        }
    }
}

fn read_setting(storage: &dyn KeyValueStore, make: fn(u32) -> Setting, default: u32) -> u32 {
    let key = make(default).key();
    let Some(value) = read_value::<u32>(storage, key) else {
        return default;
    };

    match make(value).validate() {
        Ok(()) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "ignoring out of range setting");
            default
        }
    }
}

fn read_setups(storage: &dyn KeyValueStore) -> Vec<TimerSetup> {
    let setups: Vec<TimerSetup> = read_value(storage, keys::SAVED_TIMER_SETUPS).unwrap_or_default();

    setups
        .into_iter()
        .filter(|setup| match setup_settings(setup).iter().try_for_each(Setting::validate) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(setup = %setup.display_name(), error = %e, "dropping invalid saved setup");
                false
            }
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
