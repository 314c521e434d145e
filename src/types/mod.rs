//! Core data types for the Flow timer.
//!
//! This module defines the data structures used for:
//! - Phase sequencing and the countdown state machine
//! - Timer setups (the four tunable duration/session values)
//! - IPC request/response serialization

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// TimerPhase
// ============================================================================

/// Represents the current phase of the work/break cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    /// Focused work session
    #[default]
    Work,
    /// Short break between work sessions
    ShortBreak,
    /// Long break after `sessions_before_long_break` work sessions
    LongBreak,
}

impl TimerPhase {
    /// Returns the string representation of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerPhase::Work => "work",
            TimerPhase::ShortBreak => "short_break",
            TimerPhase::LongBreak => "long_break",
        }
    }

    /// Returns the human readable name of the phase.
    pub fn display_name(&self) -> &'static str {
        match self {
            TimerPhase::Work => "Work",
            TimerPhase::ShortBreak => "Short Break",
            TimerPhase::LongBreak => "Long Break",
        }
    }

    /// Returns true for both break phases.
    pub fn is_break(&self) -> bool {
        *self != TimerPhase::Work
    }
}

// ============================================================================
// TimerSetup
// ============================================================================

/// A bundle of the four tunable values, saved for quick reuse.
///
/// Two setups with the same durations and session count are duplicates even
/// when their ids differ; see [`TimerSetup::display_name`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSetup {
    /// Stable identity
    pub id: Uuid,
    /// Work duration in minutes
    pub work_duration: u32,
    /// Short break duration in minutes
    pub short_break_duration: u32,
    /// Long break duration in minutes
    pub long_break_duration: u32,
    /// Work sessions before a long break
    pub sessions_before_long_break: u32,
}

impl TimerSetup {
    /// Creates a setup with a fresh identity.
    pub fn new(
        work_duration: u32,
        short_break_duration: u32,
        long_break_duration: u32,
        sessions_before_long_break: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            work_duration,
            short_break_duration,
            long_break_duration,
            sessions_before_long_break,
        }
    }

    /// Returns the signature used for display and duplicate detection,
    /// e.g. `25m/5m/15m/4`.
    pub fn display_name(&self) -> String {
        format!(
            "{}m/{}m/{}m/{}",
            self.work_duration,
            self.short_break_duration,
            self.long_break_duration,
            self.sessions_before_long_break
        )
    }

    /// Returns the configured length of `phase` in minutes.
    pub fn duration_minutes(&self, phase: TimerPhase) -> u32 {
        match phase {
            TimerPhase::Work => self.work_duration,
            TimerPhase::ShortBreak => self.short_break_duration,
            TimerPhase::LongBreak => self.long_break_duration,
        }
    }

    /// Returns the configured length of `phase` in seconds.
    pub fn duration_seconds(&self, phase: TimerPhase) -> u32 {
        self.duration_minutes(phase).saturating_mul(60)
    }

    /// Returns true if both setups carry the same four values.
    pub fn same_values(&self, other: &TimerSetup) -> bool {
        self.display_name() == other.display_name()
    }
}

// ============================================================================
// TimerState
// ============================================================================

/// The countdown state machine.
///
/// Durations are never stored here; every operation that needs one takes the
/// current [`TimerSetup`] so that settings changes are picked up at the next
/// reset or phase entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    /// Current phase
    pub phase: TimerPhase,
    /// Remaining seconds in the current phase
    pub remaining_seconds: u32,
    /// Whether the countdown is ticking
    pub is_running: bool,
    /// Work sessions completed since the last long break
    pub completed_sessions: u32,
}

impl TimerState {
    /// Creates a paused Work state with a full countdown.
    pub fn new(setup: &TimerSetup) -> Self {
        Self {
            phase: TimerPhase::Work,
            remaining_seconds: setup.duration_seconds(TimerPhase::Work),
            is_running: false,
            completed_sessions: 0,
        }
    }

    /// Restores the full duration of the current phase.
    pub fn reset_countdown(&mut self, setup: &TimerSetup) {
        self.remaining_seconds = setup.duration_seconds(self.phase);
    }

    /// Decrements the countdown by one second.
    ///
    /// Returns true only when this call brought the countdown to zero.
    /// Once at zero the countdown stays there.
    pub fn tick(&mut self) -> bool {
        if self.remaining_seconds == 0 {
            return false;
        }
        self.remaining_seconds -= 1;
        self.remaining_seconds == 0
    }

    /// Moves to the next phase and refills the countdown.
    ///
    /// Returns the phase that just finished.
    pub fn advance(&mut self, setup: &TimerSetup) -> TimerPhase {
        let finished = self.phase;

        self.phase = match self.phase {
            TimerPhase::Work => {
                self.completed_sessions += 1;
                if self.completed_sessions >= setup.sessions_before_long_break {
                    self.completed_sessions = 0;
                    TimerPhase::LongBreak
                } else {
                    TimerPhase::ShortBreak
                }
            }
            TimerPhase::ShortBreak | TimerPhase::LongBreak => TimerPhase::Work,
        };

        self.reset_countdown(setup);
        finished
    }

    /// Returns the remaining time as zero-padded `MM:SS`.
    pub fn formatted_time(&self) -> String {
        format!(
            "{:02}:{:02}",
            self.remaining_seconds / 60,
            self.remaining_seconds % 60
        )
    }

    /// Returns the elapsed fraction of the current phase in `[0.0, 1.0]`.
    pub fn progress(&self, setup: &TimerSetup) -> f64 {
        let total = setup.duration_seconds(self.phase);
        if total == 0 {
            return 0.0;
        }
        let elapsed = total.saturating_sub(self.remaining_seconds);
        (f64::from(elapsed) / f64::from(total)).clamp(0.0, 1.0)
    }
}

// ============================================================================
// TimerSnapshot
// ============================================================================

/// Read-only view of the timer published to collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub phase: TimerPhase,
    pub remaining_seconds: u32,
    pub is_running: bool,
    pub completed_sessions: u32,
    pub sessions_before_long_break: u32,
    pub formatted_time: String,
    pub progress: f64,
}

impl TimerSnapshot {
    /// Captures the state together with the values derived from `setup`.
    pub fn capture(state: &TimerState, setup: &TimerSetup) -> Self {
        Self {
            phase: state.phase,
            remaining_seconds: state.remaining_seconds,
            is_running: state.is_running,
            completed_sessions: state.completed_sessions,
            sessions_before_long_break: setup.sessions_before_long_break,
            formatted_time: state.formatted_time(),
            progress: state.progress(setup),
        }
    }
}

// ============================================================================
// Settings Types
// ============================================================================

/// A single typed settings write.
///
/// Serialized as `{"key": "<storage key>", "value": ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "key", content = "value", rename_all = "camelCase")]
pub enum Setting {
    WorkDuration(u32),
    ShortBreakDuration(u32),
    LongBreakDuration(u32),
    SessionsBeforeLongBreak(u32),
    AutoStartBreak(bool),
    AutoStartWork(bool),
    PlaySoundOnComplete(bool),
    ShowWindowAtLaunch(bool),
}

/// All scalar settings at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsSnapshot {
    pub work_duration: u32,
    pub short_break_duration: u32,
    pub long_break_duration: u32,
    pub sessions_before_long_break: u32,
    pub auto_start_break: bool,
    pub auto_start_work: bool,
    pub play_sound_on_complete: bool,
    pub show_window_at_launch: bool,
}

// ============================================================================
// IPC Types
// ============================================================================

/// IPC request from client to daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum IpcRequest {
    /// Start the countdown
    Start,
    /// Pause the countdown
    Pause,
    /// Pause if running, otherwise start
    Toggle,
    /// Refill the current phase
    Reset,
    /// Jump to the next phase
    Skip,
    /// Query the timer
    Status,
    /// Query all scalar settings
    Settings,
    /// Write one setting
    Set {
        /// The setting to write
        setting: Setting,
    },
    /// Save the current durations as a setup
    SaveSetup,
    /// Apply a saved setup
    ApplySetup {
        /// Setup identity
        id: Uuid,
    },
    /// Delete a saved setup
    DeleteSetup {
        /// Setup identity
        id: Uuid,
    },
    /// List saved setups
    ListSetups,
}

/// Response data for IPC responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
    /// Timer snapshot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer: Option<TimerSnapshot>,
    /// Scalar settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<SettingsSnapshot>,
    /// Saved setups in display order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setups: Option<Vec<TimerSetup>>,
}

impl ResponseData {
    /// Creates response data holding a timer snapshot.
    pub fn timer(snapshot: TimerSnapshot) -> Self {
        Self {
            timer: Some(snapshot),
            ..Self::default()
        }
    }

    /// Creates response data holding the scalar settings.
    pub fn settings(snapshot: SettingsSnapshot) -> Self {
        Self {
            settings: Some(snapshot),
            ..Self::default()
        }
    }

    /// Creates response data holding the saved setups.
    pub fn setups(setups: Vec<TimerSetup>) -> Self {
        Self {
            setups: Some(setups),
            ..Self::default()
        }
    }
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Optional response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }

    /// Returns true for error responses.
    pub fn is_error(&self) -> bool {
        self.status == "error"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn default_setup() -> TimerSetup {
        TimerSetup::new(25, 5, 15, 4)
    }

    // ------------------------------------------------------------------------
    // TimerPhase Tests
    // ------------------------------------------------------------------------

    mod timer_phase_tests {
        use super::*;

        #[test]
        fn test_default_is_work() {
            assert_eq!(TimerPhase::default(), TimerPhase::Work);
        }

        #[test]
        fn test_as_str() {
            assert_eq!(TimerPhase::Work.as_str(), "work");
            assert_eq!(TimerPhase::ShortBreak.as_str(), "short_break");
            assert_eq!(TimerPhase::LongBreak.as_str(), "long_break");
        }

        #[test]
        fn test_display_name() {
            assert_eq!(TimerPhase::Work.display_name(), "Work");
            assert_eq!(TimerPhase::ShortBreak.display_name(), "Short Break");
            assert_eq!(TimerPhase::LongBreak.display_name(), "Long Break");
        }

        #[test]
        fn test_is_break() {
            assert!(!TimerPhase::Work.is_break());
            assert!(TimerPhase::ShortBreak.is_break());
            assert!(TimerPhase::LongBreak.is_break());
        }

        #[test]
        fn test_serialized_form_matches_as_str() {
            let json = serde_json::to_string(&TimerPhase::ShortBreak).unwrap();
            assert_eq!(json, "\"short_break\"");
        }
    }

    // ------------------------------------------------------------------------
    // TimerSetup Tests
    // ------------------------------------------------------------------------

    mod timer_setup_tests {
        use super::*;

        #[test]
        fn test_display_name() {
            assert_eq!(default_setup().display_name(), "25m/5m/15m/4");
            assert_eq!(TimerSetup::new(50, 10, 20, 3).display_name(), "50m/10m/20m/3");
        }

        #[test]
        fn test_new_assigns_distinct_ids() {
            let a = default_setup();
            let b = default_setup();
            assert_ne!(a.id, b.id);
            assert!(a.same_values(&b));
        }

        #[test]
        fn test_same_values_differs_on_any_field() {
            let base = default_setup();
            assert!(!base.same_values(&TimerSetup::new(26, 5, 15, 4)));
            assert!(!base.same_values(&TimerSetup::new(25, 6, 15, 4)));
            assert!(!base.same_values(&TimerSetup::new(25, 5, 16, 4)));
            assert!(!base.same_values(&TimerSetup::new(25, 5, 15, 5)));
        }

        #[test]
        fn test_durations_per_phase() {
            let setup = default_setup();
            assert_eq!(setup.duration_seconds(TimerPhase::Work), 1500);
            assert_eq!(setup.duration_seconds(TimerPhase::ShortBreak), 300);
            assert_eq!(setup.duration_seconds(TimerPhase::LongBreak), 900);
            assert_eq!(setup.duration_minutes(TimerPhase::LongBreak), 15);
        }

        #[test]
        fn test_serialized_field_names() {
            let setup = TimerSetup::new(50, 10, 20, 3);
            let value = serde_json::to_value(&setup).unwrap();

            assert_eq!(value["workDuration"], 50);
            assert_eq!(value["shortBreakDuration"], 10);
            assert_eq!(value["longBreakDuration"], 20);
            assert_eq!(value["sessionsBeforeLongBreak"], 3);
            assert_eq!(value["id"], setup.id.to_string());
        }
    }

    // ------------------------------------------------------------------------
    // TimerState Tests
    // ------------------------------------------------------------------------

    mod timer_state_tests {
        use super::*;

        #[test]
        fn test_new_state() {
            let state = TimerState::new(&default_setup());

            assert_eq!(state.phase, TimerPhase::Work);
            assert_eq!(state.remaining_seconds, 25 * 60);
            assert!(!state.is_running);
            assert_eq!(state.completed_sessions, 0);
        }

        #[test]
        fn test_tick_decrements() {
            let mut state = TimerState::new(&default_setup());
            state.remaining_seconds = 2;

            assert!(!state.tick());
            assert_eq!(state.remaining_seconds, 1);

            assert!(state.tick());
            assert_eq!(state.remaining_seconds, 0);
        }

        #[test]
        fn test_tick_at_zero_is_noop() {
            let mut state = TimerState::new(&default_setup());
            state.remaining_seconds = 0;

            assert!(!state.tick());
            assert!(!state.tick());
            assert_eq!(state.remaining_seconds, 0);
        }

        #[test]
        fn test_advance_work_to_short_break() {
            let setup = default_setup();
            let mut state = TimerState::new(&setup);

            let finished = state.advance(&setup);

            assert_eq!(finished, TimerPhase::Work);
            assert_eq!(state.phase, TimerPhase::ShortBreak);
            assert_eq!(state.completed_sessions, 1);
            assert_eq!(state.remaining_seconds, 300);
        }

        #[test]
        fn test_advance_break_to_work_keeps_sessions() {
            let setup = default_setup();
            let mut state = TimerState::new(&setup);
            state.advance(&setup);

            let finished = state.advance(&setup);

            assert_eq!(finished, TimerPhase::ShortBreak);
            assert_eq!(state.phase, TimerPhase::Work);
            assert_eq!(state.completed_sessions, 1);
            assert_eq!(state.remaining_seconds, 1500);
        }

        #[test]
        fn test_long_break_after_threshold() {
            let setup = default_setup();
            let mut state = TimerState::new(&setup);

            for expected in 1..4 {
                state.advance(&setup);
                assert_eq!(state.phase, TimerPhase::ShortBreak);
                assert_eq!(state.completed_sessions, expected);
                state.advance(&setup);
            }

            state.advance(&setup);
            assert_eq!(state.phase, TimerPhase::LongBreak);
            assert_eq!(state.completed_sessions, 0);
            assert_eq!(state.remaining_seconds, 900);

            state.advance(&setup);
            assert_eq!(state.phase, TimerPhase::Work);
            assert_eq!(state.remaining_seconds, 1500);
        }

        #[test]
        fn test_single_session_threshold_always_long_break() {
            let setup = TimerSetup::new(25, 5, 15, 1);
            let mut state = TimerState::new(&setup);

            state.advance(&setup);
            assert_eq!(state.phase, TimerPhase::LongBreak);
            assert_eq!(state.completed_sessions, 0);
        }

        #[test]
        fn test_lowered_threshold_triggers_long_break() {
            let mut state = TimerState::new(&default_setup());
            state.completed_sessions = 3;

            state.advance(&TimerSetup::new(25, 5, 15, 2));

            assert_eq!(state.phase, TimerPhase::LongBreak);
            assert_eq!(state.completed_sessions, 0);
        }

        #[test]
        fn test_reset_countdown_uses_given_setup() {
            let mut state = TimerState::new(&default_setup());
            state.remaining_seconds = 12;

            state.reset_countdown(&TimerSetup::new(50, 10, 20, 3));

            assert_eq!(state.remaining_seconds, 3000);
        }

        #[test]
        fn test_formatted_time() {
            let mut state = TimerState::new(&default_setup());
            assert_eq!(state.formatted_time(), "25:00");

            state.remaining_seconds = 65;
            assert_eq!(state.formatted_time(), "01:05");

            state.remaining_seconds = 0;
            assert_eq!(state.formatted_time(), "00:00");

            state.remaining_seconds = 90 * 60;
            assert_eq!(state.formatted_time(), "90:00");
        }

        #[test]
        fn test_progress() {
            let setup = default_setup();
            let mut state = TimerState::new(&setup);
            assert_eq!(state.progress(&setup), 0.0);

            state.remaining_seconds = 750;
            assert!((state.progress(&setup) - 0.5).abs() < f64::EPSILON);

            state.remaining_seconds = 0;
            assert!((state.progress(&setup) - 1.0).abs() < f64::EPSILON);
        }

        #[test]
        fn test_progress_zero_duration() {
            let setup = TimerSetup::new(0, 5, 15, 4);
            let state = TimerState::new(&setup);
            assert_eq!(state.progress(&setup), 0.0);
        }

        #[test]
        fn test_progress_clamped_when_duration_shrinks() {
            let mut state = TimerState::new(&default_setup());
            state.remaining_seconds = 1400;

            let shorter = TimerSetup::new(10, 5, 15, 4);
            assert_eq!(state.progress(&shorter), 0.0);
        }
    }

    // ------------------------------------------------------------------------
    // Snapshot and IPC Tests
    // ------------------------------------------------------------------------

    mod snapshot_tests {
        use super::*;

        #[test]
        fn test_capture() {
            let setup = default_setup();
            let mut state = TimerState::new(&setup);
            state.remaining_seconds = 1499;
            state.is_running = true;

            let snapshot = TimerSnapshot::capture(&state, &setup);

            assert_eq!(snapshot.phase, TimerPhase::Work);
            assert_eq!(snapshot.remaining_seconds, 1499);
            assert!(snapshot.is_running);
            assert_eq!(snapshot.sessions_before_long_break, 4);
            assert_eq!(snapshot.formatted_time, "24:59");
            assert!(snapshot.progress > 0.0);
        }
    }

    mod ipc_tests {
        use super::*;

        #[test]
        fn test_request_tags() {
            let json = serde_json::to_string(&IpcRequest::SaveSetup).unwrap();
            assert_eq!(json, r#"{"command":"saveSetup"}"#);

            let request: IpcRequest = serde_json::from_str(r#"{"command":"toggle"}"#).unwrap();
            assert_eq!(request, IpcRequest::Toggle);
        }

        #[test]
        fn test_set_request_uses_storage_keys() {
            let request: IpcRequest = serde_json::from_str(
                r#"{"command":"set","setting":{"key":"workDuration","value":50}}"#,
            )
            .unwrap();
            assert_eq!(
                request,
                IpcRequest::Set {
                    setting: Setting::WorkDuration(50)
                }
            );

            let request: IpcRequest = serde_json::from_str(
                r#"{"command":"set","setting":{"key":"playSoundOnComplete","value":false}}"#,
            )
            .unwrap();
            assert_eq!(
                request,
                IpcRequest::Set {
                    setting: Setting::PlaySoundOnComplete(false)
                }
            );
        }

        #[test]
        fn test_set_request_rejects_wrong_value_type() {
            let result: Result<IpcRequest, _> = serde_json::from_str(
                r#"{"command":"set","setting":{"key":"autoStartWork","value":3}}"#,
            );
            assert!(result.is_err());
        }

        #[test]
        fn test_response_skips_empty_data() {
            let response = IpcResponse::success("ok", Some(ResponseData::setups(Vec::new())));
            let json = serde_json::to_string(&response).unwrap();
            assert!(json.contains("\"setups\":[]"));
            assert!(!json.contains("timer"));
            assert!(!json.contains("settings"));
        }

        #[test]
        fn test_error_response() {
            let response = IpcResponse::error("boom");
            assert!(response.is_error());
            assert!(response.data.is_none());
            assert!(!IpcResponse::success("", None).is_error());
        }
    }
}
