//! Display utilities for the Flow CLI.
//!
//! This module provides formatted output for:
//! - Command results
//! - Timer status
//! - Settings with preset/custom markers
//! - Saved setups

use crate::types::{IpcResponse, Setting, SettingsSnapshot, TimerSetup, TimerSnapshot};

/// Width of the status progress bar in cells.
const PROGRESS_BAR_WIDTH: usize = 20;

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the daemon's message followed by a one-line timer summary.
    pub fn show_command_result(response: &IpcResponse) {
        if !response.message.is_empty() {
            println!("{}", response.message);
        }

        if let Some(timer) = response.data.as_ref().and_then(|d| d.timer.as_ref()) {
            println!("  {}", Self::timer_line(timer));
        }
    }

    /// Shows the current timer status.
    pub fn show_status(timer: &TimerSnapshot) {
        println!("{}", Self::format_status(timer));
    }

    /// Shows all settings.
    pub fn show_settings(settings: &SettingsSnapshot) {
        println!("{}", Self::format_settings(settings));
    }

    /// Shows the saved setups, marking the one matching `current`.
    pub fn show_setups(setups: &[TimerSetup], current: Option<&SettingsSnapshot>) {
        println!("{}", Self::format_setups(setups, current));
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("Error: {message}");
    }

    // ------------------------------------------------------------------------
    // Formatting
    // ------------------------------------------------------------------------

    fn timer_line(timer: &TimerSnapshot) -> String {
        format!(
            "{} {} ({})",
            timer.phase.display_name(),
            timer.formatted_time,
            if timer.is_running { "running" } else { "paused" }
        )
    }

    fn format_status(timer: &TimerSnapshot) -> String {
        let lines = [
            "Flow Timer Status".to_string(),
            "─────────────────".to_string(),
            format!(
                "Phase:     {} ({})",
                timer.phase.display_name(),
                if timer.is_running { "running" } else { "paused" }
            ),
            format!("Remaining: {}", timer.formatted_time),
            format!("Progress:  {}", Self::progress_bar(timer.progress)),
            format!(
                "Sessions:  {}/{}",
                timer.completed_sessions, timer.sessions_before_long_break
            ),
        ];
        lines.join("\n")
    }

    fn format_settings(settings: &SettingsSnapshot) -> String {
        let lines = [
            Self::minutes_line("Work", Setting::WorkDuration(settings.work_duration)),
            Self::minutes_line(
                "Short break",
                Setting::ShortBreakDuration(settings.short_break_duration),
            ),
            Self::minutes_line(
                "Long break",
                Setting::LongBreakDuration(settings.long_break_duration),
            ),
            Self::setting_line(
                "Sessions",
                settings.sessions_before_long_break.to_string(),
                Setting::SessionsBeforeLongBreak(settings.sessions_before_long_break),
            ),
            format!("{:<18}{}", "Auto-start break:", Self::on_off(settings.auto_start_break)),
            format!("{:<18}{}", "Auto-start work:", Self::on_off(settings.auto_start_work)),
            format!("{:<18}{}", "Sound:", Self::on_off(settings.play_sound_on_complete)),
            format!("{:<18}{}", "Show at launch:", Self::on_off(settings.show_window_at_launch)),
        ];
        lines.join("\n")
    }

    fn format_setups(setups: &[TimerSetup], current: Option<&SettingsSnapshot>) -> String {
        if setups.is_empty() {
            return "No saved setups. Save the current one with 'flow setups save'.".to_string();
        }

        setups
            .iter()
            .enumerate()
            .map(|(index, setup)| {
                let marker = match current {
                    Some(c) if Self::matches_current(setup, c) => "*",
                    _ => " ",
                };
                format!("{marker} {}. {}", index + 1, setup.display_name())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn matches_current(setup: &TimerSetup, current: &SettingsSnapshot) -> bool {
        setup.work_duration == current.work_duration
            && setup.short_break_duration == current.short_break_duration
            && setup.long_break_duration == current.long_break_duration
            && setup.sessions_before_long_break == current.sessions_before_long_break
    }

    fn minutes_line(label: &str, setting: Setting) -> String {
        let minutes = setting.value().as_u64().unwrap_or_default();
        Self::setting_line(label, format!("{minutes} min"), setting)
    }

    fn setting_line(label: &str, value: String, setting: Setting) -> String {
        let label = format!("{label}:");
        if setting.is_custom() {
            format!("{label:<18}{value} (custom)")
        } else {
            format!("{label:<18}{value}")
        }
    }

    fn on_off(enabled: bool) -> &'static str {
        if enabled {
            "on"
        } else {
            "off"
        }
    }

    fn progress_bar(progress: f64) -> String {
        let progress = progress.clamp(0.0, 1.0);
        // Truncation is intended: a cell fills once fully elapsed.
        let filled = (progress * PROGRESS_BAR_WIDTH as f64) as usize;
        format!(
            "[{}{}] {:>3.0}%",
            "#".repeat(filled),
            "-".repeat(PROGRESS_BAR_WIDTH - filled),
            progress * 100.0
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
