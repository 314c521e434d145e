//! Command definitions for the Flow CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::Setting;

// ============================================================================
// CLI Structure
// ============================================================================

/// Flow - a Pomodoro work/break interval timer
#[derive(Parser, Debug)]
#[command(
    name = "flow",
    version,
    about = "Pomodoro work/break interval timer",
    long_about = "A Pomodoro timer that alternates work sessions with short and long breaks.\n\
                  The timer runs inside `flow daemon`; every other command talks to it over a Unix socket.",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Daemon socket path (defaults to ~/.flow/flow.sock)
    #[arg(long, global = true, value_name = "PATH")]
    pub socket: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the countdown
    Start,

    /// Pause the countdown
    Pause,

    /// Pause if running, otherwise start
    Toggle,

    /// Restore the full duration of the current phase
    Reset,

    /// Jump to the next phase
    Skip,

    /// Show current timer status
    Status,

    /// Show all settings
    Settings,

    /// Change a setting
    Set {
        /// Setting to change
        #[arg(value_enum)]
        key: SettingKey,

        /// New value: minutes, a session count, or on/off
        value: String,
    },

    /// Manage saved timer setups
    Setups {
        #[command(subcommand)]
        action: SetupsCommand,
    },

    /// Run the timer daemon in the foreground
    Daemon(DaemonArgs),

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Saved setup actions
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SetupsCommand {
    /// List saved setups
    List,

    /// Save the current durations as a setup
    Save,

    /// Apply a saved setup
    Apply {
        /// List number, signature such as 50m/10m/20m/3, or id
        setup: String,
    },

    /// Delete a saved setup
    Delete {
        /// List number, signature such as 50m/10m/20m/3, or id
        setup: String,
    },
}

/// Arguments for the daemon command
#[derive(Args, Debug, Clone, Default)]
pub struct DaemonArgs {
    /// Settings file (defaults to ~/.flow/settings.json)
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,
}

// ============================================================================
// Setting Keys
// ============================================================================

/// Settings that can be changed from the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    /// Work duration in minutes
    Work,
    /// Short break duration in minutes
    ShortBreak,
    /// Long break duration in minutes
    LongBreak,
    /// Work sessions before a long break
    Sessions,
    /// Start breaks automatically
    AutoStartBreak,
    /// Start work sessions automatically after a break
    AutoStartWork,
    /// Play a sound when a phase completes
    Sound,
    /// Print the status when the daemon launches
    ShowWindow,
}

impl SettingKey {
    /// Parses `value` into a typed setting.
    ///
    /// # Errors
    ///
    /// Returns a message if the value has the wrong shape for this key.
    /// Range checks happen in the daemon.
    pub fn parse_value(self, value: &str) -> Result<Setting, String> {
        match self {
            SettingKey::Work => parse_number(value).map(Setting::WorkDuration),
            SettingKey::ShortBreak => parse_number(value).map(Setting::ShortBreakDuration),
            SettingKey::LongBreak => parse_number(value).map(Setting::LongBreakDuration),
            SettingKey::Sessions => parse_number(value).map(Setting::SessionsBeforeLongBreak),
            SettingKey::AutoStartBreak => parse_switch(value).map(Setting::AutoStartBreak),
            SettingKey::AutoStartWork => parse_switch(value).map(Setting::AutoStartWork),
            SettingKey::Sound => parse_switch(value).map(Setting::PlaySoundOnComplete),
            SettingKey::ShowWindow => parse_switch(value).map(Setting::ShowWindowAtLaunch),
        }
    }
}

fn parse_number(value: &str) -> Result<u32, String> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("'{value}' is not a whole number"))
}

fn parse_switch(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => Err(format!("'{value}' is not on/off")),
    }
}

// ============================================================================
// Tests
// ============================================================================
