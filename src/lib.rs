//! Flow Timer Library
//!
//! This library provides the core functionality for the Flow Pomodoro timer.
//! It includes:
//! - Settings store with durable key-value persistence and saved setups
//! - Timer engine for the work / short break / long break cycle
//! - IPC server/client for daemon-CLI communication
//! - CLI command parsing and display utilities
//! - Type definitions for phases, setups, snapshots and IPC messages

pub mod cli;
pub mod daemon;
pub mod settings;
pub mod types;

// Re-export commonly used types for convenience
pub use daemon::{
    Chime, CompletionListener, Daemon, EventFilter, PhaseCompletion, StateField, TerminalBell,
    TimerEngine, TimerEvent,
};
pub use settings::{
    JsonFileStore, KeyValueStore, MemoryStore, SettingsError, SettingsStore, SharedSettings,
};
pub use types::{
    IpcRequest, IpcResponse, ResponseData, Setting, SettingsSnapshot, TimerPhase, TimerSetup,
    TimerSnapshot, TimerState,
};
