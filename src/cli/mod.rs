//! CLI module for the Flow timer.
//!
//! This module provides the command-line interface:
//! - `commands`: Command definitions using clap derive
//! - `client`: IPC client for daemon communication
//! - `display`: Output formatting and display logic

pub mod client;
pub mod commands;
pub mod display;

pub use client::{resolve_setup, IpcClient};
pub use commands::{Cli, Commands, DaemonArgs, SettingKey, SetupsCommand};
pub use display::Display;
