//! Daemon module for the Flow timer.
//!
//! This module contains the core daemon functionality:
//! - `timer`: Timer engine with phase transitions and countdown logic
//! - `completion`: Chime and auto-start reactions to finished phases
//! - `ipc`: Unix socket server and request dispatch

pub mod completion;
pub mod ipc;
pub mod timer;

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;

use crate::settings::SettingsStore;

pub use completion::{Chime, CompletionListener, MockChime, TerminalBell};
pub use ipc::{default_socket_path, IpcError, IpcServer, RequestHandler};
pub use timer::{EventFilter, PhaseCompletion, StateField, TimerEngine, TimerEvent};

/// A running daemon: engine, completion listener and IPC server.
pub struct Daemon {
    engine: TimerEngine,
    server: IpcServer,
    listener: JoinHandle<()>,
}

impl Daemon {
    /// Wires up the engine around `store` and binds the socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub async fn start(socket_path: &Path, store: SettingsStore, chime: Arc<dyn Chime>) -> Result<Self> {
        let engine = TimerEngine::new(store.into_shared()).await;
        let listener = CompletionListener::new(engine.clone(), chime).spawn().await;
        let server = IpcServer::new(socket_path)?;

        Ok(Self {
            engine,
            server,
            listener,
        })
    }

    /// Returns the engine handle.
    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    /// Serves requests until `shutdown` resolves, then stops the timer.
    pub async fn serve<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        self.server
            .serve(RequestHandler::new(self.engine.clone()), shutdown)
            .await;

        self.engine.pause().await;
        self.listener.abort();
        tracing::info!("daemon stopped");
    }
}
