//! IPC server for the Flow daemon.
//!
//! This module provides Unix Domain Socket IPC functionality:
//! - Server that listens on a Unix socket
//! - Request/response handling for timer and settings commands
//! - The accept loop that runs until shutdown
//!
//! One JSON request per connection, answered by one JSON response.

use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::time::{timeout, Duration};
use uuid::Uuid;

use crate::settings::storage::DATA_DIR_NAME;
use crate::settings::SharedSettings;
use crate::types::{IpcRequest, IpcResponse, ResponseData, Setting};

use super::timer::TimerEngine;

// ============================================================================
// Constants
// ============================================================================

/// Socket file name under the data directory.
pub const SOCKET_FILE_NAME: &str = "flow.sock";

/// Maximum request size in bytes (4KB)
pub const MAX_REQUEST_SIZE: usize = 4096;

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 5;

/// Returns `~/.flow/flow.sock`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn default_socket_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine the home directory")?;
    Ok(home.join(DATA_DIR_NAME).join(SOCKET_FILE_NAME))
}

// ============================================================================
// IpcError
// ============================================================================

/// IPC-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Read error
    #[error("Failed to read request: {0}")]
    ReadError(String),

    /// Client closed the connection without sending anything
    #[error("Connection closed by client")]
    ConnectionClosed,

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Request too large
    #[error("Request too large (max {MAX_REQUEST_SIZE} bytes)")]
    RequestTooLarge,
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix Domain Socket IPC server.
pub struct IpcServer {
    /// Unix socket listener
    listener: UnixListener,
    /// Socket path (for cleanup)
    socket_path: PathBuf,
}

impl IpcServer {
    /// Creates a new IPC server bound to the specified socket path.
    ///
    /// A stale socket file left by a previous run is removed first.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn new(socket_path: &Path) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .with_context(|| format!("Failed to remove existing socket: {}", socket_path.display()))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {}", parent.display()))?;
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {}", socket_path.display()))?;

        tracing::info!(path = %socket_path.display(), "IPC server listening");

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Accepts an incoming client connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be accepted.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        Ok(stream)
    }

    /// Reads one request, up to end of stream, and deserializes it.
    ///
    /// # Errors
    ///
    /// Returns an error if reading times out, the request exceeds
    /// [`MAX_REQUEST_SIZE`], or it is not a valid request.
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest> {
        let mut buffer = Vec::with_capacity(512);
        let limit = MAX_REQUEST_SIZE as u64 + 1;

        let read_result = timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            (&mut *stream).take(limit).read_to_end(&mut buffer),
        )
        .await;

        match read_result {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(IpcError::ReadError(e.to_string()).into()),
            Err(_) => return Err(IpcError::Timeout.into()),
        }

        if buffer.is_empty() {
            return Err(IpcError::ConnectionClosed.into());
        }
        if buffer.len() > MAX_REQUEST_SIZE {
            return Err(IpcError::RequestTooLarge.into());
        }

        let request: IpcRequest =
            serde_json::from_slice(&buffer).context("Failed to deserialize IPC request")?;

        Ok(request)
    }

    /// Serializes and sends an IPC response to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub async fn send_response(stream: &mut UnixStream, response: &IpcResponse) -> Result<()> {
        let json = serde_json::to_vec(response).context("Failed to serialize IPC response")?;

        stream
            .write_all(&json)
            .await
            .context("Failed to write response")?;
        stream.flush().await.context("Failed to flush response")?;

        Ok(())
    }

    /// Accepts connections and answers requests until `shutdown` resolves.
    ///
    /// Each connection is served on its own task.
    pub async fn serve<F>(&self, handler: RequestHandler, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutting down IPC server");
                    break;
                }
                accepted = self.accept() => match accepted {
                    Ok(stream) => {
                        let handler = handler.clone();
                        tokio::spawn(async move { handler.serve_connection(stream).await });
                    }
                    Err(e) => tracing::warn!(error = %e, "failed to accept connection"),
                },
            }
        }
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

// ============================================================================
// RequestHandler
// ============================================================================

/// Dispatches IPC requests to the engine and the settings store.
#[derive(Clone)]
pub struct RequestHandler {
    engine: TimerEngine,
    settings: SharedSettings,
}

impl RequestHandler {
    /// Creates a handler driving `engine` and the settings it reads.
    pub fn new(engine: TimerEngine) -> Self {
        let settings = engine.settings().clone();
        Self { engine, settings }
    }

    /// Reads one request from `stream` and writes the response back.
    pub async fn serve_connection(&self, mut stream: UnixStream) {
        let response = match IpcServer::receive_request(&mut stream).await {
            Ok(request) => {
                tracing::debug!(?request, "handling request");
                self.handle(request).await
            }
            Err(e) => {
                tracing::warn!(error = %e, "rejected IPC request");
                IpcResponse::error(e.to_string())
            }
        };

        if let Err(e) = IpcServer::send_response(&mut stream, &response).await {
            tracing::warn!(error = %e, "failed to send IPC response");
        }
    }

    /// Handles an IPC request and returns the appropriate response.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::Start => {
                self.engine.start().await;
                self.timer_response("Timer started").await
            }
            IpcRequest::Pause => {
                self.engine.pause().await;
                self.timer_response("Timer paused").await
            }
            IpcRequest::Toggle => {
                self.engine.toggle().await;
                let running = self.engine.state().await.is_running;
                self.timer_response(if running { "Timer started" } else { "Timer paused" })
                    .await
            }
            IpcRequest::Reset => {
                self.engine.reset().await;
                self.timer_response("Timer reset").await
            }
            IpcRequest::Skip => {
                self.engine.skip().await;
                self.timer_response("Skipped to next phase").await
            }
            IpcRequest::Status => self.timer_response("").await,
            IpcRequest::Settings => {
                let snapshot = self.settings.read().await.snapshot();
                IpcResponse::success("", Some(ResponseData::settings(snapshot)))
            }
            IpcRequest::Set { setting } => self.handle_set(setting).await,
            IpcRequest::SaveSetup => self.handle_save_setup().await,
            IpcRequest::ApplySetup { id } => self.handle_apply_setup(id).await,
            IpcRequest::DeleteSetup { id } => self.handle_delete_setup(id).await,
            IpcRequest::ListSetups => {
                let setups = self.settings.read().await.saved_setups().to_vec();
                IpcResponse::success("", Some(ResponseData::setups(setups)))
            }
        }
    }

    async fn timer_response(&self, message: &str) -> IpcResponse {
        IpcResponse::success(message, Some(ResponseData::timer(self.engine.snapshot().await)))
    }

    async fn timer_and_settings_response(&self, message: String) -> IpcResponse {
        let settings = self.settings.read().await.snapshot();
        let timer = self.engine.snapshot().await;
        IpcResponse::success(
            message,
            Some(ResponseData {
                timer: Some(timer),
                settings: Some(settings),
                setups: None,
            }),
        )
    }

    async fn handle_set(&self, setting: Setting) -> IpcResponse {
        let result = self.settings.write().await.apply(setting);
        if let Err(e) = result {
            return IpcResponse::error(e.to_string());
        }

        if setting.affects_timer() {
            self.engine.update_from_settings().await;
        }

        self.timer_and_settings_response(format!("Updated {}", setting.key()))
            .await
    }

    async fn handle_save_setup(&self) -> IpcResponse {
        let mut settings = self.settings.write().await;
        let name = settings.current_setup().display_name();
        let message = if settings.save_current_setup() {
            format!("Saved setup {name}")
        } else {
            format!("Setup {name} is already saved")
        };

        IpcResponse::success(message, Some(ResponseData::setups(settings.saved_setups().to_vec())))
    }

    async fn handle_apply_setup(&self, id: Uuid) -> IpcResponse {
        let result = {
            let mut settings = self.settings.write().await;
            match settings.find_setup(id).cloned() {
                Some(setup) => settings.apply_setup(&setup).map(|()| setup),
                None => return IpcResponse::error(format!("No saved setup with id {id}")),
            }
        };

        match result {
            Ok(setup) => {
                self.engine.update_from_settings().await;
                self.timer_and_settings_response(format!("Applied setup {}", setup.display_name()))
                    .await
            }
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    async fn handle_delete_setup(&self, id: Uuid) -> IpcResponse {
        let mut settings = self.settings.write().await;
        let Some(name) = settings.find_setup(id).map(|s| s.display_name()) else {
            return IpcResponse::error(format!("No saved setup with id {id}"));
        };

        settings.delete_setup(id);
        IpcResponse::success(
            format!("Deleted setup {name}"),
            Some(ResponseData::setups(settings.saved_setups().to_vec())),
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
