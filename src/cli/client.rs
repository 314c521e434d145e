//! IPC client for communicating with the Flow daemon.
//!
//! This module provides:
//! - Unix Domain Socket client
//! - Request/response handling
//! - Connection retry logic (requests are never resent)
//! - Resolution of saved setup selectors

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::timeout;
use uuid::Uuid;

use crate::daemon::ipc::default_socket_path;
use crate::types::{IpcRequest, IpcResponse, Setting, TimerSetup};

// ============================================================================
// Constants
// ============================================================================

/// Connection timeout in seconds
const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Read/write timeout in seconds
const IO_TIMEOUT_SECS: u64 = 5;

/// Maximum response size in bytes (64KB)
const MAX_RESPONSE_SIZE: u64 = 65536;

/// Maximum retry attempts
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds (base delay, multiplied by attempt number)
const RETRY_DELAY_MS: u64 = 500;

// ============================================================================
// Setup selectors
// ============================================================================

/// Finds a saved setup by 1-based list position, signature or id.
pub fn resolve_setup<'a>(selector: &str, setups: &'a [TimerSetup]) -> Option<&'a TimerSetup> {
    let selector = selector.trim();

    if let Ok(position) = selector.parse::<usize>() {
        return position.checked_sub(1).and_then(|index| setups.get(index));
    }

    if let Some(setup) = setups.iter().find(|s| s.display_name() == selector) {
        return Some(setup);
    }

    let id = Uuid::parse_str(selector).ok()?;
    setups.iter().find(|s| s.id == id)
}

// ============================================================================
// IpcClient
// ============================================================================

/// IPC client for daemon communication.
pub struct IpcClient {
    /// Socket path
    socket_path: PathBuf,
    /// Connection timeout
    timeout: Duration,
}

impl IpcClient {
    /// Creates a new IPC client with the default socket path.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        Ok(Self::with_socket_path(default_socket_path()?))
    }

    /// Creates a new IPC client with a custom socket path.
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: Duration::from_secs(CONNECTION_TIMEOUT_SECS),
        }
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub async fn start(&self) -> Result<IpcResponse> {
        self.send(&IpcRequest::Start).await
    }

    pub async fn pause(&self) -> Result<IpcResponse> {
        self.send(&IpcRequest::Pause).await
    }

    pub async fn toggle(&self) -> Result<IpcResponse> {
        self.send(&IpcRequest::Toggle).await
    }

    pub async fn reset(&self) -> Result<IpcResponse> {
        self.send(&IpcRequest::Reset).await
    }

    pub async fn skip(&self) -> Result<IpcResponse> {
        self.send(&IpcRequest::Skip).await
    }

    pub async fn status(&self) -> Result<IpcResponse> {
        self.send(&IpcRequest::Status).await
    }

    pub async fn settings(&self) -> Result<IpcResponse> {
        self.send(&IpcRequest::Settings).await
    }

    pub async fn set(&self, setting: Setting) -> Result<IpcResponse> {
        self.send(&IpcRequest::Set { setting }).await
    }

    pub async fn list_setups(&self) -> Result<IpcResponse> {
        self.send(&IpcRequest::ListSetups).await
    }

    pub async fn save_setup(&self) -> Result<IpcResponse> {
        self.send(&IpcRequest::SaveSetup).await
    }

    /// Applies the saved setup matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns an error if no saved setup matches or the daemon rejects it.
    pub async fn apply_setup(&self, selector: &str) -> Result<IpcResponse> {
        let id = self.find_setup_id(selector).await?;
        self.send(&IpcRequest::ApplySetup { id }).await
    }

    /// Deletes the saved setup matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns an error if no saved setup matches.
    pub async fn delete_setup(&self, selector: &str) -> Result<IpcResponse> {
        let id = self.find_setup_id(selector).await?;
        self.send(&IpcRequest::DeleteSetup { id }).await
    }

    async fn find_setup_id(&self, selector: &str) -> Result<Uuid> {
        let response = self.list_setups().await?;
        let setups = response.data.and_then(|d| d.setups).unwrap_or_default();

        resolve_setup(selector, &setups)
            .map(|setup| setup.id)
            .with_context(|| format!("No saved setup matches '{selector}'"))
    }

    /// Sends a request and fails on error responses.
    async fn send(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let stream = self.connect_with_retry().await?;
        let response = self.send_request(stream, request).await?;

        if response.is_error() {
            anyhow::bail!("{}", response.message);
        }

        Ok(response)
    }

    /// Connects to the daemon, retrying failed connection attempts.
    ///
    /// Only connecting is retried. Once a request was written the daemon may
    /// already have applied it, so sending twice could skip two phases.
    async fn connect_with_retry(&self) -> Result<UnixStream> {
        let mut attempt = 1;

        loop {
            match self.connect().await {
                Ok(stream) => return Ok(stream),
                Err(e) if attempt < MAX_RETRIES => {
                    tracing::warn!("connection failed (attempt {}/{}): {:#}", attempt, MAX_RETRIES, e);
                    let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt));
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn connect(&self) -> Result<UnixStream> {
        timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("Timed out connecting to the daemon")?
            .context("Cannot connect to the daemon. Start it with 'flow daemon'")
    }

    /// Sends a single request over `stream` and reads the response.
    async fn send_request(&self, mut stream: UnixStream, request: &IpcRequest) -> Result<IpcResponse> {
        let request_json = serde_json::to_vec(request).context("Failed to serialize request")?;

        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            stream.write_all(&request_json),
        )
        .await
        .context("Timed out sending request")?
        .context("Failed to send request")?;

        // Shutdown write side to signal end of request
        stream
            .shutdown()
            .await
            .context("Failed to finish request")?;

        let mut buffer = Vec::new();
        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            (&mut stream).take(MAX_RESPONSE_SIZE).read_to_end(&mut buffer),
        )
        .await
        .context("Timed out waiting for the daemon")?
        .context("Failed to receive response")?;

        if buffer.is_empty() {
            anyhow::bail!("No response from the daemon");
        }

        serde_json::from_slice(&buffer).context("Failed to parse response")
    }
}

// ============================================================================
// Tests
// ============================================================================
