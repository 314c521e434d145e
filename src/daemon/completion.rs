//! Reactions to finished phases.
//!
//! The engine only announces transitions. This listener rings the completion
//! chime and resumes the countdown when the matching auto-start flag is set.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::timer::{EventFilter, PhaseCompletion, TimerEngine, TimerEvent};

// ============================================================================
// Chime
// ============================================================================

/// Plays the completion sound.
pub trait Chime: Send + Sync {
    /// Plays the sound once without blocking.
    ///
    /// # Errors
    ///
    /// Returns an error if the output device could not be written.
    fn ring(&self) -> std::io::Result<()>;
}

/// Rings the terminal bell on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl Chime for TerminalBell {
    fn ring(&self) -> std::io::Result<()> {
        let mut stderr = std::io::stderr();
        stderr.write_all(b"\x07")?;
        stderr.flush()
    }
}

/// Chime that only counts how often it rang.
#[derive(Debug, Default)]
pub struct MockChime {
    rings: AtomicUsize,
}

impl MockChime {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ring_count(&self) -> usize {
        self.rings.load(Ordering::SeqCst)
    }
}

impl Chime for MockChime {
    fn ring(&self) -> std::io::Result<()> {
        self.rings.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// CompletionListener
// ============================================================================

/// Handles `PhaseCompleted` events for the daemon.
pub struct CompletionListener {
    engine: TimerEngine,
    chime: Arc<dyn Chime>,
}

impl CompletionListener {
    pub fn new(engine: TimerEngine, chime: Arc<dyn Chime>) -> Self {
        Self { engine, chime }
    }

    /// Subscribes to the engine and handles completions on a background task.
    pub async fn spawn(self) -> JoinHandle<()> {
        let events = self.engine.subscribe(EventFilter::PhaseCompleted).await;
        tokio::spawn(self.run(events))
    }

    async fn run(self, mut events: mpsc::UnboundedReceiver<TimerEvent>) {
        while let Some(event) = events.recv().await {
            if let TimerEvent::PhaseCompleted(completion) = event {
                self.on_phase_completed(completion).await;
            }
        }
    }

    /// Rings the chime if requested and applies the auto-start flags.
    ///
    /// Skipped phases never start on their own. Nothing starts if the timer
    /// was touched after the transition.
    pub async fn on_phase_completed(&self, completion: PhaseCompletion) {
        if completion.chime {
            if let Err(e) = self.chime.ring() {
                tracing::warn!(error = %e, "failed to play completion sound");
            }
        }

        if !completion.natural {
            return;
        }

        let auto_start = self
            .engine
            .settings()
            .read()
            .await
            .should_auto_start(completion.next);

        if !auto_start {
            return;
        }

        if self.engine.start_after(&completion).await {
            tracing::info!(phase = completion.next.as_str(), "auto-started next phase");
        } else {
            tracing::debug!(phase = completion.next.as_str(), "timer changed, not auto-starting");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
