//! Progress and status reporting
//!
//! The pipeline never talks to a UI directly. Jobs and queues narrate through
//! an `InstallObserver`; transfers emit `TransferEvent`s through a callback
//! that the owning job relays.

use std::sync::Arc;
use tracing::{debug, info};

/// Progress of an operation on a 0..=100 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Percent(u8),
    /// Total size unknown; a UI should show a busy indicator
    Indeterminate,
}

impl Progress {
    /// Clamp to 100
    pub fn percent(value: u64) -> Self {
        Progress::Percent(value.min(100) as u8)
    }

    /// Fraction `done / total`, indeterminate when `total` is zero
    pub fn of(done: u64, total: u64) -> Self {
        if total == 0 {
            Progress::Indeterminate
        } else {
            Self::percent(done.saturating_mul(100) / total)
        }
    }

    /// Integer form with `-1` for indeterminate
    pub fn as_i32(&self) -> i32 {
        match self {
            Progress::Percent(p) => i32::from(*p),
            Progress::Indeterminate => -1,
        }
    }

    /// Map a 0..=100 value onto the `start..=end` band of a larger scale
    pub fn scale(self, start: u8, end: u8) -> Self {
        match self {
            Progress::Percent(p) => {
                let span = u32::from(end.saturating_sub(start));
                Progress::Percent(start + (span * u32::from(p) / 100) as u8)
            }
            Progress::Indeterminate => Progress::Indeterminate,
        }
    }
}

/// Observer contract for jobs and queues
///
/// Methods may be called from any thread, including the transfer task, and
/// must not block for long.
pub trait InstallObserver: Send + Sync {
    /// Human-readable narration
    fn on_status(&self, _message: &str) {}

    /// Overall progress of the observed operation
    fn on_progress(&self, _progress: Progress) {}

    /// Cancellation of the observed queue has been requested
    fn on_cancel_requested(&self) {}
}

/// Observer that ignores everything
#[derive(Debug, Default)]
pub struct NullObserver;

impl InstallObserver for NullObserver {}

/// Observer forwarding to `tracing`
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl InstallObserver for LoggingObserver {
    fn on_status(&self, message: &str) {
        info!("{}", message);
    }

    fn on_progress(&self, progress: Progress) {
        match progress {
            Progress::Percent(p) => debug!(percent = p, "progress"),
            Progress::Indeterminate => debug!("progress indeterminate"),
        }
    }

    fn on_cancel_requested(&self) {
        info!("Cancellation requested");
    }
}

/// Observer forwarding every call to several observers
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn InstallObserver>>,
}

impl std::fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_count", &self.observers.len())
            .finish()
    }
}

impl CompositeObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observer(mut self, observer: Arc<dyn InstallObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl InstallObserver for CompositeObserver {
    fn on_status(&self, message: &str) {
        for observer in &self.observers {
            observer.on_status(message);
        }
    }

    fn on_progress(&self, progress: Progress) {
        for observer in &self.observers {
            observer.on_progress(progress);
        }
    }

    fn on_cancel_requested(&self) {
        for observer in &self.observers {
            observer.on_cancel_requested();
        }
    }
}

/// Non-terminal events emitted by a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    Status(String),
    Progress(Progress),
}

/// Callback receiving transfer events, invoked on the transfer task
pub type TransferCallback = Arc<dyn Fn(TransferEvent) + Send + Sync>;
