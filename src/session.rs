//! Lifecycle and progress of one scan.
//!
//! A session is created per scan and replaced when the next scan starts.
//! Nothing here is global: the controller holds the current session and the
//! scheduler's workers hold a clone of the same `Arc`.
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Idle,
    Running,
    /// Stop was requested; in-flight probes may still land.
    Cancelling,
    /// Stopped and every worker has exited.
    Cancelled,
    Completed,
}

impl Lifecycle {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Lifecycle::Running,
            2 => Lifecycle::Cancelling,
            3 => Lifecycle::Cancelled,
            4 => Lifecycle::Completed,
            _ => Lifecycle::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Lifecycle::Idle => 0,
            Lifecycle::Running => 1,
            Lifecycle::Cancelling => 2,
            Lifecycle::Cancelled => 3,
            Lifecycle::Completed => 4,
        }
    }

    /// Whether the caller should treat the scan as active.
    pub fn is_active(self) -> bool {
        self == Lifecycle::Running
    }

    pub fn is_finished(self) -> bool {
        matches!(self, Lifecycle::Cancelled | Lifecycle::Completed)
    }
}

#[derive(Debug)]
pub struct ScanSession {
    id: u64,
    total: u64,
    checked: AtomicU64,
    state: AtomicU8,
    cancel: CancellationToken,
    started: Instant,
}

impl ScanSession {
    /// A running session over `total` targets.
    pub fn new(id: u64, total: u64) -> Self {
        Self::with_cancel(id, total, CancellationToken::new())
    }

    pub fn with_cancel(id: u64, total: u64, cancel: CancellationToken) -> Self {
        Self {
            id,
            total,
            checked: AtomicU64::new(0),
            state: AtomicU8::new(Lifecycle::Running.as_u8()),
            cancel,
            started: Instant::now(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn checked(&self) -> u64 {
        self.checked.load(Ordering::Acquire)
    }

    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Count one finished target. Saturates at `total`.
    pub fn record_checked(&self) -> bool {
        self.checked
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.total).then_some(n + 1)
            })
            .is_ok()
    }

    /// Signal workers to stop claiming. Returns `false` if the session was not
    /// running.
    pub fn request_cancel(&self) -> bool {
        self.cancel.cancel();
        self.transition(Lifecycle::Running, Lifecycle::Cancelling)
    }

    /// Called once every worker has exited.
    pub fn finish(&self) -> Lifecycle {
        let end = if self.cancel.is_cancelled() {
            Lifecycle::Cancelled
        } else {
            Lifecycle::Completed
        };
        // Running -> end, or Cancelling -> Cancelled.
        if !self.transition(Lifecycle::Running, end) {
            self.transition(Lifecycle::Cancelling, Lifecycle::Cancelled);
        }
        self.lifecycle()
    }

    fn transition(&self, from: Lifecycle, to: Lifecycle) -> bool {
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn progress_percent(&self) -> u8 {
        percent(self.checked(), self.total)
    }
}

fn percent(checked: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let p = (checked as f64 / total as f64 * 100.0).round();
    p.clamp(0.0, 100.0) as u8
}

/// Progress snapshot exposed to the presentation layer.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionStatus {
    pub session_id: Option<u64>,
    pub state: Lifecycle,
    pub checked: u64,
    pub total: u64,
    pub progress_percent: u8,
    pub online_found: usize,
    pub source: String,
    pub elapsed_ms: u64,
}

impl SessionStatus {
    /// Status when no scan has been started. `total` is the size of the
    /// currently loaded target list.
    pub fn idle(total: u64, online_found: usize, source: impl Into<String>) -> Self {
        Self {
            session_id: None,
            state: Lifecycle::Idle,
            checked: 0,
            total,
            progress_percent: 0,
            online_found,
            source: source.into(),
            elapsed_ms: 0,
        }
    }

    pub fn of(session: &ScanSession, online_found: usize, source: impl Into<String>) -> Self {
        Self {
            session_id: Some(session.id()),
            state: session.lifecycle(),
            checked: session.checked(),
            total: session.total(),
            progress_percent: session.progress_percent(),
            online_found,
            source: source.into(),
            elapsed_ms: u64::try_from(session.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }
}
