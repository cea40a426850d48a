use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::probe::ProbeClient;
use crate::session::{Lifecycle, ScanSession};
use crate::store::ResultStore;
use crate::types::{ProbeOutcome, StatusRecord, Target};

/// Default number of probes in flight.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Upper bound applied to caller-supplied concurrency.
pub const MAX_CONCURRENCY: usize = 512;

/// Counters for one finished (or stopped) scan.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub session_id: u64,
    pub state: Lifecycle,
    pub workers: usize,
    pub total: u64,
    pub checked: u64,
    pub reachable: u64,
    pub unreachable: u64,
    pub failed: u64,
}

/// Summary plus the records gathered into the store.
#[derive(Serialize, Debug, Clone)]
pub struct ScanResults {
    pub summary: ScanSummary,
    pub records: Vec<StatusRecord>,
}

/// Scan `targets` to completion with a fresh store.
pub async fn scan_targets(
    targets: &[Target],
    probe: Arc<dyn ProbeClient>,
    concurrency: usize,
) -> ScanResults {
    scan_targets_with_cancel(targets, probe, concurrency, CancellationToken::new()).await
}

/// Variant that accepts a `CancellationToken` to allow external cancellation.
pub async fn scan_targets_with_cancel(
    targets: &[Target],
    probe: Arc<dyn ProbeClient>,
    concurrency: usize,
    cancel: CancellationToken,
) -> ScanResults {
    let store = ResultStore::new();
    let session = Arc::new(ScanSession::with_cancel(1, targets.len() as u64, cancel));
    let summary = run_session(targets.into(), probe, store.clone(), session, concurrency).await;
    ScanResults {
        summary,
        records: store.snapshot().await,
    }
}

/// Everything the workers share. The claim cursor and the store are the only
/// mutable pieces; both are reached through methods on this type.
struct ScanCoordinator {
    targets: Arc<[Target]>,
    cursor: AtomicUsize,
    session: Arc<ScanSession>,
    store: ResultStore,
    probe: Arc<dyn ProbeClient>,
    reachable: AtomicU64,
    unreachable: AtomicU64,
    failed: AtomicU64,
}

impl ScanCoordinator {
    /// Claim the next unclaimed target, unless cancelled or exhausted.
    fn claim(&self) -> Option<usize> {
        if self.session.is_cancelled() {
            return None;
        }
        let len = self.targets.len();
        self.cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| {
                (i < len).then_some(i + 1)
            })
            .ok()
    }

    async fn settle(&self, target: &str, outcome: ProbeOutcome) {
        match outcome {
            ProbeOutcome::Reachable(record) => {
                self.reachable.fetch_add(1, Ordering::Relaxed);
                if record.identity() != Some(target) {
                    debug!(%target, resolved = record.display_identity(), "service reported canonical address");
                }
                self.store.merge(record).await;
            }
            ProbeOutcome::Unreachable => {
                self.unreachable.fetch_add(1, Ordering::Relaxed);
                debug!(%target, "offline");
            }
            ProbeOutcome::Failed(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                debug!(%target, error = %e, "probe failed");
            }
        }
        self.session.record_checked();
    }
}

/// Drive `session` over `targets` with at most `concurrency` probes in flight.
///
/// - Starts `min(concurrency, targets.len())` workers sharing one cursor.
/// - Reachable records are merged into `store` under their own resolved
///   identity, which may differ from the probed target.
/// - Every claimed target bumps `checked` exactly once, whatever the outcome.
/// - Cancellation stops further claims; in-flight probes finish and may still
///   merge.
pub async fn run_session(
    targets: Arc<[Target]>,
    probe: Arc<dyn ProbeClient>,
    store: ResultStore,
    session: Arc<ScanSession>,
    concurrency: usize,
) -> ScanSummary {
    let workers = concurrency.clamp(1, MAX_CONCURRENCY).min(targets.len());
    info!(
        session = session.id(),
        total = targets.len(),
        workers,
        "scan started"
    );

    let coord = Arc::new(ScanCoordinator {
        targets,
        cursor: AtomicUsize::new(0),
        session: session.clone(),
        store,
        probe,
        reachable: AtomicU64::new(0),
        unreachable: AtomicU64::new(0),
        failed: AtomicU64::new(0),
    });

    let mut set = JoinSet::new();
    for _ in 0..workers {
        let coord = coord.clone();
        set.spawn(async move {
            while let Some(idx) = coord.claim() {
                let target = &coord.targets[idx];
                let outcome = coord.probe.probe(target).await;
                coord.settle(target, outcome).await;
            }
        });
    }

    while let Some(res) = set.join_next().await {
        if let Err(e) = res {
            warn!(error = %e, "scan worker aborted");
        }
    }

    let state = session.finish();
    let summary = ScanSummary {
        session_id: session.id(),
        state,
        workers,
        total: session.total(),
        checked: session.checked(),
        reachable: coord.reachable.load(Ordering::Relaxed),
        unreachable: coord.unreachable.load(Ordering::Relaxed),
        failed: coord.failed.load(Ordering::Relaxed),
    };
    info!(
        session = summary.session_id,
        state = ?summary.state,
        checked = summary.checked,
        total = summary.total,
        reachable = summary.reachable,
        "scan finished"
    );
    summary
}
