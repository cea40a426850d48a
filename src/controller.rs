use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::ScanConfig;
use crate::details::{self, ServerDetails};
use crate::error::{ControlError, ProbeError};
use crate::probe::{McStatusClient, ProbeClient};
use crate::query::{FilterCriteria, QueryPage, SortKey, ViewState};
use crate::scanner::{self, ScanSummary};
use crate::session::{Lifecycle, ScanSession, SessionStatus};
use crate::source::{self, TargetList};
use crate::store::ResultStore;
use crate::types::{StatusRecord, Target};

/// Partial update of the view; absent fields are left as they are.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ViewUpdate {
    pub criteria: Option<FilterCriteria>,
    pub sort: Option<SortKey>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

/// Control surface over the scanner: start/stop, progress, results and the
/// filter/sort/page view.
///
/// Cloning yields another handle to the same controller.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<Inner>,
}

struct Inner {
    probe: Arc<dyn ProbeClient>,
    store: ResultStore,
    concurrency: usize,
    source_location: Option<String>,
    state: RwLock<ControlState>,
    view: Mutex<ViewState>,
}

struct ControlState {
    targets: Arc<[Target]>,
    source: String,
    session: Option<Arc<ScanSession>>,
    task: Option<JoinHandle<ScanSummary>>,
    last_summary: Option<ScanSummary>,
    next_session_id: u64,
}

impl Controller {
    pub fn new(probe: Arc<dyn ProbeClient>, targets: TargetList, config: &ScanConfig) -> Self {
        let mut view = ViewState::default();
        view.set_page_size(config.page_size);
        Self {
            inner: Arc::new(Inner {
                probe,
                store: ResultStore::new(),
                concurrency: config.effective_concurrency(),
                source_location: config.source.clone(),
                state: RwLock::new(ControlState {
                    targets: targets.targets.into(),
                    source: targets.source,
                    session: None,
                    task: None,
                    last_summary: None,
                    next_session_id: 1,
                }),
                view: Mutex::new(view),
            }),
        }
    }

    /// Build the HTTP probe client and load targets as configured.
    pub async fn from_config(config: &ScanConfig) -> Result<Self> {
        let client = McStatusClient::new(config.api_base.clone(), config.timeout())?;
        let targets = source::load_targets(config.source.as_deref()).await;
        Ok(Self::new(Arc::new(client), targets, config))
    }

    pub fn store(&self) -> &ResultStore {
        &self.inner.store
    }

    /// Start a scan with the configured concurrency.
    pub async fn start_scan(&self, reset_results: bool) -> Result<SessionStatus, ControlError> {
        self.start_scan_with(reset_results, None).await
    }

    /// Start a new session over the current target list.
    ///
    /// `reset_results` empties the result set first; otherwise prior records
    /// stay and are refreshed by the new probes. A stopped session blocks a
    /// new start until its in-flight probes have landed.
    pub async fn start_scan_with(
        &self,
        reset_results: bool,
        concurrency: Option<usize>,
    ) -> Result<SessionStatus, ControlError> {
        let mut state = self.inner.state.write().await;
        if let Some(s) = &state.session {
            match s.lifecycle() {
                Lifecycle::Running => return Err(ControlError::AlreadyRunning),
                Lifecycle::Cancelling => return Err(ControlError::Stopping),
                _ => {}
            }
        }
        if state.targets.is_empty() {
            return Err(ControlError::NoTargets);
        }
        if reset_results {
            self.inner.store.clear().await;
        }

        let id = state.next_session_id;
        state.next_session_id += 1;
        let targets = state.targets.clone();
        let session = Arc::new(ScanSession::new(id, targets.len() as u64));
        let concurrency = concurrency
            .map(|c| c.clamp(1, scanner::MAX_CONCURRENCY))
            .unwrap_or(self.inner.concurrency);

        let task = tokio::spawn({
            let probe = self.inner.probe.clone();
            let store = self.inner.store.clone();
            let session = session.clone();
            let this = self.clone();
            async move {
                let summary = scanner::run_session(targets, probe, store, session, concurrency).await;
                this.record_summary(&summary).await;
                summary
            }
        });

        info!(session = id, reset_results, concurrency, "scan requested");
        state.session = Some(session.clone());
        state.task = Some(task);
        Ok(SessionStatus::of(
            &session,
            self.inner.store.len().await,
            state.source.clone(),
        ))
    }

    async fn record_summary(&self, summary: &ScanSummary) {
        let mut state = self.inner.state.write().await;
        let current = state.session.as_ref().map(|s| s.id());
        if current == Some(summary.session_id) {
            state.last_summary = Some(summary.clone());
        }
    }

    /// Stop claiming new targets. The session reads as stopped immediately;
    /// probes already in flight still land.
    pub async fn stop_scan(&self) -> SessionStatus {
        {
            let state = self.inner.state.read().await;
            if let Some(s) = &state.session {
                if s.request_cancel() {
                    info!(session = s.id(), checked = s.checked(), "scan stop requested");
                }
            }
        }
        self.status().await
    }

    pub async fn status(&self) -> SessionStatus {
        let online = self.inner.store.len().await;
        let state = self.inner.state.read().await;
        match &state.session {
            Some(s) => SessionStatus::of(s, online, state.source.clone()),
            None => SessionStatus::idle(state.targets.len() as u64, online, state.source.clone()),
        }
    }

    /// Summary of the most recent session once it has finished.
    pub async fn last_summary(&self) -> Option<ScanSummary> {
        self.inner.state.read().await.last_summary.clone()
    }

    /// Wait for the current session's workers to exit.
    pub async fn wait(&self) -> Option<ScanSummary> {
        let task = self.inner.state.write().await.task.take()?;
        match task.await {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(error = %e, "scan task failed");
                None
            }
        }
    }

    pub async fn snapshot(&self) -> Vec<StatusRecord> {
        self.inner.store.snapshot().await
    }

    /// Re-run the target source. The new list applies to the next session.
    pub async fn reload_targets(&self) -> usize {
        let list = source::load_targets(self.inner.source_location.as_deref()).await;
        let count = list.len();
        let mut state = self.inner.state.write().await;
        state.targets = list.targets.into();
        state.source = list.source;
        count
    }

    pub async fn set_filter(&self, criteria: FilterCriteria) {
        self.inner.view.lock().await.set_filter(criteria);
    }

    pub async fn set_sort(&self, sort: SortKey) {
        self.inner.view.lock().await.set_sort(sort);
    }

    pub async fn set_page(&self, page: usize) {
        self.inner.view.lock().await.set_page(page);
    }

    pub async fn set_page_size(&self, page_size: usize) {
        self.inner.view.lock().await.set_page_size(page_size);
    }

    /// Apply `update`: criteria, then sort, then page size, then page, so an
    /// explicit page survives the reset the other setters cause.
    pub async fn update_view(&self, update: ViewUpdate) -> QueryPage {
        {
            let mut view = self.inner.view.lock().await;
            if let Some(c) = update.criteria {
                view.set_filter(c);
            }
            if let Some(s) = update.sort {
                view.set_sort(s);
            }
            if let Some(size) = update.page_size {
                view.set_page_size(size);
            }
            if let Some(p) = update.page {
                view.set_page(p);
            }
        }
        self.view().await
    }

    /// Current page of the filtered, sorted results over a fresh snapshot.
    pub async fn view(&self) -> QueryPage {
        let snapshot = self.inner.store.snapshot().await;
        self.inner.view.lock().await.apply(&snapshot)
    }

    pub async fn view_state(&self) -> ViewState {
        self.inner.view.lock().await.clone()
    }

    /// Detail lookup for one host, independent of any scan.
    pub async fn details(&self, host: &str) -> Result<ServerDetails, ProbeError> {
        details::lookup(self.inner.probe.as_ref(), host).await
    }
}
