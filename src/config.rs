use std::time::Duration;

use serde::Deserialize;

use crate::probe::DEFAULT_API_BASE;
use crate::query::DEFAULT_PAGE_SIZE;
use crate::scanner::{DEFAULT_CONCURRENCY, MAX_CONCURRENCY};

/// Runtime settings for the controller and probe client.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScanConfig {
    /// Primary target list: URL or file path. `None` uses the bundled list.
    pub source: Option<String>,
    pub concurrency: usize,
    pub api_base: String,
    /// Per-request timeout for the HTTP probe client.
    pub timeout_ms: Option<u64>,
    pub page_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            source: None,
            concurrency: DEFAULT_CONCURRENCY,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_ms: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ScanConfig {
    /// Concurrency clamped into `1..=MAX_CONCURRENCY`.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(1, MAX_CONCURRENCY)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.filter(|&ms| ms > 0).map(Duration::from_millis)
    }
}
