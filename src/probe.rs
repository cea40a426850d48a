use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::ProbeError;
use crate::types::{ProbeOutcome, StatusRecord};

pub const DEFAULT_API_BASE: &str = "https://api.mcstatus.io/v2";

/// Narrow contract between the scheduler and the status service.
///
/// Implementors supply the raw fetches; [`ProbeClient::probe`] turns a status
/// document into an outcome and is what the scheduler calls.
#[async_trait]
pub trait ProbeClient: Send + Sync {
    /// Raw status document for `host`.
    async fn status(&self, host: &str) -> Result<Value, ProbeError>;

    /// Raw query document for `host`. Only the detail view uses it; clients
    /// without a query endpoint answer `Null`.
    async fn query(&self, _host: &str) -> Result<Value, ProbeError> {
        Ok(Value::Null)
    }

    /// Probe one target. Never fails: errors become [`ProbeOutcome::Failed`].
    async fn probe(&self, target: &str) -> ProbeOutcome {
        match self.status(target).await {
            Ok(doc) => classify(target, &doc),
            Err(e) => ProbeOutcome::Failed(e),
        }
    }
}

/// Map a status document to an outcome. Anything but `"online": true` is
/// unreachable.
pub fn classify(target: &str, doc: &Value) -> ProbeOutcome {
    if doc.get("online").and_then(Value::as_bool) == Some(true) {
        ProbeOutcome::Reachable(StatusRecord::from_status(target, doc))
    } else {
        ProbeOutcome::Unreachable
    }
}

/// Client for the mcstatus.io v2 Java edition endpoints.
#[derive(Debug, Clone)]
pub struct McStatusClient {
    http: reqwest::Client,
    api_base: String,
}

impl McStatusClient {
    /// `timeout` bounds each HTTP request; `None` leaves requests unbounded.
    pub fn new(api_base: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ProbeError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let http = builder.build()?;
        let api_base = api_base.into().trim_end_matches('/').to_string();
        Ok(Self { http, api_base })
    }

    pub fn status_url(&self, host: &str) -> String {
        format!("{}/status/java/{}", self.api_base, host)
    }

    pub fn query_url(&self, host: &str) -> String {
        format!("{}/query/java/{}", self.api_base, host)
    }

    async fn get_json(&self, url: &str) -> Result<Value, ProbeError> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            debug!(%url, %status, "status service returned non-success");
            return Err(ProbeError::Status(status.as_u16()));
        }
        Ok(resp.json::<Value>().await?)
    }
}

#[async_trait]
impl ProbeClient for McStatusClient {
    async fn status(&self, host: &str) -> Result<Value, ProbeError> {
        self.get_json(&self.status_url(host)).await
    }

    async fn query(&self, host: &str) -> Result<Value, ProbeError> {
        self.get_json(&self.query_url(host)).await
    }
}
