//! Single-host detail lookup: the status document plus the optional query
//! document, folded into one view.
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::ProbeError;
use crate::identity::{self, PLAYER_LIST_FIELDS, WHITELIST_FIELDS};
use crate::probe::ProbeClient;
use crate::types::{PlayerSample, StatusRecord};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WhitelistStatus {
    Enabled,
    Disabled,
    Unknown,
}

impl WhitelistStatus {
    /// First whitelist flag present in the status document, then the query
    /// document. A present non-boolean value means `Unknown`.
    pub fn resolve(status: &Value, query: &Value) -> Self {
        match identity::first_present(&[status, query], WHITELIST_FIELDS).and_then(Value::as_bool) {
            Some(true) => WhitelistStatus::Enabled,
            Some(false) => WhitelistStatus::Disabled,
            None => WhitelistStatus::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WhitelistStatus::Enabled => "Enabled",
            WhitelistStatus::Disabled => "Disabled",
            WhitelistStatus::Unknown => "Unknown",
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ServerDetails {
    /// Host as requested.
    pub host: String,
    pub record: StatusRecord,
    pub whitelist: WhitelistStatus,
    /// Query player list if the query endpoint had one, else the status sample.
    pub players: Vec<PlayerSample>,
}

impl ServerDetails {
    pub fn compose(host: &str, status: &Value, query: &Value) -> Self {
        let players = identity::first_array(&[query, status], PLAYER_LIST_FIELDS)
            .map(|list| list.iter().map(PlayerSample::from_json).collect())
            .unwrap_or_default();
        Self {
            host: host.to_string(),
            record: StatusRecord::from_status(host, status),
            whitelist: WhitelistStatus::resolve(status, query),
            players,
        }
    }
}

/// Fetch both documents concurrently.
///
/// A failed status fetch fails the lookup. Many servers disable the query
/// protocol, so a failed query fetch only drops the extra fields.
pub async fn lookup(client: &dyn ProbeClient, host: &str) -> Result<ServerDetails, ProbeError> {
    let (status, query) = tokio::join!(client.status(host), client.query(host));
    let status = status?;
    let query = query.unwrap_or_else(|e| {
        debug!(%host, error = %e, "query lookup failed");
        Value::Null
    });
    Ok(ServerDetails::compose(host, &status, &query))
}
