use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::SourceError;
use crate::identity::{self, FieldPath};
use crate::types::Target;

/// Target list compiled into the binary, used when the primary source fails.
pub const BUNDLED_LIST: &str = include_str!("../servers.json");
pub const BUNDLED_LABEL: &str = "servers.json";

/// Where a list entry keeps its host.
pub const TARGET_FIELDS: &[FieldPath] = &[FieldPath(&["ip"]), FieldPath(&["host"])];

/// Ordered hosts plus a label naming the provider that supplied them.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetList {
    pub targets: Vec<Target>,
    pub source: String,
}

impl TargetList {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Parse a JSON array of `{ "ip": ... }` / `{ "host": ... }` objects.
///
/// Bare strings are accepted as hosts. Entries without a usable host are
/// dropped; order is preserved and duplicates are kept.
pub fn parse_target_list(json: &str) -> Result<Vec<Target>, SourceError> {
    let doc: Value = serde_json::from_str(json)?;
    let items = doc.as_array().ok_or(SourceError::NotAnArray)?;
    Ok(items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim()).filter(|s| !s.is_empty()),
            _ => identity::first_str(item, TARGET_FIELDS),
        })
        .map(str::to_owned)
        .collect())
}

fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Load the primary list from an HTTP(S) URL or a local path.
pub async fn load_primary(location: &str) -> Result<Vec<Target>, SourceError> {
    let body = if is_url(location) {
        let fetch_err = |e: reqwest::Error| SourceError::Fetch {
            url: location.to_string(),
            message: e.to_string(),
        };
        reqwest::get(location)
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(fetch_err)?
            .text()
            .await
            .map_err(fetch_err)?
    } else {
        tokio::fs::read_to_string(location)
            .await
            .map_err(|source| SourceError::Read {
                path: location.to_string(),
                source,
            })?
    };
    parse_target_list(&body)
}

/// First available list: the primary if given and valid, else the bundled
/// list. A broken bundled list yields an empty target list.
pub async fn load_targets(primary: Option<&str>) -> TargetList {
    if let Some(location) = primary {
        match load_primary(location).await {
            Ok(targets) => {
                info!(source = location, count = targets.len(), "loaded target list");
                return TargetList {
                    targets,
                    source: location.to_string(),
                };
            }
            Err(e) => warn!(source = location, error = %e, "primary target list unavailable, using bundled list"),
        }
    }
    bundled_targets()
}

pub fn bundled_targets() -> TargetList {
    let targets = parse_target_list(BUNDLED_LIST).unwrap_or_else(|e| {
        warn!(error = %e, "bundled target list is malformed");
        Vec::new()
    });
    TargetList {
        targets,
        source: BUNDLED_LABEL.to_string(),
    }
}
