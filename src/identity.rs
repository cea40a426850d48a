//! Ordered, first-match-wins extraction rules.
//!
//! The status service is loose about where it puts things: the canonical
//! address, the icon and the whitelist flag can each live under several keys
//! depending on server software and endpoint. Every place that needs one of
//! these values goes through the rule tables below instead of re-deriving the
//! lookup order locally.
//!
//! Identity precedence, used for the merge key, the list key and link targets:
//!
//! 1. the address reported by the status service (`ip_address`)
//! 2. the address that was probed (`ip`)
//! 3. the generic `host` field
//! 4. for display only, the placeholder [`UNKNOWN_HOST`]
use serde_json::Value;

use crate::types::StatusRecord;

/// Shown where a record has no usable identity. Never used as a merge key.
pub const UNKNOWN_HOST: &str = "Unknown IP";

/// A path of object keys into a JSON document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPath(pub &'static [&'static str]);

impl FieldPath {
    /// Walk the path; `null` at the end counts as absent.
    pub fn lookup<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        let mut cur = doc;
        for key in self.0 {
            cur = cur.get(key)?;
        }
        if cur.is_null() {
            None
        } else {
            Some(cur)
        }
    }
}

/// Addresses a raw status response may report, in precedence order.
pub const REPORTED_ADDRESS: &[FieldPath] = &[FieldPath(&["ip_address"]), FieldPath(&["ip"])];

pub const ICON_FIELDS: &[FieldPath] = &[
    FieldPath(&["icon"]),
    FieldPath(&["favicon"]),
    FieldPath(&["server", "icon"]),
    FieldPath(&["server", "favicon"]),
];

/// Whitelist flag locations, checked per document (status first, then query).
pub const WHITELIST_FIELDS: &[FieldPath] = &[
    FieldPath(&["whitelist"]),
    FieldPath(&["whitelisted"]),
    FieldPath(&["server", "whitelist"]),
    FieldPath(&["server", "whitelisted"]),
    FieldPath(&["server", "is_whitelisted"]),
    FieldPath(&["server", "isWhitelisted"]),
    FieldPath(&["players", "whitelist"]),
];

/// Player list locations, checked per document (query first, then status).
pub const PLAYER_LIST_FIELDS: &[FieldPath] = &[
    FieldPath(&["players", "list"]),
    FieldPath(&["players", "sample"]),
];

pub const PLAYER_ID_FIELDS: &[FieldPath] = &[FieldPath(&["id"]), FieldPath(&["uuid"])];

pub const PLAYER_NAME_FIELDS: &[FieldPath] = &[FieldPath(&["name_clean"]), FieldPath(&["name"])];

/// First rule whose value is present (non-null), across `docs` in order.
///
/// A present value stops the search even if it has an unexpected type; the
/// caller decides what a wrong-typed value means.
pub fn first_present<'a>(docs: &[&'a Value], rules: &[FieldPath]) -> Option<&'a Value> {
    docs.iter()
        .copied()
        .flat_map(|doc| rules.iter().filter_map(move |rule| rule.lookup(doc)))
        .next()
}

/// First rule yielding a non-empty string. Empty strings and non-strings are
/// skipped.
pub fn first_str<'a>(doc: &'a Value, rules: &[FieldPath]) -> Option<&'a str> {
    rules
        .iter()
        .filter_map(|rule| rule.lookup(doc))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// First rule yielding an array, across `docs` in order. An empty array still
/// wins.
pub fn first_array<'a>(docs: &[&'a Value], rules: &[FieldPath]) -> Option<&'a Vec<Value>> {
    docs.iter()
        .copied()
        .flat_map(|doc| rules.iter().filter_map(move |rule| rule.lookup(doc)))
        .find_map(Value::as_array)
}

/// One step of the record identity precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityRule {
    ReportedAddress,
    ProbedAddress,
    Host,
}

pub const IDENTITY_RULES: [IdentityRule; 3] = [
    IdentityRule::ReportedAddress,
    IdentityRule::ProbedAddress,
    IdentityRule::Host,
];

impl IdentityRule {
    fn extract<'a>(&self, record: &'a StatusRecord) -> Option<&'a str> {
        let field = match self {
            IdentityRule::ReportedAddress => record.ip_address.as_deref(),
            IdentityRule::ProbedAddress => record.ip.as_deref(),
            IdentityRule::Host => record.host.as_deref(),
        };
        field.filter(|s| !s.is_empty())
    }
}

/// Resolved identity of a record, or `None` if every rule misses.
pub fn resolve_identity(record: &StatusRecord) -> Option<&str> {
    IDENTITY_RULES.iter().find_map(|rule| rule.extract(record))
}

/// Identity for display: the resolved identity, else [`UNKNOWN_HOST`].
pub fn display_identity(record: &StatusRecord) -> &str {
    resolve_identity(record).unwrap_or(UNKNOWN_HOST)
}
