use ::time::{format_description::well_known, OffsetDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProbeError;
use crate::identity::{
    self, ICON_FIELDS, PLAYER_ID_FIELDS, PLAYER_LIST_FIELDS, PLAYER_NAME_FIELDS, REPORTED_ADDRESS,
};

/// A host identifier queued for probing.
pub type Target = String;

/// One entry of a server's player sample.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PlayerSample {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl PlayerSample {
    /// Best-effort extraction from a `{id|uuid, name_clean|name}` object.
    pub fn from_json(doc: &Value) -> Self {
        Self {
            id: identity::first_str(doc, PLAYER_ID_FIELDS).map(str::to_owned),
            name: identity::first_str(doc, PLAYER_NAME_FIELDS).map(str::to_owned),
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown player")
    }
}

/// Status of one reachable server as reported by the status service.
///
/// Records are values: a newer probe of the same identity replaces the record
/// wholesale in the result store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    /// Address reported by the service, normalized to the resolved identity.
    pub ip_address: Option<String>,
    /// Address that was probed.
    pub ip: Option<String>,
    pub host: Option<String>,
    pub online: bool,
    pub players_online: u32,
    pub players_max: u32,
    pub version: Option<String>,
    pub motd: Option<String>,
    pub port: Option<u16>,
    pub icon: Option<String>,
    pub players: Vec<PlayerSample>,
    pub checked_at: String,
}

impl StatusRecord {
    /// An online record with every optional field at its default.
    pub fn reachable(ip_address: impl Into<String>) -> Self {
        Self {
            ip_address: Some(ip_address.into()),
            ip: None,
            host: None,
            online: true,
            players_online: 0,
            players_max: 0,
            version: None,
            motd: None,
            port: None,
            icon: None,
            players: Vec::new(),
            checked_at: now_rfc3339(),
        }
    }

    pub fn with_players(mut self, online: u32, max: u32) -> Self {
        self.players_online = online;
        self.players_max = max;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_motd(mut self, motd: impl Into<String>) -> Self {
        self.motd = Some(motd.into());
        self
    }

    pub fn with_probed(mut self, probed: impl Into<String>) -> Self {
        self.ip = Some(probed.into());
        self
    }

    /// Build a record from a status response for the probed `target`.
    ///
    /// Missing or wrong-typed fields fall back to defaults instead of failing.
    pub fn from_status(target: &str, doc: &Value) -> Self {
        let resolved = identity::first_str(doc, REPORTED_ADDRESS).unwrap_or(target);
        let players = identity::first_array(&[doc], PLAYER_LIST_FIELDS)
            .map(|list| list.iter().map(PlayerSample::from_json).collect())
            .unwrap_or_default();

        Self {
            ip_address: Some(resolved.to_owned()),
            ip: Some(target.to_owned()),
            host: doc.get("host").and_then(Value::as_str).map(str::to_owned),
            online: doc.get("online").and_then(Value::as_bool).unwrap_or(false),
            players_online: json_u32(doc, &["players", "online"]),
            players_max: json_u32(doc, &["players", "max"]),
            version: json_text(doc, &["version", "name_clean"]),
            motd: json_text(doc, &["motd", "clean"]),
            port: doc
                .get("port")
                .and_then(Value::as_u64)
                .and_then(|p| u16::try_from(p).ok()),
            icon: identity::first_str(doc, ICON_FIELDS).map(str::to_owned),
            players,
            checked_at: now_rfc3339(),
        }
    }

    /// Resolved identity used as the dedup key.
    pub fn identity(&self) -> Option<&str> {
        identity::resolve_identity(self)
    }

    pub fn display_identity(&self) -> &str {
        identity::display_identity(self)
    }

    /// Link target of the detail view, built from the resolved identity.
    pub fn detail_path(&self) -> Option<String> {
        self.identity().map(|id| format!("/server/{id}"))
    }

    pub fn version_label(&self) -> &str {
        self.version.as_deref().unwrap_or("Unknown")
    }

    pub fn motd_label(&self) -> &str {
        self.motd.as_deref().unwrap_or("N/A")
    }

    pub fn port_label(&self) -> String {
        self.port
            .map(|p| p.to_string())
            .unwrap_or_else(|| "N/A".to_string())
    }
}

/// Result of probing one target.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Reachable(StatusRecord),
    Unreachable,
    Failed(ProbeError),
}

fn json_at<'a>(doc: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(doc, |cur, key| cur.get(*key))
}

fn json_u32(doc: &Value, path: &[&str]) -> u32 {
    json_at(doc, path)
        .and_then(Value::as_u64)
        .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

fn json_text(doc: &Value, path: &[&str]) -> Option<String> {
    json_at(doc, path)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

pub(crate) fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_full_status_document() {
        let doc = json!({
            "online": true,
            "host": "play.example.net",
            "ip_address": "203.0.113.7",
            "port": 25565,
            "players": {
                "online": 5,
                "max": 20,
                "list": [
                    {"uuid": "abc", "name_clean": "Steve", "name": "§aSteve"},
                    {"id": "def", "name": "Alex"}
                ]
            },
            "version": {"name_clean": "1.20.4"},
            "motd": {"clean": "A Minecraft Server"},
            "icon": "data:image/png;base64,AAAA"
        });
        let r = StatusRecord::from_status("play.example.net", &doc);
        assert_eq!(r.identity(), Some("203.0.113.7"));
        assert_eq!(r.ip.as_deref(), Some("play.example.net"));
        assert!(r.online);
        assert_eq!((r.players_online, r.players_max), (5, 20));
        assert_eq!(r.version_label(), "1.20.4");
        assert_eq!(r.motd_label(), "A Minecraft Server");
        assert_eq!(r.port_label(), "25565");
        assert_eq!(r.icon.as_deref(), Some("data:image/png;base64,AAAA"));
        assert_eq!(r.players.len(), 2);
        assert_eq!(r.players[0].id.as_deref(), Some("abc"));
        assert_eq!(r.players[0].display_name(), "Steve");
        assert_eq!(r.players[1].display_name(), "Alex");
    }

    #[test]
    fn missing_fields_degrade_to_defaults() {
        let doc = json!({"online": true, "players": {"online": "lots"}});
        let r = StatusRecord::from_status("10.0.0.1", &doc);
        assert_eq!(r.identity(), Some("10.0.0.1"));
        assert_eq!((r.players_online, r.players_max), (0, 0));
        assert_eq!(r.version_label(), "Unknown");
        assert_eq!(r.motd_label(), "N/A");
        assert_eq!(r.port_label(), "N/A");
        assert!(r.icon.is_none());
        assert!(r.players.is_empty());
    }

    #[test]
    fn reported_ip_used_when_ip_address_absent() {
        let doc = json!({"online": true, "ip": "198.51.100.2"});
        let r = StatusRecord::from_status("mc.example.org", &doc);
        assert_eq!(r.identity(), Some("198.51.100.2"));
    }

    #[test]
    fn detail_path_uses_resolved_identity() {
        let r = StatusRecord::reachable("canonical.example").with_probed("alias.example");
        assert_eq!(r.detail_path().as_deref(), Some("/server/canonical.example"));
    }
}
