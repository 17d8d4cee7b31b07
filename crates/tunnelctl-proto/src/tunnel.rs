//! Tunnel records as returned by the directory

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One edge connection of a tunnel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: Uuid,
    /// Point of presence the connection terminates at
    pub colo_name: String,
    /// Set once the connection dropped and the client has not yet come back
    #[serde(default)]
    pub is_pending_reconnect: bool,
    pub opened_at: DateTime<Utc>,
}

impl Connection {
    pub fn new(colo_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            colo_name: colo_name.into(),
            is_pending_reconnect: false,
            opened_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.is_pending_reconnect
    }
}

/// Summary of a tunnel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tunnel {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl Tunnel {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether the tunnel existed (created and not yet deleted) at `at`
    pub fn existed_at(&self, at: DateTime<Utc>) -> bool {
        self.created_at <= at && self.deleted_at.map_or(true, |deleted| deleted > at)
    }

    pub fn active_connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(|c| c.is_active())
    }

    pub fn has_active_connections(&self) -> bool {
        self.active_connections().next().is_some()
    }
}

/// Render connections as `"<count>x<colo>"` entries sorted by colo name.
///
/// Pending-reconnect connections only count when
/// `include_recently_disconnected` is set. Output is byte-identical for
/// identical input, and empty when nothing is counted.
pub fn summarize_connections(
    connections: &[Connection],
    include_recently_disconnected: bool,
) -> String {
    let mut per_colo: BTreeMap<&str, usize> = BTreeMap::new();
    for connection in connections {
        if connection.is_active() || include_recently_disconnected {
            *per_colo.entry(connection.colo_name.as_str()).or_default() += 1;
        }
    }

    per_colo
        .iter()
        .map(|(colo, count)| format!("{}x{}", count, colo))
        .collect::<Vec<_>>()
        .join(", ")
}
