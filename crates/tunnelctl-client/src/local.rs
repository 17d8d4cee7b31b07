//! File-backed tunnel directory
//!
//! Keeps one JSON record per tunnel in `<base_dir>/<uuid>.tunnel.json`,
//! readable by the owner only. Other files in the directory are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tunnelctl_auth::path::write_private;
use tunnelctl_auth::TunnelSecret;
use tunnelctl_proto::{
    Change, Connection, FilterPredicate, Route, RouteResult, Tunnel, TunnelFilter,
};
use uuid::Uuid;

use crate::directory::TunnelDirectory;
use crate::error::DirectoryError;

const RECORD_SUFFIX: &str = ".tunnel.json";

/// Stored tunnel record with the data the listing never exposes
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredTunnel {
    tunnel: Tunnel,
    secret: TunnelSecret,
    #[serde(default)]
    routes: Vec<Route>,
}

/// Tunnel directory backed by a local directory of JSON files
#[derive(Debug, Clone)]
pub struct LocalDirectory {
    base_dir: PathBuf,
}

impl LocalDirectory {
    /// Open (and create if needed) a directory store at `base_dir`
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self, DirectoryError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(|source| DirectoryError::Io {
            path: base_dir.clone(),
            source,
        })?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn record_path(&self, id: Uuid) -> PathBuf {
        self.base_dir.join(format!("{}{}", id, RECORD_SUFFIX))
    }

    fn read_record(path: &Path) -> Result<StoredTunnel, DirectoryError> {
        let json = fs::read_to_string(path).map_err(|source| DirectoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| DirectoryError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
    }

    fn load(&self, id: Uuid) -> Result<StoredTunnel, DirectoryError> {
        let path = self.record_path(id);
        if !path.exists() {
            return Err(DirectoryError::NotFound(id));
        }
        Self::read_record(&path)
    }

    fn load_all(&self) -> Result<Vec<StoredTunnel>, DirectoryError> {
        let entries = fs::read_dir(&self.base_dir).map_err(|source| DirectoryError::Io {
            path: self.base_dir.clone(),
            source,
        })?;

        let mut records = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| DirectoryError::Io {
                path: self.base_dir.clone(),
                source,
            })?;
            let path = entry.path();
            let is_record = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(RECORD_SUFFIX));
            if is_record {
                records.push(Self::read_record(&path)?);
            }
        }
        Ok(records)
    }

    fn save(&self, record: &StoredTunnel) -> Result<(), DirectoryError> {
        let path = self.record_path(record.tunnel.id);
        let json = serde_json::to_string_pretty(record)?;
        write_private(&path, json.as_bytes())
            .map_err(|source| DirectoryError::Io { path, source })
    }

    fn load_live(&self, id: Uuid) -> Result<StoredTunnel, DirectoryError> {
        let record = self.load(id)?;
        if record.tunnel.is_deleted() {
            return Err(DirectoryError::Deleted(id));
        }
        Ok(record)
    }
}

fn filter_matches(tunnel: &Tunnel, filter: &TunnelFilter) -> bool {
    filter.predicates().all(|predicate| match predicate {
        FilterPredicate::NoDeleted => !tunnel.is_deleted(),
        FilterPredicate::Name(name) => &tunnel.name == name,
        FilterPredicate::ExistedAt(at) => tunnel.existed_at(*at),
        FilterPredicate::TunnelId(id) => &tunnel.id == id,
    })
}

/// Attach `route` to tunnel `id`, updating the other records in place
fn apply_route(records: &mut [StoredTunnel], id: Uuid, route: &Route) -> RouteResult {
    match route {
        Route::Dns { hostname } => {
            let already_routed = records
                .iter()
                .any(|r| r.tunnel.id == id && r.routes.contains(route));
            let change = if already_routed {
                Change::Unchanged
            } else {
                let mut moved = false;
                for record in records.iter_mut().filter(|r| r.tunnel.id != id) {
                    let before = record.routes.len();
                    record.routes.retain(|r| r != route);
                    moved |= record.routes.len() != before;
                }
                if let Some(record) = records.iter_mut().find(|r| r.tunnel.id == id) {
                    record.routes.push(route.clone());
                }
                if moved {
                    Change::Updated
                } else {
                    Change::Created
                }
            };
            RouteResult::Dns {
                hostname: hostname.clone(),
                change,
            }
        }
        Route::LoadBalancer { lb_name, pool } => {
            let lb_exists = records.iter().any(|r| {
                r.routes.iter().any(|existing| {
                    matches!(existing, Route::LoadBalancer { lb_name: name, .. } if name == lb_name)
                })
            });
            let pool_exists = records
                .iter()
                .any(|r| r.tunnel.id != id && r.routes.contains(route));
            let already_origin = records
                .iter()
                .any(|r| r.tunnel.id == id && r.routes.contains(route));

            let pool_change = if already_origin {
                Change::Unchanged
            } else {
                if let Some(record) = records.iter_mut().find(|r| r.tunnel.id == id) {
                    record.routes.push(route.clone());
                }
                if pool_exists {
                    Change::Updated
                } else {
                    Change::Created
                }
            };

            RouteResult::LoadBalancer {
                lb_name: lb_name.clone(),
                pool: pool.clone(),
                lb_change: if lb_exists {
                    Change::Unchanged
                } else {
                    Change::Created
                },
                pool_change,
            }
        }
    }
}

#[async_trait]
impl TunnelDirectory for LocalDirectory {
    async fn create_tunnel(
        &self,
        name: &str,
        secret: &TunnelSecret,
    ) -> Result<Tunnel, DirectoryError> {
        let conflict = self
            .load_all()?
            .iter()
            .any(|r| !r.tunnel.is_deleted() && r.tunnel.name == name);
        if conflict {
            return Err(DirectoryError::NameConflict(name.to_string()));
        }

        let tunnel = Tunnel {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
            deleted_at: None,
            connections: Vec::new(),
        };
        self.save(&StoredTunnel {
            tunnel: tunnel.clone(),
            secret: secret.clone(),
            routes: Vec::new(),
        })?;

        info!(tunnel_id = %tunnel.id, name = %tunnel.name, "Tunnel registered");
        Ok(tunnel)
    }

    async fn get_tunnel(&self, id: Uuid) -> Result<Tunnel, DirectoryError> {
        Ok(self.load(id)?.tunnel)
    }

    async fn list_tunnels(&self, filter: &TunnelFilter) -> Result<Vec<Tunnel>, DirectoryError> {
        let mut tunnels: Vec<Tunnel> = self
            .load_all()?
            .into_iter()
            .map(|r| r.tunnel)
            .filter(|t| filter_matches(t, filter))
            .collect();

        tunnels.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.name.cmp(&b.name))
        });

        debug!(count = tunnels.len(), "Listed tunnels");
        Ok(tunnels)
    }

    async fn delete_tunnels(&self, ids: &[Uuid]) -> Result<(), DirectoryError> {
        for &id in ids {
            let mut record = self.load_live(id)?;
            record.tunnel.deleted_at = Some(Utc::now());
            record.routes.clear();
            self.save(&record)?;
            info!(tunnel_id = %id, "Tunnel deleted");
        }
        Ok(())
    }

    async fn cleanup_connections(&self, ids: &[Uuid]) -> Result<(), DirectoryError> {
        for &id in ids {
            let mut record = self.load(id)?;
            let removed = record.tunnel.connections.len();
            record.tunnel.connections.clear();
            self.save(&record)?;
            info!(tunnel_id = %id, removed, "Cleaned up tunnel connections");
        }
        Ok(())
    }

    async fn route_tunnel(&self, id: Uuid, route: &Route) -> Result<RouteResult, DirectoryError> {
        self.load_live(id)?;

        let mut records: Vec<StoredTunnel> = self
            .load_all()?
            .into_iter()
            .filter(|r| !r.tunnel.is_deleted())
            .collect();
        let before: Vec<Vec<Route>> = records.iter().map(|r| r.routes.clone()).collect();

        let result = apply_route(&mut records, id, route);

        for (record, old_routes) in records.iter().zip(before) {
            if record.routes != old_routes {
                self.save(record)?;
            }
        }

        info!(tunnel_id = %id, route = route.kind(), "Route submitted");
        Ok(result)
    }

    async fn connect(
        &self,
        id: Uuid,
        secret: &TunnelSecret,
        colo_name: &str,
    ) -> Result<Connection, DirectoryError> {
        let mut record = self.load_live(id)?;
        if &record.secret != secret {
            return Err(DirectoryError::Unauthorized(id));
        }

        let connection = Connection::new(colo_name);
        record.tunnel.connections.push(connection.clone());
        self.save(&record)?;

        info!(tunnel_id = %id, connection_id = %connection.id, colo = %colo_name, "Connection registered");
        Ok(connection)
    }

    async fn disconnect(&self, id: Uuid, connection_id: Uuid) -> Result<(), DirectoryError> {
        let mut record = self.load(id)?;
        let connection = record
            .tunnel
            .connections
            .iter_mut()
            .find(|c| c.id == connection_id)
            .ok_or(DirectoryError::ConnectionNotFound {
                tunnel_id: id,
                connection_id,
            })?;
        connection.is_pending_reconnect = true;
        self.save(&record)?;

        info!(tunnel_id = %id, connection_id = %connection_id, "Connection marked as disconnected");
        Ok(())
    }
}
