//! Tunnel directory trait
//!
//! The directory stores tunnel records, evaluates list filters, accepts
//! route submissions and tracks edge connections. The CLI never assumes
//! anything about how it does so.

use async_trait::async_trait;
use tunnelctl_auth::TunnelSecret;
use tunnelctl_proto::{Connection, Route, RouteResult, Tunnel, TunnelFilter};
use uuid::Uuid;

use crate::error::DirectoryError;

/// Capability interface to the tunnel directory service
///
/// # Example
/// ```ignore
/// let secret = TunnelSecret::generate()?;
/// let tunnel = directory.create_tunnel("web", &secret).await?;
///
/// let route = Route::dns("app.example.com")?;
/// let result = directory.route_tunnel(tunnel.id, &route).await?;
/// println!("{}", result.success_summary());
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TunnelDirectory: Send + Sync {
    /// Register a new tunnel whose ownership is proven by `secret`
    async fn create_tunnel(
        &self,
        name: &str,
        secret: &TunnelSecret,
    ) -> Result<Tunnel, DirectoryError>;

    async fn get_tunnel(&self, id: Uuid) -> Result<Tunnel, DirectoryError>;

    /// List tunnels matching every predicate of `filter`
    async fn list_tunnels(&self, filter: &TunnelFilter) -> Result<Vec<Tunnel>, DirectoryError>;

    /// Soft-delete tunnels; they stay listable with deleted tunnels included
    async fn delete_tunnels(&self, ids: &[Uuid]) -> Result<(), DirectoryError>;

    /// Drop all connection records of the given tunnels
    async fn cleanup_connections(&self, ids: &[Uuid]) -> Result<(), DirectoryError>;

    async fn route_tunnel(&self, id: Uuid, route: &Route) -> Result<RouteResult, DirectoryError>;

    /// Record a new edge connection for a tunnel being run
    async fn connect(
        &self,
        id: Uuid,
        secret: &TunnelSecret,
        colo_name: &str,
    ) -> Result<Connection, DirectoryError>;

    /// Mark a connection as recently disconnected
    async fn disconnect(&self, id: Uuid, connection_id: Uuid) -> Result<(), DirectoryError>;
}
