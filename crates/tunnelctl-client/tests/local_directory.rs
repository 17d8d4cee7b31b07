//! LocalDirectory tests
//!
//! Exercise the file-backed directory through the `TunnelDirectory` trait,
//! the same way the CLI uses it.

use chrono::{Duration, Utc};
use tempfile::TempDir;
use tunnelctl_auth::TunnelSecret;
use tunnelctl_client::{find_id, DirectoryError, LocalDirectory, TunnelDirectory};
use tunnelctl_proto::{summarize_connections, Change, Route, RouteResult, TunnelFilter};

fn setup() -> (TempDir, LocalDirectory) {
    let temp_dir = TempDir::new().unwrap();
    let directory = LocalDirectory::open(temp_dir.path().join("tunnels")).unwrap();
    (temp_dir, directory)
}

fn secret() -> TunnelSecret {
    TunnelSecret::generate().unwrap()
}

#[tokio::test]
async fn test_create_and_get() {
    let (_temp, directory) = setup();

    let tunnel = directory.create_tunnel("web", &secret()).await.unwrap();
    assert_eq!(tunnel.name, "web");
    assert!(tunnel.connections.is_empty());

    let fetched = directory.get_tunnel(tunnel.id).await.unwrap();
    assert_eq!(fetched, tunnel);
}

#[tokio::test]
async fn test_duplicate_name_rejected_until_deleted() {
    let (_temp, directory) = setup();

    let first = directory.create_tunnel("web", &secret()).await.unwrap();
    let err = directory.create_tunnel("web", &secret()).await.unwrap_err();
    assert!(matches!(err, DirectoryError::NameConflict(ref name) if name == "web"));

    directory.delete_tunnels(&[first.id]).await.unwrap();
    directory.create_tunnel("web", &secret()).await.unwrap();
}

#[tokio::test]
async fn test_list_filters() {
    let (_temp, directory) = setup();

    let web = directory.create_tunnel("web", &secret()).await.unwrap();
    let api = directory.create_tunnel("api", &secret()).await.unwrap();
    directory.delete_tunnels(&[api.id]).await.unwrap();

    // No predicates: deleted tunnels included
    let all = directory.list_tunnels(&TunnelFilter::new()).await.unwrap();
    assert_eq!(all.len(), 2);

    let mut live = TunnelFilter::new();
    live.no_deleted();
    let listed = directory.list_tunnels(&live).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, web.id);

    let mut by_name = TunnelFilter::new();
    by_name.by_name("api");
    let listed = directory.list_tunnels(&by_name).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].is_deleted());

    let mut by_id = TunnelFilter::new();
    by_id.by_tunnel_id(web.id).by_name("api");
    assert!(directory.list_tunnels(&by_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_existed_at() {
    let (_temp, directory) = setup();

    let web = directory.create_tunnel("web", &secret()).await.unwrap();

    let mut before = TunnelFilter::new();
    before.by_existed_at(web.created_at - Duration::hours(1));
    assert!(directory.list_tunnels(&before).await.unwrap().is_empty());

    let mut now = TunnelFilter::new();
    now.by_existed_at(Utc::now());
    assert_eq!(directory.list_tunnels(&now).await.unwrap().len(), 1);

    directory.delete_tunnels(&[web.id]).await.unwrap();
    let mut later = TunnelFilter::new();
    later.by_existed_at(Utc::now() + Duration::seconds(1));
    assert!(directory.list_tunnels(&later).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_is_sorted_by_creation() {
    let (_temp, directory) = setup();

    for name in ["c", "a", "b"] {
        directory.create_tunnel(name, &secret()).await.unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
    }

    let names: Vec<String> = directory
        .list_tunnels(&TunnelFilter::new())
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["c", "a", "b"]);
}

#[tokio::test]
async fn test_delete_twice() {
    let (_temp, directory) = setup();

    let tunnel = directory.create_tunnel("web", &secret()).await.unwrap();
    directory.delete_tunnels(&[tunnel.id]).await.unwrap();

    let err = directory.delete_tunnels(&[tunnel.id]).await.unwrap_err();
    assert!(matches!(err, DirectoryError::Deleted(id) if id == tunnel.id));
}

#[tokio::test]
async fn test_connect_requires_matching_secret() {
    let (_temp, directory) = setup();

    let owner = secret();
    let tunnel = directory.create_tunnel("web", &owner).await.unwrap();

    let err = directory
        .connect(tunnel.id, &secret(), "LAX")
        .await
        .unwrap_err();
    assert!(matches!(err, DirectoryError::Unauthorized(_)));

    let connection = directory.connect(tunnel.id, &owner, "LAX").await.unwrap();
    assert_eq!(connection.colo_name, "LAX");
    assert!(!connection.is_pending_reconnect);
}

#[tokio::test]
async fn test_connection_lifecycle() {
    let (_temp, directory) = setup();

    let owner = secret();
    let tunnel = directory.create_tunnel("web", &owner).await.unwrap();

    let lax = directory.connect(tunnel.id, &owner, "LAX").await.unwrap();
    directory.connect(tunnel.id, &owner, "LAX").await.unwrap();
    directory.connect(tunnel.id, &owner, "JFK").await.unwrap();
    directory.disconnect(tunnel.id, lax.id).await.unwrap();

    let tunnel = directory.get_tunnel(tunnel.id).await.unwrap();
    assert_eq!(summarize_connections(&tunnel.connections, false), "1xJFK, 1xLAX");
    assert_eq!(summarize_connections(&tunnel.connections, true), "1xJFK, 2xLAX");

    directory.cleanup_connections(&[tunnel.id]).await.unwrap();
    let tunnel = directory.get_tunnel(tunnel.id).await.unwrap();
    assert!(tunnel.connections.is_empty());
}

#[tokio::test]
async fn test_disconnect_unknown_connection() {
    let (_temp, directory) = setup();

    let tunnel = directory.create_tunnel("web", &secret()).await.unwrap();
    let err = directory
        .disconnect(tunnel.id, uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, DirectoryError::ConnectionNotFound { .. }));
}

#[tokio::test]
async fn test_dns_route_outcomes() {
    let (_temp, directory) = setup();

    let web = directory.create_tunnel("web", &secret()).await.unwrap();
    let api = directory.create_tunnel("api", &secret()).await.unwrap();
    let route = Route::dns("app.example.com").unwrap();

    let created = directory.route_tunnel(web.id, &route).await.unwrap();
    assert!(matches!(created, RouteResult::Dns { change: Change::Created, .. }));

    let unchanged = directory.route_tunnel(web.id, &route).await.unwrap();
    assert!(matches!(unchanged, RouteResult::Dns { change: Change::Unchanged, .. }));

    let moved = directory.route_tunnel(api.id, &route).await.unwrap();
    assert!(matches!(moved, RouteResult::Dns { change: Change::Updated, .. }));

    // The hostname now belongs to api only
    let back = directory.route_tunnel(web.id, &route).await.unwrap();
    assert!(matches!(back, RouteResult::Dns { change: Change::Updated, .. }));
}

#[tokio::test]
async fn test_lb_route_outcomes() {
    let (_temp, directory) = setup();

    let web = directory.create_tunnel("web", &secret()).await.unwrap();
    let api = directory.create_tunnel("api", &secret()).await.unwrap();

    let route = Route::load_balancer("lb.example.com", "pool-a").unwrap();
    let first = directory.route_tunnel(web.id, &route).await.unwrap();
    assert_eq!(
        first.success_summary(),
        "Created load balancer lb.example.com and added a new pool pool-a with this tunnel as an origin"
    );

    let second = directory.route_tunnel(api.id, &route).await.unwrap();
    assert!(matches!(
        second,
        RouteResult::LoadBalancer {
            lb_change: Change::Unchanged,
            pool_change: Change::Updated,
            ..
        }
    ));

    let other_pool = Route::load_balancer("lb.example.com", "pool-b").unwrap();
    let third = directory.route_tunnel(api.id, &other_pool).await.unwrap();
    assert!(matches!(
        third,
        RouteResult::LoadBalancer {
            lb_change: Change::Unchanged,
            pool_change: Change::Created,
            ..
        }
    ));
}

#[tokio::test]
async fn test_route_deleted_tunnel() {
    let (_temp, directory) = setup();

    let web = directory.create_tunnel("web", &secret()).await.unwrap();
    directory.delete_tunnels(&[web.id]).await.unwrap();

    let route = Route::dns("app.example.com").unwrap();
    let err = directory.route_tunnel(web.id, &route).await.unwrap_err();
    assert!(matches!(err, DirectoryError::Deleted(_)));
}

#[tokio::test]
async fn test_find_id_by_name() {
    let (_temp, directory) = setup();

    let web = directory.create_tunnel("web", &secret()).await.unwrap();
    assert_eq!(find_id(&directory, "web").await.unwrap(), web.id);
    assert_eq!(find_id(&directory, &web.id.to_string()).await.unwrap(), web.id);

    directory.delete_tunnels(&[web.id]).await.unwrap();
    assert!(find_id(&directory, "web").await.is_err());
}
