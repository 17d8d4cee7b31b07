//! Tunnel subcommand handlers
//!
//! Each handler validates its arguments locally, talks to the directory
//! through [`TunnelDirectory`] and writes user-facing output to `out`.
//! Diagnostics go through `tracing`.

use std::fs;
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use tunnelctl_auth::path::expand_home;
use tunnelctl_auth::{is_regular_file, CredentialStore, TunnelSecret};
use tunnelctl_client::{find_id, find_ids, LocalDirectory, TunnelDirectory};
use tunnelctl_proto::{summarize_connections, Route, TunnelFilter};
use uuid::Uuid;

use crate::config::CliConfig;
use crate::error::UsageError;
use crate::output::{render, write_tunnel_table, OutputFormat};

/// Everything a subcommand needs: configuration, directory and credentials
pub struct CommandContext {
    pub config: CliConfig,
    pub directory: Box<dyn TunnelDirectory>,
    pub credentials: CredentialStore,
}

impl CommandContext {
    pub fn new(config: CliConfig, directory: Box<dyn TunnelDirectory>) -> Self {
        let credentials = CredentialStore::new(config.origin_cert.clone());
        Self {
            config,
            directory,
            credentials,
        }
    }

    /// Context backed by the file-based directory named in `config`
    pub fn open_local(config: CliConfig) -> Result<Self> {
        let base_dir = expand_home(&config.directory)?;
        let directory = LocalDirectory::open(&base_dir)
            .context(format!("Failed to open tunnel directory: {:?}", base_dir))?;
        Ok(Self::new(config, Box::new(directory)))
    }
}

fn parse_format(output: Option<&str>) -> Result<Option<OutputFormat>> {
    Ok(output.map(str::parse::<OutputFormat>).transpose()?)
}

/// Create a tunnel and write its credentials file
pub async fn create(
    ctx: &CommandContext,
    name: &str,
    output: Option<&str>,
    out: &mut dyn Write,
) -> Result<()> {
    if name.is_empty() {
        bail!(UsageError::new(
            "\"tunnelctl create\" requires exactly 1 argument, the name of tunnel to create."
        ));
    }
    let format = parse_format(output)?;

    let secret = TunnelSecret::generate().context("Couldn't generate the secret for your tunnel")?;
    let tunnel = ctx
        .directory
        .create_tunnel(name, &secret)
        .await
        .context("Create Tunnel API call failed")?;

    // Roll the tunnel back if its credentials can't be written
    if let Err(err) = ctx
        .credentials
        .persist(tunnel.id, &ctx.config.account_tag, &secret)
    {
        warn!(tunnel_id = %tunnel.id, "Failed to write credentials, deleting tunnel");
        if let Err(delete_err) = ctx.directory.delete_tunnels(&[tunnel.id]).await {
            warn!(tunnel_id = %tunnel.id, "Couldn't delete tunnel {}: {}", tunnel.id, delete_err);
        }
        return Err(err).context("Your tunnel's credentials couldn't be saved");
    }

    match format {
        Some(format) => render(format, &tunnel, out)?,
        None => writeln!(out, "Created tunnel {} with id {}", tunnel.name, tunnel.id)?,
    }
    Ok(())
}

/// Flags accepted by `list`
#[derive(Debug, Clone, Default)]
pub struct ListArgs {
    pub output: Option<String>,
    pub show_deleted: bool,
    pub name: Option<String>,
    pub when: Option<String>,
    pub id: Option<String>,
    pub show_recently_disconnected: bool,
}

/// Translate `list` flags into a directory filter.
///
/// Without `--show-deleted` the filter excludes deleted tunnels and, absent
/// `--when`, keeps only those that exist right now.
pub fn build_filter(args: &ListArgs, now: DateTime<Utc>) -> Result<TunnelFilter> {
    let mut filter = TunnelFilter::new();
    if !args.show_deleted {
        filter.no_deleted();
    }
    if let Some(name) = args.name.as_deref().filter(|n| !n.is_empty()) {
        filter.by_name(name);
    }
    match args.when.as_deref() {
        Some(when) => {
            let at = DateTime::parse_from_rfc3339(when)
                .context(format!("{} is not a valid RFC3339 timestamp", when))?;
            filter.by_existed_at(at.with_timezone(&Utc));
        }
        None if !args.show_deleted => {
            filter.by_existed_at(now);
        }
        None => {}
    }
    if let Some(id) = args.id.as_deref() {
        let id = Uuid::parse_str(id).context(format!("{} is not a valid tunnel ID", id))?;
        filter.by_tunnel_id(id);
    }
    Ok(filter)
}

pub async fn list(ctx: &CommandContext, args: &ListArgs, out: &mut dyn Write) -> Result<()> {
    let format = parse_format(args.output.as_deref())?;
    let filter = build_filter(args, Utc::now())?;

    let tunnels = ctx
        .directory
        .list_tunnels(&filter)
        .await
        .context("List Tunnel API call failed")?;

    if let Some(format) = format {
        render(format, &tunnels, out)?;
    } else if tunnels.is_empty() {
        writeln!(
            out,
            "You have no tunnels, use 'tunnelctl create' to define a new tunnel"
        )?;
    } else {
        write_tunnel_table(&tunnels, args.show_recently_disconnected, out)?;
    }
    Ok(())
}

/// Delete tunnels and their local credentials files
pub async fn delete(
    ctx: &CommandContext,
    references: &[String],
    credentials_file: Option<PathBuf>,
    force: bool,
    out: &mut dyn Write,
) -> Result<()> {
    if references.is_empty() {
        bail!(UsageError::new(
            "\"tunnelctl delete\" requires at least 1 argument, the ID or name of the tunnel to delete."
        ));
    }
    let ids = find_ids(ctx.directory.as_ref(), references).await?;

    for id in ids {
        let tunnel = ctx
            .directory
            .get_tunnel(id)
            .await
            .context(format!("Can't get tunnel information. Please check tunnel id: {}", id))?;

        if tunnel.is_deleted() {
            bail!("Tunnel {} has already been deleted", tunnel.id);
        }
        if tunnel.has_active_connections() {
            if !force {
                bail!(
                    "You can not delete tunnel {} because it has active connections. To see connections run the 'list' command. If you believe the tunnel is not active, you can use a --force flag.",
                    id
                );
            }
            ctx.directory
                .cleanup_connections(&[id])
                .await
                .context(format!("Error cleaning up connections for tunnel {}", id))?;
        }

        ctx.directory
            .delete_tunnels(&[id])
            .await
            .context("Error deleting tunnel")?;

        let path = match &credentials_file {
            Some(path) => expand_home(path)?,
            None => ctx.credentials.credentials_path(id)?,
        };
        if is_regular_file(&path) {
            match fs::remove_file(&path) {
                Ok(()) => info!(tunnel_id = %id, "Removed credentials file {}", path.display()),
                Err(err) => warn!(
                    tunnel_id = %id,
                    "Tunnel {} was deleted, but we could not remove its credentials file {}: {}. Consider deleting this file manually.",
                    id,
                    path.display(),
                    err
                ),
            }
        }

        writeln!(out, "Deleted tunnel {}", tunnel.name)?;
    }
    Ok(())
}

/// Connect a tunnel at the configured point of presence until `shutdown`
pub async fn run<F>(
    ctx: &CommandContext,
    reference: &str,
    credentials_file: Option<PathBuf>,
    force: bool,
    shutdown: F,
    out: &mut dyn Write,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    let id = find_id(ctx.directory.as_ref(), reference).await?;

    let path = match credentials_file {
        Some(path) => expand_home(&path)?,
        None => ctx.credentials.credentials_path(id)?,
    };
    if !is_regular_file(&path) {
        bail!(
            "Tunnel credentials file '{}' doesn't exist or is not a file. Create the tunnel with 'tunnelctl create' or pass --credentials-file.",
            path.display()
        );
    }
    let credentials = CredentialStore::read(&path)?;

    let tunnel = ctx.directory.get_tunnel(id).await?;
    if tunnel.has_active_connections() && !force {
        bail!(
            "Tunnel {} is already running with connections {}. Use --force to run it anyway.",
            tunnel.name,
            summarize_connections(&tunnel.connections, false)
        );
    }

    let connection = ctx
        .directory
        .connect(id, &credentials.tunnel_secret, &ctx.config.colo_name)
        .await
        .context("Failed to connect tunnel")?;
    info!(
        tunnel_id = %id,
        connection_id = %connection.id,
        "Registered tunnel connection at {}",
        connection.colo_name
    );
    writeln!(
        out,
        "Tunnel {} is running at {} (connection {})",
        tunnel.name, connection.colo_name, connection.id
    )?;
    out.flush()?;

    shutdown.await;

    info!(tunnel_id = %id, "Shutting down tunnel");
    ctx.directory
        .disconnect(id, connection.id)
        .await
        .context("Failed to unregister tunnel connection")?;
    Ok(())
}

/// Drop stale connection records of tunnels
pub async fn cleanup(ctx: &CommandContext, references: &[String], out: &mut dyn Write) -> Result<()> {
    if references.is_empty() {
        bail!(UsageError::new(
            "\"tunnelctl cleanup\" requires at least 1 argument, the IDs of the tunnels to cleanup connections."
        ));
    }
    let ids = find_ids(ctx.directory.as_ref(), references).await?;

    ctx.directory
        .cleanup_connections(&ids)
        .await
        .context("Error cleaning up connections")?;

    for id in &ids {
        writeln!(out, "Cleaned up connections for tunnel {}", id)?;
    }
    Ok(())
}

/// Route requested by `route dns` or `route lb`
#[derive(Debug, Clone)]
pub enum RouteRequest {
    Dns { tunnel: String, hostname: String },
    LoadBalancer { tunnel: String, lb_name: String, pool: String },
}

pub async fn route(ctx: &CommandContext, request: &RouteRequest, out: &mut dyn Write) -> Result<()> {
    let (reference, route) = match request {
        RouteRequest::Dns { tunnel, hostname } => (tunnel, Route::dns(hostname)?),
        RouteRequest::LoadBalancer {
            tunnel,
            lb_name,
            pool,
        } => (tunnel, Route::load_balancer(lb_name, pool)?),
    };

    let id = find_id(ctx.directory.as_ref(), reference).await?;
    let result = ctx
        .directory
        .route_tunnel(id, &route)
        .await
        .context(format!("Failed to add route {}", route.kind()))?;

    let summary = result.success_summary();
    info!(tunnel_id = %id, "{}", summary);
    writeln!(out, "{}", summary)?;
    Ok(())
}
