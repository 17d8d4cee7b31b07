//! tunnelctl - Command-line interface for managing named tunnels

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tunnelctl_cli::commands::{self, ListArgs, RouteRequest};
use tunnelctl_cli::{CommandContext, ConfigManager, UsageError};

/// tunnelctl - Create, route and inspect named tunnels
#[derive(Parser, Debug)]
#[command(name = "tunnelctl")]
#[command(about = "Create, route and inspect named tunnels", long_about = None)]
#[command(version = env!("GIT_TAG"))]
#[command(long_version = concat!(env!("GIT_TAG"), "\nCommit: ", env!("GIT_HASH"), "\nBuilt: ", env!("BUILD_TIME")))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Origin certificate; credentials files are written next to it
    #[arg(long, global = true, env = "TUNNEL_ORIGIN_CERT")]
    origincert: Option<PathBuf>,

    /// Directory holding the tunnel records
    #[arg(long, global = true, env = "TUNNEL_DIRECTORY")]
    directory: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new tunnel with the given name
    Create {
        name: String,

        /// Render output: json or yaml
        #[arg(short, long)]
        output: Option<String>,
    },

    /// List existing tunnels
    List {
        /// Render output: json or yaml
        #[arg(short, long)]
        output: Option<String>,

        /// Include deleted tunnels
        #[arg(short = 'd', long)]
        show_deleted: bool,

        /// List tunnels with the given name
        #[arg(short, long)]
        name: Option<String>,

        /// List tunnels that existed at this RFC3339 instant
        #[arg(short, long)]
        when: Option<String>,

        /// List the tunnel with this ID
        #[arg(short, long)]
        id: Option<String>,

        /// Include connections that recently dropped
        #[arg(long, visible_alias = "rd")]
        show_recently_disconnected: bool,
    },

    /// Delete tunnels by ID or name
    Delete {
        #[arg(required = true)]
        tunnels: Vec<String>,

        /// Credentials file to remove instead of the default location
        #[arg(long, visible_alias = "cred-file")]
        credentials_file: Option<PathBuf>,

        /// Clean up active connections before deleting
        #[arg(short, long)]
        force: bool,
    },

    /// Run a tunnel until interrupted
    Run {
        tunnel: String,

        /// Credentials file to use instead of the default location
        #[arg(long, visible_alias = "cred-file")]
        credentials_file: Option<PathBuf>,

        /// Run even if the tunnel already has active connections
        #[arg(short, long)]
        force: bool,
    },

    /// Drop stale connection records of tunnels
    Cleanup {
        #[arg(required = true)]
        tunnels: Vec<String>,
    },

    /// Route traffic to a tunnel
    Route {
        #[command(subcommand)]
        command: RouteCommands,
    },

    /// Manage global CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum RouteCommands {
    /// Point a hostname at the tunnel with a CNAME record
    Dns { tunnel: String, hostname: String },

    /// Add the tunnel as an origin of a load balancer pool
    Lb {
        tunnel: String,
        #[arg(value_name = "LB-NAME")]
        lb_name: String,
        #[arg(value_name = "POOL-NAME")]
        pool: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Set the account tag written into new credentials files
    SetAccount { tag: String },

    /// Show the current configuration
    Show,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    if let Err(err) = dispatch(cli).await {
        if err.downcast_ref::<UsageError>().is_some() {
            eprintln!("Error: {}", err);
            eprintln!("Run 'tunnelctl --help' for usage.");
            std::process::exit(2);
        }
        return Err(err);
    }
    Ok(())
}

async fn dispatch(cli: Cli) -> Result<()> {
    let mut stdout = io::stdout();

    let Cli {
        command,
        origincert,
        directory,
        ..
    } = cli;
    let open_context = move || -> Result<CommandContext> {
        let config = ConfigManager::load()?.with_overrides(origincert, directory);
        CommandContext::open_local(config)
    };

    match command {
        Commands::Create { name, output } => {
            let ctx = open_context()?;
            commands::create(&ctx, &name, output.as_deref(), &mut stdout).await
        }
        Commands::List {
            output,
            show_deleted,
            name,
            when,
            id,
            show_recently_disconnected,
        } => {
            let args = ListArgs {
                output,
                show_deleted,
                name,
                when,
                id,
                show_recently_disconnected,
            };
            let ctx = open_context()?;
            commands::list(&ctx, &args, &mut stdout).await
        }
        Commands::Delete {
            tunnels,
            credentials_file,
            force,
        } => {
            let ctx = open_context()?;
            commands::delete(&ctx, &tunnels, credentials_file, force, &mut stdout).await
        }
        Commands::Run {
            tunnel,
            credentials_file,
            force,
        } => {
            let ctx = open_context()?;
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for Ctrl+C: {}", e);
                }
            };
            commands::run(&ctx, &tunnel, credentials_file, force, shutdown, &mut stdout).await
        }
        Commands::Cleanup { tunnels } => {
            let ctx = open_context()?;
            commands::cleanup(&ctx, &tunnels, &mut stdout).await
        }
        Commands::Route { command } => {
            let request = match command {
                RouteCommands::Dns { tunnel, hostname } => RouteRequest::Dns { tunnel, hostname },
                RouteCommands::Lb {
                    tunnel,
                    lb_name,
                    pool,
                } => RouteRequest::LoadBalancer {
                    tunnel,
                    lb_name,
                    pool,
                },
            };
            let ctx = open_context()?;
            commands::route(&ctx, &request, &mut stdout).await
        }
        Commands::Config { command } => handle_config_command(command, &mut stdout),
    }
}

fn handle_config_command(command: ConfigCommands, out: &mut dyn Write) -> Result<()> {
    let path = ConfigManager::config_path()?;
    match command {
        ConfigCommands::SetAccount { tag } => {
            ConfigManager::set_account_tag(&path, tag)?;
            writeln!(out, "✅ Account tag saved to {}", path.display())?;
        }
        ConfigCommands::Show => {
            let config = ConfigManager::load_from(&path)?;
            let json = serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
            writeln!(out, "{}", json)?;
        }
    }
    Ok(())
}

fn init_logging(log_level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))
        .context("Failed to initialize logging filter")?;

    // Logs go to stderr so json/yaml output on stdout stays parseable
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    Ok(())
}
