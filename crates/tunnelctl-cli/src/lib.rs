//! tunnelctl - create, route and inspect named tunnels

pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use commands::CommandContext;
pub use config::{CliConfig, ConfigManager};
pub use error::UsageError;
pub use output::{render, write_tunnel_table, OutputError, OutputFormat};
