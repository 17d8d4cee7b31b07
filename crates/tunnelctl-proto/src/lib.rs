//! Tunnel Directory Types
//!
//! This crate defines the records exchanged with the tunnel directory service,
//! the routing intents submitted to it, and the local validation rules that
//! every name and hostname must pass before it leaves the machine.

pub mod filter;
pub mod route;
pub mod tunnel;
pub mod validation;

pub use filter::{FilterPredicate, TunnelFilter};
pub use route::{Change, Route, RouteError, RouteResult};
pub use tunnel::{summarize_connections, Connection, Tunnel};
pub use validation::{is_valid_hostname, is_valid_name};

/// Timestamp layout used for `existed_at` queries and table output
pub const TIME_LAYOUT: chrono::SecondsFormat = chrono::SecondsFormat::Secs;
