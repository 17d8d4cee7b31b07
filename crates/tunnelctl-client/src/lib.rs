//! Tunnel directory client
//!
//! Everything the CLI asks of the tunnel directory goes through the
//! [`TunnelDirectory`] trait. [`LocalDirectory`] implements it on top of
//! JSON files, one per tunnel.

pub mod directory;
pub mod error;
pub mod local;
pub mod resolve;

pub use directory::TunnelDirectory;
pub use error::DirectoryError;
pub use local::LocalDirectory;
pub use resolve::{find_id, find_ids, ResolveError};
