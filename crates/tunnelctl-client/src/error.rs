use std::io;
use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Errors returned by a tunnel directory
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Tunnel {0} not found")]
    NotFound(Uuid),

    #[error("Tunnel {0} has been deleted")]
    Deleted(Uuid),

    #[error("A tunnel named '{0}' already exists")]
    NameConflict(String),

    #[error("Invalid credentials for tunnel {0}")]
    Unauthorized(Uuid),

    #[error("Connection {connection_id} not found on tunnel {tunnel_id}")]
    ConnectionNotFound { tunnel_id: Uuid, connection_id: Uuid },

    #[error("Directory I/O error at {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Corrupt tunnel record {}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize tunnel record: {0}")]
    Serialize(#[from] serde_json::Error),
}
