use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while locating, writing or reading a credentials file
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Failed to determine home directory")]
    HomeDirUnavailable,

    #[error("Unable to marshal tunnel credentials to JSON")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to write tunnel credentials to {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read tunnel credentials from {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid tunnel credentials file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
