//! Tunnel credentials file
//!
//! Credentials live next to the origin certificate as `<tunnel-id>.json`,
//! so they end up wherever the user already keeps their certificate.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::CredentialError;
use crate::path::{expand_home, parent_dir, write_owner_only};
use crate::secret::TunnelSecret;

/// Contents of a tunnel credentials file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelCredentials {
    #[serde(rename = "AccountTag")]
    pub account_tag: String,
    #[serde(rename = "TunnelSecret")]
    pub tunnel_secret: TunnelSecret,
}

/// Writes and reads credentials files relative to an origin certificate
#[derive(Debug, Clone)]
pub struct CredentialStore {
    origin_cert: PathBuf,
}

impl CredentialStore {
    pub fn new(origin_cert: impl Into<PathBuf>) -> Self {
        Self {
            origin_cert: origin_cert.into(),
        }
    }

    pub fn origin_cert(&self) -> &Path {
        &self.origin_cert
    }

    /// Path of the credentials file for `tunnel_id`, home-expanded
    pub fn credentials_path(&self, tunnel_id: Uuid) -> Result<PathBuf, CredentialError> {
        let file_name = format!("{}.json", tunnel_id);
        expand_home(&parent_dir(&self.origin_cert).join(file_name))
    }

    /// Write the credentials of a freshly created tunnel.
    ///
    /// The file is written in one piece with owner-only permissions; on
    /// failure nothing is left at the target path and nothing is retried.
    pub fn persist(
        &self,
        tunnel_id: Uuid,
        account_tag: &str,
        secret: &TunnelSecret,
    ) -> Result<PathBuf, CredentialError> {
        let path = self.credentials_path(tunnel_id)?;
        let credentials = TunnelCredentials {
            account_tag: account_tag.to_string(),
            tunnel_secret: secret.clone(),
        };
        let body = serde_json::to_vec(&credentials).map_err(CredentialError::Serialize)?;

        info!(
            "Writing tunnel credentials to {}. This location was chosen based on where your origin certificate was found.",
            path.display()
        );
        info!("Keep this file secret. To revoke these credentials, delete the tunnel.");

        write_owner_only(&path, &body).map_err(|source| CredentialError::Write {
            path: path.clone(),
            source,
        })?;

        Ok(path)
    }

    /// Read a credentials file written by [`CredentialStore::persist`]
    pub fn read(path: &Path) -> Result<TunnelCredentials, CredentialError> {
        let path = expand_home(path)?;
        let body = fs::read(&path).map_err(|source| CredentialError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_slice(&body).map_err(|source| CredentialError::Parse { path, source })
    }
}

/// True if `path` exists and is not a directory
pub fn is_regular_file(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(metadata) => !metadata.is_dir(),
        Err(_) => false,
    }
}
