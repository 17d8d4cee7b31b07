//! Resolve user-supplied tunnel references (ID or name) to tunnel IDs

use thiserror::Error;
use tunnelctl_proto::TunnelFilter;
use uuid::Uuid;

use crate::directory::TunnelDirectory;
use crate::error::DirectoryError;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{0} is neither the ID nor the name of any of your tunnels")]
    NotFound(String),

    #[error("there should only be 1 non-deleted tunnel named {name}, found {count}")]
    Ambiguous { name: String, count: usize },

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Resolve a tunnel reference.
///
/// Anything that parses as a UUID is taken as the tunnel ID without a
/// lookup. Otherwise it is the name of exactly one non-deleted tunnel.
pub async fn find_id(
    directory: &dyn TunnelDirectory,
    reference: &str,
) -> Result<Uuid, ResolveError> {
    if let Ok(id) = Uuid::parse_str(reference) {
        return Ok(id);
    }

    let mut filter = TunnelFilter::new();
    filter.no_deleted().by_name(reference);

    let tunnels = directory.list_tunnels(&filter).await?;
    match tunnels.as_slice() {
        [] => Err(ResolveError::NotFound(reference.to_string())),
        [tunnel] => Ok(tunnel.id),
        _ => Err(ResolveError::Ambiguous {
            name: reference.to_string(),
            count: tunnels.len(),
        }),
    }
}

/// Resolve several references, stopping at the first failure
pub async fn find_ids(
    directory: &dyn TunnelDirectory,
    references: &[String],
) -> Result<Vec<Uuid>, ResolveError> {
    let mut ids = Vec::with_capacity(references.len());
    for reference in references {
        ids.push(find_id(directory, reference).await?);
    }
    Ok(ids)
}
