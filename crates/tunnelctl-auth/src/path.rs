//! Platform-sensitive path handling: home expansion and owner-only writes

use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use crate::error::CredentialError;

/// Expand a leading `~` to the current user's home directory.
///
/// `~user` forms are left untouched.
pub fn expand_home(path: &Path) -> Result<PathBuf, CredentialError> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let home = dirs::home_dir().ok_or(CredentialError::HomeDirUnavailable)?;
            Ok(home.join(components.as_path()))
        }
        _ => Ok(path.to_path_buf()),
    }
}

/// Directory containing `path`, `.` for a bare file name
pub fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Atomically write `contents` to `path`, readable only by the owner.
///
/// The data goes to a temporary file in the target directory first and is
/// renamed into place once it is complete and synced, so a failure never
/// leaves a truncated file at `path`.
pub fn write_owner_only(path: &Path, contents: &[u8]) -> io::Result<()> {
    write_atomic(path, contents, Access::OwnerRead)
}

/// Like [`write_owner_only`], but the owner may rewrite the file later
pub fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    write_atomic(path, contents, Access::OwnerReadWrite)
}

#[derive(Clone, Copy)]
enum Access {
    OwnerRead,
    OwnerReadWrite,
}

fn write_atomic(path: &Path, contents: &[u8], access: Access) -> io::Result<()> {
    let mut file = tempfile::Builder::new()
        .prefix(".tunnelctl-")
        .suffix(".tmp")
        .tempfile_in(parent_dir(path))?;

    file.write_all(contents)?;
    file.as_file().sync_all()?;
    restrict_to_owner(file.path(), access)?;

    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path, access: Access) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = match access {
        Access::OwnerRead => 0o400,
        Access::OwnerReadWrite => 0o600,
    };
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn restrict_to_owner(path: &Path, access: Access) -> io::Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_readonly(matches!(access, Access::OwnerRead));
    fs::set_permissions(path, permissions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_expand_home() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(
            expand_home(Path::new("~/.tunnelctl/cert.pem")).unwrap(),
            home.join(".tunnelctl/cert.pem")
        );
        assert_eq!(expand_home(Path::new("~")).unwrap(), home);
    }

    #[test]
    fn test_expand_home_leaves_other_paths() {
        assert_eq!(
            expand_home(Path::new("/etc/tunnel/cert.pem")).unwrap(),
            PathBuf::from("/etc/tunnel/cert.pem")
        );
        assert_eq!(
            expand_home(Path::new("certs/~/cert.pem")).unwrap(),
            PathBuf::from("certs/~/cert.pem")
        );
        assert_eq!(
            expand_home(Path::new("~other/cert.pem")).unwrap(),
            PathBuf::from("~other/cert.pem")
        );
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir(Path::new("cert.pem")), Path::new("."));
        assert_eq!(parent_dir(Path::new("/a/b/cert.pem")), Path::new("/a/b"));
    }

    #[test]
    fn test_write_owner_only() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("secret.json");

        write_owner_only(&path, b"{}").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"{}");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o400);
        }

        // Only the target file remains
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_private_can_be_rewritten() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("record.json");

        write_private(&path, b"{}").unwrap();
        write_private(&path, b"[]").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"[]");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_into_missing_directory_fails_cleanly() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing").join("secret.json");

        assert!(write_owner_only(&path, b"{}").is_err());
        assert!(!path.exists());
    }
}
