//! Binary file preparation inside the install directory
//!
//! Handles removing an outdated binary before a fresh extraction and marking
//! the extracted binary executable.

use std::path::Path;

use log::{debug, warn};

use crate::install::error::InstallError;

/// Set executable permissions (755) on Unix; no-op elsewhere
pub fn make_executable(path: &Path) -> Result<(), InstallError> {
    #[cfg(unix)]
    {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let mut perms = fs::metadata(path)
            .map_err(|e| InstallError::io(format!("read metadata for {}", path.display()), e))?
            .permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms)
            .map_err(|e| InstallError::io(format!("set permissions on {}", path.display()), e))?;
        debug!("Set mode 755 on {}", path.display());
    }

    #[cfg(not(unix))]
    {
        let _ = path;
    }

    Ok(())
}

/// Remove an outdated or broken binary before reinstalling
///
/// Best effort: extraction overwrites the file anyway, so a failure is only
/// logged.
pub fn remove_stale_binary(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed stale binary {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove stale binary {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_make_executable_sets_755() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aid");
        std::fs::write(&path, "bin").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();

        make_executable(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_make_executable_missing_file_errors_on_unix() {
        let dir = tempfile::tempdir().unwrap();
        let result = make_executable(&dir.path().join("absent"));
        if cfg!(unix) {
            assert!(matches!(result, Err(InstallError::Io { .. })));
        } else {
            assert!(result.is_ok());
        }
    }

    #[test]
    fn test_remove_stale_binary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aid");
        std::fs::write(&path, "old").unwrap();

        remove_stale_binary(&path);
        assert!(!path.exists());

        // Missing file is fine
        remove_stale_binary(&path);
    }
}
