use crate::error::{PodError, Result};
use crate::paths;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Exclusive hold on `.pods/registry.lock` for one read-allocate-write cycle.
///
/// Acquisition uses create-new semantics, so a second `pods` process fails
/// fast instead of reading the same registry state. The file is removed on drop.
#[derive(Debug)]
pub struct RegistryLock {
    path: PathBuf,
}

impl RegistryLock {
    pub fn acquire(root: &Path) -> Result<Self> {
        let path = paths::lock_path(root);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(PodError::RegistryLocked(path));
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(file, "{}", std::process::id())?;
        tracing::debug!(path = %path.display(), "registry lock acquired");
        Ok(Self { path })
    }
}

impl Drop for RegistryLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release registry lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn second_acquire_is_rejected() {
        let dir = TempDir::new().unwrap();
        let _first = RegistryLock::acquire(dir.path()).unwrap();
        let err = RegistryLock::acquire(dir.path()).unwrap_err();
        assert!(matches!(err, PodError::RegistryLocked(p) if p == paths::lock_path(dir.path())));
    }

    #[test]
    fn drop_releases() {
        let dir = TempDir::new().unwrap();
        {
            let _lock = RegistryLock::acquire(dir.path()).unwrap();
            assert!(paths::lock_path(dir.path()).exists());
        }
        assert!(!paths::lock_path(dir.path()).exists());
        RegistryLock::acquire(dir.path()).unwrap();
    }
}
