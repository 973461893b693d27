//! Filesystem guard evaluation

use crate::context::GuardEvaluator;
use crate::resource::Resource;
use anyhow::{Context, Result};
use std::path::Path;

/// Evaluates guards against the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsGuard;

impl FsGuard {
    /// Existence check that refuses to guess.
    ///
    /// A missing path is `Ok(false)`; an unreadable parent is an error.
    pub fn exists(path: &Path) -> Result<bool> {
        path.try_exists()
            .with_context(|| format!("Cannot determine whether {} exists", path.display()))
    }
}

impl GuardEvaluator for FsGuard {
    fn satisfied(&self, resource: &Resource) -> Result<bool> {
        match &resource.guard {
            None => Ok(false),
            Some(guard) => {
                let satisfied = Self::exists(&guard.path())?;
                log::debug!("guard {} for {}: {}", guard, resource.identity(), satisfied);
                Ok(satisfied)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Guard;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn unguarded_resource_is_never_satisfied() {
        let res = Resource::user("svc");
        assert!(!FsGuard.satisfied(&res).unwrap());
    }

    #[test]
    fn path_guard_follows_existence() {
        let tmp = TempDir::new().unwrap();
        let key = tmp.path().join("key.pem");
        let res = Resource::command("generate_certs", "true").guard(Guard::path_exists(&key));

        assert!(!FsGuard.satisfied(&res).unwrap());
        fs::write(&key, "secret").unwrap();
        assert!(FsGuard.satisfied(&res).unwrap());
    }

    #[test]
    fn marker_guard_checks_marker_file() {
        let tmp = TempDir::new().unwrap();
        let res = Resource::interpreter_package("pip3", "uvicorn", tmp.path());

        assert!(!FsGuard.satisfied(&res).unwrap());
        fs::write(tmp.path().join("pip_dep_uvicorn_installed"), "").unwrap();
        assert!(FsGuard.satisfied(&res).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_parent_is_an_error() {
        use std::os::unix::fs::PermissionsExt;

        // Root ignores directory permissions, so the check cannot fail there
        // SAFETY: geteuid has no preconditions and cannot fail.
        if unsafe { libc::geteuid() } == 0 {
            return;
        }

        let tmp = TempDir::new().unwrap();
        let locked = tmp.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let res = Resource::touch_once(locked.join("inner.log"));
        let result = FsGuard.satisfied(&res);

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(result.is_err());
    }
}
