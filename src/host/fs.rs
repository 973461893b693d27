//! Directories, files and ownership

use anyhow::{Context, Result};
use declarative::Ownership;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;

use super::ids;

/// Correct owner, group and mode drift on `path`
///
/// Returns whether anything was changed.
pub fn converge_ownership(path: &Path, ownership: &Ownership) -> Result<bool> {
    let meta = fs::metadata(path).with_context(|| format!("Failed to stat {}", path.display()))?;
    let mut changed = false;

    let uid = ownership.owner.as_deref().map(ids::uid).transpose()?;
    let gid = ownership.group.as_deref().map(ids::gid).transpose()?;

    let wrong_uid = uid.filter(|&u| u != meta.uid());
    let wrong_gid = gid.filter(|&g| g != meta.gid());
    if wrong_uid.is_some() || wrong_gid.is_some() {
        std::os::unix::fs::chown(path, wrong_uid, wrong_gid)
            .with_context(|| format!("Failed to chown {}", path.display()))?;
        log::debug!(
            "{}: owner {:?} group {:?}",
            path.display(),
            ownership.owner,
            ownership.group
        );
        changed = true;
    }

    if let Some(mode) = ownership.mode {
        let current = meta.permissions().mode() & 0o7777;
        if current != mode {
            fs::set_permissions(path, fs::Permissions::from_mode(mode))
                .with_context(|| format!("Failed to chmod {}", path.display()))?;
            log::debug!(
                "{}: mode {} -> {}",
                path.display(),
                declarative::mode::format(current),
                declarative::mode::format(mode)
            );
            changed = true;
        }
    }

    Ok(changed)
}

/// Ensure a directory exists with the given ownership
pub fn converge_directory(path: &Path, ownership: &Ownership, recursive: bool) -> Result<bool> {
    let created = if path.is_dir() {
        false
    } else {
        if recursive {
            fs::create_dir_all(path)
        } else {
            fs::create_dir(path)
        }
        .with_context(|| format!("Failed to create directory {}", path.display()))?;
        true
    };

    Ok(converge_ownership(path, ownership)? || created)
}

/// Create (touch) a file with the given ownership
pub fn converge_file(path: &Path, ownership: &Ownership) -> Result<bool> {
    let created = !path.exists();
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    Ok(converge_ownership(path, ownership)? || created)
}

/// Write `content` to `path` through a sibling temporary file and rename
///
/// The mode is applied before the rename so the final path never exists
/// with looser permissions. Without a mode, an existing file keeps its
/// permissions and a new one gets the umask default. The temporary file is
/// removed on every error path.
pub fn write_atomic(path: &Path, content: &[u8], mode: Option<u32>) -> Result<()> {
    let file_name = path
        .file_name()
        .with_context(|| format!("Invalid destination {}", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let existing = match fs::metadata(path) {
        Ok(meta) => Some(meta.permissions().mode() & 0o7777),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to stat {}", path.display()));
        }
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(&format!(".{}.", file_name.to_string_lossy()))
        .suffix(".converge-tmp")
        .permissions(fs::Permissions::from_mode(0o666))
        .tempfile_in(dir)
        .with_context(|| format!("Failed to create a temporary file in {}", dir.display()))?;

    tmp.write_all(content)
        .with_context(|| format!("Failed to write {}", tmp.path().display()))?;
    if let Some(bits) = mode.or(existing) {
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(bits))
            .with_context(|| format!("Failed to chmod {}", tmp.path().display()))?;
    }

    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to move {} into place", path.display()))?;
    Ok(())
}
