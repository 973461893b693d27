//! System user and group database lookups

use anyhow::{Context, Result};
use std::ffi::{CStr, CString};
use std::path::PathBuf;

/// A resolved system account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub uid: u32,
    pub gid: u32,
    pub home: PathBuf,
}

/// Look up a user by name
#[cfg(unix)]
pub fn user(name: &str) -> Result<Option<Account>> {
    let c_name = CString::new(name).context("Invalid user name")?;

    // SAFETY: getpwnam returns null or a pointer to static storage that
    // stays valid until the next passwd lookup. Every field is copied out
    // before returning and runs are single-threaded.
    unsafe {
        let pw = libc::getpwnam(c_name.as_ptr());
        if pw.is_null() {
            return Ok(None);
        }
        let pw = &*pw;
        Ok(Some(Account {
            uid: pw.pw_uid,
            gid: pw.pw_gid,
            home: PathBuf::from(CStr::from_ptr(pw.pw_dir).to_string_lossy().into_owned()),
        }))
    }
}

/// Look up a group by name, returning its gid and member list
#[cfg(unix)]
pub fn group(name: &str) -> Result<Option<(u32, Vec<String>)>> {
    let c_name = CString::new(name).context("Invalid group name")?;

    // SAFETY: as in `user`; gr_mem is a null-terminated array of C strings.
    unsafe {
        let gr = libc::getgrnam(c_name.as_ptr());
        if gr.is_null() {
            return Ok(None);
        }
        let gr = &*gr;

        let mut members = Vec::new();
        let mut cursor = gr.gr_mem;
        while !cursor.is_null() && !(*cursor).is_null() {
            members.push(CStr::from_ptr(*cursor).to_string_lossy().into_owned());
            cursor = cursor.add(1);
        }

        Ok(Some((gr.gr_gid, members)))
    }
}

/// Resolve a user name to a uid, failing if the user does not exist
pub fn uid(name: &str) -> Result<u32> {
    user(name)?
        .map(|a| a.uid)
        .with_context(|| format!("Unknown user '{name}'"))
}

/// Resolve a group name to a gid, failing if the group does not exist
pub fn gid(name: &str) -> Result<u32> {
    group(name)?
        .map(|(gid, _)| gid)
        .with_context(|| format!("Unknown group '{name}'"))
}

/// Whether the process runs as root
pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}
