//! System users and groups

use anyhow::Result;
use std::process::Command;

use super::ids;
use crate::runner;

/// Narrow interface to account management
pub trait AccountManager {
    /// Create the user if missing; returns whether it was created
    fn ensure_user(&mut self, name: &str, system: bool) -> Result<bool>;

    /// Create the group if missing and reconcile members
    ///
    /// With `append`, missing members are added and extra members kept.
    /// Without it, the member list is replaced.
    fn ensure_group(
        &mut self,
        name: &str,
        members: &[String],
        append: bool,
        system: bool,
    ) -> Result<bool>;
}

/// shadow-utils: `useradd`, `groupadd`, `gpasswd`
#[derive(Default)]
pub struct ShadowUtils;

impl AccountManager for ShadowUtils {
    fn ensure_user(&mut self, name: &str, system: bool) -> Result<bool> {
        if ids::user(name)?.is_some() {
            log::debug!("user {name} exists");
            return Ok(false);
        }

        let mut cmd = Command::new("useradd");
        if system {
            cmd.arg("--system");
        }
        runner::run_checked(cmd.arg(name))?;
        log::info!("created user {name}");
        Ok(true)
    }

    fn ensure_group(
        &mut self,
        name: &str,
        members: &[String],
        append: bool,
        system: bool,
    ) -> Result<bool> {
        let mut changed = false;

        let current = match ids::group(name)? {
            Some((_, current)) => current,
            None => {
                let mut cmd = Command::new("groupadd");
                if system {
                    cmd.arg("--system");
                }
                runner::run_checked(cmd.arg(name))?;
                log::info!("created group {name}");
                changed = true;
                Vec::new()
            }
        };

        match membership_change(&current, members, append) {
            MembershipChange::None => {}
            MembershipChange::Add(missing) => {
                for member in missing {
                    runner::run_checked(Command::new("gpasswd").args(["-a", member.as_str(), name]))?;
                    log::info!("added {member} to group {name}");
                }
                changed = true;
            }
            MembershipChange::Replace => {
                runner::run_checked(
                    Command::new("gpasswd").args(["-M", members.join(",").as_str(), name]),
                )?;
                log::info!("set members of group {name}: {}", members.join(", "));
                changed = true;
            }
        }

        Ok(changed)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum MembershipChange {
    None,
    Add(Vec<String>),
    Replace,
}

fn membership_change(current: &[String], desired: &[String], append: bool) -> MembershipChange {
    let missing: Vec<String> = desired
        .iter()
        .filter(|m| !current.contains(*m))
        .cloned()
        .collect();

    if append {
        if missing.is_empty() {
            MembershipChange::None
        } else {
            MembershipChange::Add(missing)
        }
    } else if missing.is_empty() && current.iter().all(|m| desired.contains(m)) {
        MembershipChange::None
    } else {
        MembershipChange::Replace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn append_adds_only_missing_members() {
        assert_eq!(
            membership_change(&names(&["a"]), &names(&["a", "b"]), true),
            MembershipChange::Add(names(&["b"]))
        );
        assert_eq!(
            membership_change(&names(&["a", "z"]), &names(&["a"]), true),
            MembershipChange::None
        );
    }

    #[test]
    fn exact_membership_replaces_on_any_difference() {
        assert_eq!(
            membership_change(&names(&["a", "z"]), &names(&["a"]), false),
            MembershipChange::Replace
        );
        assert_eq!(
            membership_change(&names(&["b", "a"]), &names(&["a", "b"]), false),
            MembershipChange::None
        );
    }

    #[test]
    fn existing_user_is_left_alone() {
        assert!(!ShadowUtils.ensure_user("root", true).unwrap());
    }
}
