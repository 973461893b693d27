//! OS package manager backend

use anyhow::{Context, Result};
use std::process::Command;

use crate::runner;

/// Narrow interface to the OS package manager
pub trait PackageManager {
    /// Packages from `packages` that are not installed
    fn missing(&self, packages: &[String]) -> Result<Vec<String>>;

    /// Refresh the package index
    fn refresh(&mut self) -> Result<()>;

    fn install(&mut self, packages: &[String]) -> Result<()>;
}

/// Debian/Ubuntu: `dpkg-query` for presence, `apt-get` for changes
pub struct Apt {
    apt_get: String,
    dpkg_query: String,
}

impl Apt {
    pub fn new(apt_get: &str) -> Self {
        Self {
            apt_get: apt_get.to_string(),
            dpkg_query: "dpkg-query".to_string(),
        }
    }

    fn apt(&self) -> Command {
        let mut cmd = Command::new(&self.apt_get);
        cmd.env("DEBIAN_FRONTEND", "noninteractive");
        cmd
    }

    fn is_installed(&self, package: &str) -> Result<bool> {
        // dpkg-query exits non-zero for packages it has never seen
        let output = Command::new(&self.dpkg_query)
            .args(["-W", "-f=${Status}", package])
            .stdin(std::process::Stdio::null())
            .output()
            .with_context(|| format!("Failed to execute: {} -W {package}", self.dpkg_query))?;
        Ok(output.status.success()
            && is_installed_status(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Whether a dpkg `${Status}` field means fully installed
pub fn is_installed_status(status: &str) -> bool {
    status.split_whitespace().last() == Some("installed")
        && status.split_whitespace().next() == Some("install")
}

impl PackageManager for Apt {
    fn missing(&self, packages: &[String]) -> Result<Vec<String>> {
        let mut missing = Vec::new();
        for package in packages {
            if !self.is_installed(package)? {
                missing.push(package.clone());
            }
        }
        Ok(missing)
    }

    fn refresh(&mut self) -> Result<()> {
        runner::run_checked(self.apt().arg("update").arg("-q"))?;
        Ok(())
    }

    fn install(&mut self, packages: &[String]) -> Result<()> {
        runner::run_checked(
            self.apt()
                .args(["install", "-y", "-q"])
                .args(packages),
        )?;
        Ok(())
    }
}
