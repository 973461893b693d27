//! Service manager backend

use anyhow::Result;
use declarative::DeferredAction;

use crate::runner;

/// Narrow interface to the service manager
pub trait ServiceManager {
    fn is_enabled(&self, unit: &str) -> Result<bool>;
    fn is_active(&self, unit: &str) -> Result<bool>;
    fn enable(&mut self, unit: &str) -> Result<()>;
    fn start(&mut self, unit: &str) -> Result<()>;
    fn restart(&mut self, unit: &str) -> Result<()>;
    fn reload(&mut self, unit: &str) -> Result<()>;

    /// Re-read unit files after they changed on disk
    fn daemon_reload(&mut self) -> Result<()>;

    /// Run a deferred restart/reload
    fn run(&mut self, action: &DeferredAction) -> Result<()> {
        match action {
            DeferredAction::Restart { unit } => self.restart(unit),
            DeferredAction::Reload { unit } => self.reload(unit),
        }
    }
}

/// systemd via `systemctl`
pub struct Systemd {
    systemctl: String,
}

impl Systemd {
    pub fn new(systemctl: &str) -> Self {
        Self {
            systemctl: systemctl.to_string(),
        }
    }

    fn exec(&self, verb: &str, unit: &str) -> Result<()> {
        runner::run_checked(std::process::Command::new(&self.systemctl).args([verb, unit]))?;
        log::info!("systemctl {verb} {unit}");
        Ok(())
    }
}

impl ServiceManager for Systemd {
    fn is_enabled(&self, unit: &str) -> Result<bool> {
        runner::succeeds(&self.systemctl, &["is-enabled", "--quiet", unit])
    }

    fn is_active(&self, unit: &str) -> Result<bool> {
        runner::succeeds(&self.systemctl, &["is-active", "--quiet", unit])
    }

    fn enable(&mut self, unit: &str) -> Result<()> {
        self.exec("enable", unit)
    }

    fn start(&mut self, unit: &str) -> Result<()> {
        self.exec("start", unit)
    }

    fn restart(&mut self, unit: &str) -> Result<()> {
        self.exec("restart", unit)
    }

    fn reload(&mut self, unit: &str) -> Result<()> {
        self.exec("reload", unit)
    }

    fn daemon_reload(&mut self) -> Result<()> {
        runner::run_checked(std::process::Command::new(&self.systemctl).arg("daemon-reload"))?;
        log::debug!("systemctl daemon-reload");
        Ok(())
    }
}

/// Whether a path is a systemd unit file location
pub fn is_unit_file(path: &std::path::Path) -> bool {
    const UNIT_DIRS: &[&str] = &[
        "/etc/systemd/system",
        "/lib/systemd/system",
        "/usr/lib/systemd/system",
    ];
    path.parent()
        .and_then(|p| p.to_str())
        .is_some_and(|dir| UNIT_DIRS.iter().any(|d| dir.starts_with(d)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn unit_file_locations() {
        assert!(is_unit_file(Path::new("/etc/systemd/system/pcapfab.service")));
        assert!(is_unit_file(Path::new(
            "/etc/systemd/system/pcapfab.service.d/override.conf"
        )));
        assert!(!is_unit_file(Path::new("/opt/pcapfab/pcapfab.py")));
    }

    #[test]
    fn missing_systemctl_is_an_error_not_inactive() {
        let systemd = Systemd::new("definitely-not-systemctl-xyz");
        assert!(systemd.is_active("x.service").is_err());
    }
}
