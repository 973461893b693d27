//! The real host executor
//!
//! [`HostExecutor`] implements [`declarative::ActionExecutor`] on top of
//! narrow backends: the package manager, account tools, the filesystem,
//! the template renderer, a shell and the service manager.

pub mod accounts;
pub mod command;
pub mod fs;
pub mod ids;
pub mod packages;
pub mod service;
pub mod template;

use anyhow::{Context, Result};
use declarative::{ActionExecutor, ChangeOutcome, DeferredAction, Guard, Resource, ResourceSpec};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::schema::Tools;
use accounts::{AccountManager, ShadowUtils};
use command::ShellCommand;
use packages::{Apt, PackageManager};
use service::{ServiceManager, Systemd};

/// Applies resources to the local host
pub struct HostExecutor {
    shell: String,
    template_dir: PathBuf,
    variables: BTreeMap<String, String>,
    packages: Box<dyn PackageManager>,
    accounts: Box<dyn AccountManager>,
    services: Box<dyn ServiceManager>,
    index_refreshed: bool,
    units_dirty: bool,
}

impl HostExecutor {
    pub fn new(tools: &Tools, template_dir: &Path, variables: BTreeMap<String, String>) -> Self {
        Self::with_backends(
            tools,
            template_dir,
            variables,
            Box::new(Apt::new(&tools.package_manager)),
            Box::new(ShadowUtils),
            Box::new(Systemd::new(&tools.systemctl)),
        )
    }

    pub fn with_backends(
        tools: &Tools,
        template_dir: &Path,
        variables: BTreeMap<String, String>,
        packages: Box<dyn PackageManager>,
        accounts: Box<dyn AccountManager>,
        services: Box<dyn ServiceManager>,
    ) -> Self {
        Self {
            shell: tools.shell.clone(),
            template_dir: template_dir.to_path_buf(),
            variables,
            packages,
            accounts,
            services,
            index_refreshed: false,
            units_dirty: false,
        }
    }

    /// Variables for one template: globals overridden by the resource's own
    fn variables_for(&self, overrides: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut merged = self.variables.clone();
        merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    fn reload_units_if_dirty(&mut self) -> Result<()> {
        if self.units_dirty {
            self.services.daemon_reload()?;
            self.units_dirty = false;
        }
        Ok(())
    }

    fn install_packages(&mut self, packages: &[String]) -> Result<bool> {
        let missing = self.packages.missing(packages)?;
        if missing.is_empty() {
            return Ok(false);
        }

        if !self.index_refreshed {
            self.packages
                .refresh()
                .context("Failed to refresh package index")?;
            self.index_refreshed = true;
        }
        self.packages.install(&missing)?;
        log::info!("installed {}", missing.join(", "));
        Ok(true)
    }

    fn run_command(&self, resource: &Resource) -> Result<bool> {
        let ResourceSpec::Command {
            command,
            user,
            cwd,
            environment,
            ..
        } = &resource.spec
        else {
            return Ok(false);
        };

        ShellCommand {
            command,
            user: user.as_deref(),
            cwd: cwd.as_deref(),
            environment: Some(environment),
        }
        .run(&self.shell)?;

        if let Some(guard @ Guard::Marker { .. }) = &resource.guard {
            let marker = guard.path();
            fs::converge_file(&marker, &declarative::Ownership::default())
                .with_context(|| format!("Failed to record marker {}", marker.display()))?;
        }
        Ok(true)
    }
}

impl ActionExecutor for HostExecutor {
    fn apply(&mut self, resource: &Resource) -> Result<ChangeOutcome> {
        let changed = match &resource.spec {
            ResourceSpec::PackageSet { packages } => self.install_packages(packages)?,
            ResourceSpec::User { name, system } => self.accounts.ensure_user(name, *system)?,
            ResourceSpec::Group {
                name,
                members,
                append,
                system,
            } => self
                .accounts
                .ensure_group(name, members, *append, *system)?,
            ResourceSpec::Directory {
                path,
                ownership,
                recursive,
            } => fs::converge_directory(path, ownership, *recursive)?,
            ResourceSpec::File { path, ownership } => fs::converge_file(path, ownership)?,
            ResourceSpec::Template {
                path,
                source,
                ownership,
                variables,
                render,
            } => {
                let content = if *render {
                    let variables = self.variables_for(variables);
                    template::render_file(&self.template_dir, source, &variables)?
                } else {
                    template::read_source(&self.template_dir, source)?
                };
                let changed = template::converge_content(path, &content, ownership)?;
                if changed && service::is_unit_file(path) {
                    self.units_dirty = true;
                }
                changed
            }
            ResourceSpec::Command { .. } => self.run_command(resource)?,
            ResourceSpec::ServiceEnable { unit } => {
                self.reload_units_if_dirty()?;
                if self.services.is_enabled(unit)? {
                    false
                } else {
                    self.services.enable(unit)?;
                    true
                }
            }
            ResourceSpec::ServiceStart { unit } => {
                self.reload_units_if_dirty()?;
                if self.services.is_active(unit)? {
                    false
                } else {
                    self.services.start(unit)?;
                    true
                }
            }
        };

        Ok(ChangeOutcome::from_bool(changed))
    }

    fn run_deferred(&mut self, action: &DeferredAction) -> Result<()> {
        self.reload_units_if_dirty()?;
        self.services.run(action)
    }
}
