//! Built-in desired-state profiles
//!
//! Both profiles converge a host running the capture-processing service:
//! accounts, a data tree, interpreter packages, TLS material, a log file,
//! the service's unit file and program, and the running service itself.
//! `full` adds the capture tooling and the shared `/nsm` data layout.
//!
//! Names and paths come from template variables, so overriding
//! `app_user` in the configuration renames the account everywhere.

use anyhow::{Result, bail};
use declarative::{DeferredAction, Guard, Resource};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::schema::{Config, ProfileName, Tools};

/// Interpreter packages the service imports
const PIP_PACKAGES_FULL: &[&str] = &[
    "fastapi",
    "pydantic",
    "uvicorn",
    "gunicorn",
    "python-dateutil",
];
const PIP_PACKAGES_MINIMAL: &[&str] = &["fastapi", "pydantic", "uvicorn"];

/// Work directories under `<data_root>/<app_user>`
const WORK_DIRS: &[&str] = &["pending", "finished", "pcaps", "files"];

/// Template variables every profile understands
pub fn default_variables() -> BTreeMap<String, String> {
    [
        ("app_user", "pcapfab"),
        ("app_group", "pcapfab"),
        ("data_user", "nsm"),
        ("data_group", "nsm"),
        ("capture_group", "stenographer"),
        ("data_root", "/nsm"),
        ("app_dir", "/opt/pcapfab"),
        ("log_file", "/var/log/pcapfab.log"),
        ("service_unit", "pcapfab.service"),
        ("unit_dir", "/etc/systemd/system"),
        ("python", "/usr/bin/python3"),
        ("listen_port", "8443"),
        ("cert_subject", "/C=US/ST=Washington/L=Seattle/O=KP/CN=pcapfab.com"),
        ("cert_days", "1826"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Profile defaults overridden by the configuration's `[variables]`
pub fn variables(config: &Config) -> BTreeMap<String, String> {
    let mut vars = default_variables();
    vars.extend(config.variables.clone());
    vars
}

/// Resolved names and paths a profile is built from
#[derive(Debug, Clone)]
pub struct Layout {
    pub app_user: String,
    pub app_group: String,
    pub data_user: String,
    pub data_group: String,
    pub capture_group: String,
    pub data_root: PathBuf,
    pub app_dir: PathBuf,
    pub log_file: PathBuf,
    pub service_unit: String,
    pub unit_dir: PathBuf,
    pub cert_subject: String,
    pub cert_days: String,
}

impl Layout {
    pub fn from_variables(vars: &BTreeMap<String, String>) -> Result<Self> {
        let get = |key: &str| -> Result<String> {
            match vars.get(key).map(|v| v.trim()) {
                Some(v) if !v.is_empty() => Ok(v.to_string()),
                _ => bail!("variable '{key}' must not be empty"),
            }
        };
        let path = |key: &str| -> Result<PathBuf> {
            let value = PathBuf::from(get(key)?);
            if !value.is_absolute() {
                bail!("variable '{key}' must be an absolute path");
            }
            Ok(value)
        };

        Ok(Self {
            app_user: get("app_user")?,
            app_group: get("app_group")?,
            data_user: get("data_user")?,
            data_group: get("data_group")?,
            capture_group: get("capture_group")?,
            data_root: path("data_root")?,
            app_dir: path("app_dir")?,
            log_file: path("log_file")?,
            service_unit: get("service_unit")?,
            unit_dir: path("unit_dir")?,
            cert_subject: get("cert_subject")?,
            cert_days: get("cert_days")?,
        })
    }

    fn key_file(&self) -> PathBuf {
        self.app_dir.join("key.pem")
    }

    fn cert_file(&self) -> PathBuf {
        self.app_dir.join("cert.pem")
    }

    fn program(&self) -> PathBuf {
        self.app_dir.join(format!("{}.py", self.app_user))
    }

    fn unit_file(&self) -> PathBuf {
        self.unit_dir.join(&self.service_unit)
    }
}

/// Resources of the selected profile, in declaration order
pub fn resources(config: &Config, vars: &BTreeMap<String, String>) -> Result<Vec<Resource>> {
    match config.profile {
        ProfileName::Full => Ok(full(&Layout::from_variables(vars)?, &config.tools)),
        ProfileName::Minimal => Ok(minimal(&Layout::from_variables(vars)?, &config.tools)),
        ProfileName::Custom => Ok(config.resources.clone()),
    }
}

/// The complete capture-processing host
pub fn full(layout: &Layout, tools: &Tools) -> Vec<Resource> {
    let l = layout;
    let mut resources = vec![
        Resource::packages(["python3-pip", "zip", "unzip", "wireshark-common"]),
        Resource::command("install_ipython", &format!("{} install ipython", tools.pip))
            .guard(Guard::path_exists("/usr/local/bin/ipython")),
        Resource::user(&l.app_user),
        Resource::user(&l.data_user),
        Resource::group(&l.capture_group).members([l.app_user.as_str()]),
        Resource::group(&l.data_group).members([l.app_user.as_str()]),
        Resource::directory(&l.data_root)
            .owner(&l.data_user)
            .group_owner(&l.data_group)
            .mode(0o750),
    ];

    let work_root = l.data_root.join(&l.app_user);
    resources.push(data_dir(&work_root, l));
    resources.extend(WORK_DIRS.iter().map(|dir| data_dir(&work_root.join(dir), l)));

    resources.push(app_dir(l));
    resources.extend(service_runtime(l, tools, PIP_PACKAGES_FULL));
    resources
}

/// The service and its runtime only
pub fn minimal(layout: &Layout, tools: &Tools) -> Vec<Resource> {
    let mut resources = vec![
        Resource::packages(["python3-pip"]),
        Resource::user(&layout.app_user),
        app_dir(layout),
    ];
    resources.extend(service_runtime(layout, tools, PIP_PACKAGES_MINIMAL));
    resources
}

fn data_dir(path: &Path, l: &Layout) -> Resource {
    Resource::directory(path)
        .owner(&l.app_user)
        .group_owner(&l.data_group)
        .mode(0o750)
}

fn app_dir(l: &Layout) -> Resource {
    Resource::directory(&l.app_dir)
        .owner(&l.app_user)
        .group_owner(&l.app_group)
        .mode(0o750)
}

/// Interpreter packages, TLS material, log file, unit, program and service
fn service_runtime(l: &Layout, tools: &Tools, pip_packages: &[&str]) -> Vec<Resource> {
    let mut resources: Vec<Resource> = pip_packages
        .iter()
        .map(|pkg| Resource::interpreter_package(&tools.pip, pkg, &l.app_dir))
        .collect();

    let key = l.key_file();
    resources.push(
        Resource::command(
            "generate_certs",
            &format!(
                "openssl req -newkey rsa:4096 -new -nodes -x509 -days {} -keyout {} -out {} -subj \"{}\"",
                l.cert_days,
                key.display(),
                l.cert_file().display(),
                l.cert_subject
            ),
        )
        .run_as(&l.app_user)
        .guard(Guard::path_exists(&key)),
    );

    resources.push(
        Resource::touch_once(&l.log_file)
            .owner(&l.app_user)
            .group_owner(&l.app_group)
            .mode(0o644),
    );

    resources.push(
        Resource::template(l.unit_file(), "pcapfab.service.tmpl")
            .owner("root")
            .group_owner("root")
            .mode(0o644),
    );

    resources.push(
        Resource::template(l.program(), "pcapfab.py.tmpl")
            .verbatim()
            .owner(&l.app_user)
            .group_owner(&l.app_group)
            .mode(0o644)
            .notifies(DeferredAction::restart(&l.service_unit)),
    );

    resources.push(Resource::service_enable(&l.service_unit));
    resources.push(Resource::service_start(&l.service_unit));
    resources
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{DesiredState, ResourceKind, ResourceSpec, marker_file_name};

    fn layout() -> Layout {
        Layout::from_variables(&default_variables()).unwrap()
    }

    fn identities(resources: &[Resource]) -> Vec<String> {
        resources.iter().map(|r| r.identity().to_string()).collect()
    }

    #[test]
    fn full_profile_is_a_valid_desired_state() {
        let resources = full(&layout(), &Tools::default());
        let desired = DesiredState::new(resources).unwrap();
        assert_eq!(desired.len(), 24);
    }

    #[test]
    fn minimal_profile_is_a_valid_desired_state() {
        let desired = DesiredState::new(minimal(&layout(), &Tools::default())).unwrap();
        assert_eq!(desired.len(), 12);
    }

    #[test]
    fn full_profile_declares_data_tree_in_order() {
        let ids = identities(&full(&layout(), &Tools::default()));
        let dirs: Vec<_> = ids
            .iter()
            .filter(|id| id.starts_with("directory["))
            .map(String::as_str)
            .collect();
        assert_eq!(
            dirs,
            vec![
                "directory[/nsm]",
                "directory[/nsm/pcapfab]",
                "directory[/nsm/pcapfab/pending]",
                "directory[/nsm/pcapfab/finished]",
                "directory[/nsm/pcapfab/pcaps]",
                "directory[/nsm/pcapfab/files]",
                "directory[/opt/pcapfab]",
            ]
        );
    }

    #[test]
    fn profile_ends_with_service_and_only_program_notifies() {
        let resources = full(&layout(), &Tools::default());
        let tail: Vec<_> = identities(&resources).into_iter().rev().take(4).collect();
        assert_eq!(
            tail,
            vec![
                "service_start[pcapfab.service]",
                "service_enable[pcapfab.service]",
                "template[/opt/pcapfab/pcapfab.py]",
                "template[/etc/systemd/system/pcapfab.service]",
            ]
        );

        let notifying: Vec<_> = resources
            .iter()
            .filter(|r| !r.notifies.is_empty())
            .map(|r| r.identity().to_string())
            .collect();
        assert_eq!(notifying, vec!["template[/opt/pcapfab/pcapfab.py]"]);
    }

    #[test]
    fn program_is_installed_verbatim_and_unit_is_rendered() {
        let resources = full(&layout(), &Tools::default());
        let render_flag = |source: &str| {
            resources.iter().find_map(|r| match &r.spec {
                ResourceSpec::Template { source: s, render, .. } if s == source => Some(*render),
                _ => None,
            })
        };
        assert_eq!(render_flag("pcapfab.py.tmpl"), Some(false));
        assert_eq!(render_flag("pcapfab.service.tmpl"), Some(true));
    }

    #[test]
    fn pip_packages_use_marker_guards_in_app_dir() {
        let resources = full(&layout(), &Tools::default());
        let pip = resources
            .iter()
            .find(|r| r.name() == "pip_fastapi")
            .unwrap();

        assert_eq!(pip.kind(), ResourceKind::Command);
        assert_eq!(
            pip.guard.as_ref().unwrap().path(),
            Path::new("/opt/pcapfab").join(marker_file_name("fastapi"))
        );
    }

    #[test]
    fn certs_run_as_app_user_guarded_by_key() {
        let resources = minimal(&layout(), &Tools::default());
        let certs = resources
            .iter()
            .find(|r| r.name() == "generate_certs")
            .unwrap();

        assert_eq!(certs.description(), "Run generate_certs as pcapfab");
        assert_eq!(
            certs.guard,
            Some(Guard::path_exists("/opt/pcapfab/key.pem"))
        );
    }

    #[test]
    fn variables_rename_accounts_and_paths() {
        let mut config = Config::default();
        config.variables.insert("app_user".into(), "svc".into());
        config.variables.insert("app_dir".into(), "/srv/app".into());

        let vars = variables(&config);
        let ids = identities(&resources(&config, &vars).unwrap());
        assert!(ids.contains(&"user[svc]".to_string()));
        assert!(ids.contains(&"directory[/srv/app]".to_string()));
        assert!(ids.contains(&"template[/srv/app/svc.py]".to_string()));
    }

    #[test]
    fn empty_or_relative_variables_are_rejected() {
        let mut vars = default_variables();
        vars.insert("app_user".into(), " ".into());
        assert!(Layout::from_variables(&vars).is_err());

        let mut vars = default_variables();
        vars.insert("app_dir".into(), "opt/app".into());
        assert!(Layout::from_variables(&vars).is_err());
    }

    #[test]
    fn custom_profile_uses_declared_resources() {
        let config = Config {
            profile: ProfileName::Custom,
            resources: vec![Resource::user("svc")],
            ..Config::default()
        };
        let out = resources(&config, &variables(&config)).unwrap();
        assert_eq!(identities(&out), vec!["user[svc]"]);
    }
}
