//! Declared resources
//!
//! A [`Resource`] is plain data: what to converge ([`ResourceSpec`]), an
//! optional [`Guard`] and the deferred actions to schedule when it changes.
//! Nothing here touches the host, so desired states can be built and
//! inspected freely in tests.

use crate::types::{DeferredAction, Guard, Identity, ResourceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Desired owner, group and permission bits of a filesystem object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "mode")]
    pub mode: Option<u32>,
}

/// Kind-specific attributes of a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceSpec {
    PackageSet {
        packages: Vec<String>,
    },
    User {
        name: String,
        #[serde(default = "default_true")]
        system: bool,
    },
    Group {
        name: String,
        #[serde(default)]
        members: Vec<String>,
        #[serde(default = "default_true")]
        append: bool,
        #[serde(default = "default_true")]
        system: bool,
    },
    Directory {
        path: PathBuf,
        #[serde(flatten)]
        ownership: Ownership,
        #[serde(default)]
        recursive: bool,
    },
    File {
        path: PathBuf,
        #[serde(flatten)]
        ownership: Ownership,
    },
    Template {
        path: PathBuf,
        source: String,
        #[serde(flatten)]
        ownership: Ownership,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        variables: BTreeMap<String, String>,
        /// False copies the source without substituting placeholders
        #[serde(default = "default_true", skip_serializing_if = "is_true")]
        render: bool,
    },
    Command {
        name: String,
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<PathBuf>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        environment: BTreeMap<String, String>,
    },
    ServiceEnable {
        unit: String,
    },
    ServiceStart {
        unit: String,
    },
}

fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

/// A unit of desired state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(flatten)]
    pub spec: ResourceSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<Guard>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notifies: Vec<DeferredAction>,
}

impl From<ResourceSpec> for Resource {
    fn from(spec: ResourceSpec) -> Self {
        Self {
            spec,
            guard: None,
            notifies: Vec::new(),
        }
    }
}

impl Resource {
    pub fn packages<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ResourceSpec::PackageSet {
            packages: packages.into_iter().map(Into::into).collect(),
        }
        .into()
    }

    pub fn user(name: &str) -> Self {
        ResourceSpec::User {
            name: name.to_string(),
            system: true,
        }
        .into()
    }

    pub fn group(name: &str) -> Self {
        ResourceSpec::Group {
            name: name.to_string(),
            members: Vec::new(),
            append: true,
            system: true,
        }
        .into()
    }

    pub fn directory(path: impl AsRef<Path>) -> Self {
        ResourceSpec::Directory {
            path: path.as_ref().to_path_buf(),
            ownership: Ownership::default(),
            recursive: false,
        }
        .into()
    }

    pub fn file(path: impl AsRef<Path>) -> Self {
        ResourceSpec::File {
            path: path.as_ref().to_path_buf(),
            ownership: Ownership::default(),
        }
        .into()
    }

    /// A file that is only ever created, never rewritten
    pub fn touch_once(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self::file(path).guard(Guard::path_exists(path))
    }

    pub fn template(path: impl AsRef<Path>, source: &str) -> Self {
        ResourceSpec::Template {
            path: path.as_ref().to_path_buf(),
            source: source.to_string(),
            ownership: Ownership::default(),
            variables: BTreeMap::new(),
            render: true,
        }
        .into()
    }

    pub fn command(name: &str, command: &str) -> Self {
        ResourceSpec::Command {
            name: name.to_string(),
            command: command.to_string(),
            user: None,
            cwd: None,
            environment: BTreeMap::new(),
        }
        .into()
    }

    /// Install an interpreter package once, recorded by a marker in `marker_dir`
    pub fn interpreter_package(installer: &str, package: &str, marker_dir: &Path) -> Self {
        Self::command(
            &format!("pip_{package}"),
            &format!("{installer} install {package}"),
        )
        .guard(Guard::marker(marker_dir, package))
    }

    pub fn service_enable(unit: &str) -> Self {
        ResourceSpec::ServiceEnable {
            unit: unit.to_string(),
        }
        .into()
    }

    pub fn service_start(unit: &str) -> Self {
        ResourceSpec::ServiceStart {
            unit: unit.to_string(),
        }
        .into()
    }

    // ------------------------------------------------------------------
    // Builder-style modifiers. Attribute setters only affect kinds that
    // carry the attribute.
    // ------------------------------------------------------------------

    pub fn guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn notifies(mut self, action: DeferredAction) -> Self {
        self.notifies.push(action);
        self
    }

    pub fn owner(mut self, owner: &str) -> Self {
        if let Some(ownership) = self.ownership_mut() {
            ownership.owner = Some(owner.to_string());
        }
        self
    }

    pub fn group_owner(mut self, group: &str) -> Self {
        if let Some(ownership) = self.ownership_mut() {
            ownership.group = Some(group.to_string());
        }
        self
    }

    pub fn mode(mut self, mode: u32) -> Self {
        if let Some(ownership) = self.ownership_mut() {
            ownership.mode = Some(mode);
        }
        self
    }

    pub fn recursive(mut self, value: bool) -> Self {
        if let ResourceSpec::Directory { recursive, .. } = &mut self.spec {
            *recursive = value;
        }
        self
    }

    pub fn members<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let ResourceSpec::Group { members, .. } = &mut self.spec {
            members.extend(names.into_iter().map(Into::into));
        }
        self
    }

    pub fn run_as(mut self, name: &str) -> Self {
        if let ResourceSpec::Command { user, .. } = &mut self.spec {
            *user = Some(name.to_string());
        }
        self
    }

    pub fn cwd(mut self, dir: impl AsRef<Path>) -> Self {
        if let ResourceSpec::Command { cwd, .. } = &mut self.spec {
            *cwd = Some(dir.as_ref().to_path_buf());
        }
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        if let ResourceSpec::Command { environment, .. } = &mut self.spec {
            environment.insert(key.to_string(), value.to_string());
        }
        self
    }

    /// Copy a template source as-is instead of rendering it
    pub fn verbatim(mut self) -> Self {
        if let ResourceSpec::Template { render, .. } = &mut self.spec {
            *render = false;
        }
        self
    }

    pub fn variable(mut self, key: &str, value: &str) -> Self {
        if let ResourceSpec::Template { variables, .. } = &mut self.spec {
            variables.insert(key.to_string(), value.to_string());
        }
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn kind(&self) -> ResourceKind {
        match &self.spec {
            ResourceSpec::PackageSet { .. } => ResourceKind::PackageSet,
            ResourceSpec::User { .. } => ResourceKind::User,
            ResourceSpec::Group { .. } => ResourceKind::Group,
            ResourceSpec::Directory { .. } => ResourceKind::Directory,
            ResourceSpec::File { .. } => ResourceKind::File,
            ResourceSpec::Template { .. } => ResourceKind::Template,
            ResourceSpec::Command { .. } => ResourceKind::Command,
            ResourceSpec::ServiceEnable { .. } => ResourceKind::ServiceEnable,
            ResourceSpec::ServiceStart { .. } => ResourceKind::ServiceStart,
        }
    }

    /// Kind-specific key, unique per kind within a desired state
    pub fn name(&self) -> String {
        match &self.spec {
            ResourceSpec::PackageSet { packages } => packages.join(", "),
            ResourceSpec::User { name, .. }
            | ResourceSpec::Group { name, .. }
            | ResourceSpec::Command { name, .. } => name.clone(),
            ResourceSpec::Directory { path, .. }
            | ResourceSpec::File { path, .. }
            | ResourceSpec::Template { path, .. } => path.display().to_string(),
            ResourceSpec::ServiceEnable { unit } | ResourceSpec::ServiceStart { unit } => {
                unit.clone()
            }
        }
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.kind(), self.name())
    }

    /// Human-readable description of what converging this resource does
    pub fn description(&self) -> String {
        match &self.spec {
            ResourceSpec::PackageSet { packages } => {
                format!("Install packages {}", packages.join(", "))
            }
            ResourceSpec::User { name, .. } => format!("Create user {name}"),
            ResourceSpec::Group { name, members, .. } if members.is_empty() => {
                format!("Create group {name}")
            }
            ResourceSpec::Group { name, members, .. } => {
                format!("Create group {name} with members {}", members.join(", "))
            }
            ResourceSpec::Directory { path, .. } => format!("Create directory {}", path.display()),
            ResourceSpec::File { path, .. } => format!("Create file {}", path.display()),
            ResourceSpec::Template {
                path,
                source,
                render: false,
                ..
            } => format!("Install {} from {}", path.display(), source),
            ResourceSpec::Template { path, source, .. } => {
                format!("Render {} from {}", path.display(), source)
            }
            ResourceSpec::Command {
                name,
                user: Some(user),
                ..
            } => format!("Run {name} as {user}"),
            ResourceSpec::Command { name, .. } => format!("Run {name}"),
            ResourceSpec::ServiceEnable { unit } => format!("Enable {unit}"),
            ResourceSpec::ServiceStart { unit } => format!("Start {unit}"),
        }
    }

    /// Filesystem path the resource manages, if any
    pub fn path(&self) -> Option<&Path> {
        match &self.spec {
            ResourceSpec::Directory { path, .. }
            | ResourceSpec::File { path, .. }
            | ResourceSpec::Template { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn ownership(&self) -> Option<&Ownership> {
        match &self.spec {
            ResourceSpec::Directory { ownership, .. }
            | ResourceSpec::File { ownership, .. }
            | ResourceSpec::Template { ownership, .. } => Some(ownership),
            _ => None,
        }
    }

    fn ownership_mut(&mut self) -> Option<&mut Ownership> {
        match &mut self.spec {
            ResourceSpec::Directory { ownership, .. }
            | ResourceSpec::File { ownership, .. }
            | ResourceSpec::Template { ownership, .. } => Some(ownership),
            _ => None,
        }
    }

    /// Service unit declared by a ServiceEnable/ServiceStart resource
    pub fn declared_unit(&self) -> Option<&str> {
        match &self.spec {
            ResourceSpec::ServiceEnable { unit } | ResourceSpec::ServiceStart { unit } => {
                Some(unit)
            }
            _ => None,
        }
    }
}

/// Permission bits as octal strings (`"0750"`) or plain integers
pub mod mode {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(u32),
    }

    /// Parse an octal mode string such as `"0750"` or `"644"`
    pub fn parse(text: &str) -> Result<u32, String> {
        let digits = text.trim().trim_start_matches("0o");
        let mode = u32::from_str_radix(digits, 8)
            .map_err(|_| format!("invalid octal mode '{text}'"))?;
        if mode > 0o7777 {
            return Err(format!("mode '{text}' out of range"));
        }
        Ok(mode)
    }

    /// Render a mode the way it is declared
    pub fn format(mode: u32) -> String {
        format!("{mode:04o}")
    }

    pub fn serialize<S: Serializer>(mode: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error> {
        match mode {
            Some(m) => serializer.serialize_str(&format(*m)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
        match Option::<Repr>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Repr::Text(text)) => parse(&text).map(Some).map_err(serde::de::Error::custom),
            // Integers are taken as already-decoded permission bits
            Some(Repr::Number(n)) if n <= 0o7777 => Ok(Some(n)),
            Some(Repr::Number(n)) => Err(serde::de::Error::custom(format!(
                "mode {n} out of range"
            ))),
        }
    }
}
