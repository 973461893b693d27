//! In-memory host used by the engine's tests

use crate::context::{ActionExecutor, GuardEvaluator};
use crate::resource::{Resource, ResourceSpec};
use crate::types::{ChangeOutcome, DeferredAction, Guard, Identity};
use anyhow::{Result, bail};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Check(String),
    Apply(String),
    Deferred(String),
}

#[derive(Debug, Default)]
pub struct HostModel {
    pub paths: HashSet<PathBuf>,
    pub contents: HashMap<PathBuf, Vec<u8>>,
    pub templates: HashMap<String, Vec<u8>>,
    pub packages: BTreeSet<String>,
    pub users: BTreeSet<String>,
    pub groups: HashMap<String, BTreeSet<String>>,
    pub enabled: BTreeSet<String>,
    pub active: BTreeSet<String>,
    pub events: Vec<Event>,
    /// Resources whose action fails
    pub failing: HashSet<Identity>,
    /// Deferred actions that fail
    pub failing_deferred: HashSet<DeferredAction>,
    /// Commands that succeed without producing their guard path
    pub leaky_commands: HashSet<String>,
    /// Guard paths that cannot be read
    pub unreadable: HashSet<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeHost(pub Rc<RefCell<HostModel>>);

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guards(&self) -> FakeGuards {
        FakeGuards(self.clone())
    }

    pub fn executor(&self) -> FakeExecutor {
        FakeExecutor(self.clone())
    }

    pub fn with<T>(&self, f: impl FnOnce(&mut HostModel) -> T) -> T {
        f(&mut self.0.borrow_mut())
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.0.borrow_mut().events.clear();
    }

    /// Only the executor's side effects, in order
    pub fn effects(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| !matches!(e, Event::Check(_)))
            .collect()
    }

    pub fn set_template(&self, source: &str, body: &str) {
        self.with(|h| h.templates.insert(source.to_string(), body.as_bytes().to_vec()));
    }
}

pub struct FakeGuards(FakeHost);

impl GuardEvaluator for FakeGuards {
    fn satisfied(&self, resource: &Resource) -> Result<bool> {
        let mut host = self.0.0.borrow_mut();
        host.events.push(Event::Check(resource.identity().to_string()));
        match &resource.guard {
            None => Ok(false),
            Some(guard) => {
                let path = guard.path();
                if host.unreadable.contains(&path) {
                    bail!("permission denied: {}", path.display());
                }
                Ok(host.paths.contains(&path))
            }
        }
    }
}

pub struct FakeExecutor(FakeHost);

impl ActionExecutor for FakeExecutor {
    fn apply(&mut self, resource: &Resource) -> Result<ChangeOutcome> {
        let mut host = self.0.0.borrow_mut();
        let identity = resource.identity();
        host.events.push(Event::Apply(identity.to_string()));

        if host.failing.contains(&identity) {
            bail!("simulated failure");
        }

        let changed = match &resource.spec {
            ResourceSpec::PackageSet { packages } => packages
                .iter()
                .fold(false, |acc, p| host.packages.insert(p.clone()) || acc),
            ResourceSpec::User { name, .. } => host.users.insert(name.clone()),
            ResourceSpec::Group { name, members, .. } => {
                let created = !host.groups.contains_key(name);
                let group = host.groups.entry(name.clone()).or_default();
                members
                    .iter()
                    .fold(created, |acc, m| group.insert(m.clone()) || acc)
            }
            ResourceSpec::Directory { path, .. } | ResourceSpec::File { path, .. } => {
                host.paths.insert(path.clone())
            }
            ResourceSpec::Template { path, source, .. } => {
                let Some(rendered) = host.templates.get(source).cloned() else {
                    bail!("template {source} not found");
                };
                host.paths.insert(path.clone());
                host.contents.insert(path.clone(), rendered.clone()) != Some(rendered)
            }
            ResourceSpec::Command { name, .. } => {
                if !host.leaky_commands.contains(name)
                    && let Some(guard) = &resource.guard
                {
                    host.paths.insert(guard.path());
                }
                true
            }
            ResourceSpec::ServiceEnable { unit } => host.enabled.insert(unit.clone()),
            ResourceSpec::ServiceStart { unit } => host.active.insert(unit.clone()),
        };

        Ok(ChangeOutcome::from_bool(changed))
    }

    fn run_deferred(&mut self, action: &DeferredAction) -> Result<()> {
        let mut host = self.0.0.borrow_mut();
        host.events.push(Event::Deferred(action.to_string()));
        if host.failing_deferred.contains(action) {
            bail!("simulated {} failure", action.verb());
        }
        Ok(())
    }
}

/// Guard helper for tests that do not care about the path
pub fn exists(path: &str) -> Guard {
    Guard::path_exists(path)
}
