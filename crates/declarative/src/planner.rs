//! Desired state construction and validation

use crate::error::ConstructionError;
use crate::notify::NotificationBus;
use crate::resource::{Resource, ResourceSpec};
use crate::types::Identity;
use std::collections::{HashMap, HashSet};

/// A validated, ordered list of resources with its notification edges
///
/// Declaration order is execution order. Construction rejects anything the
/// runner could not converge safely.
#[derive(Debug, Clone)]
pub struct DesiredState {
    resources: Vec<Resource>,
    bus: NotificationBus,
}

impl DesiredState {
    /// Validate `resources` and register their notification edges
    pub fn new(resources: Vec<Resource>) -> Result<Self, ConstructionError> {
        validate(&resources)?;

        let mut bus = NotificationBus::new();
        for resource in &resources {
            let identity = resource.identity();
            for action in &resource.notifies {
                bus.register(identity.clone(), action.clone());
            }
        }

        Ok(Self { resources, bus })
    }

    pub fn builder() -> DesiredStateBuilder {
        DesiredStateBuilder::default()
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    /// Split into resources and the notification bus for one run
    pub(crate) fn into_parts(self) -> (Vec<Resource>, NotificationBus) {
        (self.resources, self.bus)
    }
}

/// Collects resources in declaration order
#[derive(Debug, Default)]
pub struct DesiredStateBuilder {
    resources: Vec<Resource>,
}

impl DesiredStateBuilder {
    pub fn resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn resources<I: IntoIterator<Item = Resource>>(mut self, resources: I) -> Self {
        self.resources.extend(resources);
        self
    }

    pub fn push(&mut self, resource: Resource) {
        self.resources.push(resource);
    }

    pub fn build(self) -> Result<DesiredState, ConstructionError> {
        DesiredState::new(self.resources)
    }
}

fn validate(resources: &[Resource]) -> Result<(), ConstructionError> {
    let mut seen: HashMap<Identity, usize> = HashMap::new();

    for (index, resource) in resources.iter().enumerate() {
        let identity = resource.identity();

        if let Some(&first) = seen.get(&identity) {
            return Err(ConstructionError::DuplicateIdentity {
                identity,
                first,
                second: index,
            });
        }

        if resource.kind().requires_guard() && resource.guard.is_none() {
            return Err(ConstructionError::MissingGuard { identity });
        }

        if let ResourceSpec::PackageSet { packages } = &resource.spec {
            if packages.is_empty() {
                return Err(ConstructionError::EmptyPackageSet { identity });
            }
            if let Some(position) = packages.iter().position(|p| p.trim().is_empty()) {
                return Err(ConstructionError::BlankPackageName { identity, position });
            }
        }

        if let Some(path) = resource.path()
            && !path.is_absolute()
        {
            return Err(ConstructionError::RelativePath {
                path: path.to_path_buf(),
                identity,
            });
        }

        seen.insert(identity, index);
    }

    let units: HashSet<&str> = resources.iter().filter_map(Resource::declared_unit).collect();
    for resource in resources {
        for action in &resource.notifies {
            if !units.contains(action.unit()) {
                return Err(ConstructionError::UnknownNotificationTarget {
                    source_identity: resource.identity(),
                    action: action.clone(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeferredAction, Guard, ResourceKind};

    #[test]
    fn preserves_declaration_order() {
        let state = DesiredState::builder()
            .resource(Resource::user("svc"))
            .resource(Resource::directory("/srv/app").owner("svc"))
            .resource(Resource::service_start("svc.service"))
            .build()
            .unwrap();

        let kinds: Vec<_> = state.resources().iter().map(Resource::kind).collect();
        assert_eq!(
            kinds,
            vec![
                ResourceKind::User,
                ResourceKind::Directory,
                ResourceKind::ServiceStart
            ]
        );
    }

    #[test]
    fn rejects_duplicate_identity() {
        let err = DesiredState::new(vec![
            Resource::group("nsm"),
            Resource::user("nsm"),
            Resource::group("nsm").members(["pcapfab"]),
        ])
        .unwrap_err();

        assert_eq!(
            err,
            ConstructionError::DuplicateIdentity {
                identity: Identity::new(ResourceKind::Group, "nsm"),
                first: 0,
                second: 2,
            }
        );
    }

    #[test]
    fn enable_and_start_of_one_unit_are_distinct() {
        let state = DesiredState::new(vec![
            Resource::service_enable("svc.service"),
            Resource::service_start("svc.service"),
        ]);
        assert!(state.is_ok());
    }

    #[test]
    fn rejects_unguarded_command() {
        let err = DesiredState::new(vec![Resource::command("install_ipython", "pip install ipython")])
            .unwrap_err();
        assert!(matches!(err, ConstructionError::MissingGuard { .. }));
    }

    #[test]
    fn rejects_unguarded_file() {
        let err = DesiredState::new(vec![Resource::file("/var/log/app.log")]).unwrap_err();
        assert!(matches!(err, ConstructionError::MissingGuard { .. }));

        let ok = DesiredState::new(vec![Resource::touch_once("/var/log/app.log")]);
        assert!(ok.is_ok());
    }

    #[test]
    fn rejects_empty_package_set() {
        let err = DesiredState::new(vec![Resource::packages(Vec::<String>::new())]).unwrap_err();
        assert!(matches!(err, ConstructionError::EmptyPackageSet { .. }));
    }

    #[test]
    fn rejects_blank_package_name_among_valid_ones() {
        let err = DesiredState::new(vec![Resource::packages(["zip", " ", "unzip"])]).unwrap_err();
        assert!(matches!(
            err,
            ConstructionError::BlankPackageName { position: 1, .. }
        ));
    }

    #[test]
    fn rejects_relative_paths() {
        let err = DesiredState::new(vec![Resource::directory("srv/app")]).unwrap_err();
        assert!(matches!(err, ConstructionError::RelativePath { .. }));
    }

    #[test]
    fn rejects_notification_to_undeclared_unit() {
        let err = DesiredState::new(vec![
            Resource::template("/etc/app.conf", "app.conf.tmpl")
                .notifies(DeferredAction::restart("missing.service")),
            Resource::service_start("svc.service"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConstructionError::UnknownNotificationTarget { .. }
        ));
    }

    #[test]
    fn notification_target_may_be_declared_later() {
        let state = DesiredState::new(vec![
            Resource::template("/etc/app.conf", "app.conf.tmpl")
                .notifies(DeferredAction::restart("svc.service")),
            Resource::command("certs", "true").guard(Guard::path_exists("/etc/key.pem")),
            Resource::service_enable("svc.service"),
        ])
        .unwrap();

        let source = Identity::new(ResourceKind::Template, "/etc/app.conf");
        assert_eq!(
            state.bus().actions_for(&source),
            vec![&DeferredAction::restart("svc.service")]
        );
    }
}
