//! Error taxonomy for convergence runs.
//!
//! Every error names the resource identity (or deferred action) that
//! failed. None of them is retried by the engine.

use crate::types::{DeferredAction, Identity};
use std::path::PathBuf;
use thiserror::Error;

/// Problems found while building a desired state, before any host access
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConstructionError {
    /// Two resources share an identity
    #[error("duplicate resource {identity} (declared at positions {first} and {second})")]
    DuplicateIdentity {
        identity: Identity,
        first: usize,
        second: usize,
    },

    /// A non-idempotent resource was declared without a guard
    #[error("{identity} must declare a guard: its action is not idempotent")]
    MissingGuard { identity: Identity },

    /// A package set lists no packages
    #[error("{identity} lists no packages")]
    EmptyPackageSet { identity: Identity },

    /// A package set contains an empty or whitespace-only name
    #[error("{identity} has a blank package name at position {position}")]
    BlankPackageName { identity: Identity, position: usize },

    /// A filesystem resource uses a relative path
    #[error("{identity} uses relative path {}", path.display())]
    RelativePath { identity: Identity, path: PathBuf },

    /// A notification targets a unit no resource declares
    #[error("{source_identity} notifies {action}, but no service resource declares that unit")]
    UnknownNotificationTarget {
        source_identity: Identity,
        action: DeferredAction,
    },
}

/// Terminal failure of a convergence run
#[derive(Debug, Error)]
pub enum Error {
    /// The desired state is invalid
    #[error("invalid desired state: {0}")]
    Construction(#[from] ConstructionError),

    /// A guard could not be evaluated; the run stops rather than guess
    #[error("failed at {identity}: could not evaluate guard")]
    GuardEvaluation {
        identity: Identity,
        #[source]
        source: anyhow::Error,
    },

    /// The external effect of a resource failed
    #[error("failed at {identity}: action failed")]
    ActionFailure {
        identity: Identity,
        #[source]
        source: anyhow::Error,
    },

    /// A deferred action failed after every resource converged
    #[error("failed at deferred {action}: all resources converged, but the deferred action failed")]
    NotificationDrainFailure {
        action: DeferredAction,
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    /// Identity of the failed resource, if the failure belongs to one
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::GuardEvaluation { identity, .. } | Self::ActionFailure { identity, .. } => {
                Some(identity)
            }
            Self::Construction(_) | Self::NotificationDrainFailure { .. } => None,
        }
    }

    /// Whether every primary resource converged before the failure
    pub fn desired_state_reached(&self) -> bool {
        matches!(self, Self::NotificationDrainFailure { .. })
    }
}

/// Result alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceKind;

    #[test]
    fn action_failure_names_identity() {
        let err = Error::ActionFailure {
            identity: Identity::new(ResourceKind::Command, "generate_certs"),
            source: anyhow::anyhow!("exit status 1"),
        };
        assert_eq!(err.to_string(), "failed at command[generate_certs]: action failed");
        assert_eq!(err.identity().unwrap().name, "generate_certs");
        assert!(!err.desired_state_reached());
    }

    #[test]
    fn drain_failure_reports_converged_state() {
        let err = Error::NotificationDrainFailure {
            action: DeferredAction::restart("svc.service"),
            source: anyhow::anyhow!("unit not found"),
        };
        assert!(err.desired_state_reached());
        assert!(err.identity().is_none());
        assert!(err.to_string().contains("restart[svc.service]"));
    }
}
