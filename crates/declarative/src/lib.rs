//! # Declarative
//!
//! A convergence engine for single-host desired state.
//!
//! A desired state is an ordered list of typed resources. One run walks the
//! list in declaration order and, for each resource, asks a guard whether
//! the desired state already holds, applies the resource only when it does
//! not, and records whether the host actually changed. Changes fire
//! notification edges whose deferred actions run once, after the whole list
//! has converged.
//!
//! ## Core Concepts
//!
//! - **Resource**: a unit of desired state (package set, user, directory, ...)
//! - **Guard**: data describing when a resource is already satisfied
//! - **DesiredState**: validated, ordered resources plus notification edges
//! - **ConvergenceRunner**: the sequential, fail-fast run state machine
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{ConvergenceRunner, DeferredAction, DesiredState, FsGuard, Resource};
//!
//! let desired = DesiredState::builder()
//!     .resource(Resource::user("svc"))
//!     .resource(Resource::directory("/srv/app").owner("svc").mode(0o750))
//!     .resource(
//!         Resource::template("/srv/app/app.conf", "app.conf.tmpl")
//!             .notifies(DeferredAction::restart("svc.service")),
//!     )
//!     .resource(Resource::service_start("svc.service"))
//!     .build()?;
//!
//! let report = ConvergenceRunner::new(FsGuard, my_executor).run(desired);
//! let summary = report.into_result()?;
//! ```
//!
//! ## Provider Traits
//!
//! The runner is generic over:
//!
//! - [`GuardEvaluator`]: reads host facts to decide whether a guard holds
//! - [`ActionExecutor`]: performs the external effect of a resource
//! - [`ProgressCallback`]: receives progress updates
//!
//! This keeps host effects out of the engine and lets tests run it against
//! in-memory fakes.

pub mod context;
pub mod error;
pub mod guard;
pub mod notify;
pub mod plan;
pub mod planner;
pub mod resource;
pub mod runner;
pub mod types;

#[cfg(test)]
mod fake;

// Re-export main types at crate root
pub use context::{ActionExecutor, GuardEvaluator, NoProgress, ProgressCallback};
pub use error::{ConstructionError, Error};
pub use guard::FsGuard;
pub use notify::{NotificationBus, NotificationEdge};
pub use plan::{PlanEntry, PlanStatus, PlanSummary, group_by_kind, plan};
pub use planner::{DesiredState, DesiredStateBuilder};
pub use resource::{Ownership, Resource, ResourceSpec, mode};
pub use runner::{ConvergenceRunner, RunReport, converge};
pub use types::{
    ChangeOutcome, ChangeRecord, DeferredAction, DeferredRecord, Guard, Identity, ResourceKind,
    RunState, RunSummary, marker_file_name,
};
