//! Execution engine for converge
//!
//! The engine orchestrates:
//! 1. Planning - Build the desired state from configuration
//! 2. Diffing - Evaluate guards and show what a run would do
//! 3. Executing - Converge the host through the real executor

pub mod differ;
pub mod executor;
pub mod planner;

pub use executor::{ExecuteOptions, execute};
pub use planner::ExecutionPlan;
