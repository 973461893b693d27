//! Desired-state construction from configuration

use anyhow::{Context, Result};
use declarative::DesiredState;
use std::collections::BTreeMap;

use crate::profiles;
use crate::schema::Config;

/// Everything a run needs, resolved from configuration
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub desired: DesiredState,
    pub variables: BTreeMap<String, String>,
}

impl ExecutionPlan {
    /// Build and validate the selected profile
    ///
    /// Construction errors surface here, before anything touches the host.
    pub fn build(config: &Config) -> Result<Self> {
        let variables = profiles::variables(config);
        let resources = profiles::resources(config, &variables)
            .with_context(|| format!("Invalid profile '{}'", config.profile))?;
        let desired = DesiredState::new(resources)
            .with_context(|| format!("Invalid desired state for profile '{}'", config.profile))?;

        log::debug!(
            "profile {}: {} resources, {} notification edges",
            config.profile,
            desired.len(),
            desired.bus().edges().len()
        );

        Ok(Self { desired, variables })
    }

    /// Template sources the desired state renders
    pub fn template_sources(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = self
            .desired
            .resources()
            .iter()
            .filter_map(|r| match &r.spec {
                declarative::ResourceSpec::Template { source, .. } => Some(source.as_str()),
                _ => None,
            })
            .collect();
        sources.dedup();
        sources
    }
}
