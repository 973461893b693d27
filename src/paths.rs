//! Configuration file resolution
//!
//! # Environment Variables
//!
//! - `CONVERGE_CONFIG` - Explicit configuration file
//! - `CONVERGE_CONFIG_DIR` - Directory holding `converge.toml`
//!
//! # Resolution Priority
//!
//! 1. `--config` flag
//! 2. `CONVERGE_CONFIG` environment variable
//! 3. `$CONVERGE_CONFIG_DIR/converge.toml`
//! 4. `/etc/converge/converge.toml`
//! 5. `~/.config/converge/converge.toml`
//!
//! Explicit locations (1-3) are used even when the file is missing, so a
//! typo surfaces as an error instead of silently falling back.

use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file
pub const ENV_CONFIG: &str = "CONVERGE_CONFIG";

/// Environment variable naming the configuration directory
pub const ENV_CONFIG_DIR: &str = "CONVERGE_CONFIG_DIR";

/// Configuration file name inside a configuration directory
pub const CONFIG_FILE: &str = "converge.toml";

/// System-wide configuration directory
pub const SYSTEM_CONFIG_DIR: &str = "/etc/converge";

/// Where the configuration comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLocation {
    /// Named by the operator; must exist
    Explicit(PathBuf),
    /// First default that exists, if any
    Discovered(Option<PathBuf>),
}

impl ConfigLocation {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(path) => Some(path),
            Self::Discovered(path) => path.as_deref(),
        }
    }
}

/// Resolve the configuration location
pub fn config_location(flag: Option<&Path>) -> ConfigLocation {
    resolve(
        flag,
        std::env::var(ENV_CONFIG).ok().as_deref(),
        std::env::var(ENV_CONFIG_DIR).ok().as_deref(),
        &default_candidates(),
    )
}

fn resolve(
    flag: Option<&Path>,
    env_file: Option<&str>,
    env_dir: Option<&str>,
    defaults: &[PathBuf],
) -> ConfigLocation {
    if let Some(path) = flag {
        log::debug!("Using config from --config: {}", path.display());
        return ConfigLocation::Explicit(path.to_path_buf());
    }

    if let Some(file) = env_file.filter(|v| !v.is_empty()) {
        let path = expand(file);
        log::debug!("Using config from {ENV_CONFIG}: {}", path.display());
        return ConfigLocation::Explicit(path);
    }

    if let Some(dir) = env_dir.filter(|v| !v.is_empty()) {
        let path = expand(dir).join(CONFIG_FILE);
        log::debug!("Using config from {ENV_CONFIG_DIR}: {}", path.display());
        return ConfigLocation::Explicit(path);
    }

    let found = defaults.iter().find(|p| p.is_file()).cloned();
    match &found {
        Some(path) => log::debug!("Using config: {}", path.display()),
        None => log::debug!("No config file found, using defaults"),
    }
    ConfigLocation::Discovered(found)
}

/// Default configuration files in priority order
pub fn default_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![Path::new(SYSTEM_CONFIG_DIR).join(CONFIG_FILE)];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".config").join("converge").join(CONFIG_FILE));
    }
    candidates
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
