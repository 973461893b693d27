use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths::{self, ConfigLocation};
use crate::schema::{Config, ProfileName};

/// Supported configuration formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Detect the format from the file extension; anything but `.json` is TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }

    pub fn parse(self, content: &str) -> Result<Config> {
        match self {
            Self::Toml => toml::from_str(content).context("Invalid TOML format"),
            Self::Json => serde_json::from_str(content).context("Invalid JSON format"),
        }
    }
}

/// A loaded configuration and the file it came from
#[derive(Debug)]
pub struct Loaded {
    pub config: Config,
    pub source: Option<PathBuf>,
}

impl Loaded {
    /// Human-readable origin for status output
    pub fn origin(&self) -> String {
        self.source
            .as_ref()
            .map_or_else(|| "built-in defaults".to_string(), |p| p.display().to_string())
    }
}

/// Load the configuration, applying a `--profile` override
pub fn load(flag: Option<&Path>, profile: Option<ProfileName>) -> Result<Loaded> {
    let location = paths::config_location(flag);
    let mut loaded = load_from(&location)?;
    if let Some(profile) = profile {
        log::debug!("profile override: {profile}");
        loaded.config.profile = profile;
    }
    loaded.config.validate()?;
    Ok(loaded)
}

fn load_from(location: &ConfigLocation) -> Result<Loaded> {
    let Some(path) = location.path() else {
        return Ok(Loaded {
            config: Config::default(),
            source: None,
        });
    };

    if !path.exists() {
        bail!("Config file not found: {}", path.display());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read config file: {}", path.display()))?;
    let config = ConfigFormat::from_path(path)
        .parse(&content)
        .with_context(|| format!("Invalid config file: {}", path.display()))?;

    Ok(Loaded {
        config,
        source: Some(path.to_path_buf()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn format_from_extension() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("/etc/converge/converge.json")),
            ConfigFormat::Json
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("/etc/converge/converge.toml")),
            ConfigFormat::Toml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("/etc/converge/converge")),
            ConfigFormat::Toml
        );
    }

    #[test]
    fn no_file_means_defaults() {
        let loaded = load_from(&ConfigLocation::Discovered(None)).unwrap();
        assert!(loaded.source.is_none());
        assert_eq!(loaded.config.profile, ProfileName::Full);
        assert_eq!(loaded.origin(), "built-in defaults");
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nope.toml");
        let err = load_from(&ConfigLocation::Explicit(path)).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn loads_json_by_extension() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("converge.json");
        fs::write(
            &path,
            r#"{"profile": "minimal", "variables": {"app_user": "svc"}}"#,
        )
        .unwrap();

        let loaded = load_from(&ConfigLocation::Explicit(path.clone())).unwrap();
        assert_eq!(loaded.config.profile, ProfileName::Minimal);
        assert_eq!(loaded.config.variables["app_user"], "svc");
        assert_eq!(loaded.source, Some(path));
    }

    #[test]
    fn invalid_toml_names_the_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("converge.toml");
        fs::write(&path, "profile = [").unwrap();

        let err = format!("{:#}", load_from(&ConfigLocation::Explicit(path)).unwrap_err());
        assert!(err.contains("converge.toml"), "{err}");
    }

    #[test]
    fn profile_override_applies() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("converge.toml");
        fs::write(&path, "profile = \"full\"").unwrap();

        let loaded = load(Some(&path), Some(ProfileName::Minimal)).unwrap();
        assert_eq!(loaded.config.profile, ProfileName::Minimal);
    }
}
