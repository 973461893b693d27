use anyhow::{Result, bail};
use declarative::Resource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Main Config Schema
// ============================================================================

/// The converge configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Which desired state to converge to
    pub profile: ProfileName,

    /// Directory holding template sources
    pub template_dir: PathBuf,

    /// Template variables, merged over the profile's defaults
    pub variables: BTreeMap<String, String>,

    /// External tool names
    pub tools: Tools,

    /// Resources for the `custom` profile, in declaration order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Resource>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: ProfileName::Full,
            template_dir: PathBuf::from("/etc/converge/templates"),
            variables: BTreeMap::new(),
            tools: Tools::default(),
            resources: Vec::new(),
        }
    }
}

impl Config {
    /// Validate settings that do not depend on the host
    pub fn validate(&self) -> Result<()> {
        if !self.template_dir.is_absolute() {
            bail!(
                "template_dir must be an absolute path, got '{}'",
                self.template_dir.display()
            );
        }

        self.tools.validate()?;

        match self.profile {
            ProfileName::Custom if self.resources.is_empty() => {
                bail!("profile 'custom' requires at least one [[resources]] entry")
            }
            ProfileName::Full | ProfileName::Minimal if !self.resources.is_empty() => {
                log::warn!(
                    "{} [[resources]] entries ignored by profile '{}'",
                    self.resources.len(),
                    self.profile
                );
            }
            _ => {}
        }

        Ok(())
    }
}

// ============================================================================
// Profiles
// ============================================================================

/// Built-in or user-declared desired state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProfileName {
    /// Complete capture-processing host
    Full,
    /// Service and its runtime only
    Minimal,
    /// Resources declared in the configuration file
    Custom,
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileName::Full => write!(f, "full"),
            ProfileName::Minimal => write!(f, "minimal"),
            ProfileName::Custom => write!(f, "custom"),
        }
    }
}

// ============================================================================
// Tools
// ============================================================================

/// Names (or paths) of the external tools the host executor invokes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Tools {
    pub package_manager: String,
    pub pip: String,
    pub systemctl: String,
    pub shell: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            package_manager: "apt-get".to_string(),
            pip: "pip3".to_string(),
            systemctl: "systemctl".to_string(),
            shell: "/bin/sh".to_string(),
        }
    }
}

impl Tools {
    pub fn validate(&self) -> Result<()> {
        for (key, value) in self.entries() {
            if value.trim().is_empty() {
                bail!("tools.{key} must not be empty");
            }
        }
        Ok(())
    }

    /// `(key, tool)` pairs in declaration order
    pub fn entries(&self) -> [(&'static str, &str); 4] {
        [
            ("package_manager", &self.package_manager),
            ("pip", &self.pip),
            ("systemctl", &self.systemctl),
            ("shell", &self.shell),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::ResourceKind;

    #[test]
    fn empty_config_is_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.profile, ProfileName::Full);
        assert_eq!(config.tools, Tools::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_custom_resources_in_order() {
        let config: Config = toml::from_str(
            r#"
            profile = "custom"
            template_dir = "/srv/templates"

            [variables]
            app_user = "svc"

            [tools]
            pip = "/usr/local/bin/pip3"

            [[resources]]
            kind = "user"
            name = "svc"

            [[resources]]
            kind = "directory"
            path = "/srv/app"
            owner = "svc"
            mode = "0750"

            [[resources]]
            kind = "template"
            path = "/srv/app/app.conf"
            source = "app.conf.tmpl"
            notifies = [{ action = "restart", unit = "svc.service" }]

            [[resources]]
            kind = "service_start"
            unit = "svc.service"
            "#,
        )
        .unwrap();

        assert_eq!(config.profile, ProfileName::Custom);
        assert_eq!(config.tools.pip, "/usr/local/bin/pip3");
        assert_eq!(config.tools.shell, "/bin/sh");
        let kinds: Vec<_> = config.resources.iter().map(Resource::kind).collect();
        assert_eq!(
            kinds,
            vec![
                ResourceKind::User,
                ResourceKind::Directory,
                ResourceKind::Template,
                ResourceKind::ServiceStart,
            ]
        );
        assert_eq!(
            config.resources[1].ownership().and_then(|o| o.mode),
            Some(0o750)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn custom_profile_needs_resources() {
        let config: Config = toml::from_str(r#"profile = "custom""#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn relative_template_dir_is_rejected() {
        let config: Config = toml::from_str(r#"template_dir = "templates""#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_tool_is_rejected() {
        let config: Config = toml::from_str("[tools]\nsystemctl = \" \"").unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("tools.systemctl"), "{err}");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<Config>("profiel = \"full\"").is_err());
    }
}
