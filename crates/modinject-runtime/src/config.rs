//! Injector configuration (modinject.toml)
//!
//! ```toml
//! [injector]
//! extension = "py"
//! init-stem = "__init__"
//! sample-limit = 5
//! selftest-token = "__SELFTEST__"
//! validate = true
//!
//! [host]
//! site-paths = ["./site"]
//! ```

use std::path::{Path, PathBuf};

use modinject_engine::{PACKAGE_INIT_STEM, SOURCE_EXTENSION};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bundle::{SourceLayout, SELFTEST_TOKEN};

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InjectorConfig {
    pub injector: InjectorSettings,
    pub host: HostSettings,
}

/// `[injector]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct InjectorSettings {
    /// Source file extension, without the dot
    pub extension: String,

    /// File stem of a package root
    pub init_stem: String,

    /// Number of paths listed in the status sample
    pub sample_limit: usize,

    /// Literal that selects the built-in test package
    pub selftest_token: String,

    /// Whether to import every injected package after merging
    pub validate: bool,
}

impl Default for InjectorSettings {
    fn default() -> Self {
        Self {
            extension: SOURCE_EXTENSION.to_string(),
            init_stem: PACKAGE_INIT_STEM.to_string(),
            sample_limit: 5,
            selftest_token: SELFTEST_TOKEN.to_string(),
            validate: true,
        }
    }
}

/// `[host]`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct HostSettings {
    /// Directories the host resolves modules from without injection
    pub site_paths: Vec<PathBuf>,
}

impl InjectorConfig {
    /// Load a config from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_str(&content)?;

        // Relative site paths are relative to the config file
        if let Some(base) = path.parent() {
            for site in &mut config.host.site_paths {
                if site.is_relative() {
                    *site = base.join(&*site);
                }
            }
        }
        Ok(config)
    }

    /// Parse a config from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: InjectorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let settings = &self.injector;

        if settings.extension.is_empty() {
            return Err(ConfigError::ValidationError(
                "extension cannot be empty".to_string(),
            ));
        }
        if settings.extension.contains('.') || settings.extension.contains('/') {
            return Err(ConfigError::ValidationError(format!(
                "Invalid extension: {}. Give it without the leading dot",
                settings.extension
            )));
        }
        if settings.init_stem.is_empty() {
            return Err(ConfigError::ValidationError(
                "init-stem cannot be empty".to_string(),
            ));
        }
        if settings.sample_limit == 0 {
            return Err(ConfigError::ValidationError(
                "sample-limit must be at least 1".to_string(),
            ));
        }
        if settings.selftest_token.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "selftest-token cannot be blank".to_string(),
            ));
        }
        Ok(())
    }

    pub fn layout(&self) -> SourceLayout {
        SourceLayout::new(&self.injector.extension, &self.injector.init_stem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = InjectorConfig::from_str("").unwrap();
        assert_eq!(config, InjectorConfig::default());
        assert_eq!(config.injector.sample_limit, 5);
        assert!(config.injector.validate);
        assert!(config.host.site_paths.is_empty());
    }

    #[test]
    fn test_kebab_case_keys() {
        let config = InjectorConfig::from_str(
            r#"
[injector]
init-stem = "__pkg__"
sample-limit = 2
validate = false

[host]
site-paths = ["/opt/site"]
"#,
        )
        .unwrap();

        assert_eq!(config.injector.init_stem, "__pkg__");
        assert_eq!(config.injector.sample_limit, 2);
        assert!(!config.injector.validate);
        assert_eq!(config.host.site_paths, vec![PathBuf::from("/opt/site")]);
        assert_eq!(config.layout().init_stem, "__pkg__");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        for toml in [
            "[injector]\nextension = \"\"",
            "[injector]\nextension = \".py\"",
            "[injector]\ninit-stem = \"\"",
            "[injector]\nsample-limit = 0",
        ] {
            assert!(
                matches!(
                    InjectorConfig::from_str(toml),
                    Err(ConfigError::ValidationError(_))
                ),
                "accepted: {}",
                toml
            );
        }
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            InjectorConfig::from_str("[injector\n"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_from_file_resolves_site_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modinject.toml");
        std::fs::write(&path, "[host]\nsite-paths = [\"site\"]\n").unwrap();

        let config = InjectorConfig::from_file(&path).unwrap();
        assert_eq!(config.host.site_paths, vec![dir.path().join("site")]);
    }
}
