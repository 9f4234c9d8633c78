use crate::domain::{BranchConventions, ReleaseVersion};
use crate::error::{ReleaseError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "gitflow.toml";

/// Represents the complete configuration for gitflow-release.
///
/// Contains branch naming conventions, release parameters and publishing settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub branches: BranchesConfig,

    #[serde(default)]
    pub release: ReleaseConfig,

    #[serde(default)]
    pub publish: PublishConfig,
}

fn default_master() -> String {
    "master".to_string()
}

fn default_develop() -> String {
    "develop".to_string()
}

fn default_release_prefix() -> String {
    "release".to_string()
}

fn default_hotfix_prefix() -> String {
    "hotfix".to_string()
}

/// GitFlow branch names and prefixes
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BranchesConfig {
    #[serde(default = "default_master")]
    pub master: String,

    #[serde(default = "default_develop")]
    pub develop: String,

    #[serde(default = "default_release_prefix")]
    pub release_prefix: String,

    #[serde(default = "default_hotfix_prefix")]
    pub hotfix_prefix: String,
}

impl Default for BranchesConfig {
    fn default() -> Self {
        BranchesConfig {
            master: default_master(),
            develop: default_develop(),
            release_prefix: default_release_prefix(),
            hotfix_prefix: default_hotfix_prefix(),
        }
    }
}

impl BranchesConfig {
    pub fn conventions(&self) -> BranchConventions {
        BranchConventions {
            master: self.master.clone(),
            develop: self.develop.clone(),
            release_prefix: self.release_prefix.clone(),
            hotfix_prefix: self.hotfix_prefix.clone(),
        }
    }
}

fn default_changelog() -> PathBuf {
    PathBuf::from("CHANGELOG.md")
}

fn default_remote() -> String {
    "origin".to_string()
}

/// Parameters of the release being prepared
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ReleaseConfig {
    /// Base version (X.Y.Z); usually passed on the command line
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default = "default_changelog")]
    pub changelog: PathBuf,

    #[serde(default = "default_remote")]
    pub remote: String,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        ReleaseConfig {
            version: None,
            changelog: default_changelog(),
            remote: default_remote(),
        }
    }
}

fn default_release_configuration() -> String {
    "Release".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_package_extension() -> String {
    "nupkg".to_string()
}

fn default_source() -> String {
    "https://api.nuget.org/v3/index.json".to_string()
}

fn default_tool() -> String {
    "dotnet".to_string()
}

/// Package publishing and local installation settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PublishConfig {
    /// Build configuration that packages may be published from
    #[serde(default = "default_release_configuration")]
    pub release_configuration: String,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_package_extension")]
    pub package_extension: String,

    #[serde(default = "default_source")]
    pub source: String,

    /// Tool package name used by `install`
    #[serde(default)]
    pub product: Option<String>,

    /// Packaging toolchain executable
    #[serde(default = "default_tool")]
    pub tool: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        PublishConfig {
            release_configuration: default_release_configuration(),
            output_dir: default_output_dir(),
            package_extension: default_package_extension(),
            source: default_source(),
            product: None,
            tool: default_tool(),
        }
    }
}

impl Config {
    /// Check names are usable before any process is spawned
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("branches.master", &self.branches.master),
            ("branches.develop", &self.branches.develop),
            ("branches.release_prefix", &self.branches.release_prefix),
            ("branches.hotfix_prefix", &self.branches.hotfix_prefix),
            ("release.remote", &self.release.remote),
        ];

        for (key, value) in named {
            if value.trim().is_empty() {
                return Err(ReleaseError::config(format!("{} must not be empty", key)));
            }
            if value.contains(char::is_whitespace) {
                return Err(ReleaseError::config(format!(
                    "{} must not contain whitespace: '{}'",
                    key, value
                )));
            }
        }

        if self.branches.master.eq_ignore_ascii_case(&self.branches.develop) {
            return Err(ReleaseError::config(
                "branches.master and branches.develop must differ",
            ));
        }

        Ok(())
    }

    /// The release base version; required by every operation
    pub fn release_version(&self) -> Result<ReleaseVersion> {
        match self.release.version.as_deref() {
            Some(version) => ReleaseVersion::parse(version),
            None => Err(ReleaseError::config(
                "release version is required (--release-version or [release] version)",
            )),
        }
    }

    /// Changelog path, required and non-empty
    pub fn changelog_path(&self) -> Result<&Path> {
        if self.release.changelog.as_os_str().is_empty() {
            return Err(ReleaseError::config("changelog path must not be empty"));
        }
        Ok(&self.release.changelog)
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `gitflow.toml` in current directory
/// 3. `.gitflow.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If a file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let path = if let Some(path) = config_path {
        path.to_path_buf()
    } else if Path::new(CONFIG_FILE_NAME).exists() {
        PathBuf::from(CONFIG_FILE_NAME)
    } else if let Some(config_dir) = dirs::config_dir() {
        let user_config = config_dir.join(format!(".{}", CONFIG_FILE_NAME));
        if user_config.exists() {
            user_config
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    let config_str = fs::read_to_string(&path).map_err(|e| {
        ReleaseError::config(format!("cannot read {}: {}", path.display(), e))
    })?;

    toml::from_str(&config_str)
        .map_err(|e| ReleaseError::config(format!("cannot parse {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.branches.master, "master");
        assert_eq!(config.branches.develop, "develop");
        assert_eq!(config.branches.release_prefix, "release");
        assert_eq!(config.branches.hotfix_prefix, "hotfix");
        assert_eq!(config.release.remote, "origin");
        assert_eq!(config.release.changelog, PathBuf::from("CHANGELOG.md"));
        assert_eq!(config.publish.release_configuration, "Release");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("[branches]\nmaster = \"main\"\n").unwrap();
        assert_eq!(config.branches.master, "main");
        assert_eq!(config.branches.develop, "develop");
        assert_eq!(config.publish.tool, "dotnet");
    }

    #[test]
    fn test_release_version_required() {
        let config = Config::default();
        assert!(matches!(
            config.release_version(),
            Err(ReleaseError::Configuration(_))
        ));
    }

    #[test]
    fn test_release_version_parsed() {
        let mut config = Config::default();
        config.release.version = Some("1.2.3".to_string());
        assert_eq!(config.release_version().unwrap().to_string(), "1.2.3");
    }

    #[test]
    fn test_validate_rejects_blank_and_spaced_names() {
        let mut config = Config::default();
        config.branches.develop = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.release.remote = "my origin".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_same_master_and_develop() {
        let mut config = Config::default();
        config.branches.develop = "MASTER".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_changelog_path() {
        let mut config = Config::default();
        config.release.changelog = PathBuf::new();
        assert!(config.changelog_path().is_err());
    }

    #[test]
    fn test_conventions_from_config() {
        let mut config = Config::default();
        config.branches.release_prefix = "rc".to_string();
        let conventions = config.branches.conventions();
        assert_eq!(conventions.release_prefix, "rc");
        assert_eq!(conventions.master, "master");
    }
}
