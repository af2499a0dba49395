//! Version-control configuration via `ledgervc.toml`
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration. Edit the file and reopen to change settings.

use ledgervc_core::{BranchSpec, VcsError, VcsResult, DEFAULT_BRANCH, DEFAULT_COMMIT_ID_SUFFIX};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "ledgervc.toml";

/// Version-control configuration loaded from `ledgervc.toml`.
///
/// # Example
///
/// ```toml
/// default_branch = "main"
/// commit_id_suffix = ".json"
/// publish_to_secondaries = true
/// cache_ledgers = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsConfig {
    /// Branch used when a spec has no `:branch` part; cannot be deleted or renamed
    #[serde(default = "default_branch")]
    pub default_branch: String,
    /// Suffix stripped from commit ids before comparison
    #[serde(default = "default_suffix")]
    pub commit_id_suffix: String,
    /// Publish pointer moves to secondary nameservices as well
    #[serde(default = "default_true")]
    pub publish_to_secondaries: bool,
    /// Keep loaded ledgers between calls
    #[serde(default = "default_true")]
    pub cache_ledgers: bool,
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_suffix() -> String {
    DEFAULT_COMMIT_ID_SUFFIX.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for VcsConfig {
    fn default() -> Self {
        Self {
            default_branch: default_branch(),
            commit_id_suffix: default_suffix(),
            publish_to_secondaries: true,
            cache_ledgers: true,
        }
    }
}

impl VcsConfig {
    /// Check that the configured default branch is a valid branch name
    pub fn validate(&self) -> VcsResult<()> {
        BranchSpec::parse(&format!("ledger:{}", self.default_branch)).map_err(|e| {
            VcsError::invalid_input(format!(
                "Invalid default_branch '{}' in {}: {}",
                self.default_branch, CONFIG_FILE_NAME, e
            ))
        })?;
        Ok(())
    }

    /// Parse a user-supplied branch spec against the configured default branch
    pub fn parse_spec(&self, spec: &str) -> VcsResult<BranchSpec> {
        BranchSpec::parse_with_default(spec, &self.default_branch)
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# ledgervc configuration
#
# Branch used when a spec names only a ledger ("ledger" == "ledger:main").
# The default branch can never be deleted or renamed.
default_branch = "main"

# Suffix some storage backends append to commit ids.
# Stripped once when a commit is read so ids compare by value.
commit_id_suffix = ".json"

# Also publish branch pointer moves to secondary nameservices (best effort).
publish_to_secondaries = true

# Keep loaded ledgers in memory between calls.
cache_ledgers = true
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> VcsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VcsError::internal(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: VcsConfig = toml::from_str(&content).map_err(|e| {
            VcsError::invalid_input(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> VcsResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                VcsError::internal(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> VcsResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| VcsError::internal(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            VcsError::internal(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_toml_parses_to_default() {
        let parsed: VcsConfig = toml::from_str(VcsConfig::default_toml()).unwrap();
        assert_eq!(parsed, VcsConfig::default());
    }

    #[test]
    fn empty_file_uses_defaults() {
        let parsed: VcsConfig = toml::from_str("").unwrap();
        assert_eq!(parsed.default_branch, "main");
        assert_eq!(parsed.commit_id_suffix, ".json");
        assert!(parsed.publish_to_secondaries);
        assert!(parsed.cache_ledgers);
    }

    #[test]
    fn write_default_if_missing_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert!(!path.exists());
        VcsConfig::write_default_if_missing(&path).unwrap();
        assert!(path.exists());
        let config = VcsConfig::from_file(&path).unwrap();
        assert_eq!(config, VcsConfig::default());
    }

    #[test]
    fn write_default_if_missing_keeps_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "default_branch = \"trunk\"\n").unwrap();
        VcsConfig::write_default_if_missing(&path).unwrap();
        let config = VcsConfig::from_file(&path).unwrap();
        assert_eq!(config.default_branch, "trunk");
    }

    #[test]
    fn write_to_file_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = VcsConfig {
            default_branch: "trunk".into(),
            commit_id_suffix: String::new(),
            publish_to_secondaries: false,
            cache_ledgers: false,
        };
        config.write_to_file(&path).unwrap();
        assert_eq!(VcsConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn invalid_default_branch_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "default_branch = \"-bad\"\n").unwrap();
        let err = VcsConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, VcsError::InvalidInput { .. }));
    }

    #[test]
    fn malformed_toml_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "default_branch = [").unwrap();
        assert!(VcsConfig::from_file(&path).is_err());
    }

    #[test]
    fn parse_spec_uses_configured_default() {
        let config = VcsConfig {
            default_branch: "trunk".into(),
            ..Default::default()
        };
        let spec = config.parse_spec("L").unwrap();
        assert_eq!(spec.branch(), "trunk");
        assert!(!spec.is_qualified());
    }
}
