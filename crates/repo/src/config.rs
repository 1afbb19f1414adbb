//! Per-repository configuration (`.mgit/config.toml`)

use crate::error::RepoError;
use crate::verify::VerifyScope;
use crate::Result;
use mgit_core::store::atomic_write;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Repository configuration
///
/// Every section is optional; unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub user: UserConfig,
    pub store: StoreConfig,
    pub verify: VerifyConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Author recorded in new commits (empty: fall back to `$USER`)
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Files at least this large are memory-mapped while staging (default: 4MB)
    pub mmap_threshold: u64,

    /// Fsync objects, refs and logs before they become visible (default: true)
    pub fsync: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            mmap_threshold: 4 * 1024 * 1024,
            fsync: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub scope: VerifyScope,
}

impl Config {
    /// Load from `path`, falling back to defaults when the file is absent
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("config not found at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(RepoError::io(path, e)),
        };

        toml::from_str(&content).map_err(|e| RepoError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn save(&self, path: &Path, tmp_dir: &Path) -> Result<()> {
        let body = toml::to_string_pretty(self).map_err(|e| RepoError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let content = format!("# mgit repository configuration\n{}", body);
        atomic_write(tmp_dir, path, content.as_bytes(), self.store.fsync)
            .map_err(|e| RepoError::io(path, e))
    }

    /// Author for new commits: `user.name`, then `$USER`, then `"unknown"`
    pub fn author(&self) -> String {
        let name = self.user.name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
        std::env::var("USER")
            .ok()
            .filter(|user| !user.trim().is_empty())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store.mmap_threshold, 4_194_304);
        assert!(config.store.fsync);
        assert_eq!(config.verify.scope, VerifyScope::History);
    }

    #[test]
    fn test_partial_file_and_unknown_keys() -> anyhow::Result<()> {
        let config: Config = toml::from_str(
            r#"
            [user]
            name = "ada"
            color = "blue"

            [verify]
            scope = "single"
            "#,
        )?;
        assert_eq!(config.user.name, "ada");
        assert_eq!(config.author(), "ada");
        assert_eq!(config.verify.scope, VerifyScope::Single);
        assert_eq!(config.store, StoreConfig::default());
        Ok(())
    }

    #[test]
    fn test_save_then_load() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("config.toml");

        assert_eq!(Config::load(&path)?, Config::default());

        let mut config = Config::default();
        config.user.name = "grace".into();
        config.store.fsync = false;
        config.save(&path, temp_dir.path())?;

        assert_eq!(Config::load(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_invalid_file_is_config_error() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[store]\nfsync = \"sometimes\"\n")?;
        assert_eq!(Config::load(&path).unwrap_err().category(), "config");
        Ok(())
    }
}
