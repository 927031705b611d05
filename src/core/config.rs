//! Configuration file management.
//!
//! Handles locating, reading and writing `ossuary.toml`. The document is
//! plain data; [`Policy::load`](crate::core::policy::Policy::load) turns it
//! into the validated snapshot every command works from.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::constants;
use crate::core::types::KeyAlias;
use crate::error::{ConfigError, Result};

/// Vault configuration stored in `ossuary.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Vault root; relative paths resolve against the config file's folder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    /// Key alias of the person running the tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<KeyAlias>,
    /// Cipher backend: "gpg" (default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cipher: Option<String>,
    /// gpg executable override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpg: Option<PathBuf>,
    /// Keys every secret is encrypted to.
    #[serde(default)]
    pub keepers: Vec<KeyAlias>,
    #[serde(default)]
    pub teams: BTreeMap<String, Vec<KeyAlias>>,
    /// Evaluated in order; every matching rule contributes.
    #[serde(default)]
    pub permissions: Vec<PermissionEntry>,
    /// Evaluated in order; the first match wins.
    #[serde(default)]
    pub templates: Vec<TemplateEntry>,

    /// File this configuration was read from.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// `[[permissions]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PermissionEntry {
    pub query: String,
    /// `+alias` grants, `-alias` revokes; alias names a key or a team.
    pub grants: Vec<String>,
}

/// `[[templates]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateEntry {
    pub query: String,
    pub template: String,
}

impl Config {
    /// Skeleton written by `ossuary init`.
    pub fn new(keeper: &str) -> Self {
        Self {
            identity: Some(keeper.to_string()),
            keepers: vec![keeper.to_string()],
            ..Self::default()
        }
    }

    /// Candidate configuration paths, most specific first.
    pub fn search_paths(root: Option<&Path>) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(root) = root {
            paths.push(root.join(constants::CONFIG_FILE));
        }
        paths.push(PathBuf::from(constants::CONFIG_FILE));
        if let Some(home) = dirs::home_dir() {
            paths.push(
                home.join(constants::HOME_CONFIG_DIR)
                    .join(constants::CONFIG_FILE),
            );
        }
        paths.push(Path::new(constants::SYSTEM_CONFIG_DIR).join(constants::CONFIG_FILE));
        paths
    }

    /// Find the configuration file.
    ///
    /// An explicit path is used as-is; otherwise the first existing entry of
    /// [`Config::search_paths`] wins.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` listing every searched location.
    pub fn locate(explicit: Option<&Path>, root: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if path.is_file() {
                return Ok(path.to_path_buf());
            }
            return Err(ConfigError::NotFound {
                searched: vec![path.display().to_string()],
            }
            .into());
        }

        let candidates = Self::search_paths(root);
        candidates
            .iter()
            .find(|path| path.is_file())
            .cloned()
            .ok_or_else(|| {
                ConfigError::NotFound {
                    searched: candidates.iter().map(|p| p.display().to_string()).collect(),
                }
                .into()
            })
    }

    /// Load configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadFile` if the file can't be read,
    /// or `ConfigError::Parse` if the TOML is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config");

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&contents).map_err(ConfigError::Parse)?;
        config.source = Some(path.to_path_buf());

        debug!(
            keepers = config.keepers.len(),
            teams = config.teams.len(),
            permissions = config.permissions.len(),
            templates = config.templates.len(),
            "config loaded"
        );
        Ok(config)
    }

    /// Save configuration to `path`.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "saving config");

        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Vault root folder.
    ///
    /// `root` wins when set; otherwise the folder holding the configuration.
    pub fn root_dir(&self) -> PathBuf {
        let base = self
            .source
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_default();
        match &self.root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => base.join(root),
            None => base,
        }
    }

    /// Configured cipher name.
    pub fn cipher(&self) -> &str {
        self.cipher.as_deref().unwrap_or(constants::DEFAULT_CIPHER)
    }
}
