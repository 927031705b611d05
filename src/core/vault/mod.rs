//! The primary interface for ossuary operations.
//!
//! Vault owns the configuration, the policy snapshot and the cipher backend,
//! and provides every secret operation the CLI exposes.

mod list;
mod rebuild;
mod secrets;

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::core::cipher::{Cipher, CipherBackend};
use crate::core::config::Config;
use crate::core::constants::{self, KEYS_DIR, SECRETS_DIR, TEMPLATES_DIR};
use crate::core::policy::Policy;
use crate::core::secret::{self, Secret};
use crate::error::{ConfigError, Result, SecretError};

pub use list::{ListOptions, SchemaState, SecretDetails, TemplateReport};
pub use rebuild::{RebuildOptions, RebuildSummary, DEFAULT_WORKERS};

/// The primary interface for ossuary operations.
///
/// Everything it holds is read-only after [`Vault::open`], so a `&Vault` can
/// be shared freely between threads.
#[derive(Debug)]
pub struct Vault {
    config: Config,
    policy: Policy,
    cipher: CipherBackend,
}

/// Part of the secret tree an operation covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// A folder, walked recursively.
    Tree(PathBuf),
    /// One secret.
    Secret(PathBuf),
}

impl Scope {
    pub fn path(&self) -> &Path {
        match self {
            Self::Tree(path) | Self::Secret(path) => path,
        }
    }
}

impl Vault {
    /// Locate and load the configuration, then build the policy snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if no configuration is found or it fails to
    /// validate; no secret is touched in that case.
    pub fn open(config: Option<&Path>, root: Option<&Path>) -> Result<Self> {
        let path = Config::locate(config, root)?;
        let mut config = Config::load(&path)?;
        if let Some(root) = root {
            config.root = Some(std::env::current_dir()?.join(root));
        }
        Self::from_config(config)
    }

    /// Build a vault from an already loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the policy or cipher can't be built.
    pub fn from_config(config: Config) -> Result<Self> {
        let policy = Policy::load(&config)?;
        let cipher = CipherBackend::from_config(&config, &policy)?;
        debug!(cipher = cipher.name(), "vault opened");
        Ok(Self {
            config,
            policy,
            cipher,
        })
    }

    /// Create a configuration skeleton and the vault folders in `dir`.
    ///
    /// Returns the path of the new configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::AlreadyInitialized` if `dir` already holds a
    /// configuration, or `ConfigError::MissingFolder` if `dir` doesn't exist.
    pub fn init(dir: &Path, keeper: &str) -> Result<PathBuf> {
        if !dir.is_dir() {
            return Err(ConfigError::MissingFolder(dir.to_path_buf()).into());
        }
        let path = dir.join(constants::CONFIG_FILE);
        if path.exists() {
            return Err(ConfigError::AlreadyInitialized(path).into());
        }

        for folder in [KEYS_DIR, SECRETS_DIR, TEMPLATES_DIR] {
            std::fs::create_dir_all(dir.join(folder))?;
        }
        Config::new(keeper).save(&path)?;

        debug!(path = %path.display(), keeper, "vault initialized");
        Ok(path)
    }

    /// Get config reference.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn cipher(&self) -> &dyn Cipher {
        &self.cipher
    }

    /// Resolve a folder or URI argument against the secrets folder.
    ///
    /// `None` or an empty string means the whole tree. A URI whose secret
    /// file exists takes precedence over a folder of the same name.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::InvalidUri` for a malformed argument, or
    /// `SecretError::FolderNotFound` when it names neither.
    pub fn resolve_scope(&self, scope: Option<&str>) -> Result<Scope> {
        let root = self.policy.secrets_dir();
        let scope = scope.map(|s| s.trim_matches('/')).unwrap_or_default();
        if scope.is_empty() {
            return Ok(Scope::Tree(root.to_path_buf()));
        }
        secret::validate_uri(scope)?;

        let single = Secret::new(&self.policy, scope)?;
        if single.exists() {
            return Ok(Scope::Secret(single.path().to_path_buf()));
        }
        let folder = root.join(scope);
        if folder.is_dir() {
            return Ok(Scope::Tree(folder));
        }
        Err(SecretError::FolderNotFound(scope.to_string()).into())
    }

    /// Regular files of `scope`, depth-first, sorted by file name.
    pub(crate) fn walk(&self, scope: &Scope) -> impl Iterator<Item = Result<PathBuf>> {
        WalkDir::new(scope.path())
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) if entry.file_type().is_file() => Some(Ok(entry.into_path())),
                Ok(_) => None,
                Err(e) => Some(Err(std::io::Error::from(e).into())),
            })
    }
}
