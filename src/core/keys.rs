//! Public keys and key sets.
//!
//! Keys are loaded once from `keys/**/<alias>.pub` and shared through
//! [`Arc`]. Identity is the alias: two keys are equal when their aliases are.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::trace;

use crate::core::openpgp::{self, KeyId};
use crate::error::{ConfigError, Error, Result};

/// An OpenPGP public key known to the vault.
#[derive(Debug, Clone)]
pub struct PublicKey {
    alias: String,
    key_ids: Vec<KeyId>,
    path: PathBuf,
}

impl PublicKey {
    pub fn new(alias: impl Into<String>, key_ids: Vec<KeyId>, path: impl Into<PathBuf>) -> Self {
        Self {
            alias: alias.into(),
            key_ids,
            path: path.into(),
        }
    }

    /// Read a key file and derive the primary and subkey ids.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidKey` if the file is unreadable or holds no
    /// usable public key packet.
    pub fn load(alias: &str, path: &Path) -> Result<Self> {
        let invalid = |reason: String| ConfigError::InvalidKey {
            alias: alias.to_string(),
            reason,
        };

        let material = std::fs::read(path).map_err(|e| invalid(e.to_string()))?;
        let key_ids = openpgp::public_key_ids(&material).map_err(|e| match e {
            Error::Packet(e) => invalid(e.to_string()),
            other => invalid(other.to_string()),
        })?;

        trace!(alias, ids = key_ids.len(), "public key loaded");
        Ok(Self::new(alias, key_ids, path))
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Primary key id first, then subkeys.
    pub fn key_ids(&self) -> &[KeyId] {
        &self.key_ids
    }

    pub fn primary_key_id(&self) -> Option<KeyId> {
        self.key_ids.first().copied()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `id` names the primary key or one of its subkeys.
    pub fn matches(&self, id: KeyId) -> bool {
        self.key_ids.contains(&id)
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.alias == other.alias
    }
}

impl Eq for PublicKey {}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.alias.cmp(&other.alias)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.alias)
    }
}

/// A set of public keys, iterated in alias order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    keys: BTreeMap<String, Arc<PublicKey>>,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: Arc<PublicKey>) {
        self.keys.insert(key.alias.clone(), key);
    }

    pub fn remove(&mut self, alias: &str) -> Option<Arc<PublicKey>> {
        self.keys.remove(alias)
    }

    pub fn contains(&self, key: &PublicKey) -> bool {
        self.keys.contains_key(&key.alias)
    }

    pub fn get(&self, alias: &str) -> Option<&Arc<PublicKey>> {
        self.keys.get(alias)
    }

    /// Add every key of `other`.
    pub fn union(&mut self, other: &KeySet) {
        for (alias, key) in &other.keys {
            self.keys.insert(alias.clone(), Arc::clone(key));
        }
    }

    /// Remove every key of `other`.
    pub fn difference(&mut self, other: &KeySet) {
        for alias in other.keys.keys() {
            self.keys.remove(alias);
        }
    }

    pub fn is_superset(&self, other: &KeySet) -> bool {
        other.keys.keys().all(|alias| self.keys.contains_key(alias))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<PublicKey>> {
        self.keys.values()
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl FromIterator<Arc<PublicKey>> for KeySet {
    fn from_iter<I: IntoIterator<Item = Arc<PublicKey>>>(iter: I) -> Self {
        let mut set = Self::new();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

impl<'a> IntoIterator for &'a KeySet {
    type Item = &'a Arc<PublicKey>;
    type IntoIter = std::collections::btree_map::Values<'a, String, Arc<PublicKey>>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.values()
    }
}
