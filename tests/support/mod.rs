//! Test support utilities for ossuary integration tests.
//!
//! Provides reusable vault setup and helper commands.

#![allow(dead_code)]

pub mod assertions;
pub mod commands;
pub mod fixtures;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;

use std::path::PathBuf;

use ossuary::core::openpgp::KeyId;
use tempfile::TempDir;

/// Test environment with isolated temp directories.
///
/// Each test gets its own vault root and home dir. No process-global state
/// is mutated; child processes use `.current_dir()` so tests can run in
/// parallel.
pub struct Test {
    /// Vault root, also the working directory of every command
    pub dir: TempDir,
    /// Temporary home directory
    pub home: TempDir,
}

impl Test {
    /// Create a new empty test environment.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let home = TempDir::new().expect("failed to create temp home");

        Self { dir, home }
    }

    /// Create a vault with keys alice, bob, carol and dave and `config`
    /// appended to a header selecting the test cipher when available.
    pub fn vault(config: &str) -> Self {
        Self::with_config(&format!("cipher = \"{}\"\n{config}", cipher()))
    }

    /// Like [`Test::vault`], writing `config` verbatim.
    pub fn with_config(config: &str) -> Self {
        let t = Self::new();
        for folder in ["keys", "secrets", "templates"] {
            std::fs::create_dir_all(t.dir.path().join(folder)).expect("failed to create folder");
        }
        for alias in KEYS {
            t.add_key(alias);
        }
        std::fs::write(
            t.dir.path().join("templates/database.skeleton"),
            DATABASE_SKELETON,
        )
        .expect("failed to write template");
        std::fs::write(t.dir.path().join("ossuary.toml"), config)
            .expect("failed to write ossuary.toml");
        t
    }

    /// Ephemeral gpg home used by every command of this test.
    pub fn gnupg_home(&self) -> PathBuf {
        self.home.path().join(".gnupg")
    }

    /// Path of a file under the secrets folder.
    pub fn secret_path(&self, relative: &str) -> PathBuf {
        self.dir.path().join("secrets").join(relative)
    }

    /// Write `keys/<alias>.pub` with synthetic key material.
    pub fn add_key(&self, alias: &str) {
        std::fs::write(
            self.dir.path().join("keys").join(format!("{alias}.pub")),
            armored_key(alias),
        )
        .expect("failed to write public key");
    }

    /// Write a secret addressed to `recipients` without any cipher.
    pub fn write_secret(&self, uri: &str, tags: &[(&str, &str)], recipients: &[&str]) {
        let ids: Vec<_> = recipients.iter().map(|alias| key_id(alias)).collect();
        self.write_secret_ids(uri, tags, &ids);
    }

    /// Write a secret addressed to raw key ids.
    pub fn write_secret_ids(&self, uri: &str, tags: &[(&str, &str)], ids: &[KeyId]) {
        let tags = tags
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ossuary::core::secret::container::write(
            &self.secret_path(&format!("{uri}.secret")),
            &tags,
            &message(ids, b"value"),
        )
        .expect("failed to write secret");
    }

    /// Bytes of every file under the secrets folder.
    pub fn snapshot(&self) -> Vec<(PathBuf, Vec<u8>)> {
        walkdir::WalkDir::new(self.dir.path().join("secrets"))
            .sort_by_file_name()
            .into_iter()
            .map(|e| e.expect("failed to walk secrets"))
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let bytes = std::fs::read(e.path()).expect("failed to read file");
                (e.into_path(), bytes)
            })
            .collect()
    }
}
