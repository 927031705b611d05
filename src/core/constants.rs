//! Constants used throughout ossuary.
//!
//! Centralizes file names, extensions and tunables.

/// Configuration file name (ossuary.toml).
pub const CONFIG_FILE: &str = "ossuary.toml";

/// Per-user configuration directory relative to HOME (~/.ossuary).
pub const HOME_CONFIG_DIR: &str = ".ossuary";

/// System-wide configuration directory.
pub const SYSTEM_CONFIG_DIR: &str = "/etc/ossuary";

/// Folder holding `<alias>.pub` files.
pub const KEYS_DIR: &str = "keys";

/// Folder holding the secret tree.
pub const SECRETS_DIR: &str = "secrets";

/// Folder holding template schemas and skeletons.
pub const TEMPLATES_DIR: &str = "templates";

pub const SECRET_EXTENSION: &str = "secret";
pub const PUBLIC_KEY_EXTENSION: &str = "pub";
pub const SCHEMA_EXTENSION: &str = "schema";
pub const SKELETON_EXTENSION: &str = "skeleton";

/// Cipher used when the configuration names none.
pub const DEFAULT_CIPHER: &str = "gpg";

/// Team implicitly holding every key, unless configured explicitly.
pub const ALL_TEAM: &str = "all";

/// Bound of the rebuild task queue.
pub const TASK_QUEUE_CAPACITY: usize = 32;

/// Environment variable selecting the log filter.
pub const LOG_ENV: &str = "OSSUARY_LOG";

/// Producer string stored in every container's gzip comment.
pub fn producer() -> String {
    format!("Generated by Ossuary {}", env!("CARGO_PKG_VERSION"))
}
