//! Type aliases for domain concepts.
//!
//! Provides semantic type aliases to make function signatures more descriptive.

use std::collections::BTreeMap;

/// A secret identifier: slash-separated, relative to the secrets folder,
/// without extension (e.g. `db/prod/password`).
pub type Uri = String;

/// A public key alias, the file stem of `keys/<alias>.pub`.
pub type KeyAlias = String;

/// Tag name to value, stored unencrypted in the container header.
pub type Tags = BTreeMap<String, String>;
