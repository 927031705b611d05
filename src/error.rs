//! Error types.
//!
//! Each concern owns an error enum; [`Error`] wraps them so callers can use
//! `?` across module boundaries.

use std::path::PathBuf;

use thiserror::Error;

pub use crate::core::query::SyntaxError;

/// Top-level error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Query(#[from] SyntaxError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Packet(#[from] PacketError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration loading failures.
///
/// All of these are fatal: no secret is touched with a partially valid policy.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration not found (looked in: {})", .searched.join(", "))]
    NotFound { searched: Vec<String> },

    #[error("configuration already exists: {0}")]
    AlreadyInitialized(PathBuf),

    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("missing folder: {0}")]
    MissingFolder(PathBuf),

    #[error("invalid public key '{alias}': {reason}")]
    InvalidKey { alias: String, reason: String },

    #[error("duplicate public key alias '{0}'")]
    DuplicateKey(String),

    #[error("unknown key '{0}' used as identity")]
    UnknownIdentity(String),

    #[error("unknown keeper '{0}'")]
    UnknownKeeper(String),

    #[error("at least one keeper is required")]
    NoKeepers,

    #[error("unknown key '{key}' in team '{team}'")]
    UnknownTeamMember { team: String, key: String },

    #[error("invalid query '{query}': {source}")]
    InvalidQuery {
        query: String,
        #[source]
        source: SyntaxError,
    },

    #[error("invalid permission expression '{expression}' (expected +ALIAS or -ALIAS)")]
    InvalidExpression { expression: String },

    #[error("unknown key or team '{alias}' in permission expression for '{query}'")]
    UnknownGrantee { query: String, alias: String },

    #[error("unknown template '{template}' in template rule for '{query}'")]
    UnknownTemplate { query: String, template: String },

    #[error("invalid template '{alias}': {reason}")]
    InvalidTemplate { alias: String, reason: String },

    #[error("unknown cipher '{0}'")]
    UnknownCipher(String),

    #[error("unknown key '{0}'")]
    UnknownKey(String),
}

/// Secret lookup and container failures.
#[derive(Error, Debug)]
pub enum SecretError {
    #[error("secret does not exist: {0}")]
    NotFound(String),

    #[error("folder does not exist: {0}")]
    FolderNotFound(String),

    #[error("invalid secret uri '{uri}': {reason}")]
    InvalidUri { uri: String, reason: &'static str },

    #[error("invalid tag '{0}' (expected NAME:VALUE)")]
    InvalidTag(String),

    #[error("secret does not match '{alias}' template: {}", .errors.join("; "))]
    TemplateMismatch { alias: String, errors: Vec<String> },

    #[error("malformed secret container {path}: {reason}")]
    Container { path: PathBuf, reason: String },
}

/// Crypto collaborator failures.
#[derive(Error, Debug)]
pub enum CipherError {
    #[error("access denied: you are not a recipient of this secret")]
    AccessDenied,

    #[error("no recipients to encrypt to")]
    NoRecipients,

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("gpg executable not found: {0}")]
    GpgNotFound(String),
}

/// OpenPGP framing failures.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PacketError {
    #[error("invalid ASCII armor: {0}")]
    Armor(String),

    #[error("truncated packet")]
    Truncated,

    #[error("unsupported packet: {0}")]
    Unsupported(String),

    #[error("no public key packet found")]
    NoKey,
}

pub type Result<T> = std::result::Result<T, Error>;
