//! Secret records.
//!
//! A [`Secret`] is a URI, its tags and the path of its container under the
//! secrets folder. Values are built per operation and never cached; the
//! ciphertext stays on disk until an explicit decrypt.

pub mod container;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, trace};
use zeroize::Zeroizing;

use crate::core::cipher::Cipher;
use crate::core::constants::SECRET_EXTENSION;
use crate::core::keys::{KeySet, PublicKey};
use crate::core::openpgp::{self, KeyId};
use crate::core::policy::Policy;
use crate::core::query::Context;
use crate::core::types::{Tags, Uri};
use crate::error::{CipherError, Result, SecretError};

/// An encrypted secret identified by URI.
#[derive(Debug, Clone)]
pub struct Secret {
    uri: Uri,
    tags: Tags,
    path: PathBuf,
}

/// How a secret's actual recipients compare with the policy.
///
/// Aliases and key ids are sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecipientReport {
    /// Aliases the policy requires.
    pub expected: Vec<String>,
    /// Key ids in the ciphertext matching no known key.
    pub unknown: Vec<String>,
    /// Known keys in the ciphertext the policy no longer allows.
    pub rubbish: Vec<String>,
    /// Required keys the ciphertext is not addressed to.
    pub missing: Vec<String>,
}

impl RecipientReport {
    /// No drift between actual and expected recipients.
    pub fn is_compliant(&self) -> bool {
        self.unknown.is_empty() && self.rubbish.is_empty() && self.missing.is_empty()
    }
}

/// Check that `uri` names a location inside the secrets folder.
///
/// # Errors
///
/// Returns `SecretError::InvalidUri` with the reason.
pub fn validate_uri(uri: &str) -> Result<()> {
    let invalid = |reason: &'static str| -> crate::error::Error {
        SecretError::InvalidUri {
            uri: uri.to_string(),
            reason,
        }
        .into()
    };

    if uri.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if uri.starts_with('/') {
        return Err(invalid("must be relative"));
    }
    if uri
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(invalid("must not contain empty, '.' or '..' segments"));
    }
    if uri.ends_with(&format!(".{SECRET_EXTENSION}")) {
        return Err(invalid("must not include the .secret extension"));
    }
    Ok(())
}

/// Parse a `NAME:VALUE` tag argument.
///
/// Names are restricted to what query identifiers can spell.
///
/// # Errors
///
/// Returns `SecretError::InvalidTag` when the separator or name is missing
/// or the name has other characters.
pub fn parse_tag(text: &str) -> Result<(String, String)> {
    let invalid = || SecretError::InvalidTag(text.to_string());
    let (name, value) = text.split_once(':').ok_or_else(invalid)?;
    let name = name.trim();
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
    {
        return Err(invalid().into());
    }
    Ok((name.to_string(), value.to_string()))
}

impl Secret {
    /// A secret at `uri`, which need not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::InvalidUri` for a malformed URI.
    pub fn new(policy: &Policy, uri: &str) -> Result<Self> {
        validate_uri(uri)?;
        let path = policy
            .secrets_dir()
            .join(format!("{uri}.{SECRET_EXTENSION}"));
        Ok(Self {
            uri: uri.to_string(),
            tags: Tags::new(),
            path,
        })
    }

    /// Load an existing secret's tags.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::NotFound` when no regular file backs `uri`.
    pub fn load(policy: &Policy, uri: &str) -> Result<Self> {
        let mut secret = Self::new(policy, uri)?;
        if !secret.path.is_file() {
            return Err(SecretError::NotFound(uri.to_string()).into());
        }
        let (tags, _) = container::open(&secret.path)?;
        secret.tags = tags;
        trace!(uri, tags = secret.tags.len(), "secret loaded");
        Ok(secret)
    }

    /// URI of the secret file at `path`.
    ///
    /// `Ok(None)` for files that aren't `.secret` files under the policy's
    /// secrets folder.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::InvalidUri` for a `.secret` file whose name
    /// doesn't form a valid URI.
    pub fn uri_for_path(policy: &Policy, path: &Path) -> Result<Option<Uri>> {
        if path.extension().map_or(true, |extension| extension != SECRET_EXTENSION) {
            return Ok(None);
        }
        let Ok(relative) = path.strip_prefix(policy.secrets_dir()) else {
            return Ok(None);
        };
        let relative = relative.with_extension("");
        let uri = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| SecretError::InvalidUri {
                uri: relative.to_string_lossy().into_owned(),
                reason: "must be valid UTF-8",
            })?
            .join("/");
        validate_uri(&uri)?;
        Ok(Some(uri))
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Tag value by name, ignoring case.
    pub fn tag(&self, name: &str) -> Option<&str> {
        let wanted = name.to_lowercase();
        self.tags
            .iter()
            .find(|(key, _)| key.to_lowercase() == wanted)
            .map(|(_, value)| value.as_str())
    }

    /// Set a tag, replacing any tag whose name differs only by case.
    pub fn set_tag(&mut self, name: &str, value: &str) {
        let wanted = name.to_lowercase();
        self.tags.retain(|key, _| key.to_lowercase() != wanted);
        self.tags.insert(name.to_string(), value.to_string());
    }

    /// Replace all tags.
    pub fn set_tags<I, K, V>(&mut self, tags: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.tags.clear();
        for (name, value) in tags {
            self.set_tag(name.as_ref(), value.as_ref());
        }
    }

    /// Key ids the ciphertext is addressed to.
    ///
    /// Reads only the leading session-key packets; needs no private key.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::NotFound` if the file is gone, or a container or
    /// packet error for a corrupt file.
    pub fn current_recipient_key_ids(&self) -> Result<Vec<KeyId>> {
        if !self.exists() {
            return Err(SecretError::NotFound(self.uri.clone()).into());
        }
        let (_, mut payload) = container::open(&self.path)?;
        openpgp::recipient_key_ids(&mut payload)
    }

    /// Encrypt `plaintext` to the policy's expected recipients and replace
    /// the container atomically.
    ///
    /// # Errors
    ///
    /// Returns the cipher's error or an IO error; the existing file is left
    /// untouched on failure.
    pub fn encrypt(&self, policy: &Policy, cipher: &dyn Cipher, plaintext: &[u8]) -> Result<()> {
        let recipients = policy.expected_recipients(self);
        debug!(
            uri = %self.uri,
            recipients = %recipients.aliases().collect::<Vec<_>>().join(","),
            "encrypting secret"
        );
        let ciphertext = cipher.encrypt(plaintext, &recipients)?;
        container::write(&self.path, &self.tags, &ciphertext)
    }

    /// Decrypt the secret with the caller's identity.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::AccessDenied` when the configured identity is not
    /// among the ciphertext's recipients, or whatever the cipher reports.
    pub fn decrypt(&self, policy: &Policy, cipher: &dyn Cipher) -> Result<Zeroizing<Vec<u8>>> {
        if !self.exists() {
            return Err(SecretError::NotFound(self.uri.clone()).into());
        }
        let payload = container::read_payload(&self.path)?;

        if let Some(identity) = policy.identity() {
            let ids = openpgp::recipient_key_ids(&mut payload.as_slice())?;
            // Anonymous recipients can't be checked up front.
            let hidden = ids.contains(&KeyId::WILDCARD);
            if !hidden && !ids.iter().any(|id| identity.matches(*id)) {
                debug!(uri = %self.uri, identity = identity.alias(), "identity is not a recipient");
                return Err(CipherError::AccessDenied.into());
            }
        }

        debug!(uri = %self.uri, "decrypting secret");
        cipher.decrypt(&payload)
    }

    /// Compare the ciphertext's recipients with the policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the container can't be inspected.
    pub fn recipients(&self, policy: &Policy) -> Result<RecipientReport> {
        let expected = policy.expected_recipients(self);

        let mut current = KeySet::new();
        let mut unknown = BTreeSet::new();
        for id in self.current_recipient_key_ids()? {
            match policy.key_by_id(id) {
                Some(key) => current.insert(std::sync::Arc::clone(key)),
                None => {
                    unknown.insert(id);
                }
            }
        }

        let mut rubbish = current.clone();
        rubbish.difference(&expected);
        let mut missing = expected.clone();
        missing.difference(&current);

        let names = |set: &KeySet| set.aliases().map(str::to_string).collect::<Vec<_>>();
        Ok(RecipientReport {
            expected: names(&expected),
            unknown: unknown.iter().map(KeyId::to_string).collect(),
            rubbish: names(&rubbish),
            missing: names(&missing),
        })
    }

    /// Whether `key` may read the secret: it is expected, or the ciphertext
    /// is already addressed to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the container can't be inspected.
    pub fn is_readable_by(&self, policy: &Policy, key: &PublicKey) -> Result<bool> {
        if policy.expected_recipients(self).contains(key) {
            return Ok(true);
        }
        Ok(self
            .current_recipient_key_ids()?
            .iter()
            .any(|id| key.matches(*id)))
    }
}

impl Context for Secret {
    fn get(&self, identifier: &str) -> &str {
        if identifier == "uri" {
            return &self.uri;
        }
        identifier
            .strip_prefix("tags.")
            .and_then(|name| self.tag(name))
            .unwrap_or("")
    }
}
