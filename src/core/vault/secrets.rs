//! Single-secret operations.

use tracing::{debug, info};
use zeroize::Zeroizing;

use super::{SecretDetails, Vault};
use crate::core::secret::Secret;
use crate::error::Result;

impl Vault {
    /// Decrypt a secret.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::NotFound` if the secret doesn't exist, or
    /// `CipherError::AccessDenied` if the caller is not a recipient.
    pub fn get(&self, uri: &str) -> Result<Zeroizing<Vec<u8>>> {
        let secret = Secret::load(&self.policy, uri)?;
        secret.decrypt(&self.policy, &self.cipher)
    }

    /// Encrypt `plaintext` as `uri`, replacing its tags with `tags`.
    ///
    /// Recipients are computed from the new tags.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::TemplateMismatch` when the matching template's
    /// schema rejects `plaintext`, or an error for an invalid URI or a cipher
    /// failure; an existing secret is left untouched on failure.
    pub fn set(&self, uri: &str, plaintext: &[u8], tags: &[(String, String)]) -> Result<Secret> {
        let mut secret = Secret::new(&self.policy, uri)?;
        secret.set_tags(tags.iter().map(|(name, value)| (name, value)));
        if let Some(template) = self.policy.template_for(&secret) {
            debug!(uri, template = template.alias(), "template applies");
            template.validate(plaintext)?;
        }

        secret.encrypt(&self.policy, &self.cipher, plaintext)?;
        info!(uri, tags = secret.tags().len(), "secret stored");
        Ok(secret)
    }

    /// Recipients, template and tags of a secret, read from its header only.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::NotFound` if the secret doesn't exist, or an
    /// error if its container can't be inspected.
    pub fn about(&self, uri: &str) -> Result<SecretDetails> {
        let secret = Secret::load(&self.policy, uri)?;
        self.details(&secret, false)
    }

    /// Skeleton of the template matching `uri` with `tags`, if any.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::InvalidUri` for a malformed URI.
    pub fn skeleton(&self, uri: &str, tags: &[(String, String)]) -> Result<Option<Vec<u8>>> {
        let mut secret = Secret::new(&self.policy, uri)?;
        secret.set_tags(tags.iter().map(|(name, value)| (name, value)));
        Ok(self
            .policy
            .template_for(&secret)
            .and_then(|template| template.skeleton())
            .map(<[u8]>::to_vec))
    }
}
