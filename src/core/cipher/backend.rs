//! Cipher backend selection and dispatch.

use tracing::debug;
use zeroize::Zeroizing;

use super::{Cipher, Gpg};
use crate::core::config::Config;
use crate::core::keys::KeySet;
use crate::core::policy::Policy;
use crate::error::{ConfigError, Result};

/// Cipher backend for vault operations.
///
/// - `Gpg`: the gpg CLI (default)
/// - `Literal`: in-process test cipher
#[derive(Debug)]
pub enum CipherBackend {
    Gpg(Gpg),

    #[cfg(any(test, feature = "test-cipher"))]
    Literal(super::Literal),
}

impl CipherBackend {
    /// Create a cipher backend from configuration.
    ///
    /// The test cipher decrypts for the policy's configured identity.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownCipher` for an unsupported name.
    #[cfg_attr(not(any(test, feature = "test-cipher")), allow(unused_variables))]
    pub fn from_config(config: &Config, policy: &Policy) -> Result<Self> {
        match config.cipher() {
            "gpg" => {
                debug!("creating gpg cipher backend");
                Ok(Self::Gpg(Gpg::new(config.gpg.clone())))
            }
            #[cfg(any(test, feature = "test-cipher"))]
            "literal" => {
                debug!("creating literal cipher backend");
                let identity = policy
                    .identity()
                    .map(|key| key.key_ids().to_vec())
                    .unwrap_or_default();
                Ok(Self::Literal(super::Literal::new(identity)))
            }
            other => Err(ConfigError::UnknownCipher(other.to_string()).into()),
        }
    }
}

impl Cipher for CipherBackend {
    fn encrypt(&self, plaintext: &[u8], recipients: &KeySet) -> Result<Vec<u8>> {
        match self {
            Self::Gpg(gpg) => gpg.encrypt(plaintext, recipients),
            #[cfg(any(test, feature = "test-cipher"))]
            Self::Literal(literal) => literal.encrypt(plaintext, recipients),
        }
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        match self {
            Self::Gpg(gpg) => gpg.decrypt(ciphertext),
            #[cfg(any(test, feature = "test-cipher"))]
            Self::Literal(literal) => literal.decrypt(ciphertext),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Gpg(gpg) => gpg.name(),
            #[cfg(any(test, feature = "test-cipher"))]
            Self::Literal(literal) => literal.name(),
        }
    }
}
