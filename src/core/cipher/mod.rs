//! Cryptographic operations.
//!
//! Provides the encryption/decryption abstraction used by secrets. OpenPGP
//! itself is delegated: ossuary only inspects packet framing (see
//! [`openpgp`](crate::core::openpgp)) and never handles private keys.
//!
//! ## Backends
//!
//! - **gpg**: Default. Drives the `gpg` executable; decryption goes through
//!   the user's agent.
//! - **literal**: In-process stand-in compiled for tests only (feature
//!   `test-cipher`). Writes correctly addressed session-key packets around
//!   an unencrypted literal data packet.

use zeroize::Zeroizing;

use crate::core::keys::KeySet;
use crate::error::Result;

mod backend;
mod gpg;

#[cfg(any(test, feature = "test-cipher"))]
mod literal;

pub use backend::CipherBackend;
pub use gpg::Gpg;

#[cfg(any(test, feature = "test-cipher"))]
pub use literal::Literal;

/// Cryptographic backend trait.
///
/// Implementations are shared by reference across rebuild workers.
pub trait Cipher: Send + Sync {
    /// Encrypt `plaintext` into one OpenPGP message addressed to every key
    /// of `recipients`.
    ///
    /// # Errors
    ///
    /// Returns `CipherError` if encryption fails.
    fn encrypt(&self, plaintext: &[u8], recipients: &KeySet) -> Result<Vec<u8>>;

    /// Decrypt an OpenPGP message with the caller's identity.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::AccessDenied` when the caller holds none of the
    /// message's recipient keys.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>>;

    /// Backend name for display/config.
    fn name(&self) -> &'static str;
}
