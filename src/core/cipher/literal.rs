//! In-process test cipher.
//!
//! Produces well-framed OpenPGP messages whose session-key packets name the
//! real recipient key ids, followed by the plaintext in a literal data
//! packet. Nothing is actually encrypted. Only compiled for tests.

use zeroize::Zeroizing;

use super::Cipher;
use crate::core::keys::KeySet;
use crate::core::openpgp::{self, KeyId, TAG_LITERAL_DATA, TAG_PKESK};
use crate::error::{CipherError, Result};

/// RSA, as far as anyone inspecting the packets is concerned.
const ALGORITHM: u8 = 1;

#[derive(Debug, Clone, Default)]
pub struct Literal {
    identity: Vec<KeyId>,
}

impl Literal {
    /// `identity` lists the key ids the simulated agent can decrypt for.
    pub fn new(identity: Vec<KeyId>) -> Self {
        Self { identity }
    }
}

impl Cipher for Literal {
    fn name(&self) -> &'static str {
        "literal"
    }

    fn encrypt(&self, plaintext: &[u8], recipients: &KeySet) -> Result<Vec<u8>> {
        if recipients.is_empty() {
            return Err(CipherError::NoRecipients.into());
        }

        let mut message = Vec::new();
        for key in recipients {
            let id = key.primary_key_id().ok_or_else(|| {
                CipherError::EncryptionFailed(format!("key '{}' has no key id", key.alias()))
            })?;
            message.extend(openpgp::encode_pkesk(id, ALGORITHM, &[0x00, 0x08, 0x5a]));
        }

        // binary format, no file name, zero date
        let mut literal = vec![b'b', 0, 0, 0, 0, 0];
        literal.extend_from_slice(plaintext);
        message.extend(openpgp::encode_packet(TAG_LITERAL_DATA, &literal));
        Ok(message)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let packets = openpgp::read_packets(ciphertext)?;

        let addressed = packets
            .iter()
            .filter(|(tag, body)| *tag == TAG_PKESK && body.len() >= 9)
            .any(|(_, body)| {
                let mut id = [0u8; 8];
                id.copy_from_slice(&body[1..9]);
                self.identity.contains(&KeyId(u64::from_be_bytes(id)))
            });
        if !addressed {
            return Err(CipherError::AccessDenied.into());
        }

        let (_, body) = packets
            .into_iter()
            .find(|(tag, _)| *tag == TAG_LITERAL_DATA)
            .ok_or_else(|| CipherError::DecryptionFailed("no literal data packet".to_string()))?;
        let name_len = body.get(1).copied().unwrap_or(0) as usize;
        let data = body
            .get(6 + name_len..)
            .ok_or_else(|| CipherError::DecryptionFailed("truncated literal data".to_string()))?;
        Ok(Zeroizing::new(data.to_vec()))
    }
}
