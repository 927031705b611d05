//! Test fixtures and constants.
//!
//! Keys are synthetic: well-framed v4 public key packets whose ids are
//! derived the same way real ones are, but useless for cryptography.

use base64::Engine;
use ossuary::core::openpgp::{self, KeyId};

/// Aliases of the keys every test vault starts with.
pub const KEYS: [&str; 4] = ["alice", "bob", "carol", "dave"];

/// Cipher named in test configurations.
pub fn cipher() -> &'static str {
    if cfg!(feature = "test-cipher") {
        "literal"
    } else {
        "gpg"
    }
}

fn seed(alias: &str) -> u8 {
    alias.bytes().fold(7u8, |acc, b| acc.wrapping_mul(31).wrapping_add(b))
}

fn key_body(seed: u8) -> Vec<u8> {
    let mut body = vec![4, 0x5f, 0x00, 0x00, seed, 1];
    body.extend_from_slice(&[0x00, 0x40, seed, 9, 8, 7, 6, 5, 4, 3]);
    body.extend_from_slice(&[0x00, 0x11, 0x01, 0x00, 0x01]);
    body
}

/// ASCII-armored public key for `alias`.
pub fn armored_key(alias: &str) -> String {
    let mut binary = openpgp::encode_packet(6, &key_body(seed(alias)));
    binary.extend(openpgp::encode_packet(
        13,
        format!("{alias} <{alias}@example.org>").as_bytes(),
    ));
    let encoded = base64::engine::general_purpose::STANDARD.encode(binary);
    format!("-----BEGIN PGP PUBLIC KEY BLOCK-----\n\n{encoded}\n-----END PGP PUBLIC KEY BLOCK-----\n")
}

/// Primary key id of `alias`'s key.
pub fn key_id(alias: &str) -> KeyId {
    openpgp::public_key_ids(armored_key(alias).as_bytes()).expect("synthetic key is valid")[0]
}

/// OpenPGP message addressed to `ids` around an unencrypted literal packet,
/// the same shape the test cipher produces.
pub fn message(ids: &[KeyId], plaintext: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for id in ids {
        out.extend(openpgp::encode_pkesk(*id, 1, &[0x00, 0x08, 0x5a]));
    }
    let mut literal = vec![b'b', 0, 0, 0, 0, 0];
    literal.extend_from_slice(plaintext);
    out.extend(openpgp::encode_packet(11, &literal));
    out
}

/// Skeleton of the `database` template.
pub const DATABASE_SKELETON: &str = "host=\nuser=\npassword=\n";

/// Configuration shared by most tests.
///
/// alice is the caller and sole keeper; `ops` is bob and carol; production
/// secrets go to ops; `db/` secrets use the `database` template.
pub const CONFIG: &str = r#"
identity = "alice"
keepers = ["alice"]

[teams]
ops = ["bob", "carol"]

[[permissions]]
query = 'tags.env == "prod"'
grants = ["+ops"]

[[templates]]
query = 'uri ~ "^db/"'
template = "database"
"#;
