//! OpenPGP packet inspection.
//!
//! Only what the vault needs without touching private keys: ASCII-armor
//! decoding, packet framing, key ids of public (sub)keys and the key ids a
//! message's session-key packets are addressed to.

use std::fmt;
use std::io::{self, Read};

use base64::Engine;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tracing::trace;

use crate::error::{PacketError, Result};

/// Public-Key Encrypted Session Key packet.
pub const TAG_PKESK: u8 = 1;
pub const TAG_PUBLIC_KEY: u8 = 6;
pub const TAG_LITERAL_DATA: u8 = 11;
pub const TAG_PUBLIC_SUBKEY: u8 = 14;

/// A 64-bit OpenPGP key id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyId(pub u64);

impl KeyId {
    /// The all-zero id used by anonymous ("hidden") recipients.
    pub const WILDCARD: KeyId = KeyId(0);

    fn from_slice(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes[..8]);
        Self(u64::from_be_bytes(buf))
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

/// Packet body length as encoded in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyLength {
    Fixed(usize),
    /// First chunk of a partial-length body.
    Partial(usize),
    /// Old-format "until end of input".
    Indeterminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub tag: u8,
    pub length: BodyLength,
}

/// Strip ASCII armor if present; binary input is returned unchanged.
///
/// # Errors
///
/// Returns `PacketError::Armor` for a malformed armor block.
pub fn dearmor(input: &[u8]) -> std::result::Result<Vec<u8>, PacketError> {
    let Ok(text) = std::str::from_utf8(input) else {
        return Ok(input.to_vec());
    };
    let trimmed = text.trim_start();
    if !trimmed.starts_with("-----BEGIN PGP ") {
        return Ok(input.to_vec());
    }

    let mut lines = trimmed.lines().skip(1);
    // Armor headers end at the first blank line.
    for line in lines.by_ref() {
        if line.trim().is_empty() {
            break;
        }
    }

    let mut body = String::new();
    let mut terminated = false;
    for line in lines {
        let line = line.trim();
        if line.starts_with("-----END PGP ") {
            terminated = true;
            break;
        }
        // CRC24 checksum line.
        if line.starts_with('=') {
            continue;
        }
        body.push_str(line);
    }
    if !terminated {
        return Err(PacketError::Armor("missing END line".to_string()));
    }

    base64::engine::general_purpose::STANDARD
        .decode(body.as_bytes())
        .map_err(|e| PacketError::Armor(e.to_string()))
}

fn read_u8<R: Read>(input: &mut R) -> io::Result<Option<u8>> {
    let mut buf = [0u8; 1];
    match input.read(&mut buf)? {
        0 => Ok(None),
        _ => Ok(Some(buf[0])),
    }
}

fn read_exact<R: Read>(input: &mut R, buf: &mut [u8]) -> Result<()> {
    input.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => PacketError::Truncated.into(),
        _ => e.into(),
    })
}

fn read_be(input: &mut impl Read, width: usize) -> Result<usize> {
    let mut buf = [0u8; 4];
    read_exact(input, &mut buf[4 - width..])?;
    Ok(u32::from_be_bytes(buf) as usize)
}

/// Read one packet header; `None` at a clean end of input.
///
/// # Errors
///
/// Returns `PacketError` for framing errors and propagates read errors.
pub fn read_header<R: Read>(input: &mut R) -> Result<Option<PacketHeader>> {
    let Some(first) = read_u8(input)? else {
        return Ok(None);
    };
    if first & 0x80 == 0 {
        return Err(PacketError::Unsupported(format!("invalid packet header 0x{first:02x}")).into());
    }

    if first & 0x40 != 0 {
        let tag = first & 0x3f;
        let mut octet = [0u8; 1];
        read_exact(input, &mut octet)?;
        let length = match octet[0] {
            l @ 0..=191 => BodyLength::Fixed(l as usize),
            l @ 192..=223 => {
                let mut second = [0u8; 1];
                read_exact(input, &mut second)?;
                BodyLength::Fixed(((l as usize - 192) << 8) + second[0] as usize + 192)
            }
            255 => BodyLength::Fixed(read_be(input, 4)?),
            l => BodyLength::Partial(1 << (l & 0x1f)),
        };
        Ok(Some(PacketHeader { tag, length }))
    } else {
        let tag = (first >> 2) & 0x0f;
        let length = match first & 0x03 {
            0 => BodyLength::Fixed(read_be(input, 1)?),
            1 => BodyLength::Fixed(read_be(input, 2)?),
            2 => BodyLength::Fixed(read_be(input, 4)?),
            _ => BodyLength::Indeterminate,
        };
        Ok(Some(PacketHeader { tag, length }))
    }
}

fn read_body<R: Read>(input: &mut R, header: PacketHeader) -> Result<Vec<u8>> {
    match header.length {
        BodyLength::Fixed(len) => {
            // Grow with the bytes actually present; the header length is untrusted.
            let mut body = Vec::new();
            input.take(len as u64).read_to_end(&mut body)?;
            if body.len() < len {
                return Err(PacketError::Truncated.into());
            }
            Ok(body)
        }
        other => Err(PacketError::Unsupported(format!(
            "{other:?} body in packet with tag {}",
            header.tag
        ))
        .into()),
    }
}

/// Key id a session-key packet is addressed to.
fn pkesk_key_id(body: &[u8]) -> std::result::Result<KeyId, PacketError> {
    match body.first() {
        Some(3) if body.len() >= 9 => Ok(KeyId::from_slice(&body[1..9])),
        Some(6) => {
            let len = *body.get(1).ok_or(PacketError::Truncated)? as usize;
            if len == 0 {
                return Ok(KeyId::WILDCARD);
            }
            let fingerprint = body.get(3..2 + len).ok_or(PacketError::Truncated)?;
            match body[2] {
                4 if fingerprint.len() == 20 => Ok(KeyId::from_slice(&fingerprint[12..])),
                6 if fingerprint.len() == 32 => Ok(KeyId::from_slice(fingerprint)),
                version => Err(PacketError::Unsupported(format!(
                    "v{version} key in session key packet"
                ))),
            }
        }
        Some(3) | None => Err(PacketError::Truncated),
        Some(version) => Err(PacketError::Unsupported(format!(
            "v{version} session key packet"
        ))),
    }
}

/// Collect the recipients of an encrypted message.
///
/// Walks the leading session-key packets and stops at the first packet of
/// any other kind, so only the message prologue is read.
///
/// # Errors
///
/// Returns `PacketError` for malformed framing and propagates read errors.
pub fn recipient_key_ids<R: Read>(input: &mut R) -> Result<Vec<KeyId>> {
    let mut ids = Vec::new();
    while let Some(header) = read_header(input)? {
        if header.tag != TAG_PKESK {
            break;
        }
        let body = read_body(input, header)?;
        ids.push(pkesk_key_id(&body)?);
    }
    trace!(recipients = ids.len(), "session key packets scanned");
    Ok(ids)
}

/// Key id of a public key or subkey packet body.
fn key_packet_id(body: &[u8]) -> std::result::Result<KeyId, PacketError> {
    match body.first() {
        Some(4) => {
            let mut hasher = Sha1::new();
            hasher.update([0x99]);
            hasher.update((body.len() as u16).to_be_bytes());
            hasher.update(body);
            let fingerprint = hasher.finalize();
            Ok(KeyId::from_slice(&fingerprint[12..]))
        }
        Some(6) => {
            let mut hasher = Sha256::new();
            hasher.update([0x9b]);
            hasher.update((body.len() as u32).to_be_bytes());
            hasher.update(body);
            let fingerprint = hasher.finalize();
            Ok(KeyId::from_slice(&fingerprint[..8]))
        }
        Some(version) => Err(PacketError::Unsupported(format!("v{version} public key"))),
        None => Err(PacketError::Truncated),
    }
}

/// Key ids of a transferable public key: primary first, then subkeys.
///
/// Accepts armored or binary input.
///
/// # Errors
///
/// Returns `PacketError::NoKey` when the input holds no public key packet.
pub fn public_key_ids(material: &[u8]) -> Result<Vec<KeyId>> {
    let binary = dearmor(material)?;
    let mut input = binary.as_slice();
    let mut ids = Vec::new();
    while let Some(header) = read_header(&mut input)? {
        let body = read_body(&mut input, header)?;
        if matches!(header.tag, TAG_PUBLIC_KEY | TAG_PUBLIC_SUBKEY) {
            if header.tag == TAG_PUBLIC_SUBKEY && ids.is_empty() {
                return Err(PacketError::Unsupported("subkey before primary key".to_string()).into());
            }
            ids.push(key_packet_id(&body)?);
        }
    }
    if ids.is_empty() {
        return Err(PacketError::NoKey.into());
    }
    Ok(ids)
}

/// Frame a packet body with a new-format header.
pub fn encode_packet(tag: u8, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 6);
    out.push(0xc0 | (tag & 0x3f));
    match body.len() {
        len @ 0..=191 => out.push(len as u8),
        len @ 192..=8383 => {
            let len = len - 192;
            out.push(((len >> 8) as u8) + 192);
            out.push((len & 0xff) as u8);
        }
        len => {
            out.push(255);
            out.extend_from_slice(&(len as u32).to_be_bytes());
        }
    }
    out.extend_from_slice(body);
    out
}

/// Encode a v3 session-key packet addressed to `key_id`.
///
/// The encrypted session key is opaque to this module; callers supply it.
pub fn encode_pkesk(key_id: KeyId, algorithm: u8, encrypted_key: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(10 + encrypted_key.len());
    body.push(3);
    body.extend_from_slice(&key_id.0.to_be_bytes());
    body.push(algorithm);
    body.extend_from_slice(encrypted_key);
    encode_packet(TAG_PKESK, &body)
}

/// Read every fixed-length packet of a message.
///
/// # Errors
///
/// Returns `PacketError` for malformed framing or partial-length bodies.
pub fn read_packets(mut input: &[u8]) -> Result<Vec<(u8, Vec<u8>)>> {
    let mut packets = Vec::new();
    while let Some(header) = read_header(&mut input)? {
        let body = read_body(&mut input, header)?;
        packets.push((header.tag, body));
    }
    Ok(packets)
}
