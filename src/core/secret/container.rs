//! Secret container codec.
//!
//! A secret file is a gzip stream. The header comment names the producer,
//! the header extra field holds the tags as a JSON object, and the
//! compressed payload is a single OpenPGP message. Tags are therefore
//! readable without decrypting anything.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::{Compression, GzBuilder};
use tempfile::NamedTempFile;
use tracing::trace;

use crate::core::constants;
use crate::core::types::Tags;
use crate::error::{Result, SecretError};

/// Largest extra field gzip can carry.
const MAX_EXTRA_LEN: usize = u16::MAX as usize;

fn malformed(path: &Path, reason: impl Into<String>) -> SecretError {
    SecretError::Container {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Open a container, returning its tags and a reader over the payload.
///
/// # Errors
///
/// Returns `SecretError::Container` when the file is not a gzip stream or
/// the tags are not a JSON object of strings.
pub fn open(path: &Path) -> Result<(Tags, GzDecoder<BufReader<File>>)> {
    let file = File::open(path)?;
    let decoder = GzDecoder::new(BufReader::new(file));
    let header = decoder
        .header()
        .ok_or_else(|| malformed(path, "not a gzip stream"))?;

    let tags = match header.extra() {
        Some(extra) if !extra.is_empty() => serde_json::from_slice(extra)
            .map_err(|e| malformed(path, format!("invalid tags: {e}")))?,
        _ => Tags::new(),
    };
    trace!(path = %path.display(), tags = tags.len(), "container opened");
    Ok((tags, decoder))
}

/// Read the whole decompressed payload.
///
/// # Errors
///
/// Returns `SecretError::Container` for a corrupt stream.
pub fn read_payload(path: &Path) -> Result<Vec<u8>> {
    let (_, mut decoder) = open(path)?;
    let mut payload = Vec::new();
    decoder
        .read_to_end(&mut payload)
        .map_err(|e| malformed(path, e.to_string()))?;
    Ok(payload)
}

/// Write a fresh container and atomically replace `path` with it.
///
/// The new file is assembled next to the target and renamed over it only
/// once complete, so readers see either the old or the new secret.
///
/// # Errors
///
/// Returns `SecretError::Container` when the tags don't fit the header, or
/// an IO error; `path` is untouched in both cases.
pub fn write(path: &Path, tags: &Tags, payload: &[u8]) -> Result<()> {
    let extra = serde_json::to_vec(tags).map_err(|e| malformed(path, e.to_string()))?;
    if extra.len() > MAX_EXTRA_LEN {
        return Err(malformed(path, "tags exceed the gzip header limit").into());
    }

    let dir = path
        .parent()
        .ok_or_else(|| malformed(path, "no parent folder"))?;
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut encoder = GzBuilder::new()
            .comment(constants::producer())
            .extra(extra)
            .write(&mut tmp, Compression::default());
        encoder.write_all(payload)?;
        encoder.finish()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    trace!(path = %path.display(), bytes = payload.len(), "container written");
    Ok(())
}
