//! Single-secret commands (get, set, about).

use std::io::{Read, Write};
use std::path::Path;

use tracing::debug;
use zeroize::Zeroizing;

use crate::cli::{output, Location};
use crate::core::secret;
use crate::error::Result;

fn parse_tags(tags: &[String]) -> Result<Vec<(String, String)>> {
    tags.iter().map(|tag| secret::parse_tag(tag)).collect()
}

/// Decrypt a secret to stdout or `file`.
pub fn get(location: &Location, uri: &str, file: Option<&Path>) -> Result<()> {
    let vault = location.open()?;
    let plaintext = vault.get(uri)?;

    match file {
        Some(path) => {
            write_private(path, &plaintext)?;
            debug!(uri, path = %path.display(), "plaintext written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&plaintext)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Write `bytes` to `path`, readable by the owner only (Unix).
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    // The mode above only applies to newly created files.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(bytes)?;
    file.flush()
}

/// Print the skeleton of the template matching `uri` and `tags`.
pub fn skeleton(location: &Location, uri: &str, tags: &[String]) -> Result<()> {
    let vault = location.open()?;
    match vault.skeleton(uri, &parse_tags(tags)?)? {
        Some(skeleton) => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&skeleton)?;
            stdout.flush()?;
        }
        None => output::warn(&format!("no template skeleton applies to '{uri}'")),
    }
    Ok(())
}

/// Encrypt stdin or `file` as `uri`.
pub fn set(location: &Location, uri: &str, file: Option<&Path>, tags: &[String]) -> Result<()> {
    let tags = parse_tags(tags)?;
    let vault = location.open()?;

    let mut plaintext = Zeroizing::new(Vec::new());
    match file {
        Some(path) => {
            std::fs::File::open(path)?.read_to_end(&mut plaintext)?;
        }
        None => {
            std::io::stdin().lock().read_to_end(&mut plaintext)?;
        }
    }

    let secret = vault.set(uri, &plaintext, &tags)?;
    output::success(&format!("set {}", secret.uri()));
    Ok(())
}

/// Show recipients and tags of a secret.
pub fn about(location: &Location, uri: &str) -> Result<()> {
    let vault = location.open()?;
    let details = vault.about(uri)?;
    let report = &details.recipients;

    println!("- Expected recipients: {}", report.expected.join(", "));
    if !report.unknown.is_empty() {
        println!("! Unknown rubbish recipients: {}", report.unknown.join(", "));
    }
    if !report.rubbish.is_empty() {
        println!("! Rubbish recipients: {}", report.rubbish.join(", "));
    }
    if !report.missing.is_empty() {
        println!("! Missing recipients: {}", report.missing.join(", "));
    }
    if let Some(template) = &details.template {
        println!("- Template: {}", template.alias);
    }
    println!("- Tags:");
    for (name, value) in &details.tags {
        println!("  + {name}: {value}");
    }
    Ok(())
}
