//! GPG cipher backend.
//!
//! Encrypts with `gpg --recipient-file`, so recipients come straight from
//! the vault's `keys/` folder and never need to be imported into a keyring.
//! Decryption uses whatever secret keys the user's gpg agent holds.
//!
//! gpg runs under `LC_ALL=C`; failures are classified from `--status-fd`
//! lines rather than human-readable messages.
//!
//! ## Requirements
//!
//! - `gpg` 2.1.14 or later on `PATH`, or configured with `gpg = "..."`
//! - the caller's private key available to the agent for decryption

use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::sync::OnceLock;

use tracing::{debug, trace};
use zeroize::Zeroizing;

use super::Cipher;
use crate::core::keys::KeySet;
use crate::error::{CipherError, Result};

/// GPG cipher backend using the gpg CLI.
///
/// The executable is resolved on first use, so commands that never touch
/// ciphertext work without gpg installed.
#[derive(Debug, Default)]
pub struct Gpg {
    program: Option<PathBuf>,
    resolved: OnceLock<PathBuf>,
}

impl Gpg {
    /// `program` overrides the `gpg` found on `PATH`.
    pub fn new(program: Option<PathBuf>) -> Self {
        Self {
            program,
            resolved: OnceLock::new(),
        }
    }

    fn program(&self) -> Result<PathBuf> {
        if let Some(path) = self.resolved.get() {
            return Ok(path.clone());
        }
        let found = match &self.program {
            Some(program) => which::which(program),
            None => which::which("gpg"),
        }
        .map_err(|e| CipherError::GpgNotFound(e.to_string()))?;
        debug!(path = %found.display(), "gpg located");
        Ok(self.resolved.get_or_init(|| found).clone())
    }

    /// Run gpg with `args`, feeding `input` on stdin.
    fn run(&self, args: &[std::ffi::OsString], input: &[u8]) -> Result<Output> {
        let program = self.program()?;
        let mut child = Command::new(&program)
            .args(args)
            .env("LC_ALL", "C")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CipherError::GpgNotFound(format!("{}: {e}", program.display())))?;

        let mut stdin = child.stdin.take();
        // stdin is fed from a separate thread so a full stdout pipe can't
        // deadlock the exchange.
        let output = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin.as_mut() {
                Some(stdin) => stdin.write_all(input),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer.join().unwrap_or(Ok(()));
            output.and_then(|output| written.map(|()| output))
        })?;
        Ok(output)
    }
}

impl Cipher for Gpg {
    fn name(&self) -> &'static str {
        "gpg"
    }

    fn encrypt(&self, plaintext: &[u8], recipients: &KeySet) -> Result<Vec<u8>> {
        trace!(
            recipients = recipients.len(),
            plaintext_len = plaintext.len(),
            "encrypting with GPG"
        );

        if recipients.is_empty() {
            return Err(CipherError::NoRecipients.into());
        }

        let mut args: Vec<std::ffi::OsString> = [
            "--batch",
            "--quiet",
            "--yes",
            "--trust-model",
            "always",
            "--output",
            "-",
            "--encrypt",
        ]
        .into_iter()
        .map(Into::into)
        .collect();
        for key in recipients {
            args.push("--recipient-file".into());
            args.push(key.path().into());
        }

        let output = self
            .run(&args, plaintext)
            .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CipherError::EncryptionFailed(stderr.trim().to_string()).into());
        }

        trace!(ciphertext_len = output.stdout.len(), "encrypted with GPG");
        Ok(output.stdout)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        trace!(ciphertext_len = ciphertext.len(), "decrypting with GPG");

        let args: Vec<std::ffi::OsString> = [
            "--batch",
            "--quiet",
            "--status-fd",
            "2",
            "--output",
            "-",
            "--decrypt",
        ]
        .into_iter()
        .map(Into::into)
        .collect();
        let output = self
            .run(&args, ciphertext)
            .map_err(|e| CipherError::DecryptionFailed(e.to_string()))?;
        let plaintext = Zeroizing::new(output.stdout);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if no_secret_key(&stderr) {
                return Err(CipherError::AccessDenied.into());
            }
            let message: Vec<&str> = stderr
                .lines()
                .filter(|line| !line.starts_with(STATUS_PREFIX))
                .collect();
            return Err(CipherError::DecryptionFailed(message.join("\n").trim().to_string()).into());
        }

        trace!(plaintext_len = plaintext.len(), "decrypted with GPG");
        Ok(plaintext)
    }
}

const STATUS_PREFIX: &str = "[GNUPG:] ";

/// Whether gpg's status output reports a missing secret key for every
/// session key packet of the message.
fn no_secret_key(status: &str) -> bool {
    let mut addressed = BTreeSet::new();
    let mut missing = BTreeSet::new();
    for line in status.lines() {
        let Some(rest) = line.strip_prefix(STATUS_PREFIX) else {
            continue;
        };
        let mut fields = rest.split_whitespace();
        match (fields.next(), fields.next()) {
            (Some("ENC_TO"), Some(id)) => {
                addressed.insert(id);
            }
            (Some("NO_SECKEY"), Some(id)) => {
                missing.insert(id);
            }
            _ => {}
        }
    }
    !missing.is_empty() && missing.is_superset(&addressed)
}
