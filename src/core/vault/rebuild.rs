//! Reconciliation of ciphertext recipients with the policy.
//!
//! One producer walks the scope and feeds a bounded queue; a fixed pool of
//! scoped workers drains it. The producer only lists directories: reading
//! containers, filtering and re-encrypting all happen in workers. Each task
//! prints at most one whole line, so concurrent workers never interleave
//! partial output.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use tracing::{debug, error, trace};

use super::{Scope, Vault};
use crate::core::constants::TASK_QUEUE_CAPACITY;
use crate::core::keys::PublicKey;
use crate::core::query::Predicate;
use crate::core::secret::Secret;
use crate::core::types::Uri;
use crate::error::Result;

/// Default size of the worker pool.
pub const DEFAULT_WORKERS: usize = 4;

/// Rebuild settings.
#[derive(Debug, Clone)]
pub struct RebuildOptions {
    /// Folder or URI; `None` covers the whole tree.
    pub scope: Option<String>,
    pub query: Predicate,
    pub readable_by: Option<Arc<PublicKey>>,
    /// Worker threads, at least one.
    pub workers: usize,
    /// Re-encrypt compliant secrets too.
    pub force: bool,
    /// Report what would be done without touching anything.
    pub dry_run: bool,
}

impl Default for RebuildOptions {
    fn default() -> Self {
        Self {
            scope: None,
            query: Predicate::TRUE,
            readable_by: None,
            workers: DEFAULT_WORKERS,
            force: false,
            dry_run: false,
        }
    }
}

/// Tally of a rebuild run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildSummary {
    /// Files checked: secrets passing the filters plus unexpected and
    /// unrecognised files.
    pub checked: usize,
    /// Secrets re-encrypted, or that would be under dry-run.
    pub reencrypted: usize,
    /// Unexpected files removed, or that would be under dry-run.
    pub removed: usize,
    pub failed: usize,
}

#[derive(Debug)]
enum Task {
    CheckSecret(Uri),
    /// A `.secret` file whose name is not a valid URI. Never removed.
    Unrecognised(PathBuf),
    RemoveUnexpected(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// Excluded by the query or readability filter; not counted.
    Filtered,
    Compliant,
    Reencrypted,
    Removed,
    Failed,
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "✓"
    } else {
        "✗"
    }
}

impl Vault {
    /// Bring every secret in scope back in line with its expected recipients
    /// and remove files that are not secrets.
    ///
    /// Result lines go to `out`, ending with `Done! N files checked.`.
    /// Failures of individual tasks are reported on their line and counted;
    /// they never stop the run.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope doesn't resolve, the walk fails or
    /// `out` can't be written. Tasks already queued are still drained.
    pub fn rebuild<W: Write + Send>(
        &self,
        options: &RebuildOptions,
        out: W,
    ) -> Result<RebuildSummary> {
        let scope = self.resolve_scope(options.scope.as_deref())?;
        let workers = options.workers.max(1);
        debug!(
            scope = %scope.path().display(),
            workers,
            force = options.force,
            dry_run = options.dry_run,
            "rebuild started"
        );

        let (sender, receiver) = mpsc::sync_channel(TASK_QUEUE_CAPACITY);
        let receiver = Mutex::new(receiver);
        let out = Mutex::new(out);
        let summary = Mutex::new(RebuildSummary::default());

        let (walked, written) = thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|_| s.spawn(|| self.work(options, &receiver, &out, &summary)))
                .collect();

            let walked = self.produce(&scope, &sender);
            drop(sender);

            let mut written = Ok(());
            for handle in handles {
                let result = handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
                if written.is_ok() {
                    written = result;
                }
            }
            (walked, written)
        });

        let summary = summary.into_inner().unwrap_or_else(PoisonError::into_inner);
        walked?;
        written?;

        let mut out = out.into_inner().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "Done! {} files checked.", summary.checked)?;
        debug!(?summary, "rebuild finished");
        Ok(summary)
    }

    /// Walk `scope` and enqueue a task per file.
    fn produce(&self, scope: &Scope, sender: &SyncSender<Task>) -> Result<()> {
        for path in self.walk(scope) {
            let path = path?;
            let task = match Secret::uri_for_path(&self.policy, &path) {
                Ok(Some(uri)) => Task::CheckSecret(uri),
                Ok(None) => Task::RemoveUnexpected(path),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "unrecognised secret file");
                    Task::Unrecognised(path)
                }
            };
            if sender.send(task).is_err() {
                break;
            }
        }
        Ok(())
    }

    /// Whether a secret passes the query and readability filters.
    ///
    /// A secret whose readability can't be determined is kept so its check
    /// reports it.
    fn selected(&self, secret: &Secret, options: &RebuildOptions) -> bool {
        if !options.query.eval(secret) {
            return false;
        }
        match &options.readable_by {
            Some(key) => secret.is_readable_by(&self.policy, key).unwrap_or(true),
            None => true,
        }
    }

    /// Worker loop: run tasks until the queue is closed and drained.
    fn work<W: Write>(
        &self,
        options: &RebuildOptions,
        receiver: &Mutex<Receiver<Task>>,
        out: &Mutex<W>,
        summary: &Mutex<RebuildSummary>,
    ) -> Result<()> {
        let mut written = Ok(());
        loop {
            let task = receiver
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .recv();
            let Ok(task) = task else {
                break;
            };

            let (outcome, line) = match task {
                Task::CheckSecret(uri) => self.check_secret(&uri, options),
                Task::Unrecognised(path) => (
                    Outcome::Failed,
                    Some(format!(
                        "! Failed to determine recipients for '{}'",
                        path.display()
                    )),
                ),
                Task::RemoveUnexpected(path) => remove_unexpected(&path, options.dry_run),
            };

            {
                let mut summary = summary.lock().unwrap_or_else(PoisonError::into_inner);
                if outcome != Outcome::Filtered {
                    summary.checked += 1;
                }
                match outcome {
                    Outcome::Filtered | Outcome::Compliant => {}
                    Outcome::Reencrypted => summary.reencrypted += 1,
                    Outcome::Removed => summary.removed += 1,
                    Outcome::Failed => summary.failed += 1,
                }
            }

            // Keep draining after a write failure so the producer never blocks.
            if let (Some(line), true) = (line, written.is_ok()) {
                let mut out = out.lock().unwrap_or_else(PoisonError::into_inner);
                written = writeln!(out, "{line}");
            }
        }
        Ok(written?)
    }

    fn check_secret(&self, uri: &str, options: &RebuildOptions) -> (Outcome, Option<String>) {
        let failed = || {
            (
                Outcome::Failed,
                Some(format!("! Failed to determine recipients for '{uri}'")),
            )
        };
        let secret = match Secret::load(&self.policy, uri) {
            Ok(secret) => secret,
            Err(e) => {
                error!(uri, error = %e, "failed to load secret");
                return failed();
            }
        };
        if !self.selected(&secret, options) {
            trace!(uri, "filtered out");
            return (Outcome::Filtered, None);
        }
        let report = match secret.recipients(&self.policy) {
            Ok(report) => report,
            Err(e) => {
                error!(uri, error = %e, "failed to determine recipients");
                return failed();
            }
        };

        let reason = if let Some(id) = report.unknown.first() {
            format!("unknown rubbish recipients ({id}, etc.)")
        } else if let Some(alias) = report.rubbish.first() {
            format!("rubbish recipients ({alias}, etc.)")
        } else if !report.missing.is_empty() {
            format!("missing recipients ({})", report.missing.join(", "))
        } else if options.force {
            "forced".to_string()
        } else {
            trace!(uri, "compliant");
            return (Outcome::Compliant, None);
        };

        let ok = options.dry_run || self.reencrypt(&secret);
        let outcome = if ok {
            Outcome::Reencrypted
        } else {
            Outcome::Failed
        };
        (
            outcome,
            Some(format!("- Re-encrypting '{uri}': {reason}... {}", mark(ok))),
        )
    }

    /// Decrypt in memory and encrypt again to the current expected
    /// recipients. The container is only replaced once both succeed.
    fn reencrypt(&self, secret: &Secret) -> bool {
        let plaintext = match secret.decrypt(&self.policy, &self.cipher) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                error!(uri = secret.uri(), error = %e, "failed to decrypt secret for re-encryption");
                return false;
            }
        };
        match secret.encrypt(&self.policy, &self.cipher, &plaintext) {
            Ok(()) => true,
            Err(e) => {
                error!(uri = secret.uri(), error = %e, "failed to re-encrypt secret");
                false
            }
        }
    }
}

fn remove_unexpected(path: &Path, dry_run: bool) -> (Outcome, Option<String>) {
    let ok = dry_run
        || match std::fs::remove_file(path) {
            Ok(()) => true,
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to remove unexpected file");
                false
            }
        };
    let outcome = if ok { Outcome::Removed } else { Outcome::Failed };
    (
        outcome,
        Some(format!(
            "- Removing unexpected file '{}'... {}",
            path.display(),
            mark(ok)
        )),
    )
}
