//! Rebuild command - reconcile ciphertext recipients with the policy.

use tracing::info;

use crate::cli::{Filter, Location};
use crate::core::vault::RebuildOptions;
use crate::error::Result;

/// Rebuild secrets under `scope`, printing one line per action.
pub fn execute(
    location: &Location,
    scope: Option<String>,
    filter: &Filter,
    workers: usize,
    force: bool,
    dry_run: bool,
) -> Result<()> {
    let vault = location.open()?;
    let options = RebuildOptions {
        scope,
        query: filter.predicate()?,
        readable_by: filter.readable_by(vault.policy())?,
        workers,
        force,
        dry_run,
    };

    let summary = vault.rebuild(&options, std::io::stdout())?;
    info!(
        checked = summary.checked,
        reencrypted = summary.reencrypted,
        removed = summary.removed,
        failed = summary.failed,
        "rebuild complete"
    );
    Ok(())
}
