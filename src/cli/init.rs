//! Init command - create a vault skeleton.

use std::path::PathBuf;

use tracing::info;

use crate::cli::{output, Location};
use crate::core::constants::{KEYS_DIR, PUBLIC_KEY_EXTENSION, TEMPLATES_DIR};
use crate::core::vault::Vault;
use crate::error::Result;

/// Initialize a vault in `dir`, the `--root` folder or the current directory.
pub fn execute(location: &Location, dir: Option<PathBuf>, keeper: Option<String>) -> Result<()> {
    let dir = match dir.or_else(|| location.root.clone()) {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let keeper = keeper.unwrap_or_else(whoami::username);

    info!("Initializing vault for keeper: {}", keeper);
    let config = Vault::init(&dir, &keeper)?;
    output::success(&format!("initialized {}", output::path(&config)));

    println!();
    println!("Next steps:");
    println!(
        "  1. add ASCII-armored public keys to {} ({}.{} is a keeper)",
        output::path(&dir.join(KEYS_DIR)),
        keeper,
        PUBLIC_KEY_EXTENSION
    );
    println!(
        "  2. optionally add templates to {}",
        output::path(&dir.join(TEMPLATES_DIR))
    );
    println!(
        "  3. set identity, teams and permissions in {}",
        output::path(&config)
    );
    println!(
        "  4. store a secret: {}",
        output::cmd("ossuary set db/password --tag env:prod < password.txt")
    );

    Ok(())
}
