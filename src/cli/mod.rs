//! Command-line interface.

pub mod init;
pub mod list;
pub mod output;
pub mod rebuild;
pub mod secrets;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use crate::core::keys::PublicKey;
use crate::core::policy::Policy;
use crate::core::query::{self, Predicate};
use crate::core::vault::{Vault, DEFAULT_WORKERS};
use crate::error::Result;

/// Ossuary - policy-driven OpenPGP secret vault.
#[derive(Parser)]
#[command(
    name = "ossuary",
    about = "Policy-driven, file-per-secret OpenPGP vault",
    version,
    after_help = "Queries: uri ~ \"^db/\" && (tags.env == 'prod' || !tags.team == 'web')"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub location: Location,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Where to find the configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct Location {
    /// Path to ossuary.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Vault root (folder holding keys/, secrets/ and templates/)
    #[arg(long, env = "OSSUARY_ROOT", global = true)]
    pub root: Option<PathBuf>,
}

impl Location {
    /// Open the vault these flags point at.
    pub fn open(&self) -> Result<Vault> {
        Vault::open(self.config.as_deref(), self.root.as_deref())
    }
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Create ossuary.toml and the vault folders
    Init {
        /// Folder to initialize (default: --root, else the current directory)
        dir: Option<PathBuf>,
        /// Key alias of the first keeper (default: your username)
        #[arg(short, long)]
        keeper: Option<String>,
    },

    /// Decrypt a secret
    Get {
        /// Secret URI (e.g., db/password)
        uri: String,
        /// Write the plaintext to this file instead of stdout
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Print the skeleton of the matching template instead
        #[arg(long, conflicts_with = "file")]
        skeleton: bool,
        /// Tags used to pick the template with --skeleton (NAME:VALUE)
        #[arg(short, long = "tag", requires = "skeleton")]
        tags: Vec<String>,
    },

    /// Encrypt a secret from stdin or a file
    Set {
        /// Secret URI
        uri: String,
        /// Read the plaintext from this file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Tag to attach (NAME:VALUE); replaces all existing tags
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Show recipients, template and tags of a secret
    About {
        /// Secret URI
        uri: String,
    },

    /// List secrets
    #[command(visible_alias = "ls")]
    List {
        /// Folder or secret URI to list
        scope: Option<String>,
        #[command(flatten)]
        filter: Filter,
        /// Show recipients, template and tags
        #[arg(short, long, conflicts_with = "json")]
        long: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Skip decrypting secrets to check them against template schemas
        #[arg(long)]
        ignore_schema: bool,
    },

    /// Re-encrypt secrets whose recipients drifted from the policy
    Rebuild {
        /// Folder or secret URI to rebuild
        scope: Option<String>,
        #[command(flatten)]
        filter: Filter,
        /// Number of worker threads
        #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,
        /// Re-encrypt compliant secrets too
        #[arg(long)]
        force: bool,
        /// Report what would be done without changing anything
        #[arg(long)]
        dry_run: bool,
    },
}

/// Filters shared by `list` and `rebuild`.
#[derive(Args, Debug, Clone, Default)]
pub struct Filter {
    /// Only secrets matching this query
    #[arg(short, long)]
    pub query: Option<String>,
    /// Only secrets readable by this key alias
    #[arg(short, long)]
    pub key: Option<String>,
}

impl Filter {
    fn predicate(&self) -> Result<Predicate> {
        Ok(query::parse_or_true(self.query.as_deref())?)
    }

    fn readable_by(&self, policy: &Policy) -> Result<Option<Arc<PublicKey>>> {
        self.key.as_deref().map(|alias| policy.key(alias)).transpose()
    }
}

/// Execute a command.
pub fn execute(command: Command, location: &Location) -> Result<()> {
    use Command::*;

    match command {
        Init { dir, keeper } => init::execute(location, dir, keeper),
        Get {
            uri,
            file,
            skeleton,
            tags,
        } => {
            if skeleton {
                secrets::skeleton(location, &uri, &tags)
            } else {
                secrets::get(location, &uri, file.as_deref())
            }
        }
        Set { uri, file, tags } => secrets::set(location, &uri, file.as_deref(), &tags),
        About { uri } => secrets::about(location, &uri),
        List {
            scope,
            filter,
            long,
            json,
            ignore_schema,
        } => list::execute(location, scope, &filter, long, json, !ignore_schema),
        Rebuild {
            scope,
            filter,
            workers,
            force,
            dry_run,
        } => rebuild::execute(location, scope, &filter, workers, force, dry_run),
    }
}
