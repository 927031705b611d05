//! Ossuary - policy-driven, file-per-secret OpenPGP vault.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ossuary::cli::output;
use ossuary::cli::{execute, Cli};
use ossuary::core::constants::LOG_ENV;
use ossuary::error::{CipherError, ConfigError, Error};

fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber with env-filter support
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("ossuary=debug")
        } else {
            EnvFilter::new("ossuary=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();

    if let Err(e) = execute(cli.command, &cli.location) {
        // Format error with suggestion if available
        let suggestion = match &e {
            Error::Config(ConfigError::NotFound { .. }) => Some("run: ossuary init"),
            Error::Config(ConfigError::MissingFolder(_)) => {
                Some("check the vault root (--root or OSSUARY_ROOT)")
            }
            Error::Config(ConfigError::UnknownKeeper(_) | ConfigError::UnknownIdentity(_)) => {
                Some("add the key as keys/<alias>.pub")
            }
            Error::Cipher(CipherError::GpgNotFound(_)) => {
                Some("install gnupg or set `gpg` in ossuary.toml")
            }
            Error::Cipher(CipherError::AccessDenied) => {
                Some("ask a keeper to grant access, then run: ossuary rebuild")
            }
            _ => None,
        };

        output::error(&e.to_string());
        if let Some(hint) = suggestion {
            output::hint(hint);
        }
        std::process::exit(1);
    }
}
