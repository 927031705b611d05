//! Ossuary - policy-driven, file-per-secret OpenPGP vault.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── init          # Create a vault skeleton
//! │   ├── secrets       # get / set / about
//! │   ├── list          # Filtered listing
//! │   └── rebuild       # Recipient reconciliation
//! └── core/             # Core library components
//!     ├── query/        # Query language (lexer, parser, predicates)
//!     ├── policy/       # Permission and template rules
//!     ├── keys          # Public keys and key sets
//!     ├── openpgp       # Armor and packet inspection
//!     ├── secret/       # Secrets and their gzip containers
//!     ├── cipher/       # Encryption backends
//!     │   ├── mod       # Cipher trait
//!     │   └── gpg       # gpg executable
//!     ├── config        # ossuary.toml
//!     └── vault/        # Operations tying everything together
//! ```
//!
//! # Features
//!
//! - One gzip container per secret, tags readable without decrypting
//! - Recipients computed from query-based permission rules
//! - Keepers always retain access
//! - Parallel rebuild that repairs recipient drift

pub mod cli;
pub mod core;
pub mod error;
