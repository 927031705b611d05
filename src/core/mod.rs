//! Core library components.
//!
//! This module contains the reusable logic: the query language, the policy
//! resolver, secret containers, the cipher backends and the vault that ties
//! them together.

pub mod cipher;
pub mod config;
pub mod constants;
pub mod keys;
pub mod openpgp;
pub mod policy;
pub mod query;
pub mod secret;
pub mod types;
pub mod vault;
