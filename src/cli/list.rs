//! List command - walk secrets with optional filters.

use std::collections::BTreeMap;

use tracing::error;

use crate::cli::{output, Filter, Location};
use crate::core::vault::{ListOptions, SchemaState, SecretDetails};
use crate::error::Result;

/// List secrets under `scope`.
///
/// Without `--key`, only secrets readable by the configured identity are
/// shown. Details check template schemas when `check_schema` is set.
pub fn execute(
    location: &Location,
    scope: Option<String>,
    filter: &Filter,
    long: bool,
    json: bool,
    check_schema: bool,
) -> Result<()> {
    let vault = location.open()?;
    let readable_by = match filter.readable_by(vault.policy())? {
        Some(key) => Some(key),
        None => vault.policy().identity().cloned(),
    };
    let options = ListOptions {
        scope,
        query: filter.predicate()?,
        readable_by,
    };
    let secrets = vault.list(&options)?;

    if json {
        let mut listing = BTreeMap::new();
        for secret in &secrets {
            match vault.details(secret, check_schema) {
                Ok(details) => {
                    listing.insert(secret.uri(), details);
                }
                Err(e) => error!(uri = secret.uri(), error = %e, "failed to export secret"),
            }
        }
        println!("{}", serde_json::to_string(&listing)?);
        return Ok(());
    }

    if secrets.is_empty() {
        output::dimmed("no secrets found");
        return Ok(());
    }

    for secret in &secrets {
        println!("- {}", secret.uri());
        if long {
            match vault.details(secret, check_schema) {
                Ok(details) => render(&details),
                Err(e) => error!(uri = secret.uri(), error = %e, "failed to export secret"),
            }
        }
    }
    Ok(())
}

fn or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

/// Tree view used by `list --long`.
fn render(details: &SecretDetails) {
    let report = &details.recipients;
    println!("  |-- recipients: {}", or_dash(&report.expected));
    println!("  |   |-- unknown: {}", or_dash(&report.unknown));
    println!("  |   |-- rubbish: {}", or_dash(&report.rubbish));
    println!("  |   `-- missing: {}", or_dash(&report.missing));
    match &details.template {
        Some(template) => {
            let mark = match template.state {
                SchemaState::Valid => "✓",
                SchemaState::Invalid => "✗",
                SchemaState::Unknown => "?",
            };
            println!("  |-- template: {} {mark}", template.alias);
        }
        None => println!("  |-- template: -"),
    }
    println!("  `-- tags");
    let last = details.tags.len().saturating_sub(1);
    for (i, (name, value)) in details.tags.iter().enumerate() {
        let branch = if i == last { '`' } else { '|' };
        println!("      {branch}-- {name}: {value}");
    }
    println!();
}
