//! Listing and inspection.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, trace, warn};

use super::Vault;
use crate::core::keys::PublicKey;
use crate::core::query::Predicate;
use crate::core::secret::{RecipientReport, Secret};
use crate::core::types::Tags;
use crate::error::Result;

/// Filters applied while listing.
#[derive(Debug, Clone)]
pub struct ListOptions {
    /// Folder or URI; `None` lists everything.
    pub scope: Option<String>,
    pub query: Predicate,
    /// Only secrets this key can read.
    pub readable_by: Option<Arc<PublicKey>>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            scope: None,
            query: Predicate::TRUE,
            readable_by: None,
        }
    }
}

/// Whether a secret's contents satisfy its template schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaState {
    Valid,
    Invalid,
    /// Not checked, or the contents could not be decrypted.
    Unknown,
}

/// The template matching a secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateReport {
    pub alias: String,
    pub state: SchemaState,
}

/// What `about` and `list --long` show for a secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretDetails {
    pub recipients: RecipientReport,
    pub template: Option<TemplateReport>,
    pub tags: Tags,
}

impl Vault {
    /// Secrets within `options.scope` passing both filters, in walk order.
    ///
    /// Files that aren't secrets are ignored. A secret that can't be loaded
    /// or inspected is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope doesn't resolve or the walk fails.
    pub fn list(&self, options: &ListOptions) -> Result<Vec<Secret>> {
        let scope = self.resolve_scope(options.scope.as_deref())?;
        let mut secrets = Vec::new();

        for path in self.walk(&scope) {
            let path = path?;
            let uri = match Secret::uri_for_path(&self.policy, &path) {
                Ok(Some(uri)) => uri,
                Ok(None) => continue,
                Err(e) => {
                    error!(path = %path.display(), error = %e, "unrecognised secret file");
                    continue;
                }
            };
            let secret = match Secret::load(&self.policy, &uri) {
                Ok(secret) => secret,
                Err(e) => {
                    error!(uri = %uri, error = %e, "failed to load secret");
                    continue;
                }
            };
            if !options.query.eval(&secret) {
                continue;
            }
            if let Some(key) = &options.readable_by {
                match secret.is_readable_by(&self.policy, key) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(e) => {
                        error!(uri = %uri, error = %e, "failed to check if secret is readable");
                        continue;
                    }
                }
            }
            trace!(uri = %uri, "listed");
            secrets.push(secret);
        }
        Ok(secrets)
    }

    /// Recipients report, template and tags of a loaded secret.
    ///
    /// With `check_schema`, a secret whose template has a schema is decrypted
    /// and checked against it; otherwise its state is `Unknown`. Templates
    /// without a schema are always `Valid`.
    ///
    /// # Errors
    ///
    /// Returns an error if the container can't be inspected.
    pub fn details(&self, secret: &Secret, check_schema: bool) -> Result<SecretDetails> {
        let template = self.policy.template_for(secret).map(|template| {
            let state = match template.schema() {
                None => SchemaState::Valid,
                Some(_) if !check_schema => SchemaState::Unknown,
                Some(_) => match secret.decrypt(&self.policy, &self.cipher) {
                    Ok(plaintext) => match template.validate(&plaintext) {
                        Ok(()) => SchemaState::Valid,
                        Err(_) => SchemaState::Invalid,
                    },
                    Err(e) => {
                        warn!(uri = secret.uri(), error = %e, "cannot check template schema");
                        SchemaState::Unknown
                    }
                },
            };
            TemplateReport {
                alias: template.alias().to_string(),
                state,
            }
        });

        Ok(SecretDetails {
            recipients: secret.recipients(&self.policy)?,
            template,
            tags: secret.tags().clone(),
        })
    }
}
