//! Permission and template rules.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::trace;

use crate::core::keys::KeySet;
use crate::core::query::{Context, Predicate};
use crate::error::{ConfigError, Result, SecretError};

/// One `+alias` or `-alias` item of a permission rule.
#[derive(Debug, Clone)]
pub struct PermissionExpression {
    alias: String,
    deny: bool,
    keys: KeySet,
}

impl PermissionExpression {
    pub fn new(alias: impl Into<String>, deny: bool, keys: KeySet) -> Self {
        Self {
            alias: alias.into(),
            deny,
            keys,
        }
    }

    /// Split `+alias` / `-alias` into the deny flag and the alias.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidExpression` without a sign or an alias.
    pub fn split(expression: &str) -> Result<(bool, &str)> {
        let expression = expression.trim();
        let invalid = || ConfigError::InvalidExpression {
            expression: expression.to_string(),
        };
        let (deny, alias) = if let Some(alias) = expression.strip_prefix('+') {
            (false, alias)
        } else if let Some(alias) = expression.strip_prefix('-') {
            (true, alias)
        } else {
            return Err(invalid().into());
        };
        let alias = alias.trim();
        if alias.is_empty() {
            return Err(invalid().into());
        }
        Ok((deny, alias))
    }

    pub fn is_deny(&self) -> bool {
        self.deny
    }

    pub fn keys(&self) -> &KeySet {
        &self.keys
    }

    /// Grant or revoke this expression's keys in `result`.
    pub fn apply(&self, result: &mut KeySet) {
        if self.deny {
            result.difference(&self.keys);
        } else {
            result.union(&self.keys);
        }
    }
}

impl fmt::Display for PermissionExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.deny { '-' } else { '+' };
        write!(f, "{sign}{}", self.alias)
    }
}

/// A query plus the expressions applied, in order, when it matches.
#[derive(Debug, Clone)]
pub struct PermissionRule {
    query: Predicate,
    expressions: Vec<PermissionExpression>,
}

impl PermissionRule {
    pub fn new(query: Predicate, expressions: Vec<PermissionExpression>) -> Self {
        Self { query, expressions }
    }

    pub fn query(&self) -> &Predicate {
        &self.query
    }

    pub fn expressions(&self) -> &[PermissionExpression] {
        &self.expressions
    }

    /// Apply the rule to `result` if it matches `context`.
    pub fn apply(&self, context: &dyn Context, result: &mut KeySet) -> bool {
        if !self.query.eval(context) {
            return false;
        }
        for expression in &self.expressions {
            expression.apply(result);
        }
        trace!(query = %self.query, "permission rule applied");
        true
    }
}

/// JSON schema that secret contents must satisfy, compiled once at load.
#[derive(Debug)]
pub struct Schema {
    document: serde_json::Value,
    validator: jsonschema::Validator,
}

impl Schema {
    /// Compile a schema document.
    ///
    /// # Errors
    ///
    /// Returns the compiler's message when `document` is not a usable schema.
    pub fn compile(document: serde_json::Value) -> std::result::Result<Self, String> {
        let validator = jsonschema::validator_for(&document).map_err(|e| e.to_string())?;
        Ok(Self {
            document,
            validator,
        })
    }

    pub fn document(&self) -> &serde_json::Value {
        &self.document
    }

    /// Check `content` as a JSON document; `Err` lists every violation.
    pub fn check(&self, content: &[u8]) -> std::result::Result<(), Vec<String>> {
        let instance: serde_json::Value = serde_json::from_slice(content)
            .map_err(|e| vec![format!("content is not valid JSON: {e}")])?;
        let errors: Vec<String> = self
            .validator
            .iter_errors(&instance)
            .map(|e| e.to_string())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Content hints attached to a family of secrets.
#[derive(Debug)]
pub struct Template {
    alias: String,
    schema: Option<Schema>,
    skeleton: Option<Vec<u8>>,
}

impl Template {
    pub fn new(alias: impl Into<String>, schema: Option<Schema>, skeleton: Option<Vec<u8>>) -> Self {
        Self {
            alias: alias.into(),
            schema,
            skeleton,
        }
    }

    /// Read `<alias>.schema` and `<alias>.skeleton` from `dir`; either may be
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidTemplate` for an unreadable file or a
    /// schema that is not JSON or does not compile.
    pub fn load(dir: &Path, alias: &str) -> Result<Self> {
        use crate::core::constants::{SCHEMA_EXTENSION, SKELETON_EXTENSION};

        let invalid = |reason: String| ConfigError::InvalidTemplate {
            alias: alias.to_string(),
            reason,
        };
        let read = |extension: &str| -> Result<Option<Vec<u8>>> {
            let path = dir.join(format!("{alias}.{extension}"));
            if !path.is_file() {
                return Ok(None);
            }
            Ok(Some(std::fs::read(&path).map_err(|e| invalid(e.to_string()))?))
        };

        let schema = match read(SCHEMA_EXTENSION)? {
            Some(bytes) => {
                let document: serde_json::Value = serde_json::from_slice(&bytes)
                    .map_err(|e| invalid(format!("schema is not valid JSON: {e}")))?;
                Some(Schema::compile(document).map_err(|e| invalid(format!("bad schema: {e}")))?)
            }
            None => None,
        };
        let skeleton = read(SKELETON_EXTENSION)?;

        Ok(Self::new(alias, schema, skeleton))
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub fn skeleton(&self) -> Option<&[u8]> {
        self.skeleton.as_deref()
    }

    /// Check secret contents against the schema. Without a schema anything
    /// passes.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::TemplateMismatch` listing every violation.
    pub fn validate(&self, content: &[u8]) -> Result<()> {
        let Some(schema) = &self.schema else {
            return Ok(());
        };
        schema.check(content).map_err(|errors| {
            SecretError::TemplateMismatch {
                alias: self.alias.clone(),
                errors,
            }
            .into()
        })
    }
}

/// A query selecting a template; the first matching rule wins.
#[derive(Debug, Clone)]
pub struct TemplateRule {
    query: Predicate,
    template: Arc<Template>,
}

impl TemplateRule {
    pub fn new(query: Predicate, template: Arc<Template>) -> Self {
        Self { query, template }
    }

    pub fn matches(&self, context: &dyn Context) -> bool {
        self.query.eval(context)
    }

    pub fn template(&self) -> &Arc<Template> {
        &self.template
    }
}
