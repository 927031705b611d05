//! Access policy.
//!
//! A [`Policy`] is the read-only snapshot every operation works from: known
//! keys, teams, keepers, permission rules and template rules. It is built
//! once per process and shared by reference, including across rebuild
//! workers.
//!
//! Expected recipients of a secret:
//!
//! 1. start from the empty set;
//! 2. for every permission rule whose query matches, in configured order,
//!    apply its `+alias`/`-alias` expressions in order;
//! 3. add the keepers.

mod rules;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::core::config::Config;
use crate::core::constants::{
    ALL_TEAM, KEYS_DIR, PUBLIC_KEY_EXTENSION, SCHEMA_EXTENSION, SECRETS_DIR, SKELETON_EXTENSION,
    TEMPLATES_DIR,
};
use crate::core::keys::{KeySet, PublicKey};
use crate::core::openpgp::KeyId;
use crate::core::query::{self, Context};
use crate::error::{ConfigError, Result};

pub use rules::{PermissionExpression, PermissionRule, Schema, Template, TemplateRule};

/// Immutable access policy snapshot.
#[derive(Debug)]
pub struct Policy {
    secrets_dir: PathBuf,
    keys: KeySet,
    by_id: HashMap<KeyId, Arc<PublicKey>>,
    teams: BTreeMap<String, KeySet>,
    keepers: KeySet,
    identity: Option<Arc<PublicKey>>,
    permissions: Vec<PermissionRule>,
    templates: Vec<TemplateRule>,
}

impl Policy {
    /// Load keys and templates from the vault root and validate `config`
    /// against them.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a missing folder, an unreadable key or
    /// template, or any rule referring to something that does not exist.
    pub fn load(config: &Config) -> Result<Self> {
        let root = config.root_dir();
        debug!(root = %root.display(), "loading policy");

        let keys_dir = require_dir(root.join(KEYS_DIR))?;
        let secrets_dir = require_dir(root.join(SECRETS_DIR))?;

        let keys = load_keys(&keys_dir)?;
        let templates = load_templates(&root.join(TEMPLATES_DIR))?;
        Self::build(secrets_dir, keys, templates, config)
    }

    /// Assemble a policy from already loaded keys and templates.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for duplicate keys, unknown aliases, invalid
    /// expressions or queries, and an empty keeper list.
    pub fn build(
        secrets_dir: PathBuf,
        keys: Vec<PublicKey>,
        templates: Vec<Template>,
        config: &Config,
    ) -> Result<Self> {
        let mut all = KeySet::new();
        let mut by_id = HashMap::new();
        for key in keys {
            if all.get(key.alias()).is_some() {
                return Err(ConfigError::DuplicateKey(key.alias().to_string()).into());
            }
            let key = Arc::new(key);
            for id in key.key_ids() {
                by_id.insert(*id, Arc::clone(&key));
            }
            all.insert(key);
        }

        let mut teams = BTreeMap::new();
        if !config.teams.contains_key(ALL_TEAM) {
            teams.insert(ALL_TEAM.to_string(), all.clone());
        }
        for (team, members) in &config.teams {
            let mut set = KeySet::new();
            for member in members {
                let key = all.get(member).ok_or_else(|| ConfigError::UnknownTeamMember {
                    team: team.clone(),
                    key: member.clone(),
                })?;
                set.insert(Arc::clone(key));
            }
            teams.insert(team.clone(), set);
        }

        if config.keepers.is_empty() {
            return Err(ConfigError::NoKeepers.into());
        }
        let mut keepers = KeySet::new();
        for alias in &config.keepers {
            let key = all
                .get(alias)
                .ok_or_else(|| ConfigError::UnknownKeeper(alias.clone()))?;
            keepers.insert(Arc::clone(key));
        }

        let identity = match &config.identity {
            Some(alias) => Some(Arc::clone(
                all.get(alias)
                    .ok_or_else(|| ConfigError::UnknownIdentity(alias.clone()))?,
            )),
            None => None,
        };

        let mut permissions = Vec::with_capacity(config.permissions.len());
        for entry in &config.permissions {
            let predicate = parse_rule_query(&entry.query)?;
            let mut expressions = Vec::with_capacity(entry.grants.len());
            for grant in &entry.grants {
                let (deny, alias) = PermissionExpression::split(grant)?;
                // A key alias shadows a team of the same name.
                let keys = match (all.get(alias), teams.get(alias)) {
                    (Some(key), _) => [Arc::clone(key)].into_iter().collect(),
                    (None, Some(team)) => team.clone(),
                    (None, None) => {
                        return Err(ConfigError::UnknownGrantee {
                            query: entry.query.clone(),
                            alias: alias.to_string(),
                        }
                        .into())
                    }
                };
                expressions.push(PermissionExpression::new(alias, deny, keys));
            }
            permissions.push(PermissionRule::new(predicate, expressions));
        }

        let templates: BTreeMap<String, Arc<Template>> = templates
            .into_iter()
            .map(|t| (t.alias().to_string(), Arc::new(t)))
            .collect();
        let mut template_rules = Vec::with_capacity(config.templates.len());
        for entry in &config.templates {
            let predicate = parse_rule_query(&entry.query)?;
            let template =
                templates
                    .get(&entry.template)
                    .ok_or_else(|| ConfigError::UnknownTemplate {
                        query: entry.query.clone(),
                        template: entry.template.clone(),
                    })?;
            template_rules.push(TemplateRule::new(predicate, Arc::clone(template)));
        }

        debug!(
            keys = all.len(),
            teams = teams.len(),
            keepers = keepers.len(),
            permissions = permissions.len(),
            templates = template_rules.len(),
            "policy ready"
        );

        Ok(Self {
            secrets_dir,
            keys: all,
            by_id,
            teams,
            keepers,
            identity,
            permissions,
            templates: template_rules,
        })
    }

    /// Root of the secret tree.
    pub fn secrets_dir(&self) -> &Path {
        &self.secrets_dir
    }

    /// Every known key.
    pub fn keys(&self) -> &KeySet {
        &self.keys
    }

    /// Look up a key by alias.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownKey` if no key has that alias.
    pub fn key(&self, alias: &str) -> Result<Arc<PublicKey>> {
        self.keys
            .get(alias)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownKey(alias.to_string()).into())
    }

    /// Map a primary or subkey id back to its key.
    pub fn key_by_id(&self, id: KeyId) -> Option<&Arc<PublicKey>> {
        self.by_id.get(&id)
    }

    pub fn team(&self, alias: &str) -> Option<&KeySet> {
        self.teams.get(alias)
    }

    pub fn keepers(&self) -> &KeySet {
        &self.keepers
    }

    /// The caller's key, when configured.
    pub fn identity(&self) -> Option<&Arc<PublicKey>> {
        self.identity.as_ref()
    }

    pub fn permissions(&self) -> &[PermissionRule] {
        &self.permissions
    }

    /// Keys a secret must be encrypted to.
    ///
    /// Always a superset of the keepers.
    pub fn expected_recipients(&self, secret: &dyn Context) -> KeySet {
        let mut result = KeySet::new();
        for rule in &self.permissions {
            rule.apply(secret, &mut result);
        }
        result.union(&self.keepers);
        trace!(recipients = result.len(), "expected recipients computed");
        result
    }

    /// Template of the first matching template rule.
    pub fn template_for(&self, secret: &dyn Context) -> Option<&Template> {
        self.templates
            .iter()
            .find(|rule| rule.matches(secret))
            .map(|rule| rule.template().as_ref())
    }
}

fn require_dir(path: PathBuf) -> Result<PathBuf> {
    if path.is_dir() {
        Ok(path)
    } else {
        Err(ConfigError::MissingFolder(path).into())
    }
}

fn parse_rule_query(text: &str) -> Result<query::Predicate> {
    query::parse(text).map_err(|source| {
        ConfigError::InvalidQuery {
            query: text.to_string(),
            source,
        }
        .into()
    })
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|ext| ext == extension)
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem().map(|stem| stem.to_string_lossy().into_owned())
}

/// Every `*.pub` below `dir`, sorted by path.
fn load_keys(dir: &Path) -> Result<Vec<PublicKey>> {
    let mut keys = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| ConfigError::ReadFile {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || !has_extension(path, PUBLIC_KEY_EXTENSION) {
            continue;
        }
        let Some(alias) = file_stem(path) else {
            continue;
        };
        keys.push(PublicKey::load(&alias, path)?);
    }
    Ok(keys)
}

/// Templates in `dir`, one per distinct `*.schema`/`*.skeleton` stem.
///
/// The folder is optional.
fn load_templates(dir: &Path) -> Result<Vec<Template>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut aliases = std::collections::BTreeSet::new();
    for entry in WalkDir::new(dir).max_depth(1) {
        let entry = entry.map_err(|e| ConfigError::ReadFile {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        let path = entry.path();
        if entry.file_type().is_file()
            && (has_extension(path, SCHEMA_EXTENSION) || has_extension(path, SKELETON_EXTENSION))
        {
            aliases.extend(file_stem(path));
        }
    }
    aliases
        .into_iter()
        .map(|alias| Template::load(dir, &alias))
        .collect()
}
