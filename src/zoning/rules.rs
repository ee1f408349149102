//! Zone rules and the immutable rule set they live in.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Key of the sentinel rule handed out when a zone has no entry.
pub const DEFAULT_RULE_KEY: &str = "__default__";

/// Height used by the default rule unless a [`DefaultPolicy`] says otherwise.
pub const DEFAULT_RULE_HEIGHT_M: f64 = 10.0;

const DEFAULT_RULE_NOTES: &str = "Default rule: zone has no specific regulation in the table.";

/// Building regulation for one zoning key.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneRule {
    key: String,
    max_regulatory_height_m: f64,
    max_building_depth_m: Option<f64>,
    notes: String,
}

impl ZoneRule {
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        max_regulatory_height_m: f64,
        max_building_depth_m: Option<f64>,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            max_regulatory_height_m,
            max_building_depth_m,
            notes: notes.into(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Regulatory height in metres. Zero means the zone is not buildable.
    #[must_use]
    pub fn max_regulatory_height_m(&self) -> f64 {
        self.max_regulatory_height_m
    }

    /// Maximum building depth. `None` defers to the parcel's own depth.
    #[must_use]
    pub fn max_building_depth_m(&self) -> Option<f64> {
        self.max_building_depth_m
    }

    #[must_use]
    pub fn notes(&self) -> &str {
        &self.notes
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.key == DEFAULT_RULE_KEY
    }
}

/// Policy for zones without a rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefaultPolicy {
    /// Height of the fallback rule. `0.0` turns unknown zones into
    /// non-buildable parcels instead of producing a best-effort volume.
    pub height_m: f64,
}

impl Default for DefaultPolicy {
    fn default() -> Self {
        Self {
            height_m: DEFAULT_RULE_HEIGHT_M,
        }
    }
}

/// Static-data integrity problems, raised while building a [`RuleSet`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleSetError {
    #[error("zone key `{0}` is empty or not a plain zoning token")]
    InvalidKey(String),
    #[error("zone key `{0}` is defined more than once")]
    DuplicateKey(String),
    #[error("zone `{key}` has a non-finite or negative {field}")]
    InvalidValue { key: String, field: &'static str },
    #[error("alias `{alias}` points to `{target}`, which has no rule")]
    DanglingAlias { alias: String, target: String },
    #[error("alias `{alias}` points to `{target}`, which is itself an alias")]
    AliasChain { alias: String, target: String },
    #[error("alias `{0}` is defined more than once")]
    DuplicateAlias(String),
    #[error("alias `{0}` shadows a zone rule with the same key")]
    AliasShadowsRule(String),
    #[error("default rule height must be finite and non-negative, got {0}")]
    InvalidDefaultHeight(f64),
}

/// Immutable rule table plus alias projection.
///
/// Built once at startup and shared by reference; every lookup is read-only.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub(crate) rules: BTreeMap<String, ZoneRule>,
    pub(crate) aliases: BTreeMap<String, String>,
    pub(crate) default_rule: ZoneRule,
}

impl RuleSet {
    #[must_use]
    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::default()
    }

    /// Rule for an exact canonical key, without alias or default handling.
    #[must_use]
    pub fn rule(&self, key: &str) -> Option<&ZoneRule> {
        self.rules.get(key)
    }

    #[must_use]
    pub fn default_rule(&self) -> &ZoneRule {
        &self.default_rule
    }

    pub fn rules(&self) -> impl Iterator<Item = &ZoneRule> {
        self.rules.values()
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn alias_target(&self, code: &str) -> Option<&str> {
        self.aliases.get(code).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Collects rule tuples and alias pairs, then validates them in [`RuleSetBuilder::build`].
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    rules: Vec<ZoneRule>,
    aliases: Vec<(String, String)>,
    fallthrough: BTreeSet<String>,
    policy: DefaultPolicy,
}

impl RuleSetBuilder {
    #[must_use]
    pub fn rule(
        mut self,
        key: &str,
        height_m: f64,
        depth_m: Option<f64>,
        notes: &str,
    ) -> Self {
        self.rules.push(ZoneRule::new(key, height_m, depth_m, notes));
        self
    }

    #[must_use]
    pub fn rules<'a, 'b: 'a, I>(mut self, rows: I) -> Self
    where
        I: IntoIterator<Item = &'a (&'b str, f64, Option<f64>, &'b str)>,
    {
        for (key, height, depth, notes) in rows {
            self.rules.push(ZoneRule::new(*key, *height, *depth, *notes));
        }
        self
    }

    #[must_use]
    pub fn alias(mut self, alias: &str, canonical: &str) -> Self {
        self.aliases.push((alias.to_owned(), canonical.to_owned()));
        self
    }

    #[must_use]
    pub fn aliases<'a, 'b: 'a, I>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = &'a (&'b str, &'b str)>,
    {
        for (alias, canonical) in pairs {
            self.aliases.push(((*alias).to_owned(), (*canonical).to_owned()));
        }
        self
    }

    /// Marks an alias target that is meant to have no rule and resolve to the default.
    #[must_use]
    pub fn fallthrough(mut self, canonical: &str) -> Self {
        self.fallthrough.insert(canonical.to_owned());
        self
    }

    #[must_use]
    pub fn default_policy(mut self, policy: DefaultPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Result<RuleSet, RuleSetError> {
        if !self.policy.height_m.is_finite() || self.policy.height_m < 0.0 {
            return Err(RuleSetError::InvalidDefaultHeight(self.policy.height_m));
        }

        let mut rules = BTreeMap::new();
        for rule in self.rules {
            validate_key(&rule.key)?;
            if !rule.max_regulatory_height_m.is_finite() {
                return Err(RuleSetError::InvalidValue {
                    key: rule.key,
                    field: "height",
                });
            }
            if rule
                .max_building_depth_m
                .is_some_and(|d| !d.is_finite() || d < 0.0)
            {
                return Err(RuleSetError::InvalidValue {
                    key: rule.key,
                    field: "depth",
                });
            }
            if rules.contains_key(&rule.key) {
                return Err(RuleSetError::DuplicateKey(rule.key));
            }
            rules.insert(rule.key.clone(), rule);
        }

        let mut aliases = BTreeMap::new();
        for (alias, target) in self.aliases {
            validate_key(&alias)?;
            validate_key(&target)?;
            if rules.contains_key(&alias) {
                return Err(RuleSetError::AliasShadowsRule(alias));
            }
            if aliases.insert(alias.clone(), target).is_some() {
                return Err(RuleSetError::DuplicateAlias(alias));
            }
        }

        for (alias, target) in &aliases {
            if aliases.contains_key(target) {
                return Err(RuleSetError::AliasChain {
                    alias: alias.clone(),
                    target: target.clone(),
                });
            }
            if !rules.contains_key(target) && !self.fallthrough.contains(target) {
                return Err(RuleSetError::DanglingAlias {
                    alias: alias.clone(),
                    target: target.clone(),
                });
            }
        }

        log::debug!(
            "rule set built with {} rules and {} aliases",
            rules.len(),
            aliases.len()
        );

        Ok(RuleSet {
            rules,
            aliases,
            default_rule: ZoneRule::new(
                DEFAULT_RULE_KEY,
                self.policy.height_m,
                None,
                DEFAULT_RULE_NOTES,
            ),
        })
    }
}

fn zone_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[0-9A-Za-z][0-9A-Za-z/\-]*$").expect("zone key pattern is a valid literal")
    })
}

fn validate_key(key: &str) -> Result<(), RuleSetError> {
    if zone_key_pattern().is_match(key) {
        Ok(())
    } else {
        Err(RuleSetError::InvalidKey(key.to_owned()))
    }
}
