//! Canonicalization of raw zone codes and rule resolution.

use super::rules::{RuleSet, ZoneRule};

/// Outcome of resolving a raw zone code.
///
/// `Defaulted` is a normal, frequent result. It carries the default rule so
/// the pipeline can continue, but callers must decide whether to surface it.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution<'a> {
    Found(&'a ZoneRule),
    Defaulted(&'a ZoneRule),
}

impl<'a> Resolution<'a> {
    #[must_use]
    pub fn rule(self) -> &'a ZoneRule {
        match self {
            Self::Found(rule) | Self::Defaulted(rule) => rule,
        }
    }

    #[must_use]
    pub fn is_matched(self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// `(rule, matched)` pair.
    #[must_use]
    pub fn into_parts(self) -> (&'a ZoneRule, bool) {
        (self.rule(), self.is_matched())
    }
}

impl RuleSet {
    /// Trims `raw` and applies at most one alias hop. `None` is the empty code.
    #[must_use]
    pub fn canonicalize<'a>(&'a self, raw: impl Into<Option<&'a str>>) -> &'a str {
        let trimmed = raw.into().unwrap_or_default().trim();
        self.alias_target(trimmed).unwrap_or(trimmed)
    }

    /// Exact, case-sensitive lookup of the canonical code, falling back to the default rule.
    pub fn resolve<'a>(&'a self, raw: impl Into<Option<&'a str>>) -> Resolution<'a> {
        self.resolve_with_canonical(raw).1
    }

    /// Like [`RuleSet::resolve`], also returning the canonical code that was looked up.
    pub fn resolve_with_canonical<'a>(
        &'a self,
        raw: impl Into<Option<&'a str>>,
    ) -> (&'a str, Resolution<'a>) {
        let canonical = self.canonicalize(raw);
        let resolution = match self.rule(canonical) {
            Some(rule) => Resolution::Found(rule),
            None => Resolution::Defaulted(self.default_rule()),
        };
        (canonical, resolution)
    }

    /// Nearest rule key by edit distance. Only meant for diagnostics on defaulted codes.
    #[must_use]
    pub fn closest_known_zone(&self, code: &str) -> Option<&str> {
        let code = code.trim();
        if code.is_empty() {
            return None;
        }
        self.rules()
            .map(|rule| (levenshtein::levenshtein(code, rule.key()), rule.key()))
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, key)| key)
    }
}
