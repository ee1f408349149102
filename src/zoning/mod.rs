//! Zone-regulation resolution: canonical codes, rule lookup and buildability.

mod buildability;
mod resolve;
mod rules;
pub mod table;

pub use buildability::{
    Buildability, DepthSource, classify, effective_depth, effective_height, is_buildable,
};
pub use resolve::Resolution;
pub use rules::{
    DEFAULT_RULE_HEIGHT_M, DEFAULT_RULE_KEY, DefaultPolicy, RuleSet, RuleSetBuilder,
    RuleSetError, ZoneRule,
};

#[cfg(test)]
mod tests;
