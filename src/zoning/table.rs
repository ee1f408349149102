//! Compiled-in regulations for the Malgrat de Mar POUM.
//!
//! Rows are `(key, max regulatory height, max building depth, notes)`. A depth
//! of `None` means the depth is drawn on the plans and the parcel bounding box
//! is used instead.

use super::rules::{DefaultPolicy, RuleSet, RuleSetError};

pub type RuleRow = (&'static str, f64, Option<f64>, &'static str);

pub const ZONE_RULES: &[RuleRow] = &[
    // 5p: private roads
    ("5p", 0.0, Some(0.0), "Private road zone. Not buildable."),
    // 12: old town, the GML carries 12-1 and 12-2 as well
    ("12", 10.65, None, "Old town. Depth per plans; height per Art. 75."),
    ("12-1", 10.65, None, "Sub-zone 12-1. Same as 12."),
    ("12-2", 10.65, None, "Sub-zone 12-2. Same as 12."),
    // 12a: row and mixed management
    ("12a", 9.00, Some(15.0), "Depth 15 m; height 9 m."),
    ("112a", 9.15, Some(12.0), "Depth 10-12 m per plans; stored as 12 m."),
    ("212a", 9.00, Some(10.0), "Depth 10 m; base height of 12a."),
    ("312a", 7.00, None, "Height 7 m; depth per plans."),
    ("412a", 9.00, Some(10.0), "Height 9 m; depth 10 m."),
    // 13: densification
    ("13a", 20.75, None, "Intensive densification. Depth per plans."),
    ("13b", 16.75, None, "Semi-intensive densification. Depth per plans."),
    ("113b", 16.75, None, "Sub-zone 113b. Same as 13b."),
    // 17: private services
    ("17", 6.10, None, "Private services. Height 6.10 m."),
    // 18: consolidated management
    ("18b", 19.80, None, "Height 19.80 m. 18c maps here by alias."),
    // 19: prefixed building
    ("19", 22.85, None, "Height 22.85 m; rest per plans."),
    ("319", 9.90, None, "Same as 19 except height 9.90 m."),
    // 20: isolated building
    ("20", 18.30, None, "Height 18.30 m; depth not fixed here."),
    ("220a", 6.50, None, "Height 6.50 m."),
    // 21: industrial
    ("21", 30.0, None, "Base 12 m; exceptionally up to 30 m."),
    ("121", 30.0, None, "Industrial PP2. Same as 21."),
    ("21a/1", 12.0, None, "Small business. Height 12 m; setbacks 5 m + 5 m."),
    ("21a/2", 12.0, None, "Medium business. Height 12 m."),
    // 26: commercial
    ("26", 7.00, None, "Commercial zone. Height 7 m; perimeter per plan."),
    // 30: complementary hotel use
    ("30", 8.55, None, "Complementary hotel use. Height 8.55 m."),
];

/// Raw codes that share another zone's parameters.
pub const ZONE_ALIASES: &[(&str, &str)] = &[("18c", "18b")];

impl RuleSet {
    /// Builds the compiled-in table. Fails only if the table itself is inconsistent.
    pub fn compiled(policy: DefaultPolicy) -> Result<Self, RuleSetError> {
        RuleSet::builder()
            .rules(ZONE_RULES)
            .aliases(ZONE_ALIASES)
            .default_policy(policy)
            .build()
    }
}
