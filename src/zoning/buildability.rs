//! Buildability decision from a zone rule and the parcel's bounding-box depth.

use super::rules::ZoneRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthSource {
    /// Fixed by the zone rule.
    Rule,
    /// Derived from the parcel bounding box.
    BoundingBox,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Buildability {
    pub height_m: f64,
    pub depth_m: f64,
    pub depth_source: DepthSource,
    pub buildable: bool,
}

/// The rule's regulatory height. Never substituted.
#[must_use]
pub fn effective_height(rule: &ZoneRule) -> f64 {
    rule.max_regulatory_height_m()
}

#[must_use]
pub fn effective_depth(rule: &ZoneRule, bbox_depth_m: f64) -> f64 {
    rule.max_building_depth_m().unwrap_or(bbox_depth_m)
}

/// Zero or negative height or depth means "not buildable". That is a policy
/// outcome, not an error.
#[must_use]
pub fn is_buildable(rule: &ZoneRule, bbox_depth_m: f64) -> bool {
    effective_height(rule) > 0.0 && effective_depth(rule, bbox_depth_m) > 0.0
}

#[must_use]
pub fn classify(rule: &ZoneRule, bbox_depth_m: f64) -> Buildability {
    let depth_source = if rule.max_building_depth_m().is_some() {
        DepthSource::Rule
    } else {
        DepthSource::BoundingBox
    };
    Buildability {
        height_m: effective_height(rule),
        depth_m: effective_depth(rule, bbox_depth_m),
        depth_source,
        buildable: is_buildable(rule, bbox_depth_m),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_depth_wins_over_bbox() {
        let rule = ZoneRule::new("12a", 9.0, Some(15.0), "");
        assert_eq!(effective_depth(&rule, 3.0), 15.0);
        assert_eq!(effective_depth(&rule, 40.0), 15.0);
        assert_eq!(classify(&rule, 3.0).depth_source, DepthSource::Rule);
    }

    #[test]
    fn missing_depth_uses_bbox() {
        let rule = ZoneRule::new("13a", 20.75, None, "");
        let result = classify(&rule, 8.2);
        assert_eq!(result.depth_m, 8.2);
        assert_eq!(result.depth_source, DepthSource::BoundingBox);
        assert!(result.buildable);
    }

    #[test]
    fn zero_or_negative_axis_is_not_buildable() {
        assert!(!is_buildable(&ZoneRule::new("5p", 0.0, Some(0.0), ""), 10.0));
        assert!(!is_buildable(&ZoneRule::new("x", 5.0, None, ""), 0.0));
        assert!(!is_buildable(&ZoneRule::new("x", -1.0, None, ""), 10.0));
        assert!(!is_buildable(&ZoneRule::new("x", 5.0, None, ""), -2.0));
    }
}
