use approx::assert_relative_eq;

use super::table::{ZONE_ALIASES, ZONE_RULES};
use super::*;

fn compiled() -> RuleSet {
    RuleSet::compiled(DefaultPolicy::default()).expect("compiled table is consistent")
}

#[test]
fn every_table_key_resolves_to_its_own_rule() {
    let set = compiled();
    for (key, height, depth, notes) in ZONE_RULES {
        let resolution = set.resolve(*key);
        assert!(resolution.is_matched(), "{key} should match");
        let rule = resolution.rule();
        assert_eq!(rule.key(), *key);
        assert_eq!(rule.max_regulatory_height_m(), *height);
        assert_eq!(rule.max_building_depth_m(), *depth);
        assert_eq!(rule.notes(), *notes);
    }
}

#[test]
fn alias_sources_resolve_like_their_targets() {
    let set = compiled();
    for (alias, target) in ZONE_ALIASES {
        let via_alias = set.resolve(*alias);
        let direct = set.resolve(*target);
        assert_eq!(via_alias.rule(), direct.rule());
        assert_eq!(via_alias.is_matched(), set.rule(target).is_some());
    }
}

#[test]
fn unknown_codes_default() {
    let set = compiled();
    for code in ["unknown_zone_xyz", "UNKNOWN", "12A", "99"] {
        let resolution = set.resolve(code);
        assert!(matches!(resolution, Resolution::Defaulted(_)), "{code}");
        assert_eq!(resolution.rule(), set.default_rule());
    }
}

#[test]
fn empty_code_defaults() {
    let set = compiled();
    assert_eq!(set.canonicalize(""), "");
    let (rule, matched) = set.resolve("").into_parts();
    assert!(!matched);
    assert_eq!(rule, set.default_rule());
    assert!(!set.resolve(None).is_matched());
    assert!(!set.resolve("   ").is_matched());
}

#[test]
fn whitespace_is_trimmed_before_lookup() {
    let set = compiled();
    assert_eq!(set.canonicalize("  12a  "), set.canonicalize("12a"));
    assert_eq!(set.resolve("  12a  "), set.resolve("12a"));
}

#[test]
fn private_road_is_not_buildable() {
    let set = compiled();
    let rule = set.resolve("5p").rule();
    assert_eq!(rule.max_regulatory_height_m(), 0.0);
    assert_eq!(rule.max_building_depth_m(), Some(0.0));
    assert!(!is_buildable(rule, 25.0));
}

#[test]
fn zone_18c_uses_18b_parameters() {
    let set = compiled();
    let resolution = set.resolve("18c");
    assert!(resolution.is_matched());
    assert_eq!(resolution.rule().key(), "18b");
    assert_relative_eq!(effective_height(resolution.rule()), 19.80);
}

#[test]
fn zone_12a_has_fixed_depth() {
    let set = compiled();
    let rule = set.resolve("12a").rule();
    assert_relative_eq!(effective_height(rule), 9.00);
    for bbox_depth in [0.5, 8.2, 15.0, 120.0] {
        assert_relative_eq!(effective_depth(rule, bbox_depth), 15.0);
    }
}

#[test]
fn zone_13a_falls_back_to_bbox_depth() {
    let set = compiled();
    let rule = set.resolve("13a").rule();
    assert_relative_eq!(effective_height(rule), 20.75);
    assert_eq!(rule.max_building_depth_m(), None);
    assert_relative_eq!(effective_depth(rule, 8.2), 8.2);
}

#[test]
fn unknown_zone_gets_default_volume() {
    let set = compiled();
    let resolution = set.resolve("unknown_zone_xyz");
    assert!(!resolution.is_matched());
    let rule = resolution.rule();
    assert!(rule.is_default());
    assert_relative_eq!(effective_height(rule), 10.0);
    assert_relative_eq!(effective_depth(rule, 8.2), 8.2);
    assert!(is_buildable(rule, 8.2));
}

#[test]
fn zero_default_height_makes_unknown_zones_unbuildable() {
    let set = RuleSet::compiled(DefaultPolicy { height_m: 0.0 }).unwrap();
    let rule = set.resolve("unknown_zone_xyz").rule();
    assert!(!is_buildable(rule, 8.2));
    // Known zones are unaffected.
    assert!(is_buildable(set.resolve("13a").rule(), 8.2));
}

#[test]
fn rule_set_is_shareable_across_threads() {
    let set = std::sync::Arc::new(compiled());
    let handles: Vec<_> = ["12a", "18c", "nope", "21a/2"]
        .into_iter()
        .map(|code| {
            let set = std::sync::Arc::clone(&set);
            std::thread::spawn(move || set.resolve(code).is_matched())
        })
        .collect();
    let matched: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(matched, [true, true, false, true]);
}
