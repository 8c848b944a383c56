use cutkit_designer::properties::{MAX_PASSES, UNSET_COUNT};
use cutkit_designer::EngravingProperties;
use proptest::prelude::*;

fn maybe_number() -> impl Strategy<Value = f64> {
    prop_oneof![Just(f64::NAN), -1000.0..1000.0f64]
}

fn same(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a == b
}

prop_compose! {
    fn any_properties()(
        enabled in any::<bool>(),
        power in maybe_number(),
        feed in maybe_number(),
        pass_count in prop_oneof![Just(UNSET_COUNT), 1..20i32],
        z_start in maybe_number(),
        pass_depth in prop_oneof![Just(f64::NAN), 0.5..50.0f64],
        z_end in maybe_number(),
        all_at_once in any::<bool>(),
    ) -> EngravingProperties {
        EngravingProperties {
            enabled,
            power,
            feed,
            pass_count,
            z_start,
            pass_depth,
            z_end,
            all_at_once,
        }
    }
}

proptest! {
    #[test]
    fn merging_unset_is_identity(p in any_properties()) {
        prop_assert_eq!(p.merge(&EngravingProperties::unset()), p);
    }

    #[test]
    fn encode_decode_round_trip(p in any_properties()) {
        let decoded = EngravingProperties::decode(&p.encode()).unwrap();
        prop_assert_eq!(decoded, p);
    }

    #[test]
    fn flat_ancestor_freezes_depth(parent in any_properties(), child in any_properties()) {
        let mut parent = parent;
        parent.all_at_once = true;
        let merged = parent.merge(&child);
        prop_assert!(merged.all_at_once);
        prop_assert_eq!(merged.pass_count, parent.pass_count);
        prop_assert!(same(merged.z_start, parent.z_start));
        prop_assert!(same(merged.pass_depth, parent.pass_depth));
    }
}

#[test]
fn test_pass_schedule_from_depth_range() {
    let p = EngravingProperties::unset().with_depth(0.0, -6.0, 2.0);
    assert_eq!(p.z_schedule(), vec![0.0, -2.0, -4.0, -6.0]);
    assert_eq!(p.pass_count_resolved(), 4);
}

#[test]
fn test_last_pass_is_clamped() {
    let p = EngravingProperties::unset().with_depth(0.0, -5.0, 2.0);
    assert_eq!(p.z_schedule(), vec![0.0, -2.0, -4.0, -5.0]);
}

#[test]
fn test_no_depth_uses_pass_count() {
    let p = EngravingProperties::unset().with_passes(3);
    let zs = p.z_schedule();
    assert_eq!(zs.len(), 3);
    assert!(zs.iter().all(|z| z.is_nan()));
    assert_eq!(EngravingProperties::unset().z_schedule().len(), 1);
}

#[test]
fn test_enabled_is_conjunction() {
    let off = EngravingProperties::unset().with_enabled(false);
    assert!(!off.merge(&EngravingProperties::unset()).enabled);
    assert!(!EngravingProperties::unset().merge(&off).enabled);
}

#[test]
fn test_child_overrides_only_set_fields() {
    let parent = EngravingProperties::unset().with_feed(1000.0).with_power(50.0);
    let child = EngravingProperties::unset().with_feed(300.0);
    let merged = parent.merge(&child);
    assert_eq!(merged.feed, 300.0);
    assert_eq!(merged.power, 50.0);
}

#[test]
fn test_unset_fields_encode_empty() {
    assert_eq!(EngravingProperties::unset().encode(), "true,,,,,,,false");
    assert!(EngravingProperties::decode("true,1,2").is_err());
}

#[test]
fn test_vanishing_pass_depth_is_capped() {
    let p = EngravingProperties::unset().with_depth(0.0, -6.0, 1e-300);
    assert!(p.exceeds_pass_limit());
    assert!(p.try_z_schedule().is_none());
    let zs = p.z_schedule();
    assert_eq!(zs.len(), MAX_PASSES);
    assert_eq!(zs[0], 0.0);
}

#[test]
fn test_decode_rejects_runaway_schedules() {
    assert!(EngravingProperties::decode("true,,,,0,1e-300,-6,false").is_err());
    assert!(EngravingProperties::decode("true,,,2000000000,,,,false").is_err());
    let ok = EngravingProperties::decode("true,,,,0,0.5,-6,false").unwrap();
    assert_eq!(ok.try_z_schedule().map(|z| z.len()), Some(13));
}
