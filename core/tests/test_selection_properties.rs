// Property tests for lane selection and translation accounting

use dualroute_core::routing::{fragment_count, select, translated_size};
use dualroute_core::{Capability, Protocol, Selection, TieBreak};
use proptest::prelude::*;

fn capability() -> impl Strategy<Value = Capability> {
    prop_oneof![
        Just(Capability::WifiOnly),
        Just(Capability::ZigbeeOnly),
        Just(Capability::Dual),
    ]
}

fn protocol() -> impl Strategy<Value = Protocol> {
    prop_oneof![Just(Protocol::Wifi), Just(Protocol::Zigbee)]
}

fn tie_break() -> impl Strategy<Value = TieBreak> {
    prop_oneof![
        Just(TieBreak::FavorWifi),
        Just(TieBreak::FavorZigbee),
        Just(TieBreak::None),
    ]
}

proptest! {
    #[test]
    fn prop_mono_nodes_only_use_lane_zero(
        cap in prop_oneof![Just(Capability::WifiOnly), Just(Capability::ZigbeeOnly)],
        required in proptest::option::of(protocol()),
        tb in tie_break(),
    ) {
        if let Selection::Lane { protocol, index } = select(cap, required, tb) {
            prop_assert_eq!(index, 0);
            prop_assert_eq!(Some(0), cap.lane_for(protocol));
        }
    }

    #[test]
    fn prop_mono_nodes_reject_the_other_protocol(
        cap in prop_oneof![Just(Capability::WifiOnly), Just(Capability::ZigbeeOnly)],
        required in protocol(),
        tb in tie_break(),
    ) {
        let speaks = cap.lane_for(required).is_some();
        prop_assert_eq!(select(cap, Some(required), tb) == Selection::Incompatible, !speaks);
    }

    #[test]
    fn prop_dual_lane_matches_required_protocol(required in protocol(), tb in tie_break()) {
        let expected = match required {
            Protocol::Wifi => 0,
            Protocol::Zigbee => 1,
        };
        prop_assert_eq!(
            select(Capability::Dual, Some(required), tb),
            Selection::Lane { protocol: required, index: expected }
        );
    }

    #[test]
    fn prop_selected_lane_exists_on_node(
        cap in capability(),
        required in proptest::option::of(protocol()),
        tb in tie_break(),
    ) {
        if let Some((protocol, index)) = select(cap, required, tb).lane() {
            prop_assert_eq!(cap.lane_protocols().get(index), Some(&protocol));
        }
    }

    #[test]
    fn prop_translated_size_law(
        size in 0usize..10_000,
        source_overhead in 0usize..64,
        target_overhead in 0usize..64,
        source_max in 1usize..8_000,
        target_max in 1usize..8_000,
    ) {
        let expected = size as i64 + target_overhead as i64 - source_overhead as i64
            + target_max as i64 - source_max as i64;
        let got = translated_size(size, source_overhead, target_overhead, source_max, target_max);
        if expected < 0 {
            prop_assert_eq!(got, None);
        } else {
            prop_assert_eq!(got, Some(expected as usize));
        }
    }

    #[test]
    fn prop_translation_there_and_back_restores_size(
        size in 0usize..10_000,
        overhead_a in 0usize..64,
        overhead_b in 0usize..64,
        max_a in 1usize..8_000,
        max_b in 1usize..8_000,
    ) {
        if let Some(there) = translated_size(size, overhead_a, overhead_b, max_a, max_b) {
            let back = translated_size(there, overhead_b, overhead_a, max_b, max_a);
            prop_assert_eq!(back, Some(size));
        }
    }

    #[test]
    fn prop_fragment_count_law(source_max in 0usize..100_000, target_max in 1usize..10_000) {
        let copies = fragment_count(source_max, target_max);
        let ratio = source_max / target_max;
        if source_max % target_max == 0 {
            prop_assert_eq!(copies, ratio.saturating_sub(1));
        } else {
            prop_assert_eq!(copies, ratio);
        }
        // Primary plus copies always covers the source payload
        prop_assert!((copies + 1) * target_max >= source_max);
    }

    #[test]
    fn prop_small_to_large_sends_once(target_max in 1usize..10_000, shrink in 1usize..10_000) {
        let source_max = target_max.saturating_sub(shrink).max(1);
        prop_assert_eq!(fragment_count(source_max, target_max), 0);
    }
}

#[test]
fn test_zero_target_payload_sends_no_copies() {
    assert_eq!(fragment_count(4000, 0), 0);
}
