//! Property-based tests for the redundancy calculator and segment merge.

#[cfg(test)]
mod tests {
    use crate::layout::{Layout, LayoutSegment, LayoutStripe};
    use crate::redundancy::RedundancyCalculator;
    use crate::statetransfer::{SegmentState, TransferSegment};
    use crate::types::Address;
    use proptest::prelude::*;

    const NODES: [&str; 4] = ["A", "B", "C", "D"];

    fn arb_stripes() -> impl Strategy<Value = Vec<Vec<&'static str>>> {
        prop::collection::vec(
            prop::sample::subsequence(NODES.to_vec(), 1..=3).prop_shuffle(),
            1..=3,
        )
    }

    fn arb_layout() -> impl Strategy<Value = Layout> {
        prop::collection::vec((1i64..20, arb_stripes()), 1..6).prop_map(|shapes| {
            let mut start = 0;
            let segments = shapes
                .into_iter()
                .map(|(len, stripes)| {
                    let segment = LayoutSegment::new(
                        start,
                        start + len,
                        stripes.into_iter().map(LayoutStripe::new).collect(),
                    );
                    start += len;
                    segment
                })
                .collect();
            Layout::new(1, segments).unwrap()
        })
    }

    fn arb_node() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec!["A", "B", "C", "D", "E"])
    }

    fn assert_disjoint_sorted(segments: &[TransferSegment]) {
        for pair in segments.windows(2) {
            assert!(
                pair[0].end_address() < pair[1].start_address(),
                "{} overlaps or precedes {}",
                pair[1],
                pair[0]
            );
        }
    }

    fn state_at(segments: &[TransferSegment], address: Address) -> Option<SegmentState> {
        segments
            .iter()
            .find(|s| s.start_address() <= address && address <= s.end_address())
            .map(TransferSegment::state)
    }

    proptest! {
        /// Requirement ranges are ordered, contiguous, and cover everything past the trim mark.
        #[test]
        fn requirement_is_contiguous_past_trim_mark(
            layout in arb_layout(),
            node in arb_node(),
            trim_mark in -1i64..120,
        ) {
            let calculator = RedundancyCalculator::new(node);
            let segments = calculator.compute_requirement(&layout, trim_mark).unwrap();

            if trim_mark >= layout.last_address() {
                prop_assert!(segments.is_empty());
            } else {
                prop_assert_eq!(segments[0].start_address(), (trim_mark + 1).max(0));
                prop_assert_eq!(segments[segments.len() - 1].end_address(), layout.last_address());
            }

            for segment in &segments {
                prop_assert!(segment.start_address() <= segment.end_address());
                prop_assert!(segment.start_address() > trim_mark);
            }
            for pair in segments.windows(2) {
                prop_assert_eq!(pair[0].end_address() + 1, pair[1].start_address());
            }
        }

        #[test]
        fn requirement_is_idempotent(
            layout in arb_layout(),
            node in arb_node(),
            trim_mark in -1i64..120,
        ) {
            let calculator = RedundancyCalculator::new(node);
            prop_assert_eq!(
                calculator.compute_requirement(&layout, trim_mark).unwrap(),
                calculator.compute_requirement(&layout, trim_mark).unwrap()
            );
        }

        /// Once restored, a range stays restored through any number of fresh merges.
        #[test]
        fn restored_ranges_survive_merges(
            layout in arb_layout(),
            node in arb_node(),
            rounds in 1usize..5,
        ) {
            let calculator = RedundancyCalculator::new(node);
            let initial = calculator.compute_requirement(&layout, -1).unwrap();

            // A node absent from every stripe sees only NotTransferred ranges.
            let unattempted = RedundancyCalculator::new("Z")
                .compute_requirement(&layout, -1)
                .unwrap();

            let mut tracked = initial.clone();
            for _ in 0..rounds {
                tracked = calculator.merge_lists(&tracked, &unattempted).unwrap();
            }

            for segment in initial.iter().filter(|s| s.state() == SegmentState::Restored) {
                for address in segment.start_address()..=segment.end_address() {
                    prop_assert_eq!(state_at(&tracked, address), Some(SegmentState::Restored));
                }
            }
        }

        /// Merged lists are sorted, disjoint, and cover every freshly required address.
        #[test]
        fn merge_covers_fresh_requirement(
            layout in arb_layout(),
            old_node in arb_node(),
            new_node in arb_node(),
            old_trim in -1i64..60,
            new_trim in -1i64..60,
        ) {
            let old = RedundancyCalculator::new(old_node)
                .compute_requirement(&layout, old_trim)
                .unwrap();
            let calculator = RedundancyCalculator::new(new_node);
            let fresh = calculator.compute_requirement(&layout, new_trim).unwrap();

            let merged = calculator.merge_lists(&old, &fresh).unwrap();
            assert_disjoint_sorted(&merged);

            for segment in &fresh {
                for address in segment.start_address()..=segment.end_address() {
                    prop_assert!(state_at(&merged, address).is_some());
                }
            }
        }

        /// Stripe order does not matter; one extra member does.
        #[test]
        fn can_merge_compares_stripes_as_sets(
            stripes in arb_stripes(),
            shuffled_seed in any::<u64>(),
            extra_stripe in any::<prop::sample::Index>(),
        ) {
            let first: Vec<LayoutStripe> = stripes.iter().cloned().map(LayoutStripe::new).collect();
            let second: Vec<LayoutStripe> = stripes
                .iter()
                .map(|servers| {
                    let mut servers = servers.clone();
                    let len = servers.len();
                    servers.rotate_left((shuffled_seed as usize) % len);
                    LayoutStripe::new(servers)
                })
                .collect();

            let same = Layout::new(
                1,
                vec![
                    LayoutSegment::new(0, 5, first.clone()),
                    LayoutSegment::new(5, 10, second.clone()),
                ],
            )
            .unwrap();
            prop_assert!(RedundancyCalculator::can_merge_segments(&same));

            let mut widened = second;
            let index = extra_stripe.index(widened.len());
            widened[index].log_servers.push("E".to_string());
            let different = Layout::new(
                1,
                vec![
                    LayoutSegment::new(0, 5, first.clone()),
                    LayoutSegment::new(5, 10, widened),
                ],
            )
            .unwrap();
            prop_assert!(!RedundancyCalculator::can_merge_segments(&different));

            let single = Layout::new(1, vec![LayoutSegment::new(0, 5, first)]).unwrap();
            prop_assert!(!RedundancyCalculator::can_merge_segments(&single));
        }

        #[test]
        fn can_restore_redundancy_needs_history_gap(
            layout in arb_layout(),
            node in arb_node(),
        ) {
            let segments = layout.segments();
            let (last, earlier) = segments.split_last().unwrap();
            let expected = !earlier.is_empty()
                && last.replicated_on(node)
                && earlier.iter().any(|segment| !segment.contains_server(node));

            prop_assert_eq!(RedundancyCalculator::can_restore_redundancy(&layout, node), expected);
        }
    }
}
