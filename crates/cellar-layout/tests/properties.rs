use cellar_layout::{Assignment, SlotCode, WineId};
use proptest::prelude::*;

/// Distinct cellar slots with optional occupants
fn entries() -> impl Strategy<Value = Vec<((u32, u32), Option<u64>)>> {
    proptest::collection::btree_map((1u32..20, 1u32..10), proptest::option::of(1u64..50), 0..30)
        .prop_map(|map| map.into_iter().collect())
}

proptest! {
    #[test]
    fn prop_hash_ignores_insertion_order(raw in entries()) {
        let forward: Assignment = raw
            .iter()
            .map(|((r, c), w)| (SlotCode::cellar(*r, *c), w.map(WineId)))
            .collect();
        let backward: Assignment = raw
            .iter()
            .rev()
            .map(|((r, c), w)| (SlotCode::cellar(*r, *c), w.map(WineId)))
            .collect();
        prop_assert_eq!(&forward, &backward);
        prop_assert_eq!(forward.content_hash(), backward.content_hash());
    }

    #[test]
    fn prop_explicit_empties_do_not_change_hash(raw in entries(), extra in proptest::collection::vec((1u32..20, 1u32..10), 0..5)) {
        let base: Assignment = raw
            .iter()
            .map(|((r, c), w)| (SlotCode::cellar(*r, *c), w.map(WineId)))
            .collect();
        let mut padded = base.clone();
        for (r, c) in extra {
            let code = SlotCode::cellar(r, c);
            if !padded.contains_slot(&code) {
                padded.set(code, None);
            }
        }
        prop_assert_eq!(base.content_hash(), padded.content_hash());
    }

    #[test]
    fn prop_cellar_order_is_row_major(a in (1u32..30, 1u32..30), b in (1u32..30, 1u32..30)) {
        let left = SlotCode::cellar(a.0, a.1);
        let right = SlotCode::cellar(b.0, b.1);
        prop_assert_eq!(left.cmp(&right), a.cmp(&b));
        prop_assert!(SlotCode::fridge(9) < left);
    }
}
