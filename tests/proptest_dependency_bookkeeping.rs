//! Property-based check of the dependency-bookkeeping invariant: for every
//! edge not removed, it appears exactly once in its input's out-chain and
//! exactly once in its output's in-chain.

mod common;

use cranelift_entity::EntityRef;
use polysched::deps::Dependencies;
use polysched::ir::{ArrayId, Cache};
use polysched::Stats;
use proptest::prelude::*;

/// One randomly-shaped "load, store to the same array" pair, since that's
/// the fixture shape that reliably produces a dependence edge (`common`'s
/// builders don't vary array identity across a pair, so `check` always
/// finds the arrays equal and builds a real `DepPoly`).
#[derive(Clone, Debug)]
struct PairSpec {
    trip_count: i64,
    coeff: i64,
    const_offset: i64,
}

fn pair_spec() -> impl Strategy<Value = PairSpec> {
    (4i64..64, 1i64..3, -2i64..3).prop_map(|(trip_count, coeff, const_offset)| PairSpec {
        trip_count,
        coeff,
        const_offset,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn edge_chains_stay_consistent_under_random_check_and_remove(
        specs in prop::collection::vec(pair_spec(), 1..6),
        remove_mask in prop::collection::vec(any::<bool>(), 0..64),
    ) {
        let mut cache = Cache::new();
        let mut deps = Dependencies::new();
        let mut stats = Stats::new();

        let mut all_ids = Vec::new();
        for (i, spec) in specs.iter().enumerate() {
            let loop_handle = common::push_flat_loop(&mut cache, spec.trip_count);
            let array = ArrayId::new(i);
            let load = common::push_1d_addr(&mut cache, array, loop_handle, false, spec.coeff, spec.const_offset, 0);
            let store = common::push_1d_addr(&mut cache, array, loop_handle, true, spec.coeff, spec.const_offset, 1);
            let ids = deps.check(&mut cache, store, load, &mut stats);
            all_ids.extend(ids);
        }

        let mut live: Vec<_> = all_ids.clone();
        if !all_ids.is_empty() {
            for (idx, &remove) in remove_mask.iter().enumerate() {
                if !remove {
                    continue;
                }
                let target = all_ids[idx % all_ids.len()];
                if let Some(pos) = live.iter().position(|&id| id == target) {
                    let id = live.remove(pos);
                    deps.remove_edge(&mut cache, id, true, true);
                }
            }
        }

        for &id in &live {
            let input = deps.get(id).input;
            let output = deps.get(id).output;
            prop_assert_eq!(deps.output_edges(&cache, input).filter(|&e| e == id).count(), 1);
            prop_assert_eq!(deps.input_edges(&cache, output).filter(|&e| e == id).count(), 1);
        }
    }
}
