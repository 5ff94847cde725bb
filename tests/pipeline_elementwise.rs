//! End-to-end smoke test: `out[i] = x[i] + y[i]` for `i in 0..N`.
//!
//! No loop-carried dependencies exist between the three distinct arrays, so
//! this exercises the "independent at every depth" path through
//! `LoopBlock::optimize` and the full IR-reconstruction pipeline without the
//! added complexity of a reduction. See `pipeline_reduction.rs` for the
//! accumulator case.

mod common;

use cranelift_entity::EntityRef;
use polysched::ir::{ArrayId, Cache};
use polysched::{deps::Dependencies, Config, Stats};

#[test]
fn elementwise_add_schedules_to_a_single_loop() {
    let mut cache = Cache::new();
    let mut deps = Dependencies::new();
    let mut stats = Stats::new();
    let config = Config::default();

    let loop_handle = common::push_flat_loop(&mut cache, 64);

    let out = ArrayId::new(0);
    let x = ArrayId::new(1);
    let y = ArrayId::new(2);

    let x_load = common::push_1d_addr(&mut cache, x, loop_handle, false, 1, 0, 0);
    let y_load = common::push_1d_addr(&mut cache, y, loop_handle, false, 1, 0, 1);
    let out_store = common::push_1d_addr(&mut cache, out, loop_handle, true, 1, 0, 2);

    // Distinct arrays: no dependence edges should be created between any
    // pair, since `DepPoly::dependence` short-circuits on `array` mismatch.
    for (a, b) in [(x_load, y_load), (x_load, out_store), (y_load, out_store)] {
        assert!(deps.check(&mut cache, a, b, &mut stats).is_empty());
    }

    let program = polysched::optimize(&mut cache, &mut deps, &config, &mut stats, &[out_store]);

    assert_eq!(program.roots.len(), 1, "the single fused node yields one root loop");
    let root = program.roots[0];
    let root_ir = &cache.loop_irs[root];

    assert!(
        root_ir.legality.reorderable,
        "a loop with no dependencies at all must be reorderable"
    );
    assert_eq!(root_ir.legality.ordered_reduction_count, 0);
    assert_eq!(root_ir.legality.unordered_reduction_count, 0);
    assert!(root_ir.legality.peel_flag.is_empty());

    // Walk the body: every node attached should be one of our three `Addr`s,
    // and none should have been dropped by the CSE/temporary-elimination
    // passes (they're all distinct arrays with distinct index expressions).
    let mut seen = Vec::new();
    let mut cursor = root_ir.child;
    while let Some(node) = cursor {
        if let Some(addr_id) = node.as_addr() {
            assert!(!cache.addrs[addr_id].dropped);
            seen.push(addr_id);
        }
        cursor = polysched::ir::node::next(&cache, node);
    }
    assert_eq!(seen.len(), 3, "all three accesses survive reconstruction");

    // `edge_levels` should be empty since no dependencies were ever checked
    // in a way that created edges.
    assert!(program.edge_levels.is_empty());
}
