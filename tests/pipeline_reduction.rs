//! End-to-end smoke test for Scenario 2 (dot product): `for i in 0..N { s
//! += x[i]*y[i]; }`.
//!
//! Exercises `reconstruct::reduction::detect_reductions`: the scalar
//! accumulator `s` is read and written every iteration at the same
//! (loop-invariant) address, so it should fold into an `Accum` `Phi` inside
//! the loop plus a `Join` `Phi` hoisted out to the top level alongside the
//! relocated final store. See `pipeline_elementwise.rs` for the
//! no-dependencies case.

mod common;

use cranelift_entity::EntityRef;
use polysched::ir::{ArrayId, Cache, Compute, ComputeKind, NodeId, Opcode, ValueId};
use polysched::{deps::Dependencies, Config, Stats};

#[test]
fn dot_product_folds_into_accum_and_join_phis() {
    let mut cache = Cache::new();
    let mut deps = Dependencies::new();
    let mut stats = Stats::new();
    let config = Config::default();

    let loop_handle = common::push_flat_loop(&mut cache, 64);

    let x = ArrayId::new(0);
    let y = ArrayId::new(1);
    let s = ArrayId::new(2);

    let x_load = common::push_1d_addr(&mut cache, x, loop_handle, false, 1, 0, 0);
    let y_load = common::push_1d_addr(&mut cache, y, loop_handle, false, 1, 0, 1);
    let s_load = common::push_scalar_addr(&mut cache, s, loop_handle, false, 2);
    let s_store = common::push_scalar_addr(&mut cache, s, loop_handle, true, 3);

    // One opaque "value produced" compute per load.
    let x_val = cache.push_compute(Compute::new(Opcode::Opaque, ComputeKind::Op));
    let y_val = cache.push_compute(Compute::new(Opcode::Opaque, ComputeKind::Op));
    let s_val = cache.push_compute(Compute::new(Opcode::Opaque, ComputeKind::Op));
    cache.addrs[x_load].load_value = Some(x_val);
    cache.addrs[y_load].load_value = Some(y_val);
    cache.addrs[s_load].load_value = Some(s_val);

    // mul = x[i] * y[i]; add = s + mul.
    let mut mul = Compute::new(Opcode::Mul, ComputeKind::Op);
    mul.push_operand(x_val);
    mul.push_operand(y_val);
    let mul_id = cache.push_compute(mul);

    let mut add = Compute::new(Opcode::Add, ComputeKind::Op);
    add.fast_math_flags.allow_reassoc = true;
    add.push_operand(s_val);
    add.push_operand(mul_id);
    let add_id = cache.push_compute(add);

    // `s_val`'s only consumer is the accumulating add: safe to fold.
    cache.computes[s_val].users.push(add_id);

    cache.addrs[s_store].stored_value = Some(ValueId::Compute(add_id));

    // Distinct arrays: no dependence edges needed between the three.
    for (a, b) in [(x_load, y_load), (x_load, s_load), (y_load, s_load), (x_load, s_store), (y_load, s_store)] {
        assert!(deps.check(&mut cache, a, b, &mut stats).is_empty());
    }

    let program = polysched::optimize(&mut cache, &mut deps, &config, &mut stats, &[s_store]);

    assert_eq!(program.roots.len(), 1);
    let root = program.roots[0];
    let root_ir = &cache.loop_irs[root];

    assert_eq!(root_ir.legality.unordered_reduction_count, 1, "the reassociable add folds into one unordered reduction");
    assert_eq!(root_ir.legality.ordered_reduction_count, 0);
    assert!(root_ir.legality.reorderable);

    // The accum phi lives inside the loop body; the join phi and the
    // relocated store were hoisted to the top level (no enclosing loop).
    let accum_phis: Vec<_> = cache
        .phis
        .keys()
        .filter(|&pid| cache.phis[pid].loop_ir == root && matches!(cache.phis[pid].kind, polysched::ir::PhiKind::Accum))
        .collect();
    assert_eq!(accum_phis.len(), 1, "exactly one accum phi for the folded accumulator");

    assert_eq!(program.top_level.len(), 2, "join phi + relocated store");
    assert!(matches!(program.top_level[0], NodeId::Phi(_)), "join phi comes first");
    match program.top_level[1] {
        NodeId::Addr(id) => {
            assert_eq!(id, s_store);
            assert!(matches!(cache.addrs[id].stored_value, Some(ValueId::Phi(_))), "store now reads the join phi's value");
        }
        other => panic!("expected the relocated store, got {other:?}"),
    }

    // The original in-loop load of `s` was folded away, replaced by the
    // accum phi; it should no longer be a live (non-dropped) address.
    assert!(cache.addrs[s_load].dropped);
}
