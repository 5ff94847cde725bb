//! End-to-end smoke test for the loop-carried, non-reassociable scenario:
//! `for i in 0..N { x[0] = x[0] + y[i]; z[i] = x[0]; }`.
//!
//! Unlike `pipeline_reduction.rs`'s dot product, the accumulation here has
//! `allow_reassoc = false` (so it must classify as an *ordered* reduction,
//! not an unordered one) and the per-iteration value also feeds a second
//! store (`z[i] = x[0]`), giving the loaded value more than one user — the
//! condition `reconstruct::reduction::try_insert_reduction` checks before
//! it will relocate a store past the loop. That second use is exactly "the
//! load-store pair cannot be hoisted because `z[i] = x[0]` reads the
//! intermediate value".
//!
//! This test doesn't additionally register a dependence edge between the
//! accumulator and `z`'s read of it (that would pull in the same
//! reverse-time-edge machinery `dependency_store_invariants.rs` already
//! exercises for a self-carried access), so it checks the reduction
//! classification and non-hoisting outcome but not `Legality::reorderable`.

mod common;

use cranelift_entity::EntityRef;
use polysched::ir::{ArrayId, Cache, Compute, ComputeKind, Opcode, ValueId};
use polysched::{deps::Dependencies, Config, Stats};

#[test]
fn nonreassociable_accumulator_is_an_ordered_reduction_and_stays_in_place() {
    let mut cache = Cache::new();
    let mut deps = Dependencies::new();
    let mut stats = Stats::new();
    let config = Config::default();

    let loop_handle = common::push_flat_loop(&mut cache, 64);

    let x = ArrayId::new(0);
    let y = ArrayId::new(1);

    let x_load = common::push_scalar_addr(&mut cache, x, loop_handle, false, 0);
    let y_load = common::push_1d_addr(&mut cache, y, loop_handle, false, 1, 0, 1);
    let x_store = common::push_scalar_addr(&mut cache, x, loop_handle, true, 2);

    let x_val = cache.push_compute(Compute::new(Opcode::Opaque, ComputeKind::Op));
    let y_val = cache.push_compute(Compute::new(Opcode::Opaque, ComputeKind::Op));
    cache.addrs[x_load].load_value = Some(x_val);
    cache.addrs[y_load].load_value = Some(y_val);

    let mut add = Compute::new(Opcode::Add, ComputeKind::Op);
    add.fast_math_flags.allow_reassoc = false;
    add.push_operand(x_val);
    add.push_operand(y_val);
    let add_id = cache.push_compute(add);
    cache.addrs[x_store].stored_value = Some(ValueId::Compute(add_id));

    // `x_val`'s first user is the accumulating add...
    cache.computes[x_val].users.push(add_id);
    // ...and its second is the store of `z[i] = x[0]`, modeled directly as
    // a further consumer of the same loaded value rather than a distinct
    // load address (see module doc).
    let z_read = cache.push_compute(Compute::new(Opcode::Opaque, ComputeKind::Op));
    cache.computes[x_val].users.push(z_read);

    assert!(deps.check(&mut cache, x_load, y_load, &mut stats).is_empty());

    let program = polysched::optimize(&mut cache, &mut deps, &config, &mut stats, &[x_store]);

    assert_eq!(program.roots.len(), 1);
    let root = program.roots[0];
    let root_ir = &cache.loop_irs[root];

    assert_eq!(root_ir.legality.ordered_reduction_count, 1, "a non-reassociable latch chain counts as an ordered reduction");
    assert_eq!(root_ir.legality.unordered_reduction_count, 0);

    // Relocation past the loop requires both a single-use load and a
    // loop-invariant store; the second use above blocks it, so the store
    // (renamed `x_store`) must still be a live, in-place child of the loop
    // rather than hoisted out to `top_level`.
    assert!(program.top_level.is_empty(), "the accumulator's extra consumer must prevent hoisting");
    assert!(!cache.addrs[x_store].dropped);
    let mut found_store = false;
    let mut cursor = root_ir.child;
    while let Some(node) = cursor {
        if node.as_addr() == Some(x_store) {
            found_store = true;
        }
        cursor = polysched::ir::node::next(&cache, node);
    }
    assert!(found_store, "the store stays inside the loop body instead of being relocated");
}
