//! End-to-end smoke test for the matrix-multiply scenario:
//! `for i, for j, for k { C[i,j] += A[i,k]*B[k,j]; }`.
//!
//! `C`'s load/store pair is invariant in `k` (coefficient 0 on the
//! innermost loop variable, mirroring the scalar accumulator in
//! `pipeline_reduction.rs` but over a 2-D index), so it folds into an
//! `Accum`/`Join` `Phi` pair the same way; `A` and `B` each vary in two of
//! the three loops but not the third, and touch distinct arrays, so no
//! dependence edges are needed between any of the three accesses.

mod common;

use cranelift_entity::EntityRef;
use polysched::ir::{ArrayId, Cache, Compute, ComputeKind, NodeId, Opcode, ValueId};
use polysched::{deps::Dependencies, Config, Stats};

#[test]
fn matmul_folds_into_accum_and_join_phis_over_a_three_level_nest() {
    let mut cache = Cache::new();
    let mut deps = Dependencies::new();
    let mut stats = Stats::new();
    let config = Config::default();

    // i, j, k, each trip count 8.
    let loop_handle = common::push_nested_loop(&mut cache, &[8, 8, 8]);

    let a = ArrayId::new(0);
    let b = ArrayId::new(1);
    let c = ArrayId::new(2);

    // A[i,k]: varies in loops 0 and 2, not 1.
    let a_load = common::push_nd_addr(&mut cache, a, loop_handle, false, vec![vec![1, 0, 0], vec![0, 0, 1]], vec![0, 0], vec![0, 0]);
    // B[k,j]: varies in loops 2 and 1, not 0.
    let b_load = common::push_nd_addr(&mut cache, b, loop_handle, false, vec![vec![0, 0, 1], vec![0, 1, 0]], vec![0, 0], vec![0, 1]);
    // C[i,j]: varies in loops 0 and 1, not 2 (the accumulator).
    let c_load = common::push_nd_addr(&mut cache, c, loop_handle, false, vec![vec![1, 0, 0], vec![0, 1, 0]], vec![0, 0], vec![0, 2]);
    let c_store = common::push_nd_addr(&mut cache, c, loop_handle, true, vec![vec![1, 0, 0], vec![0, 1, 0]], vec![0, 0], vec![0, 3]);

    let a_val = cache.push_compute(Compute::new(Opcode::Opaque, ComputeKind::Op));
    let b_val = cache.push_compute(Compute::new(Opcode::Opaque, ComputeKind::Op));
    let c_val = cache.push_compute(Compute::new(Opcode::Opaque, ComputeKind::Op));
    cache.addrs[a_load].load_value = Some(a_val);
    cache.addrs[b_load].load_value = Some(b_val);
    cache.addrs[c_load].load_value = Some(c_val);

    let mut mul = Compute::new(Opcode::Mul, ComputeKind::Op);
    mul.push_operand(a_val);
    mul.push_operand(b_val);
    let mul_id = cache.push_compute(mul);

    let mut add = Compute::new(Opcode::Add, ComputeKind::Op);
    add.fast_math_flags.allow_reassoc = true;
    add.push_operand(c_val);
    add.push_operand(mul_id);
    let add_id = cache.push_compute(add);

    cache.computes[c_val].users.push(add_id);
    cache.addrs[c_store].stored_value = Some(ValueId::Compute(add_id));

    // Distinct arrays: no dependence edges needed between any pair.
    for (x, y) in [(a_load, b_load), (a_load, c_load), (b_load, c_load), (a_load, c_store), (b_load, c_store)] {
        assert!(deps.check(&mut cache, x, y, &mut stats).is_empty());
    }

    let program = polysched::optimize(&mut cache, &mut deps, &config, &mut stats, &[c_store]);

    assert_eq!(program.roots.len(), 1, "A, B, and C fold into a single scheduled node / root loop nest");
    let root = program.roots[0];

    // Walk down to the innermost loop (the one carrying the accumulator).
    let mut innermost = root;
    loop {
        let children: Vec<_> = {
            let mut v = Vec::new();
            let mut cur = cache.loop_irs[innermost].child;
            while let Some(n) = cur {
                v.push(n);
                cur = polysched::ir::node::next(&cache, n);
            }
            v
        };
        match children.iter().find_map(|n| if let NodeId::LoopIr(c) = n { Some(*c) } else { None }) {
            Some(child) => innermost = child,
            None => break,
        }
    }

    let inner_legality = &cache.loop_irs[innermost].legality;
    assert_eq!(inner_legality.unordered_reduction_count, 1, "the reassociable C accumulation folds into one unordered reduction");
    assert_eq!(inner_legality.ordered_reduction_count, 0);
    assert!(inner_legality.reorderable);

    // The original in-loop load of C was folded away, replaced by the accum phi.
    assert!(cache.addrs[c_load].dropped);
}
