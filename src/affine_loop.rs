//! Per-loop iteration polyhedron with dynamic symbols.
//!
//! Named `AffineLoop` rather than `Loop` to avoid the keyword. `A` is a
//! [`crate::linalg::Matrix`]
//! laid out `[1, dyn_syms, loop-vars]` per row, one row per inequality
//! `a0 + sum(aj*sj) + sum(bk*ik) >= 0`.

use crate::bitset::LoopMask;
use crate::comparator::Comparator;
use crate::config::{Config, DYN_LOOP_EST};
use crate::host::{AffineExpr, BackedgeCount, CouldNotCompute};
use crate::linalg::{self, Matrix};
use crate::stats::Stats;
use crate::symbol::Symbol;

/// An iteration-space polyhedron for a (possibly multi-level) loop nest.
#[derive(Clone, Debug)]
pub struct AffineLoop {
    /// Depth of this nest (number of loop-variable columns in `a`).
    num_loops: usize,
    /// The original depth before any peeling, kept so `remove_outer_most`
    /// is idempotent.
    original_num_loops: usize,
    dyn_syms: Vec<Symbol>,
    a: Matrix,
    /// If true, `i_k >= 0` holds implicitly for every loop variable; the
    /// comparator used by `prune_bounds` is built accordingly.
    non_negative: bool,
}

impl AffineLoop {
    /// Number of explicit columns before the loop-variable block:
    /// the constant column plus one per dynamic symbol.
    fn var_offset(&self) -> usize {
        1 + self.dyn_syms.len()
    }

    pub fn num_loops(&self) -> usize {
        self.num_loops
    }

    pub fn dyn_syms(&self) -> &[Symbol] {
        &self.dyn_syms
    }

    pub fn is_non_negative(&self) -> bool {
        self.non_negative
    }

    pub fn constraints(&self) -> &Matrix {
        &self.a
    }

    /// Build an `AffineLoop` directly from a pre-built constraint matrix;
    /// used by tests and by `DepPoly`, which stacks two loops' matrices
    /// diagonally without going through `construct`.
    pub fn from_matrix(num_loops: usize, dyn_syms: Vec<Symbol>, a: Matrix, non_negative: bool) -> Self {
        AffineLoop {
            num_loops,
            original_num_loops: num_loops,
            dyn_syms,
            a,
            non_negative,
        }
    }

    /// Walk an affine representation of a source loop's trip count,
    /// decomposing it into `{constant, dynamic-symbol-with-coefficient}`
    /// contributions via the host's [`BackedgeCount`] oracle.
    ///
    /// Returns `Ok(loop)` on full success, or `Err(reject_depth)` — the
    /// number of outermost levels that could not be affinely represented
    /// and must be peeled by the caller into dynamic symbols instead.
    pub fn construct<H, S>(host: &H, source_loops: &[S], config: &Config) -> Result<AffineLoop, usize>
    where
        H: BackedgeCount<S>,
    {
        let mut dyn_syms: Vec<Symbol> = Vec::new();
        let mut bounds: Vec<(i64, Vec<i64>)> = Vec::new(); // (constant, per-symbol coeffs), one per loop level
        let mut reject_depth = 0;

        for (depth, src) in source_loops.iter().enumerate() {
            if depth >= config.max_depth {
                break;
            }
            match host.backedge_count(src) {
                Ok(expr) => {
                    let mut coeffs = vec![0i64; dyn_syms.len()];
                    for (sym, coeff) in &expr.terms {
                        let idx = dyn_syms.iter().position(|s| s == sym).unwrap_or_else(|| {
                            dyn_syms.push(*sym);
                            coeffs.push(0);
                            dyn_syms.len() - 1
                        });
                        coeffs[idx] += *coeff;
                    }
                    bounds.push((expr.constant, coeffs));
                }
                Err(CouldNotCompute) => {
                    reject_depth = depth + 1;
                    break;
                }
            }
        }

        if bounds.is_empty() {
            return Err(source_loops.len().min(config.max_depth).max(reject_depth));
        }

        let num_loops = bounds.len();
        let num_dyn = dyn_syms.len();
        let cols = 1 + num_dyn + num_loops;
        let mut rows: Vec<Vec<i64>> = Vec::new();

        for (k, (constant, coeffs)) in bounds.iter().enumerate() {
            // Lower bound: i_k >= 0 (implicit, non_negative = true below).
            // Upper bound: i_k <= constant + sum(coeff * sym) - 1, i.e.
            // (constant - 1) + sum(coeff*sym) - i_k >= 0.
            let mut row = vec![0i64; cols];
            row[0] = constant - 1;
            for (j, &c) in coeffs.iter().enumerate() {
                row[1 + j] = c;
            }
            row[1 + num_dyn + k] = -1;
            rows.push(row);
        }

        let a = Matrix::from_rows(&rows);
        if reject_depth > 0 {
            return Err(reject_depth);
        }
        Ok(AffineLoop {
            num_loops,
            original_num_loops: num_loops,
            dyn_syms,
            a,
            non_negative: true,
        })
    }

    /// Produce a new `AffineLoop` whose constraint matrix is
    /// `A . [I 0; 0 R]` with a translation by `offset`, for a unimodular
    /// `r` restricted to the loop-variable columns.
    ///
    /// `offset[k]` is subtracted from loop variable `k`'s column before the
    /// rotation is applied. Non-negativity of the rotated loop is only
    /// preserved when `r`
    /// is elementwise non-negative; otherwise this inserts explicit
    /// `i_k >= 0` rows so later passes see them uniformly.
    pub fn rotate(&self, r: &Matrix, offset: &[i64]) -> AffineLoop {
        debug_assert_eq!(r.rows(), self.num_loops);
        debug_assert_eq!(r.cols(), self.num_loops);
        debug_assert_eq!(offset.len(), self.num_loops);

        let var_off = self.var_offset();
        let mut out_rows = Vec::with_capacity(self.a.rows());
        for row in self.a.iter_rows() {
            let mut new_row = row.to_vec();
            // Substitute i_k = offset[k] + sum_j R[j][k] * i'_j: first fold
            // the offset into the constant column, then remap loop-var
            // coefficients through R.
            let old_vars = &row[var_off..];
            let mut constant_delta = 0i64;
            for (k, &old_coeff) in old_vars.iter().enumerate() {
                constant_delta += old_coeff * offset[k];
            }
            new_row[0] += constant_delta;

            let mut new_vars = vec![0i64; self.num_loops];
            for j in 0..self.num_loops {
                let mut acc = 0i64;
                for k in 0..self.num_loops {
                    acc += old_vars[k] * r[(k, j)];
                }
                new_vars[j] = acc;
            }
            new_row[var_off..].copy_from_slice(&new_vars);
            out_rows.push(new_row);
        }

        let r_nonneg = (0..self.num_loops).all(|i| (0..self.num_loops).all(|j| r[(i, j)] >= 0));
        let mut a = Matrix::from_rows(&out_rows);
        let non_negative = self.non_negative && r_nonneg;
        if self.non_negative && !r_nonneg {
            for k in 0..self.num_loops {
                let mut row = vec![0i64; a.cols()];
                row[var_off + k] = 1;
                a.push_row(&row);
            }
        }

        AffineLoop {
            num_loops: self.num_loops,
            original_num_loops: self.original_num_loops,
            dyn_syms: self.dyn_syms.clone(),
            a,
            non_negative,
        }
    }

    /// Convert the `k` outermost loops into dynamic symbols. Idempotent:
    /// calling this twice with the cumulative total equals calling it once,
    /// since symbols are tracked against `original_num_loops` rather than
    /// the current (possibly already-peeled) depth.
    pub fn remove_outer_most(&self, k: usize, next_symbol: &mut impl FnMut() -> Symbol) -> AffineLoop {
        let k = k.min(self.num_loops);
        if k == 0 {
            return self.clone();
        }

        let var_off = self.var_offset();
        let new_syms: Vec<Symbol> = (0..k).map(|_| next_symbol()).collect();
        let mut dyn_syms = self.dyn_syms.clone();
        dyn_syms.extend(new_syms.iter().copied());

        // Every row's coefficient on the peeled loop variables becomes a
        // coefficient on the corresponding new symbol instead; remaining
        // loop-variable columns shift left by `k`.
        let mut out_rows = Vec::with_capacity(self.a.rows());
        for row in self.a.iter_rows() {
            let mut new_row = Vec::with_capacity(row.len());
            new_row.extend_from_slice(&row[..var_off]);
            new_row.extend(vec![0i64; k]); // new symbol columns, filled below
            new_row.extend_from_slice(&row[var_off + k..]);
            for peeled in 0..k {
                new_row[var_off + peeled] = row[var_off + peeled];
            }
            out_rows.push(new_row);
        }

        AffineLoop {
            num_loops: self.num_loops - k,
            original_num_loops: self.original_num_loops,
            dyn_syms,
            a: Matrix::from_rows(&out_rows),
            non_negative: self.non_negative,
        }
    }

    /// Fourier–Motzkin eliminate loop variable `v` (0-based, outermost
    /// first), dropping one loop level entirely.
    pub fn remove_loop(&self, v: usize) -> AffineLoop {
        debug_assert!(v < self.num_loops);
        let col = self.var_offset() + v;
        let a = linalg::fourier_motzkin_eliminate(&self.a, col);
        AffineLoop {
            num_loops: self.num_loops - 1,
            original_num_loops: self.original_num_loops.saturating_sub(1),
            dyn_syms: self.dyn_syms.clone(),
            a,
            non_negative: self.non_negative,
        }
    }

    /// Repeatedly ask the comparator whether any inequality row is implied
    /// by the others (plus the implicit `i_k >= 0` rows); drop such rows.
    /// Also normalizes equality-looking rows (gcd of nonconstant coeffs
    /// divides the constant exactly) by dividing through by their gcd.
    pub fn prune_bounds(&mut self, stats: &mut Stats) {
        loop {
            let comparator = self.build_comparator();
            let redundant = (0..self.a.rows()).find(|&i| comparator.row_is_redundant(i, stats));
            let Some(idx) = redundant else { break };
            self.a.remove_row(idx);
        }

        for r in 0..self.a.rows() {
            let g = linalg::row_gcd(self.a.row(r));
            if g > 1 {
                for c in 0..self.a.cols() {
                    self.a[(r, c)] /= g;
                }
            }
        }
    }

    fn build_comparator(&self) -> Comparator {
        let nvars = self.dyn_syms.len() + self.num_loops;
        let mut c = Comparator::new(nvars, self.non_negative);
        for row in self.a.iter_rows() {
            c.add_inequality(row.to_vec());
        }
        c
    }

    /// `(exact, value)`: exact iff there is exactly one lower and one upper
    /// bound on `depth`'s variable both depending only on that variable
    /// (and dynamic symbols, not other loop variables); otherwise
    /// `value = DYN_LOOP_EST`.
    pub fn trip_count(&self, depth: usize) -> (bool, u64) {
        debug_assert!(depth < self.num_loops);
        let var_off = self.var_offset();
        let col = var_off + depth;

        let mut lower: Option<&[i64]> = None;
        let mut upper: Option<&[i64]> = None;
        let mut exact = true;

        for row in self.a.iter_rows() {
            let coeff = row[col];
            if coeff == 0 {
                continue;
            }
            // A row only depending on this loop's own variable (among the
            // loop-variable columns) qualifies as a candidate bound.
            let other_loop_vars_zero = (0..self.num_loops)
                .filter(|&k| k != depth)
                .all(|k| row[var_off + k] == 0);
            if !other_loop_vars_zero {
                exact = false;
                continue;
            }
            if coeff > 0 {
                if lower.is_some() {
                    exact = false;
                }
                lower = Some(row);
            } else {
                if upper.is_some() {
                    exact = false;
                }
                upper = Some(row);
            }
        }

        match (lower, upper, exact) {
            (Some(lo), Some(hi), true) => {
                // lo: coeff_lo * i + rest_lo >= 0  =>  i >= -rest_lo/coeff_lo
                // hi: coeff_hi * i + rest_hi >= 0, coeff_hi < 0
                //     => i <= rest_hi / (-coeff_hi)
                // All dynamic-symbol coefficients must be zero for a purely
                // numeric trip count; if any remain this is still "exact"
                // in shape but the value is symbolic, so fall back.
                let lo_has_syms = lo[1..var_off].iter().any(|&c| c != 0);
                let hi_has_syms = hi[1..var_off].iter().any(|&c| c != 0);
                if lo_has_syms || hi_has_syms {
                    (true, DYN_LOOP_EST)
                } else {
                    let coeff_lo = lo[col];
                    let lo_bound = -lo[0] as f64 / coeff_lo as f64;
                    let coeff_hi = -hi[col];
                    let hi_bound = hi[0] as f64 / coeff_hi as f64;
                    let count = (hi_bound.floor() - lo_bound.ceil() + 1.0).max(0.0);
                    (true, count as u64)
                }
            }
            _ => (false, DYN_LOOP_EST),
        }
    }

    /// Does widening this loop's range at `depth` by one unit (extending the
    /// lower bound down if `extend_lower`, else the upper bound up) add any
    /// reachable new point when the rest of the nest is held fixed? Used by
    /// the LP to decide whether a fusion-boundary range extension is free.
    ///
    /// Grounded on the original `zeroExtraItersUponExtending`: find every
    /// explicit bound row on `depth`'s own variable that faces the extended
    /// direction, pin the loop variable to the one-unit-further boundary
    /// point each such row implies, and check whether that point is still
    /// reachable by the rest of the polyhedron. If every candidate boundary
    /// point is unreachable, the extension introduces no new iterations.
    pub fn zero_extra_iters_upon_extending(&self, depth: usize, extend_lower: bool, stats: &mut Stats) -> bool {
        debug_assert!(depth < self.num_loops);
        let (exact, _) = self.trip_count(depth);
        if !exact {
            return false;
        }

        let var_off = self.var_offset();
        let col = var_off + depth;

        let mut candidates: Vec<Vec<i64>> = Vec::new();
        for row in self.a.iter_rows() {
            let coeff = row[col];
            if coeff == 0 {
                continue;
            }
            let other_loop_vars_zero = (0..self.num_loops)
                .filter(|&k| k != depth)
                .all(|k| row[var_off + k] == 0);
            if !other_loop_vars_zero {
                continue;
            }
            let extends_this_bound = if extend_lower { coeff > 0 } else { coeff < 0 };
            if extends_this_bound {
                candidates.push(row.to_vec());
            }
        }

        if candidates.is_empty() {
            if extend_lower && self.non_negative {
                let mut implicit = vec![0i64; self.a.cols()];
                implicit[col] = 1;
                candidates.push(implicit);
            } else {
                // No bound faces this direction at all: extension is
                // unconstrained and cannot be assumed free.
                return false;
            }
        }

        for bound in &candidates {
            let coeff = bound[col];
            let mut point_row = bound.clone();
            point_row[0] += coeff.abs();

            let mut comparator = Comparator::new(self.dyn_syms.len() + self.num_loops, self.non_negative);
            for row in self.a.iter_rows() {
                comparator.add_inequality(row.to_vec());
            }
            comparator.add_equality(point_row);
            if !comparator.is_empty(stats) {
                return false;
            }
        }
        true
    }

    pub fn loop_mask(&self) -> LoopMask {
        let mut mask = LoopMask::default();
        for k in 0..self.num_loops {
            mask.insert(k as u8);
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_loop(n: i64) -> AffineLoop {
        // 0 <= i < n, one loop level, no dynamic symbols.
        let a = Matrix::from_rows(&[vec![n - 1, -1]]);
        AffineLoop::from_matrix(1, vec![], a, true)
    }

    #[test]
    fn trip_count_exact_for_constant_bounds() {
        let l = square_loop(10);
        let (exact, value) = l.trip_count(0);
        assert!(exact);
        assert_eq!(value, 10);
    }

    #[test]
    fn prune_bounds_removes_dominated_row() {
        let mut stats = Stats::new();
        let a = Matrix::from_rows(&[vec![5, -1], vec![10, -1]]);
        let mut l = AffineLoop::from_matrix(1, vec![], a, true);
        l.prune_bounds(&mut stats);
        assert_eq!(l.constraints().rows(), 1);
        assert_eq!(l.constraints().row(0), &[5, -1]);
    }

    #[test]
    fn peel_idempotence() {
        use cranelift_entity::EntityRef;

        let mut next_id = 0usize;
        let mut next_symbol = move || {
            let s = Symbol::new(next_id);
            next_id += 1;
            s
        };
        let a = Matrix::from_rows(&[vec![9, 0, -1], vec![9, -1, 0]]);
        let l = AffineLoop::from_matrix(2, vec![], a, true);

        let once = l.remove_outer_most(1, &mut next_symbol);
        let twice = once.remove_outer_most(1, &mut next_symbol);

        let mut next_id2 = 100usize;
        let mut next_symbol2 = move || {
            let s = Symbol::new(next_id2);
            next_id2 += 1;
            s
        };
        let direct = l.remove_outer_most(1, &mut next_symbol2);

        assert_eq!(twice.num_loops(), direct.num_loops());
        assert_eq!(twice.constraints().rows(), direct.constraints().rows());
    }
}
