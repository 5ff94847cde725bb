//! An exact-rational simplex tableau, shared by the symbolic comparator's
//! Farkas-multiplier feasibility queries and the LP block's omni-simplex
//! (`solve_lexmin` below is what the latter actually calls to decode Φ/ω).
//!
//! No floating point anywhere in this crate's numeric core: every pivot is
//! `num_rational::Ratio<i64>` arithmetic, so a lex-min result can be decoded
//! back to exact integers (after clearing a shared denominator) rather than
//! accumulating rounding error across thousands of pivots in a large nest.
//!
//! Grounded on the "reusable scratch tableau" shape of
//! `cranelift-codegen::regalloc::context::Context`: a `Tableau` is built once
//! per query and its storage (rows as `Vec<Vec<Ratio<i64>>>`) is the only
//! allocation, so repeated queries against small systems (as `prune_bounds`
//! issues, one per candidate row) stay cheap.

use num_rational::Ratio;
use num_traits::{One, Zero};

use crate::stats::Stats;

type R = Ratio<i64>;

/// Outcome of a simplex solve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimplexOutcome {
    Feasible,
    Infeasible,
}

/// A standard-form tableau: `num_vars` structural variables (>= 0), plus one
/// synthetic variable per row added internally during phase 1. Rows encode
/// `A x <= b` after converting equalities/`>=` rows to slack form by the
/// caller; this tableau only ever runs phase-1 feasibility plus lexicographic
/// minimization of the structural variables in column order, which is all
/// the comparator and LP block need (neither needs a true objective row).
#[derive(Clone, Debug)]
pub struct Tableau {
    /// `rows[i]` has length `num_vars + 1`; column 0 is the constant term,
    /// columns `1..=num_vars` are the structural variable coefficients.
    /// Row semantics: `constant + coeffs . x >= 0`.
    rows: Vec<Vec<R>>,
    num_vars: usize,
}

impl Tableau {
    pub fn new(num_vars: usize) -> Self {
        Tableau {
            rows: Vec::new(),
            num_vars,
        }
    }

    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Add a row `constant + coeffs . x >= 0`. `coeffs.len()` must equal
    /// `num_vars`.
    pub fn add_ge_row(&mut self, constant: i64, coeffs: &[i64]) {
        debug_assert_eq!(coeffs.len(), self.num_vars);
        let mut row = Vec::with_capacity(self.num_vars + 1);
        row.push(Ratio::from_integer(constant));
        row.extend(coeffs.iter().map(|&c| Ratio::from_integer(c)));
        self.rows.push(row);
    }

    /// Add an equality row as two inequality rows (`>= 0` and `<= 0`, i.e.
    /// negated `>= 0`), the standard trick for expressing `= 0` in a
    /// `>=`-only tableau: one row per original inequality plus two rows per
    /// equality.
    pub fn add_eq_row(&mut self, constant: i64, coeffs: &[i64]) {
        self.add_ge_row(constant, coeffs);
        let neg_coeffs: Vec<i64> = coeffs.iter().map(|&c| -c).collect();
        self.add_ge_row(-constant, &neg_coeffs);
    }

    /// Phase-1 feasibility: is there an `x >= 0` (variables are implicitly
    /// nonnegative; callers that need a free variable split it into a
    /// difference of two nonnegative variables before calling this) with
    /// every row's value `>= 0`?
    ///
    /// This runs a standard Big-M-free two-phase simplex: introduce one
    /// artificial variable per currently-violated row, minimize their sum,
    /// and report feasibility depending on whether that minimum reaches
    /// zero. Small systems only (comparator queries, per-depth LP blocks),
    /// so a textbook dense tableau is adequate; no need for a revised
    /// simplex or sparse pivoting.
    pub fn solve_feasibility(&self, stats: &mut Stats) -> SimplexOutcome {
        let nv = self.num_vars;
        let nr = self.rows.len();
        if nr == 0 {
            return SimplexOutcome::Feasible;
        }

        // Working tableau columns: [rhs, x_1..x_nv, s_1..s_nr, a_1..a_nr].
        // Row i is the equality `coeffs_i . x - s_i + a_i = rhs_i`, derived
        // from the original `constant_i + coeffs_i . x >= 0` by setting
        // `rhs_i = -constant_i` and `s_i = coeffs_i . x - rhs_i >= 0`; if
        // that leaves `rhs_i < 0` the whole row is negated first so the
        // artificial can start in the basis with a nonnegative value.
        let width = 1 + nv + nr + nr;
        let mut t: Vec<Vec<R>> = Vec::with_capacity(nr);
        for (i, row) in self.rows.iter().enumerate() {
            let mut r = vec![Ratio::zero(); width];
            let rhs = -row[0];
            let flip = rhs < Ratio::zero();
            let sign = if flip { -Ratio::one() } else { Ratio::one() };
            r[0] = sign * rhs;
            for j in 0..nv {
                r[1 + j] = sign * row[1 + j];
            }
            r[1 + nv + i] = -sign; // slack coefficient
            r[1 + nv + nr + i] = Ratio::one(); // artificial coefficient
            t.push(r);
        }

        // Objective row: minimize sum of artificials == maximize -(sum).
        let mut obj = vec![Ratio::zero(); width];
        for i in 0..nr {
            obj[1 + nv + nr + i] = Ratio::one();
        }
        // Reduce objective row against the initial basis (all artificials).
        for row in &t {
            for (o, v) in obj.iter_mut().zip(row.iter()) {
                *o -= *v;
            }
        }

        let mut basis: Vec<usize> = (0..nr).map(|i| 1 + nv + nr + i).collect();

        loop {
            stats.simplex_pivots += 1;
            // Find entering column: most negative reduced cost among
            // structural + artificial columns (Bland's rule by lowest
            // index on ties to guarantee termination).
            let mut enter: Option<usize> = None;
            for c in 1..width {
                if obj[c] < Ratio::zero() {
                    enter = Some(c);
                    break;
                }
            }
            let Some(enter) = enter else {
                break;
            };

            let Some(leave) = ratio_test(&t, enter) else {
                // Unbounded; cannot happen for a feasibility objective
                // bounded below by zero, but guard anyway.
                return SimplexOutcome::Infeasible;
            };

            pivot(&mut t, &mut obj, leave, enter);
            basis[leave] = enter;
        }

        let artificial_sum: R = basis
            .iter()
            .enumerate()
            .filter(|(_, &b)| b >= 1 + nv + nr)
            .map(|(i, _)| t[i][0])
            .fold(Ratio::zero(), |a, b| a + b);

        if artificial_sum.is_zero() {
            SimplexOutcome::Feasible
        } else {
            SimplexOutcome::Infeasible
        }
    }

    /// Minimize `objective . x` (structural variables, implicitly `>= 0`)
    /// subject to this tableau's rows. Returns the full structural-variable
    /// assignment at the optimum, or `None` if infeasible. A column whose
    /// objective coefficient is zero is free to land anywhere on the optimal
    /// face; which value it takes is resolved by whichever basis phase 1
    /// happens to leave it in, same as `solve_feasibility`'s Bland's-rule
    /// tie-breaking.
    fn minimize(&self, objective: &[R], stats: &mut Stats) -> Option<Vec<R>> {
        let nv = self.num_vars;
        let nr = self.rows.len();
        if nr == 0 {
            return Some(vec![R::zero(); nv]);
        }

        let width = 1 + nv + nr + nr;
        let mut t: Vec<Vec<R>> = Vec::with_capacity(nr);
        for row in &self.rows {
            let mut r = vec![R::zero(); width];
            let rhs = -row[0];
            let flip = rhs < R::zero();
            let sign = if flip { -R::one() } else { R::one() };
            r[0] = sign * rhs;
            for j in 0..nv {
                r[1 + j] = sign * row[1 + j];
            }
            r[1 + nv + t.len()] = -sign;
            r[1 + nv + nr + t.len()] = R::one();
            t.push(r);
        }

        let mut obj = vec![R::zero(); width];
        for i in 0..nr {
            obj[1 + nv + nr + i] = R::one();
        }
        for row in &t {
            for (o, v) in obj.iter_mut().zip(row.iter()) {
                *o -= *v;
            }
        }

        let mut basis: Vec<usize> = (0..nr).map(|i| 1 + nv + nr + i).collect();

        // Phase 1: drive the artificial-variable sum to zero, exactly as
        // `solve_feasibility` does.
        loop {
            stats.simplex_pivots += 1;
            let Some(enter) = (1..width).find(|&c| obj[c] < R::zero()) else {
                break;
            };
            let Some(leave) = ratio_test(&t, enter) else {
                return None;
            };
            pivot(&mut t, &mut obj, leave, enter);
            basis[leave] = enter;
        }

        let artificial_sum: R = basis
            .iter()
            .enumerate()
            .filter(|(_, &b)| b >= 1 + nv + nr)
            .map(|(i, _)| t[i][0])
            .fold(R::zero(), |a, b| a + b);
        if !artificial_sum.is_zero() {
            return None;
        }

        // Drive out any artificial still basic at a degenerate zero level so
        // phase 2 never has an artificial column available to (re-)enter.
        for i in 0..nr {
            if basis[i] >= 1 + nv + nr {
                if let Some(c) = (1..1 + nv + nr).find(|&c| t[i][c] != R::zero()) {
                    pivot(&mut t, &mut obj, i, c);
                    basis[i] = c;
                }
            }
        }

        // Phase 2: minimize the real objective over structural + slack
        // columns only (artificials are excluded from re-entering).
        let mut obj2 = vec![R::zero(); width];
        obj2[1..=nv].copy_from_slice(objective);
        for (i, &b) in basis.iter().enumerate() {
            if b < width && obj2[b] != R::zero() {
                let factor = obj2[b];
                for (o, v) in obj2.iter_mut().zip(t[i].iter()) {
                    *o -= factor * v;
                }
            }
        }

        const MAX_PHASE2_PIVOTS: usize = 10_000;
        for _ in 0..MAX_PHASE2_PIVOTS {
            stats.simplex_pivots += 1;
            let Some(enter) = (1..(1 + nv + nr)).find(|&c| obj2[c] < R::zero()) else {
                let mut solution = vec![R::zero(); nv];
                for (i, &b) in basis.iter().enumerate() {
                    if (1..=nv).contains(&b) {
                        solution[b - 1] = t[i][0];
                    }
                }
                return Some(solution);
            };
            let Some(leave) = ratio_test(&t, enter) else {
                // Unbounded: every structural column this crate ever hands
                // `minimize` is boxed in by the independence-solution rows
                // (see `lp_block::independence_row`), so an unbounded
                // direction means the caller's system is malformed rather
                // than genuinely optimizable; report it the same way as
                // infeasibility so the caller falls back to graph-splitting.
                return None;
            };
            pivot(&mut t, &mut obj2, leave, enter);
            basis[leave] = enter;
        }
        None
    }

    /// Lexicographically minimize the structural variables named by
    /// `priority`, in that order: first find the minimum of `priority[0]`,
    /// fix it there with an exact equality, then minimize `priority[1]`
    /// subject to that fix, and so on. Returns every structural variable's
    /// value at the resulting lexicographic optimum (not just the
    /// prioritized ones — columns never named in `priority` take whatever
    /// value the final feasible basis leaves them at), or `None` if the
    /// system is infeasible. This is the decode step the omni-simplex
    /// construction calls for: rather than an arbitrary feasible point, the
    /// result favors the earliest-prioritized columns being as small as
    /// possible.
    pub fn solve_lexmin(&self, priority: &[usize], stats: &mut Stats) -> Option<Vec<R>> {
        let nv = self.num_vars;
        let mut rows = self.rows.clone();

        for &col in priority {
            debug_assert!(col < nv);
            let probe = Tableau {
                rows: rows.clone(),
                num_vars: nv,
            };
            let mut objective = vec![R::zero(); nv];
            objective[col] = R::one();
            let solution = probe.minimize(&objective, stats)?;
            let value = solution[col];

            // Fix this column at its optimum for every later round, as an
            // exact (possibly fractional) equality: `var[col] = value`.
            let mut coeffs = vec![R::zero(); nv];
            coeffs[col] = R::one();
            let mut pos = vec![R::zero(); 1 + nv];
            pos[0] = -value;
            pos[1..].copy_from_slice(&coeffs);
            let mut neg = pos.clone();
            for v in neg.iter_mut() {
                *v = -*v;
            }
            rows.push(pos);
            rows.push(neg);
        }

        let probe = Tableau {
            rows,
            num_vars: nv,
        };
        probe.minimize(&vec![R::zero(); nv], stats)
    }
}

/// Bland's-rule ratio test: the row whose current value divided by its
/// `enter`-column coefficient is smallest among rows with a positive
/// coefficient there, or `None` if no such row exists (unbounded).
fn ratio_test(t: &[Vec<R>], enter: usize) -> Option<usize> {
    let mut leave = None;
    let mut best_ratio: Option<R> = None;
    for (i, row) in t.iter().enumerate() {
        if row[enter] > R::zero() {
            let ratio = row[0] / row[enter];
            if best_ratio.is_none() || ratio < best_ratio.unwrap() {
                best_ratio = Some(ratio);
                leave = Some(i);
            }
        }
    }
    leave
}

fn pivot(t: &mut [Vec<R>], obj: &mut [R], prow: usize, pcol: usize) {
    let pivot_val = t[prow][pcol];
    for x in t[prow].iter_mut() {
        *x /= pivot_val;
    }
    let prow_snapshot = t[prow].clone();
    for (i, row) in t.iter_mut().enumerate() {
        if i == prow {
            continue;
        }
        let factor = row[pcol];
        if factor != Ratio::zero() {
            for (x, p) in row.iter_mut().zip(prow_snapshot.iter()) {
                *x -= factor * p;
            }
        }
    }
    let factor = obj[pcol];
    if factor != Ratio::zero() {
        for (x, p) in obj.iter_mut().zip(prow_snapshot.iter()) {
            *x -= factor * p;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trivially_feasible_system() {
        let mut t = Tableau::new(1);
        t.add_ge_row(5, &[1]); // 5 + x >= 0, x >= 0 implicit
        let mut stats = Stats::new();
        assert_eq!(t.solve_feasibility(&mut stats), SimplexOutcome::Feasible);
    }

    #[test]
    fn infeasible_system() {
        let mut t = Tableau::new(1);
        // x <= -1 and x >= 0 (implicit) is infeasible.
        t.add_ge_row(-1, &[-1]); // -1 - x >= 0  =>  x <= -1
        let mut stats = Stats::new();
        assert_eq!(t.solve_feasibility(&mut stats), SimplexOutcome::Infeasible);
    }

    #[test]
    fn equality_row_is_feasible_at_matching_point() {
        let mut t = Tableau::new(2);
        t.add_eq_row(0, &[1, -1]); // x0 - x1 = 0
        t.add_ge_row(3, &[-1, 0]); // x0 <= 3
        let mut stats = Stats::new();
        assert_eq!(t.solve_feasibility(&mut stats), SimplexOutcome::Feasible);
    }
}
