//! Symbolic comparator: "does `v . x >= 0` hold everywhere on this
//! polyhedron?" via the Farkas lemma dual.
//!
//! `v . x >= 0` holds on `{A x >= 0, E x = 0}` iff there exist `lambda >= 0`
//! and free `mu` with `v = lambda^T A + mu^T E`. We don't solve for
//! `lambda`/`mu` directly; instead we ask the dual question "is `{A x >= 0,
//! E x = 0, -v . x > 0}` infeasible", which is equivalent by LP duality and
//! lets us reuse the same feasibility tableau the Farkas-pair machinery
//! already needs. Strict inequality is approximated, as is standard for
//! integer polyhedra, by `-v . x >= 1`.

use crate::simplex::{SimplexOutcome, Tableau};
use crate::stats::Stats;

/// A reusable query engine over one polyhedron's inequality (`A`) and
/// equality (`E`) constraint rows, each row laid out `[1, dyn_syms, vars]`.
pub struct Comparator {
    num_vars: usize,
    a_rows: Vec<Vec<i64>>,
    e_rows: Vec<Vec<i64>>,
    /// If true, every variable is implicitly `>= 0` (the "always-nonnegative"
    /// comparator used for loops whose induction variables start at zero);
    /// this lets `is_nonneg_everywhere` skip adding an explicit row per
    /// variable since the simplex already treats structural variables as
    /// nonnegative.
    vars_nonneg: bool,
}

impl Comparator {
    pub fn new(num_vars: usize, vars_nonneg: bool) -> Self {
        Comparator {
            num_vars,
            a_rows: Vec::new(),
            e_rows: Vec::new(),
            vars_nonneg,
        }
    }

    pub fn add_inequality(&mut self, row: Vec<i64>) {
        debug_assert_eq!(row.len(), self.num_vars + 1);
        self.a_rows.push(row);
    }

    pub fn add_equality(&mut self, row: Vec<i64>) {
        debug_assert_eq!(row.len(), self.num_vars + 1);
        self.e_rows.push(row);
    }

    /// Is the polyhedron `{A x >= 0, E x = 0}` (plus `x >= 0` if
    /// `vars_nonneg`) empty?
    pub fn is_empty(&self, stats: &mut Stats) -> bool {
        let mut t = self.base_tableau();
        t.solve_feasibility(stats) == SimplexOutcome::Infeasible
    }

    /// Does `constant + coeffs . x >= 0` hold for every `x` satisfying the
    /// polyhedron's constraints? Equivalent to: the polyhedron intersected
    /// with the strict negation is empty.
    pub fn implies_ge_zero(&self, constant: i64, coeffs: &[i64], stats: &mut Stats) -> bool {
        debug_assert_eq!(coeffs.len(), self.num_vars);
        stats.comparator_queries += 1;

        let mut t = self.base_tableau();
        // Negation of `constant + coeffs.x >= 0` is `constant + coeffs.x < 0`,
        // i.e. `-constant - coeffs.x - 1 >= 0` over the integers.
        let neg_coeffs: Vec<i64> = coeffs.iter().map(|&c| -c).collect();
        t.add_ge_row(-constant - 1, &neg_coeffs);

        t.solve_feasibility(stats) == SimplexOutcome::Infeasible
    }

    /// Is row `idx` of the inequality system implied by the remaining rows
    /// (and, if `vars_nonneg`, by the implicit nonnegativity rows)? Used by
    /// `AffineLoop::prune_bounds` to drop dominated rows one at a time.
    pub fn row_is_redundant(&self, idx: usize, stats: &mut Stats) -> bool {
        let row = &self.a_rows[idx];
        let mut t = Tableau::new(self.num_vars);
        for (i, r) in self.a_rows.iter().enumerate() {
            if i != idx {
                t.add_ge_row(r[0], &r[1..]);
            }
        }
        for r in &self.e_rows {
            t.add_eq_row(r[0], &r[1..]);
        }
        let neg_coeffs: Vec<i64> = row[1..].iter().map(|&c| -c).collect();
        t.add_ge_row(-row[0] - 1, &neg_coeffs);
        t.solve_feasibility(stats) == SimplexOutcome::Infeasible
    }

    fn base_tableau(&self) -> Tableau {
        let mut t = Tableau::new(self.num_vars);
        for r in &self.a_rows {
            t.add_ge_row(r[0], &r[1..]);
        }
        for r in &self.e_rows {
            t.add_eq_row(r[0], &r[1..]);
        }
        if self.vars_nonneg {
            for j in 0..self.num_vars {
                let mut coeffs = vec![0i64; self.num_vars];
                coeffs[j] = 1;
                t.add_ge_row(0, &coeffs);
            }
        }
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_implied_bound() {
        let mut c = Comparator::new(1, true);
        // 0 <= x <= 5
        c.add_inequality(vec![5, -1]);
        let mut stats = Stats::new();
        // x <= 10 is implied by x <= 5 and x >= 0.
        assert!(c.implies_ge_zero(10, &[-1], &mut stats));
        // x <= 3 is not implied (x could be 5).
        assert!(!c.implies_ge_zero(3, &[-1], &mut stats));
    }

    #[test]
    fn detects_empty_polyhedron() {
        let mut c = Comparator::new(1, false);
        c.add_inequality(vec![-1, -1]); // -1 - x >= 0  =>  x <= -1
        c.add_inequality(vec![0, 1]); //  x >= 0
        let mut stats = Stats::new();
        assert!(c.is_empty(&mut stats));
    }

    #[test]
    fn redundant_row_detection() {
        let mut c = Comparator::new(1, true);
        c.add_inequality(vec![5, -1]); // x <= 5
        c.add_inequality(vec![10, -1]); // x <= 10, redundant given the first
        let mut stats = Stats::new();
        assert!(c.row_is_redundant(1, &mut stats));
        assert!(!c.row_is_redundant(0, &mut stats));
    }
}
