//! Hermite normal form of an integer matrix, computed column-by-column via
//! elementary row operations (swap, negate, subtract-integer-multiple).
//!
//! `DepPoly::dependence` uses this to decide whether an equality subsystem
//! (the "must access the same element" constraints) even has an integer
//! solution before handing the inequality subsystem to the simplex: a
//! system `A x = b` has an integer solution iff, after reducing `A` to HNF
//! `H`, `b` is in the integer column span of `H` (checked by back-substitution
//! since `H` is lower triangular).

use super::{gcd, Matrix};

/// Result of reducing `m` to (row-style) Hermite normal form: `h = u * m`
/// where `u` is unimodular, `h` lower-triangular with non-negative pivots,
/// and entries above each pivot's row reduced modulo the pivot.
pub struct HnfResult {
    pub h: Matrix,
    /// The unimodular transform applied to reach `h` from the input, needed
    /// by callers that must also transform a right-hand side vector.
    pub u: Matrix,
}

/// Compute the Hermite normal form of `m` by row reduction.
///
/// This is the textbook algorithm: process columns left to right; within
/// each column, repeatedly pick the row (at or below the current pivot row)
/// with the smallest nonzero absolute entry and subtract integer multiples
/// of it from every other candidate row, like an integer Euclidean
/// algorithm carried out across rows instead of within one.
pub fn hermite_normal_form(m: &Matrix) -> HnfResult {
    let rows = m.rows();
    let cols = m.cols();
    let mut h = m.clone();
    let mut u = identity(rows);

    let mut pivot_row = 0;
    for col in 0..cols {
        if pivot_row >= rows {
            break;
        }
        loop {
            // Find the row in [pivot_row, rows) with the smallest nonzero
            // absolute value in this column.
            let mut best: Option<usize> = None;
            for r in pivot_row..rows {
                let v = h[(r, col)];
                if v != 0 && (best.is_none() || v.abs() < h[(best.unwrap(), col)].abs()) {
                    best = Some(r);
                }
            }
            let Some(best_row) = best else {
                // Column is entirely zero at/below pivot_row; move on.
                break;
            };
            if best_row != pivot_row {
                swap_rows(&mut h, &mut u, pivot_row, best_row);
            }
            let pivot_val = h[(pivot_row, col)];
            let mut all_reduced = true;
            for r in (pivot_row + 1)..rows {
                let v = h[(r, col)];
                if v != 0 {
                    let k = v.div_euclid(pivot_val);
                    subtract_row_multiple(&mut h, &mut u, r, pivot_row, k);
                    if h[(r, col)] != 0 {
                        all_reduced = false;
                    }
                }
            }
            if all_reduced {
                break;
            }
        }
        if h[(pivot_row, col)] != 0 {
            if h[(pivot_row, col)] < 0 {
                negate_row(&mut h, &mut u, pivot_row);
            }
            // Reduce entries above the pivot modulo the pivot, the
            // canonical-form requirement of HNF.
            let pivot_val = h[(pivot_row, col)];
            for r in 0..pivot_row {
                let v = h[(r, col)];
                let k = v.div_euclid(pivot_val);
                if k != 0 {
                    subtract_row_multiple(&mut h, &mut u, r, pivot_row, k);
                }
            }
            pivot_row += 1;
        }
    }

    HnfResult { h, u }
}

fn identity(n: usize) -> Matrix {
    let mut m = Matrix::zeros(n, n);
    for i in 0..n {
        m[(i, i)] = 1;
    }
    m
}

fn swap_rows(h: &mut Matrix, u: &mut Matrix, a: usize, b: usize) {
    for c in 0..h.cols() {
        let (x, y) = (h[(a, c)], h[(b, c)]);
        h[(a, c)] = y;
        h[(b, c)] = x;
    }
    for c in 0..u.cols() {
        let (x, y) = (u[(a, c)], u[(b, c)]);
        u[(a, c)] = y;
        u[(b, c)] = x;
    }
}

fn negate_row(h: &mut Matrix, u: &mut Matrix, r: usize) {
    for c in 0..h.cols() {
        h[(r, c)] = -h[(r, c)];
    }
    for c in 0..u.cols() {
        u[(r, c)] = -u[(r, c)];
    }
}

/// `row[dst] -= k * row[src]`, applied to both `h` and the accumulated
/// transform `u` so the two stay in lock-step.
fn subtract_row_multiple(h: &mut Matrix, u: &mut Matrix, dst: usize, src: usize, k: i64) {
    if k == 0 {
        return;
    }
    for c in 0..h.cols() {
        let s = h[(src, c)];
        h[(dst, c)] -= k * s;
    }
    for c in 0..u.cols() {
        let s = u[(src, c)];
        u[(dst, c)] -= k * s;
    }
}

/// GCD of an entire matrix's entries, 0 if the matrix is all zero.
pub fn matrix_gcd(m: &Matrix) -> i64 {
    m.iter_rows()
        .flat_map(|r| r.iter().copied())
        .fold(0i64, gcd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduces_to_lower_triangular() {
        let m = Matrix::from_rows(&[vec![2, 3], vec![4, 6]]);
        let HnfResult { h, .. } = hermite_normal_form(&m);
        // Second row is a multiple of the first, so HNF collapses it to 0.
        assert!(h.row(1).iter().all(|&x| x == 0) || h.row(0).iter().all(|&x| x == 0));
    }

    #[test]
    fn identity_matrix_is_its_own_hnf() {
        let m = identity(3);
        let HnfResult { h, u } = hermite_normal_form(&m);
        assert_eq!(h, identity(3));
        assert_eq!(u, identity(3));
    }
}
