//! Fourier–Motzkin elimination of a single variable from a system of
//! inequalities `A x + b >= 0` (row layout: constant column first).
//!
//! Used by `AffineLoop::remove_loop` to project an inner loop's bounds out
//! of the enclosing iteration-space polyhedron once that loop has been fully
//! unrolled or peeled away, and by `DepPoly::dependence` when narrowing a
//! dependence polytope onto a subset of its dimensions.

use super::{gcd, Matrix};

/// Eliminate column `var` (1-based position within the loop-variable block,
/// i.e. column index `1 + var` in the row layout) from `rows`, returning the
/// resulting system over the remaining columns.
///
/// Standard Fourier–Motzkin: partition rows into those with a positive,
/// negative, or zero coefficient on `var`; zero-coefficient rows pass
/// through unchanged (with the `var` column dropped); every positive row is
/// paired with every negative row and the combination that cancels `var` is
/// emitted. This is worst-case quadratic in row count, which is why callers
/// only invoke it on already-pruned systems.
pub fn fourier_motzkin_eliminate(m: &Matrix, col: usize) -> Matrix {
    let cols = m.cols();
    debug_assert!(col < cols, "column out of range");

    let mut pos = Vec::new();
    let mut neg = Vec::new();
    let mut zero = Vec::new();

    for row in m.iter_rows() {
        let c = row[col];
        if c > 0 {
            pos.push(row.to_vec());
        } else if c < 0 {
            neg.push(row.to_vec());
        } else {
            zero.push(drop_col(row, col));
        }
    }

    let mut out_rows = zero;

    for p in &pos {
        for n in &neg {
            out_rows.push(combine(p, n, col));
        }
    }

    if out_rows.is_empty() {
        return Matrix::zeros(0, cols - 1);
    }
    Matrix::from_rows(&out_rows)
}

fn drop_col(row: &[i64], col: usize) -> Vec<i64> {
    let mut v = Vec::with_capacity(row.len() - 1);
    v.extend_from_slice(&row[..col]);
    v.extend_from_slice(&row[col + 1..]);
    v
}

/// Combine a positive-coefficient row `p` and negative-coefficient row `n`
/// on column `col` into a single inequality with that column eliminated:
/// `(-n[col]) * p + p[col] * n`, then divide through by the row's gcd to
/// keep coefficients small.
fn combine(p: &[i64], n: &[i64], col: usize) -> Vec<i64> {
    let pc = p[col];
    let nc = -n[col];
    debug_assert!(pc > 0 && nc > 0);

    let mut combined: Vec<i64> = p
        .iter()
        .zip(n.iter())
        .map(|(&a, &b)| nc * a + pc * b)
        .collect();
    combined.remove(col);

    let g = combined.iter().fold(0i64, |g, &x| gcd(g, x));
    if g > 1 {
        for x in combined.iter_mut() {
            *x /= g;
        }
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eliminates_one_variable() {
        // 0 <= x <= 5, 0 <= y <= 10, eliminate x (column 1).
        let m = Matrix::from_rows(&[
            vec![0, 1, 0],
            vec![5, -1, 0],
            vec![0, 0, 1],
            vec![10, 0, -1],
        ]);
        let out = fourier_motzkin_eliminate(&m, 1);
        // x's rows (0, 1) cancel against each other producing a tautology
        // 5 >= 0, plus the two y rows passed through unchanged.
        assert_eq!(out.cols(), 2);
        assert!(out.iter_rows().any(|r| r == [0, 1]));
        assert!(out.iter_rows().any(|r| r == [10, -1]));
    }

    #[test]
    fn empty_when_no_rows_reference_column() {
        let m = Matrix::from_rows(&[vec![1, 0]]);
        let out = fourier_motzkin_eliminate(&m, 1);
        assert_eq!(out.rows(), 1);
        assert_eq!(out.row(0), &[1]);
    }
}
