//! Integer null-space basis of a matrix, via rational row-reduction
//! followed by clearing denominators.
//!
//! Two callers: `DepPoly`'s time-dimension detection, which needs a basis
//! for the space of iteration-vector differences a dependence does *not*
//! constrain (used to decide how many extra schedule dimensions a
//! dependence edge needs), and `LoopBlock`'s independence-solution
//! constraints, which project a schedule onto the directions a set of
//! already-satisfied dependences leave free.

use num_rational::Ratio;

use super::{gcd, Matrix};

type R = Ratio<i64>;

/// Return a basis (one row per basis vector) for the null space of `m`,
/// i.e. all integer vectors `x` with `m * x = 0`, scaled to be primitive
/// (gcd of each row's entries is 1).
pub fn null_space(m: &Matrix) -> Matrix {
    let rows = m.rows();
    let cols = m.cols();
    if rows == 0 {
        return identity_rows(cols);
    }

    let mut a: Vec<Vec<R>> = (0..rows)
        .map(|r| m.row(r).iter().map(|&x| Ratio::from_integer(x)).collect())
        .collect();

    let mut pivot_cols = Vec::new();
    let mut pivot_row = 0;
    for col in 0..cols {
        if pivot_row >= rows {
            break;
        }
        let Some(sel) = (pivot_row..rows).find(|&r| a[r][col] != Ratio::from_integer(0)) else {
            continue;
        };
        a.swap(pivot_row, sel);
        let pivot_val = a[pivot_row][col];
        for x in a[pivot_row].iter_mut() {
            *x /= pivot_val;
        }
        for r in 0..rows {
            if r == pivot_row {
                continue;
            }
            let factor = a[r][col];
            if factor != Ratio::from_integer(0) {
                for c in 0..cols {
                    let sub = factor * a[pivot_row][c];
                    a[r][c] -= sub;
                }
            }
        }
        pivot_cols.push(col);
        pivot_row += 1;
    }

    let rank = pivot_row;
    let free_cols: Vec<usize> = (0..cols).filter(|c| !pivot_cols.contains(c)).collect();

    if free_cols.is_empty() {
        return Matrix::zeros(0, cols);
    }

    let mut basis_rows: Vec<Vec<i64>> = Vec::with_capacity(free_cols.len());
    for &free in &free_cols {
        let mut v: Vec<R> = vec![Ratio::from_integer(0); cols];
        v[free] = Ratio::from_integer(1);
        for (i, &pc) in pivot_cols.iter().enumerate().take(rank) {
            v[pc] = -a[i][free];
        }
        basis_rows.push(clear_denominators(&v));
    }

    Matrix::from_rows(&basis_rows)
}

fn clear_denominators(v: &[R]) -> Vec<i64> {
    let denom_lcm = v.iter().fold(1i64, |acc, r| super::lcm(acc, *r.denom()));
    let scaled: Vec<i64> = v
        .iter()
        .map(|r| (r * Ratio::from_integer(denom_lcm)).to_integer())
        .collect();
    let g = scaled.iter().fold(0i64, |g, &x| gcd(g, x));
    if g > 1 {
        scaled.into_iter().map(|x| x / g).collect()
    } else {
        scaled
    }
}

fn identity_rows(n: usize) -> Matrix {
    let mut m = Matrix::zeros(n, n);
    for i in 0..n {
        m[(i, i)] = 1;
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_rank_square_has_trivial_null_space() {
        let m = Matrix::from_rows(&[vec![1, 0], vec![0, 1]]);
        let ns = null_space(&m);
        assert_eq!(ns.rows(), 0);
    }

    #[test]
    fn single_equation_has_one_dimensional_null_space() {
        // x - y = 0  =>  null space spanned by (1, 1).
        let m = Matrix::from_rows(&[vec![1, -1]]);
        let ns = null_space(&m);
        assert_eq!(ns.rows(), 1);
        let row = ns.row(0);
        // Either (1, 1) or a negative scalar multiple is acceptable.
        assert!(row == [1, 1] || row == [-1, -1]);
    }

    #[test]
    fn zero_matrix_null_space_is_full_identity() {
        let m = Matrix::zeros(0, 3);
        let ns = null_space(&m);
        assert_eq!(ns.rows(), 3);
    }
}
