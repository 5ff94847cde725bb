//! The dependence polyhedron between two array accesses.

use crate::ir::{Addr, Cache};
use crate::linalg::{self, Matrix};
use crate::simplex::Tableau;
use crate::symbol::Symbol;

/// The dependence polyhedron between two accesses `x` (`dim0` loops) and `y`
/// (`dim1` loops): `{ A.[1;s;ix;iy;t] >= 0, E.[1;s;ix;iy;t] = 0 }`.
#[derive(Clone, Debug)]
pub struct DepPoly {
    pub dyn_syms: Vec<Symbol>,
    pub dim0: usize,
    pub dim1: usize,
    pub a: Matrix,
    pub e: Matrix,
    pub time_dim: usize,
    /// Length of the iteration-space range each time dimension spans,
    /// indexed `0..time_dim`.
    pub null_steps: Vec<i64>,
}

impl DepPoly {
    fn var_offset(&self) -> usize {
        1 + self.dyn_syms.len()
    }

    pub fn total_vars(&self) -> usize {
        self.dyn_syms.len() + self.dim0 + self.dim1 + self.time_dim
    }

    /// Offsets of `phi_x`/`phi_y`/`omega` within the variable space of the
    /// Farkas-pair tableaus `farkas_pair` builds (`sat` and `bnd` share this
    /// prefix layout: `[lambda, mu, phi_x, phi_y, omega, ...]`).
    pub fn phi_x_offset(&self) -> usize {
        self.a.rows() + self.e.rows()
    }

    pub fn phi_y_offset(&self) -> usize {
        self.phi_x_offset() + self.dim0
    }

    pub fn omega_offset(&self) -> usize {
        self.phi_y_offset() + self.dim1
    }

    /// Build the dependence polyhedron between `x` and `y`, or `None` if the
    /// two accesses touch disjoint arrays.
    pub fn dependence(cache: &Cache, x: &Addr, y: &Addr) -> Option<DepPoly> {
        if x.array != y.array {
            return None;
        }

        let x_loop = &cache.loops[x.loop_handle];
        let y_loop = &cache.loops[y.loop_handle];

        let mut dyn_syms = x_loop.dyn_syms().to_vec();
        let mut y_sym_map = vec![0usize; y_loop.dyn_syms().len()];
        for (j, sym) in y_loop.dyn_syms().iter().enumerate() {
            y_sym_map[j] = match dyn_syms.iter().position(|s| s == sym) {
                Some(idx) => idx,
                None => {
                    dyn_syms.push(*sym);
                    dyn_syms.len() - 1
                }
            };
        }

        let dim0 = x_loop.num_loops();
        let dim1 = y_loop.num_loops();
        let num_dyn = dyn_syms.len();
        let cols = 1 + num_dyn + dim0 + dim1;

        let mut a_rows: Vec<Vec<i64>> = Vec::new();

        // Stack x's constraints: constant + x-dyn-syms + x-loop-vars, all
        // zero on y's loop-var columns.
        for row in x_loop.constraints().iter_rows() {
            let mut r = vec![0i64; cols];
            r[0] = row[0];
            for (j, sym) in x_loop.dyn_syms().iter().enumerate() {
                let idx = dyn_syms.iter().position(|s| s == sym).unwrap();
                r[1 + idx] += row[1 + j];
            }
            let var_off_x = 1 + x_loop.dyn_syms().len();
            for k in 0..dim0 {
                r[1 + num_dyn + k] = row[var_off_x + k];
            }
            a_rows.push(r);
        }

        // Stack y's constraints onto the y-loop-var columns.
        for row in y_loop.constraints().iter_rows() {
            let mut r = vec![0i64; cols];
            r[0] = row[0];
            for (j, _) in y_loop.dyn_syms().iter().enumerate() {
                let idx = y_sym_map[j];
                r[1 + idx] += row[1 + j];
            }
            let var_off_y = 1 + y_loop.dyn_syms().len();
            for k in 0..dim1 {
                r[1 + num_dyn + dim0 + k] = row[var_off_y + k];
            }
            a_rows.push(r);
        }

        // Identity block: every loop variable (both x's and y's) is itself a
        // loop index and so implicitly `>= 0`, regardless of whether the
        // source loop's own bound constraints happen to restate that.
        for k in 0..(dim0 + dim1) {
            let mut r = vec![0i64; cols];
            r[1 + num_dyn + k] = 1;
            a_rows.push(r);
        }

        // Equality per array dimension: x_offset - y_offset + x.index.ix -
        // y.index.iy = 0.
        let ndims = x.access.index_matrix.rows();
        let mut e_rows: Vec<Vec<i64>> = Vec::new();
        let mut shared_index = Matrix::zeros(ndims, dim0 + dim1);
        for d in 0..ndims {
            let mut r = vec![0i64; cols];
            r[0] = x.access.offset_omega[d] - y.access.offset_omega[d];
            for (j, sym) in x_loop.dyn_syms().iter().enumerate() {
                let _ = sym;
                let idx = dyn_syms.iter().position(|s| s == &x_loop.dyn_syms()[j]).unwrap();
                r[1 + idx] += x.access.offset_symbols[(d, j)];
            }
            for (j, _) in y_loop.dyn_syms().iter().enumerate() {
                let idx = y_sym_map[j];
                r[1 + idx] -= y.access.offset_symbols[(d, j)];
            }
            for k in 0..dim0.min(x.access.index_matrix.cols()) {
                r[1 + num_dyn + k] = x.access.index_matrix[(d, k)];
                shared_index[(d, k)] = x.access.index_matrix[(d, k)];
            }
            for k in 0..dim1.min(y.access.index_matrix.cols()) {
                r[1 + num_dyn + dim0 + k] = -y.access.index_matrix[(d, k)];
                shared_index[(d, dim0 + k)] = y.access.index_matrix[(d, k)];
            }
            e_rows.push(r);
        }

        let mut a = Matrix::from_rows(&a_rows);
        let mut e = if e_rows.is_empty() {
            Matrix::zeros(0, cols)
        } else {
            Matrix::from_rows(&e_rows)
        };

        // Time dimension: null space of the shared index matrix, restricted
        // to directions common to both accesses' loop-variable columns.
        let ns = linalg::null_space(&shared_index);
        let time_dim = ns.rows();
        if time_dim > 0 {
            a.extend_cols(time_dim);
            e.extend_cols(time_dim);
        }
        let null_steps = (0..time_dim)
            .map(|r| linalg::row_gcd(ns.row(r)).max(1))
            .collect();

        Some(DepPoly {
            dyn_syms,
            dim0,
            dim1,
            a,
            e,
            time_dim,
            null_steps,
        })
    }

    /// Build the Farkas pair: `(sat_simplex, bnd_simplex)`.
    ///
    /// Variable order `[lambda (one per A row), omega, phi_x, phi_y, w, u]`.
    /// `sat` enforces `lambda.A + mu.E = delta_phi` (the signed schedule
    /// difference between the two accesses); `bnd` adds slack `w + u.N`
    /// quantifying the worst-case difference across the time dimensions.
    pub fn farkas_pair(&self) -> (Tableau, Tableau) {
        let lambda_dim = self.a.rows();
        let mu_dim = self.e.rows();
        let phi_dim = self.dim0 + self.dim1;
        // sat vars: lambda, mu(+/-), phi_x, phi_y, omega  (omega is a
        // single scalar constant term in the satisfaction equation).
        let sat_vars = lambda_dim + mu_dim + phi_dim + 1;
        let mut sat = Tableau::new(sat_vars);

        // One row per structural column of [1, dyn_syms, x, y, time] except
        // time: the Farkas identity lambda.A + mu.E - delta_phi = 0 holds
        // column-by-column. The constant and x/y loop-variable columns carry
        // a target in delta_phi (omega, phi_x, phi_y respectively);
        // dynamic-symbol columns carry no such target, so their row is just
        // `lambda.A_col + mu.E_col = 0` — the combination must cancel
        // there too, since a symbol's coefficient is part of the accesses'
        // structural shape, not something a schedule can offset. Time
        // columns are the one exception: `bnd`'s slack `u` absorbs them
        // instead, so they're left out of this per-column identity.
        let var_off = self.var_offset();
        let num_syms = self.dyn_syms.len();
        for col in 0..(1 + self.dim0 + self.dim1) {
            let real_col = if col == 0 { 0 } else { var_off + col - 1 };
            let mut coeffs = vec![0i64; sat_vars];
            for (r, row) in self.a.iter_rows().enumerate() {
                coeffs[r] = row[real_col];
            }
            for (r, row) in self.e.iter_rows().enumerate() {
                coeffs[lambda_dim + r] = row[real_col];
            }
            if col == 0 {
                coeffs[lambda_dim + mu_dim + phi_dim] = -1; // omega
            } else if col - 1 < self.dim0 {
                coeffs[lambda_dim + mu_dim + (col - 1)] = -1;
            } else {
                coeffs[lambda_dim + mu_dim + self.dim0 + (col - 1 - self.dim0)] = 1;
            }
            sat.add_eq_row(0, &coeffs);
        }
        for s in 0..num_syms {
            let real_col = 1 + s;
            let mut coeffs = vec![0i64; sat_vars];
            for (r, row) in self.a.iter_rows().enumerate() {
                coeffs[r] = row[real_col];
            }
            for (r, row) in self.e.iter_rows().enumerate() {
                coeffs[lambda_dim + r] = row[real_col];
            }
            // No delta_phi target: a symbol's coefficient is part of the
            // accesses' structural shape, not something a schedule can
            // offset, so the combination must simply cancel here too.
            sat.add_eq_row(0, &coeffs);
        }

        // Bounding simplex: same structure plus slack `w` and per-time-dim
        // `u`, used by `LoopBlock` to quantify a dependence's worst-case
        // distance rather than just its sign.
        let bnd_vars = sat_vars + 1 + self.time_dim;
        let mut bnd = Tableau::new(bnd_vars);
        for col in 0..(1 + self.dim0 + self.dim1) {
            let real_col = if col == 0 { 0 } else { var_off + col - 1 };
            let mut coeffs = vec![0i64; bnd_vars];
            for (r, row) in self.a.iter_rows().enumerate() {
                coeffs[r] = row[real_col];
            }
            for (r, row) in self.e.iter_rows().enumerate() {
                coeffs[lambda_dim + r] = row[real_col];
            }
            if col == 0 {
                coeffs[lambda_dim + mu_dim + phi_dim] = -1;
                coeffs[sat_vars] = -1; // w
            } else if col - 1 < self.dim0 {
                coeffs[lambda_dim + mu_dim + (col - 1)] = -1;
            } else {
                coeffs[lambda_dim + mu_dim + self.dim0 + (col - 1 - self.dim0)] = 1;
            }
            bnd.add_eq_row(0, &coeffs);
        }
        for s in 0..num_syms {
            let real_col = 1 + s;
            let mut coeffs = vec![0i64; bnd_vars];
            for (r, row) in self.a.iter_rows().enumerate() {
                coeffs[r] = row[real_col];
            }
            for (r, row) in self.e.iter_rows().enumerate() {
                coeffs[lambda_dim + r] = row[real_col];
            }
            bnd.add_eq_row(0, &coeffs);
        }
        for t in 0..self.time_dim {
            let mut coeffs = vec![0i64; bnd_vars];
            coeffs[sat_vars + 1 + t] = self.null_steps[t];
            bnd.add_ge_row(0, &coeffs);
        }

        (sat, bnd)
    }

    /// Assemble a trimmed polyhedron with `x_phi.i_x = y_phi.i_y` added as
    /// an equality and ask whether it is empty.
    pub fn check_sat(&self, x_phi_row: &[i64], y_phi_row: &[i64], stats: &mut crate::stats::Stats) -> bool {
        debug_assert_eq!(x_phi_row.len(), self.dim0);
        debug_assert_eq!(y_phi_row.len(), self.dim1);

        let nvars = self.total_vars();
        let mut comparator = crate::comparator::Comparator::new(nvars, false);
        for row in self.a.iter_rows() {
            comparator.add_inequality(row.to_vec());
        }
        for row in self.e.iter_rows() {
            comparator.add_equality(row.to_vec());
        }
        let var_off = self.var_offset();
        let mut extra = vec![0i64; 1 + nvars];
        for k in 0..self.dim0 {
            extra[1 + (var_off - 1) + k] = x_phi_row[k];
        }
        for k in 0..self.dim1 {
            extra[1 + (var_off - 1) + self.dim0 + k] = -y_phi_row[k];
        }
        comparator.add_equality(extra);

        comparator.is_empty(stats)
    }

    /// Used when a nonempty `AffineExpr` needs to cross-reference the merged
    /// dynamic-symbol list; kept as a small helper so callers outside this
    /// module don't re-derive the merge logic.
    pub fn symbol_index(&self, sym: Symbol) -> Option<usize> {
        self.dyn_syms.iter().position(|s| *s == sym)
    }
}
