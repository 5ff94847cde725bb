//! Dense integer-matrix primitives.
//!
//! No crate in the reachable ecosystem provides the specific combination
//! this engine needs — dense row-major matrices over `i64` with free
//! sub-matrix views, Hermite normal form, a null-space basis, and
//! Fourier–Motzkin elimination — so this module implements them directly
//! rather than vendoring a mismatched dependency. GCD/LCM are the one piece
//! of this that *does* have a well-established crate (`num-integer`), so we
//! use that instead of hand-rolling Euclid's algorithm.

mod fourier_motzkin;
mod hnf;
mod matrix;
mod nullspace;

pub use fourier_motzkin::fourier_motzkin_eliminate;
pub use hnf::hermite_normal_form;
pub use matrix::Matrix;
pub use nullspace::null_space;

pub use num_integer::Integer as GcdLcm;

/// `gcd(a, b)`, always non-negative, `gcd(0, 0) = 0`.
#[inline]
pub fn gcd(a: i64, b: i64) -> i64 {
    a.gcd(&b)
}

/// `lcm(a, b)`, always non-negative.
#[inline]
pub fn lcm(a: i64, b: i64) -> i64 {
    a.lcm(&b)
}

/// GCD of a whole row, used to normalize equality rows in `prune_bounds`.
pub fn row_gcd(row: &[i64]) -> i64 {
    row.iter().fold(0i64, |g, &x| gcd(g, x))
}
