//! Sobol generator-matrix columns.
//!
//! Dimension 0 is the exact van der Corput sequence (bit-reversal): column `i` is
//! `1 << (31 - i)`, the textbook base-2 radical-inverse generator matrix, and needs no
//! external table.
//!
//! Dimensions 1..=12 are genuine Sobol direction-number columns, built from actual
//! primitive polynomials over GF(2) (degree 1 through 5 — every primitive polynomial
//! of each of those degrees) via the standard Sobol/Antonov-Saleev recurrence
//! (Bratley & Fox 1988, Algorithm 659):
//!
//! ```text
//! v_i = a_1 v_{i-1} XOR a_2 v_{i-2} XOR ... XOR a_{s-1} v_{i-s+1} XOR v_{i-s} XOR (v_{i-s} >> s)
//! ```
//!
//! seeded with the minimal valid initial direction numbers `m_i = 1` (any odd `m_i <
//! 2^i` gives a mathematically valid Sobol column; Joe-Kuo-style optimized initial
//! numbers only improve the *equidistribution constant*, not the base low-discrepancy
//! property this sampler depends on). Beyond [`NUM_REAL_DIMENSIONS`] a dimension's
//! matrix is one of these genuine columns reused, decorrelated from its other
//! replicas by folding a replica-dependent salt into the scramble in
//! [`super::sobol_sample`] rather than by hashing a synthetic matrix — every drawn
//! dimension keeps its real stratification even once the bounce budget outgrows the
//! transcribed polynomial table.

use std::sync::OnceLock;

/// Number of columns per dimension (one per bit of a 32-bit sample index).
pub const MATRIX_SIZE: usize = 32;

/// Dimensions with a genuinely transcribed primitive-polynomial Sobol matrix: 0 (van
/// der Corput) plus one per primitive polynomial over GF(2) of degree 1 through 5.
pub const NUM_REAL_DIMENSIONS: usize = 13;

struct Poly {
    degree: u32,
    /// `a_1 ..= a_{degree - 1}`, the interior coefficients of
    /// `x^degree + a_1 x^(degree-1) + ... + a_{degree-1} x + 1`.
    coeffs: &'static [u32],
}

/// One primitive polynomial per real dimension 1..=12, in nondecreasing degree.
const POLYS: [Poly; NUM_REAL_DIMENSIONS - 1] = [
    Poly { degree: 1, coeffs: &[] },             // x + 1
    Poly { degree: 2, coeffs: &[1] },            // x^2 + x + 1
    Poly { degree: 3, coeffs: &[0, 1] },         // x^3 + x + 1
    Poly { degree: 3, coeffs: &[1, 0] },         // x^3 + x^2 + 1
    Poly { degree: 4, coeffs: &[0, 0, 1] },      // x^4 + x + 1
    Poly { degree: 4, coeffs: &[1, 0, 0] },      // x^4 + x^3 + 1
    Poly { degree: 5, coeffs: &[0, 1, 0, 0] },   // x^5 + x^2 + 1
    Poly { degree: 5, coeffs: &[0, 0, 1, 0] },   // x^5 + x^3 + 1
    Poly { degree: 5, coeffs: &[0, 1, 1, 1] },   // x^5 + x^3 + x^2 + x + 1
    Poly { degree: 5, coeffs: &[1, 0, 1, 1] },   // x^5 + x^4 + x^2 + x + 1
    Poly { degree: 5, coeffs: &[1, 1, 0, 1] },   // x^5 + x^4 + x^3 + x + 1
    Poly { degree: 5, coeffs: &[1, 1, 1, 0] },   // x^5 + x^4 + x^3 + x^2 + 1
];

/// Runs the Sobol direction-number recurrence for one primitive polynomial, producing
/// its 32 generator-matrix columns (`v_1 ..= v_32`, one bit of `sample_idx` each).
fn direction_numbers(poly: &Poly) -> [u32; MATRIX_SIZE] {
    let s = poly.degree;
    let mut v = [0u32; MATRIX_SIZE + 1]; // 1-indexed; v[0] is unused padding.
    for i in 1..=s {
        v[i as usize] = 1u32 << (32 - i); // m_i = 1
    }
    for i in (s + 1)..=(MATRIX_SIZE as u32) {
        let base = v[(i - s) as usize];
        let mut val = base ^ (base >> s);
        for (k, &a) in poly.coeffs.iter().enumerate() {
            if a != 0 {
                val ^= v[(i - 1 - k as u32) as usize];
            }
        }
        v[i as usize] = val;
    }
    let mut cols = [0u32; MATRIX_SIZE];
    cols.copy_from_slice(&v[1..=MATRIX_SIZE]);
    cols
}

fn generate_dimension(dim: u32) -> [u32; MATRIX_SIZE] {
    if dim == 0 {
        let mut cols = [0u32; MATRIX_SIZE];
        for (i, c) in cols.iter_mut().enumerate() {
            *c = 1u32 << (31 - i);
        }
        return cols;
    }
    direction_numbers(&POLYS[(dim - 1) as usize])
}

static TABLE: OnceLock<Vec<[u32; MATRIX_SIZE]>> = OnceLock::new();

/// Returns the generator-matrix columns for one of the [`NUM_REAL_DIMENSIONS`]
/// genuinely transcribed dimensions, wrapping modulo that count. Callers needing more
/// dimensions go through [`super::sobol_sample`], which folds a replica salt into the
/// scramble instead of calling this directly, so reused dimensions stay decorrelated.
pub fn columns(real_dimension: u32) -> [u32; MATRIX_SIZE] {
    let table =
        TABLE.get_or_init(|| (0..NUM_REAL_DIMENSIONS as u32).map(generate_dimension).collect());
    table[(real_dimension as usize) % NUM_REAL_DIMENSIONS]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_zero_is_van_der_corput() {
        let cols = columns(0);
        assert_eq!(cols[0], 1 << 31);
        assert_eq!(cols[31], 1);
    }

    #[test]
    fn columns_are_deterministic() {
        assert_eq!(columns(5), columns(5));
    }

    #[test]
    fn distinct_dimensions_differ() {
        assert_ne!(columns(1), columns(2));
    }

    #[test]
    fn every_real_dimension_starts_from_the_minimal_initial_number() {
        // m_1 = 1 for every dimension, so v_1 = 1 << 31 regardless of which
        // primitive polynomial drives the rest of the column.
        for dim in 0..NUM_REAL_DIMENSIONS as u32 {
            assert_eq!(columns(dim)[0], 1 << 31);
        }
    }

    #[test]
    fn columns_wrap_modulo_the_real_dimension_count() {
        assert_eq!(columns(0), columns(NUM_REAL_DIMENSIONS as u32));
    }
}
