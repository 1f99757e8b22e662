//! Problem data in compressed-column form and its validation.
//!
//! A conic program is specified by a sparse matrix `A` (m x n, column-major),
//! the right-hand side `b`, and the cost vector `c`:
//!
//! ```text
//! min  c^T x
//! s.t. A x + s = b
//!      s in K
//! ```
//!
//! The cone `K` is described separately by [`Cone`](crate::cones::Cone). The
//! solver borrows a [`Data`] immutably for the duration of a solve; all
//! scaling happens on an internal copy.

use derive_more::{Display, Error};
use problemo::Problem;

use crate::cones::Cone;
use crate::{E, I, Settings};

/// Input rejected by validation. Each variant is a distinct reason.
#[derive(Debug, Display, Error, PartialEq)]
pub enum ValidationError {
    #[display("A components have inconsistent lengths")]
    MalformedMatrix,

    #[display("b/c lengths do not match m/n")]
    MalformedVectors,

    #[display("m and n must both be greater than 0")]
    EmptyDimension,

    #[display("m must be greater than or equal to n")]
    FewerRowsThanCols,

    #[display("column pointers not strictly increasing")]
    ColPointersNotIncreasing,

    #[display("nonzeros in A outside of valid range")]
    NonzerosOutOfRange,

    #[display("row index inconsistent with input dimension")]
    RowIndexOutOfRange,

    #[display("invalid cone dimensions")]
    InvalidCone,

    #[display("cone dimensions not equal to num rows in A")]
    ConeDimMismatch,

    #[display("eps tolerance must be positive")]
    NonPositiveEps,

    #[display("alpha must be in (0,2)")]
    AlphaOutOfRange,

    #[display("rho_x must be nonnegative (1e-3 works well)")]
    NegativeRhoX,

    #[display("scale must be positive")]
    NonPositiveScale,

    #[display("undet_tol must be positive")]
    NonPositiveUndetTol,
}

/// Conic program data. Read-only for the solver.
#[allow(non_snake_case)]
#[derive(Debug, Clone)]
pub struct Data {
    /// Number of rows of `A` (constraints).
    pub(crate) m: I,
    /// Number of columns of `A` (variables).
    pub(crate) n: I,
    /// Column pointers, length `n + 1`, strictly increasing.
    pub(crate) Ap: Vec<I>,
    /// Row indices, length `Ap[n]`.
    pub(crate) Ai: Vec<I>,
    /// Nonzero values, length `Ap[n]`.
    pub(crate) Ax: Vec<E>,
    /// Right-hand side, length `m`.
    pub(crate) b: Vec<E>,
    /// Cost vector, length `n`.
    pub(crate) c: Vec<E>,
}

#[allow(non_snake_case)]
impl Data {
    /// Creates problem data from compressed-column `A`, `b`, and `c`.
    ///
    /// No validation happens here; the solver validates on `init`.
    pub fn new(m: I, n: I, Ap: Vec<I>, Ai: Vec<I>, Ax: Vec<E>, b: Vec<E>, c: Vec<E>) -> Self {
        Self {
            m,
            n,
            Ap,
            Ai,
            Ax,
            b,
            c,
        }
    }

    /// Number of constraints (rows of `A`).
    pub fn num_cons(&self) -> I {
        self.m
    }

    /// Number of variables (columns of `A`).
    pub fn num_vars(&self) -> I {
        self.n
    }

    /// Number of stored nonzeros of `A`.
    pub fn nnz(&self) -> I {
        *self.Ap.last().unwrap_or(&0)
    }

    /// Row indices and values of column `j`.
    pub(crate) fn col(&self, j: I) -> (&[I], &[E]) {
        let range = self.Ap[j]..self.Ap[j + 1];
        (&self.Ai[range.clone()], &self.Ax[range])
    }

    /// `out += A x`.
    pub(crate) fn accum_by_a(&self, x: &[E], out: &mut [E]) {
        for j in 0..self.n {
            let (rows, vals) = self.col(j);
            let xj = x[j];
            for (&i, &v) in rows.iter().zip(vals) {
                out[i] += v * xj;
            }
        }
    }

    /// `out += A^T y`.
    pub(crate) fn accum_by_a_trans(&self, y: &[E], out: &mut [E]) {
        for j in 0..self.n {
            let (rows, vals) = self.col(j);
            let mut acc = 0.0;
            for (&i, &v) in rows.iter().zip(vals) {
                acc += v * y[i];
            }
            out[j] += acc;
        }
    }

    /// Checks the data, the cone, and the settings. Every rejection reason is
    /// a distinct [`ValidationError`].
    pub fn validate(&self, cone: &Cone, settings: &Settings) -> Result<(), Problem> {
        if self.m == 0 || self.n == 0 {
            return Err(ValidationError::EmptyDimension.into());
        }
        if self.m < self.n {
            return Err(ValidationError::FewerRowsThanCols.into());
        }
        if self.Ap.len() != self.n + 1 {
            return Err(ValidationError::MalformedMatrix.into());
        }
        if !self.Ap.windows(2).all(|w| w[0] < w[1]) {
            return Err(ValidationError::ColPointersNotIncreasing.into());
        }
        let anz = self.Ap[self.n];
        if anz == 0 || anz as E / self.m as E > self.n as E {
            return Err(ValidationError::NonzerosOutOfRange.into());
        }
        if self.Ai.len() != anz || self.Ax.len() != anz {
            return Err(ValidationError::MalformedMatrix.into());
        }
        if self.Ai.iter().any(|&i| i >= self.m) {
            return Err(ValidationError::RowIndexOutOfRange.into());
        }
        if self.b.len() != self.m || self.c.len() != self.n {
            return Err(ValidationError::MalformedVectors.into());
        }
        if cone.validate().is_err() {
            return Err(ValidationError::InvalidCone.into());
        }
        if cone.full_dim() != self.m {
            return Err(ValidationError::ConeDimMismatch.into());
        }
        if !(settings.eps > 0.0) {
            return Err(ValidationError::NonPositiveEps.into());
        }
        if !(settings.alpha > 0.0 && settings.alpha < 2.0) {
            return Err(ValidationError::AlphaOutOfRange.into());
        }
        if !(settings.rho_x >= 0.0) {
            return Err(ValidationError::NegativeRhoX.into());
        }
        if !(settings.scale > 0.0) {
            return Err(ValidationError::NonPositiveScale.into());
        }
        if !(settings.undet_tol > 0.0) {
            return Err(ValidationError::NonPositiveUndetTol.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cones::Cone;

    fn identity(m: I) -> Data {
        Data::new(
            m,
            m,
            (0..=m).collect(),
            (0..m).collect(),
            vec![1.0; m],
            vec![1.0; m],
            vec![1.0; m],
        )
    }

    fn check(data: &Data, cone: &Cone) -> Result<(), Problem> {
        data.validate(cone, &Settings::default())
    }

    #[test]
    fn test_accum_by_a() {
        // A = [1 2; 0 3] in column-major form
        let data = Data::new(
            2,
            2,
            vec![0, 1, 3],
            vec![0, 0, 1],
            vec![1.0, 2.0, 3.0],
            vec![0.0; 2],
            vec![0.0; 2],
        );
        let mut out = vec![0.0; 2];
        data.accum_by_a(&[1.0, 1.0], &mut out);
        assert_eq!(out, [3.0, 3.0]);

        let mut out_t = vec![0.0; 2];
        data.accum_by_a_trans(&[1.0, 1.0], &mut out_t);
        assert_eq!(out_t, [1.0, 5.0]);
    }

    #[test]
    fn test_validate_ok() {
        assert!(check(&identity(3), &Cone::nonneg(3)).is_ok());
    }

    #[test]
    fn test_validate_rejects_wide() {
        let mut data = identity(3);
        data.m = 2;
        assert!(check(&data, &Cone::nonneg(2)).is_err());
    }

    #[test]
    fn test_validate_rejects_nonmonotone_col_ptrs() {
        let mut data = identity(3);
        data.Ap = vec![0, 1, 1, 3];
        assert!(check(&data, &Cone::nonneg(3)).is_err());
    }

    #[test]
    fn test_validate_rejects_row_index() {
        let mut data = identity(3);
        data.Ai[2] = 7;
        assert!(check(&data, &Cone::nonneg(3)).is_err());
    }

    #[test]
    fn test_validate_rejects_cone_mismatch() {
        assert!(check(&identity(3), &Cone::nonneg(2)).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let data = identity(2);
        let cone = Cone::nonneg(2);
        for settings in [
            Settings {
                eps: 0.0,
                ..Settings::default()
            },
            Settings {
                alpha: 2.0,
                ..Settings::default()
            },
            Settings {
                rho_x: -1.0,
                ..Settings::default()
            },
        ] {
            assert!(data.validate(&cone, &settings).is_err());
        }
    }
}
