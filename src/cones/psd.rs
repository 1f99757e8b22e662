//! Projection onto the positive-semidefinite cone.
//!
//! Blocks are stored as full column-major matrices. The input is symmetrized
//! before the eigendecomposition, so mildly asymmetric iterates project onto
//! the symmetric PSD cone rather than failing.

use faer::{Mat, Side};
use problemo::Problem;

use crate::E;
use crate::cones::ConeError;

/// Projects one `side * side` column-major block onto the PSD cone:
/// eigendecompose, clamp negative eigenvalues, reassemble.
pub(crate) fn proj_psd(x: &mut [E], side: usize, scratch: &mut Mat<E>) -> Result<(), Problem> {
    if side == 1 {
        x[0] = E::max(x[0], 0.0);
        return Ok(());
    }

    for j in 0..side {
        for i in 0..side {
            scratch[(i, j)] = 0.5 * (x[i + side * j] + x[j + side * i]);
        }
    }

    let evd = scratch
        .as_ref()
        .self_adjoint_eigen(Side::Lower)
        .map_err(|_| ConeError::Eigendecomposition)?;
    let u = evd.U();
    let lambda = evd.S().column_vector();

    x.fill(0.0);
    for k in 0..side {
        let lam = lambda[k];
        if lam <= 0.0 {
            continue;
        }
        for j in 0..side {
            let w = lam * u[(j, k)];
            for i in 0..side {
                x[i + side * j] += u[(i, k)] * w;
            }
        }
    }
    Ok(())
}
