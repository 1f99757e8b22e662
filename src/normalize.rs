//! Ruiz-style equilibration of the problem data.
//!
//! The solver iterates on a scaled copy `A' = scale * D^-1 A E^-1`,
//! `b' = scale * sc_b * D^-1 b`, `c' = scale * sc_c * E^-1 c`, where `D` and
//! `E` hold the accumulated row and column norms of `A`. The caller's data is
//! never touched; solutions and residuals are mapped back through the stored
//! diagonals:
//!
//! ```text
//! x[j] = x'[j] / (E[j] * sc_b)
//! y[i] = y'[i] / (D[i] * sc_c)
//! s[i] = s'[i] * D[i] / (sc_b * scale)
//! ```

use crate::E;
use crate::linalg::vector_ops::{norm_inf, scale};
use crate::problem::Data;

pub(crate) const MIN_SCALE: E = 1e-6;
const RUIZ_PASSES: usize = 3;

/// Equilibration state for one workspace.
#[derive(Debug, Clone)]
pub(crate) struct Scaling {
    /// Row norms accumulated over the balancing passes (length m).
    pub(crate) d: Vec<E>,
    /// Column norms accumulated over the balancing passes (length n).
    pub(crate) e: Vec<E>,
    /// Mean l2 row norm of the equilibrated matrix.
    pub(crate) mean_norm_row_a: E,
}

/// Balances the rows and columns of `A` in place and applies the global
/// `scale` factor. Returns the accumulated diagonals.
pub(crate) fn equilibrate(data: &mut Data, global_scale: E) -> Scaling {
    let (m, n) = (data.m, data.n);
    let mut d = vec![1.0; m];
    let mut e = vec![1.0; n];

    for _ in 0..RUIZ_PASSES {
        let mut row_norms = vec![0.0; m];
        let mut col_norms = vec![0.0; n];
        for j in 0..n {
            for idx in data.Ap[j]..data.Ap[j + 1] {
                let v = data.Ax[idx];
                row_norms[data.Ai[idx]] += v * v;
                col_norms[j] += v * v;
            }
        }
        // a zero row or column is left alone
        let row_fac: Vec<E> = row_norms
            .iter()
            .map(|&r| if r > 0.0 { r.sqrt().sqrt() } else { 1.0 })
            .collect();
        let col_fac: Vec<E> = col_norms
            .iter()
            .map(|&c| if c > 0.0 { c.sqrt().sqrt() } else { 1.0 })
            .collect();
        for j in 0..n {
            for idx in data.Ap[j]..data.Ap[j + 1] {
                data.Ax[idx] /= row_fac[data.Ai[idx]] * col_fac[j];
            }
        }
        for (di, rf) in d.iter_mut().zip(&row_fac) {
            *di *= rf;
        }
        for (ej, cf) in e.iter_mut().zip(&col_fac) {
            *ej *= cf;
        }
    }

    let mut row_norms = vec![0.0; m];
    for j in 0..n {
        for idx in data.Ap[j]..data.Ap[j + 1] {
            row_norms[data.Ai[idx]] += data.Ax[idx] * data.Ax[idx];
        }
    }
    let mean_norm_row_a = row_norms.iter().map(|r| r.sqrt()).sum::<E>() / m as E;

    scale(&mut data.Ax, global_scale);

    Scaling {
        d,
        e,
        mean_norm_row_a,
    }
}

/// Scales `b` and `c` of the working copy. Returns `(sc_b, sc_c)`.
pub(crate) fn scale_bc(data: &mut Data, scaling: &Scaling, global_scale: E) -> (E, E) {
    for (bi, di) in data.b.iter_mut().zip(&scaling.d) {
        *bi /= di;
    }
    let sc_b = scaling.mean_norm_row_a / E::max(norm_inf(&data.b), MIN_SCALE);
    scale(&mut data.b, sc_b * global_scale);

    for (cj, ej) in data.c.iter_mut().zip(&scaling.e) {
        *cj /= ej;
    }
    let sc_c = scaling.mean_norm_row_a / E::max(norm_inf(&data.c), MIN_SCALE);
    scale(&mut data.c, sc_c * global_scale);

    (sc_b, sc_c)
}

/// Maps a solution of the scaled problem back to the original data.
pub(crate) fn unscale_solution(
    x: &mut [E],
    y: &mut [E],
    s: &mut [E],
    scaling: &Scaling,
    sc_b: E,
    sc_c: E,
    global_scale: E,
) {
    for (xj, ej) in x.iter_mut().zip(&scaling.e) {
        *xj /= ej * sc_b;
    }
    for (yi, di) in y.iter_mut().zip(&scaling.d) {
        *yi /= di * sc_c;
    }
    for (si, di) in s.iter_mut().zip(&scaling.d) {
        *si *= di / (sc_b * global_scale);
    }
}

/// Maps a warm-start point given on the original data into the internal
/// scaling. Inverse of [`unscale_solution`].
pub(crate) fn scale_warm_start(
    x: &mut [E],
    y: &mut [E],
    s: &mut [E],
    scaling: &Scaling,
    sc_b: E,
    sc_c: E,
    global_scale: E,
) {
    for (xj, ej) in x.iter_mut().zip(&scaling.e) {
        *xj *= ej * sc_b;
    }
    for (yi, di) in y.iter_mut().zip(&scaling.d) {
        *yi *= di * sc_c;
    }
    for (si, di) in s.iter_mut().zip(&scaling.d) {
        *si *= sc_b * global_scale / di;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::I;

    fn test_matrix() -> Data {
        // A = [10 0; 3 0.2; 0 500], column-major
        Data::new(
            3,
            2,
            vec![0, 2, 4],
            vec![0, 1, 1, 2],
            vec![10.0, 3.0, 0.2, 500.0],
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0],
        )
    }

    #[test]
    fn test_equilibrate_round_trip() {
        let original = test_matrix();
        let mut data = original.clone();
        let scaling = equilibrate(&mut data, 2.5);

        // undo: A = D A' E / scale
        for j in 0..data.n as I {
            for idx in data.Ap[j]..data.Ap[j + 1] {
                data.Ax[idx] *= scaling.d[data.Ai[idx]] * scaling.e[j] / 2.5;
            }
        }
        for (a, b) in data.Ax.iter().zip(&original.Ax) {
            assert!((a - b).abs() <= 1e-12 * b.abs());
        }
    }

    #[test]
    fn test_equilibrate_balances_norms() {
        let mut data = test_matrix();
        let scaling = equilibrate(&mut data, 1.0);

        let mut row_norms = vec![0.0; data.m];
        let mut col_norms = vec![0.0; data.n];
        for j in 0..data.n {
            for idx in data.Ap[j]..data.Ap[j + 1] {
                let v = data.Ax[idx];
                row_norms[data.Ai[idx]] += v * v;
                col_norms[j] += v * v;
            }
        }
        for r in row_norms {
            let r = r.sqrt();
            assert!(r > 0.5 && r < 2.0, "row norm {r} far from 1");
        }
        for c in col_norms {
            let c = c.sqrt();
            assert!(c > 0.5 && c < 2.0, "col norm {c} far from 1");
        }
        assert!(scaling.mean_norm_row_a > 0.0);
    }

    #[test]
    fn test_solution_scaling_round_trip() {
        let mut data = test_matrix();
        let scaling = equilibrate(&mut data, 1.0);
        let (sc_b, sc_c) = scale_bc(&mut data, &scaling, 1.0);

        let mut x = vec![1.0, -2.0];
        let mut y = vec![0.5, 1.5, -3.0];
        let mut s = vec![0.0, 2.0, 4.0];
        let (x0, y0, s0) = (x.clone(), y.clone(), s.clone());

        scale_warm_start(&mut x, &mut y, &mut s, &scaling, sc_b, sc_c, 1.0);
        unscale_solution(&mut x, &mut y, &mut s, &scaling, sc_b, sc_c, 1.0);

        for (a, b) in x.iter().zip(&x0) {
            assert!((a - b).abs() < 1e-12);
        }
        for (a, b) in y.iter().zip(&y0) {
            assert!((a - b).abs() < 1e-12);
        }
        for (a, b) in s.iter().zip(&s0) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
