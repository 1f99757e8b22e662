//! Indirect (matrix-free) solver for the quasi-definite system.
//!
//! Eliminating the second block row of
//!
//! ```text
//! [ rho_x * I   A^T ] [ z_x ]   [ r_x ]
//! [     A       -I  ] [ z_y ] = [ r_y ]
//! ```
//!
//! gives `(rho_x * I + A^T A) z_x = r_x + A^T r_y` and `z_y = A z_x - r_y`.
//! The reduced system is symmetric positive definite and is solved by
//! conjugate gradient, warm-started from the hint. The tolerance tightens
//! with the outer iteration count so early iterations stay cheap.

use std::fmt::Write;

use problemo::Problem;

use crate::E;
use crate::linalg::solver::{KktSolver, LinSysError};
use crate::linalg::vector_ops::{add_scaled, inner_prod, norm};
use crate::problem::Data;
use crate::{Info, Settings};

const CG_TOL_FLOOR: E = 1e-9;
const CG_RATE: E = 2.0;

pub struct IndirectKktSolver {
    data: Data,
    rho_x: E,
    /// Reduced right-hand side / solution scratch, length n.
    q: Vec<E>,
    r: Vec<E>,
    p: Vec<E>,
    mp: Vec<E>,
    /// Length-m product scratch.
    tmp_m: Vec<E>,
    n_solves: usize,
    cg_iters: usize,
}

impl IndirectKktSolver {
    /// `out = (rho_x * I + A^T A) v`.
    fn reduced_mat_vec(&mut self, v: &[E], out: &mut [E]) {
        self.tmp_m.fill(0.0);
        self.data.accum_by_a(v, &mut self.tmp_m);
        for (o, vi) in out.iter_mut().zip(v) {
            *o = self.rho_x * vi;
        }
        self.data.accum_by_a_trans(&self.tmp_m, out);
    }

    /// Conjugate gradient on the reduced system, starting from `x`.
    fn conjugate_gradient(&mut self, x: &mut [E], tol: E, max_iters: usize) -> usize {
        let n = self.data.n;

        let mut mx = vec![0.0; n];
        self.reduced_mat_vec(x, &mut mx);
        for i in 0..n {
            self.r[i] = self.q[i] - mx[i];
        }
        self.p.copy_from_slice(&self.r);
        let mut rs_old = inner_prod(&self.r, &self.r);

        for k in 0..max_iters {
            if rs_old.sqrt() < tol {
                return k;
            }
            let p = std::mem::take(&mut self.p);
            let mut mp = std::mem::take(&mut self.mp);
            self.reduced_mat_vec(&p, &mut mp);
            let alpha = rs_old / inner_prod(&p, &mp);
            add_scaled(x, &p, alpha);
            add_scaled(&mut self.r, &mp, -alpha);
            self.p = p;
            self.mp = mp;

            let rs_new = inner_prod(&self.r, &self.r);
            let beta = rs_new / rs_old;
            for i in 0..n {
                self.p[i] = self.r[i] + beta * self.p[i];
            }
            rs_old = rs_new;
        }
        max_iters
    }
}

impl KktSolver for IndirectKktSolver {
    fn new(data: &Data, settings: &Settings) -> Result<Self, Problem> {
        let (m, n) = (data.m, data.n);
        Ok(Self {
            data: data.clone(),
            rho_x: settings.rho_x,
            q: vec![0.0; n],
            r: vec![0.0; n],
            p: vec![0.0; n],
            mp: vec![0.0; n],
            tmp_m: vec![0.0; m],
            n_solves: 0,
            cg_iters: 0,
        })
    }

    fn solve(
        &mut self,
        rhs: &mut [E],
        warm: Option<&[E]>,
        iter: Option<usize>,
    ) -> Result<(), Problem> {
        let (m, n) = (self.data.m, self.data.n);
        if rhs.len() != n + m {
            return Err(LinSysError::DimensionMismatch.into());
        }

        // q = r_x + A^T r_y
        self.q.copy_from_slice(&rhs[..n]);
        let (rhs_x, rhs_y) = rhs.split_at_mut(n);
        self.data.accum_by_a_trans(rhs_y, &mut self.q);

        let tol = match iter {
            Some(it) => E::max(CG_TOL_FLOOR, norm(&self.q) / ((it + 1) as E).powf(CG_RATE)),
            None => CG_TOL_FLOOR,
        };

        match warm {
            Some(w) => rhs_x.copy_from_slice(&w[..n]),
            None => rhs_x.fill(0.0),
        }
        let mut z_x = vec![0.0; n];
        z_x.copy_from_slice(rhs_x);
        self.cg_iters += self.conjugate_gradient(&mut z_x, tol, 2 * n + 10);
        self.n_solves += 1;

        if z_x.iter().any(|v| !v.is_finite()) {
            return Err(LinSysError::NotConverged.into());
        }

        // z_y = A z_x - r_y
        rhs_x.copy_from_slice(&z_x);
        self.tmp_m.fill(0.0);
        self.data.accum_by_a(&z_x, &mut self.tmp_m);
        for (yi, ti) in rhs_y.iter_mut().zip(&self.tmp_m) {
            *yi = ti - *yi;
        }
        Ok(())
    }

    fn method(&self) -> &str {
        "sparse-indirect"
    }

    fn summary(&self, _info: &Info) -> Option<String> {
        if self.n_solves == 0 {
            return None;
        }
        let mut out = String::new();
        let _ = writeln!(
            out,
            "avg CG iterations: {:.2}",
            self.cg_iters as E / self.n_solves as E
        );
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::vector_ops::norm_diff;

    fn small_data() -> Data {
        // A = [1 0; 2 3; 0 -1]
        Data::new(
            3,
            2,
            vec![0, 2, 4],
            vec![0, 1, 1, 2],
            vec![1.0, 2.0, 3.0, -1.0],
            vec![0.0; 3],
            vec![0.0; 2],
        )
    }

    fn kkt_residual(data: &Data, rho_x: E, z: &[E], rhs: &[E]) -> E {
        let (m, n) = (data.m, data.n);
        let mut out = vec![0.0; n + m];
        for j in 0..n {
            out[j] = rho_x * z[j];
        }
        data.accum_by_a_trans(&z[n..], &mut out[..n]);
        data.accum_by_a(&z[..n], &mut out[n..]);
        for i in 0..m {
            out[n + i] -= z[n + i];
        }
        norm_diff(&out, rhs)
    }

    #[test]
    fn test_indirect_solves_kkt_system() {
        let data = small_data();
        let settings = Settings::default();
        let mut solver = IndirectKktSolver::new(&data, &settings).unwrap();

        let rhs = vec![1.0, -2.0, 0.5, 3.0, -1.0];
        let mut z = rhs.clone();
        solver.solve(&mut z, None, None).unwrap();
        assert!(kkt_residual(&data, settings.rho_x, &z, &rhs) < 1e-6);
    }

    #[test]
    fn test_indirect_warm_start_matches_cold() {
        let data = small_data();
        let settings = Settings::default();
        let mut solver = IndirectKktSolver::new(&data, &settings).unwrap();

        let rhs = vec![1.0, -2.0, 0.5, 3.0, -1.0];
        let mut cold = rhs.clone();
        solver.solve(&mut cold, None, None).unwrap();

        let mut warm = rhs.clone();
        let hint = cold.clone();
        solver.solve(&mut warm, Some(&hint), None).unwrap();
        assert!(norm_diff(&cold, &warm) < 1e-6);
    }
}
