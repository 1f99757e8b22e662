//! Solution extraction and status classification.
//!
//! After the loop exits, the raw iterates split into `(x, y, s)` and the
//! homogenization scalars decide the outcome: `tau` dominant means optimal,
//! a vanishing iterate is indeterminate, and otherwise the sign of the
//! objective gap picks between the two certificate cases. The certificates
//! are normalized in [`Solver::get_info`], which also recomputes exact
//! residuals on the extracted point.

use crate::E;
use crate::linalg::vector_ops::{inner_prod, norm, scale};
use crate::solver::{Convergence, Solver};
use crate::{Info, Solution, Status};

impl Solver<'_> {
    /// Splits the iterates into a solution and classifies the outcome.
    pub(crate) fn set_solution(&self, termination: Convergence) -> (Solution, Status) {
        let (m, n, l) = (self.scaled.m, self.scaled.n, self.l);

        let mut x = self.u[..n].to_vec();
        let mut y = self.u[n..n + m].to_vec();
        let mut s = self.v[n..n + m].to_vec();

        let status = match termination {
            Convergence::Terminated(Status::Infeasible) => {
                x.fill(E::NAN);
                s.fill(E::NAN);
                Status::Infeasible
            }
            Convergence::Terminated(Status::Unbounded) => {
                y.fill(E::NAN);
                Status::Unbounded
            }
            // still running at the iteration limit, or converged to optimal
            _ => {
                let tau = self.u[l - 1];
                let kap = self.v[l - 1].abs();
                if tau > self.settings.undet_tol && tau > kap {
                    scale(&mut x, 1.0 / tau);
                    scale(&mut y, 1.0 / tau);
                    scale(&mut s, 1.0 / tau);
                    Status::Solved
                } else if norm(&self.u) < self.settings.undet_tol * (l as E).sqrt() {
                    x.fill(E::NAN);
                    y.fill(E::NAN);
                    s.fill(E::NAN);
                    Status::Indeterminate
                } else {
                    let b_ty = inner_prod(&self.scaled.b, &y);
                    let c_tx = inner_prod(&self.scaled.c, &x);
                    if b_ty < c_tx {
                        x.fill(E::NAN);
                        s.fill(E::NAN);
                        Status::Infeasible
                    } else {
                        y.fill(E::NAN);
                        Status::Unbounded
                    }
                }
            }
        };
        (Solution { x, y, s }, status)
    }

    /// Computes the reported metrics on the extracted point and normalizes
    /// the certificate rays. The solution is still on the internal scaling
    /// here; unscaling happens last.
    pub(crate) fn get_info(
        &mut self,
        sol: &mut Solution,
        status: Status,
        iter: usize,
        elapsed: E,
    ) -> Info {
        let (nmpr, nm_axs) = self.calc_primal_resid(&sol.x, &sol.s, 1.0);
        let (nmdr, nm_aty) = self.calc_dual_resid(&sol.y, 1.0);

        let mut c_tx = inner_prod(&sol.x, &self.scaled.c);
        let mut b_ty = inner_prod(&sol.y, &self.scaled.b);
        if self.scaling.is_some() {
            c_tx /= self.scale_factor * self.sc_c * self.sc_b;
            b_ty /= self.scale_factor * self.sc_c * self.sc_b;
        }

        let mut info = Info {
            status_val: status.value(),
            status: status.to_string(),
            iter,
            pobj: c_tx,
            dobj: -b_ty,
            res_pri: E::NAN,
            res_dual: E::NAN,
            rel_gap: E::NAN,
            time: elapsed,
        };

        match status {
            Status::Solved => {
                info.rel_gap = (c_tx + b_ty).abs() / (1.0 + c_tx.abs() + b_ty.abs());
                info.res_pri = nmpr / (1.0 + self.nm_b);
                info.res_dual = nmdr / (1.0 + self.nm_c);
            }
            Status::Unbounded => {
                info.pobj = -1.0;
                info.dobj = E::NAN;
                info.res_pri = self.nm_c * nm_axs / -c_tx;
                scale(&mut sol.x, -1.0 / c_tx);
                scale(&mut sol.s, -1.0 / c_tx);
            }
            Status::Infeasible => {
                info.pobj = E::NAN;
                info.dobj = -1.0;
                info.res_dual = self.nm_b * nm_aty / -b_ty;
                scale(&mut sol.y, -1.0 / b_ty);
            }
            Status::Indeterminate => {
                info.pobj = E::NAN;
                info.dobj = E::NAN;
            }
            Status::Failure => {}
        }
        info
    }
}

/// The terminal state for rejected input or an aborted solve: NaN solution
/// vectors and a `Failure` info block.
pub(crate) fn failure_return(n: usize, m: usize) -> (Solution, Info) {
    (
        Solution {
            x: vec![E::NAN; n],
            y: vec![E::NAN; m],
            s: vec![E::NAN; m],
        },
        Info {
            status_val: Status::Failure.value(),
            status: Status::Failure.to_string(),
            iter: 0,
            pobj: E::NAN,
            dobj: E::NAN,
            res_pri: E::NAN,
            res_dual: E::NAN,
            rel_gap: E::NAN,
            time: E::NAN,
        },
    )
}
