//! The splitting iteration on the homogeneous self-dual embedding.
//!
//! The primal-dual pair is lifted into `(x, y, tau)` / `(0, s, kappa)`
//! iterates of length `l = n + m + 1`. Each iteration projects onto the
//! affine subspace encoding the KKT conditions (a constant quasi-definite
//! solve), then onto the cone product, then takes a relaxed dual step. The
//! relative magnitudes of `tau` and `kappa` at a fixed point determine
//! whether the outcome is an optimum or a certificate of primal
//! infeasibility / dual unboundedness.
//!
//! A [`Solver`] is the workspace: it owns the iterates, a scaled copy of the
//! problem data, the prefactored linear-system subsolver, and the cone
//! projection state. One value may run [`Solver::solve`] repeatedly over the
//! same dimensions, which is how warm-start continuation works.

pub(crate) mod residuals;
pub(crate) mod solution;

use std::time::Instant;

use problemo::Problem;

use crate::callback::{Callback, NoOpCallback, PRINT_INTERVAL, SummaryPrinter};
use crate::cones::{Cone, ConeWork};
use crate::linalg::direct::DirectKktSolver;
use crate::linalg::indirect::IndirectKktSolver;
use crate::linalg::solver::KktSolver;
use crate::linalg::vector_ops::{add_scaled, inner_prod, norm, scale};
use crate::normalize::{Scaling, equilibrate, scale_bc, scale_warm_start, unscale_solution};
use crate::problem::Data;
use crate::solver::residuals::Residuals;
use crate::solver::solution::failure_return;
use crate::{E, Info, LinSysChoice, Settings, Solution, Status};

/// Outcome of a convergence check. The integer status encoding only
/// materializes in [`Info::status_val`]; the loop itself never traffics in a
/// "zero means keep going" sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Convergence {
    Running,
    Terminated(Status),
}

/// Workspace for one problem. Holds everything a solve mutates.
pub struct Solver<'a> {
    data: &'a Data,
    cone: &'a Cone,
    pub(crate) settings: Settings,

    /// Scaled working copy; `A` is equilibrated once at init, `b` and `c`
    /// are refreshed from `data` and rescaled at the start of every solve.
    pub(crate) scaled: Data,
    pub(crate) scaling: Option<Scaling>,
    /// Global scale factor; 1 when normalization is off.
    pub(crate) scale_factor: E,
    pub(crate) sc_b: E,
    pub(crate) sc_c: E,
    /// Norms of the caller's (unscaled) `b` and `c`.
    pub(crate) nm_b: E,
    pub(crate) nm_c: E,

    /// Embedding dimension `n + m + 1`.
    pub(crate) l: usize,
    pub(crate) u: Vec<E>,
    pub(crate) v: Vec<E>,
    pub(crate) u_t: Vec<E>,
    pub(crate) u_prev: Vec<E>,
    h: Vec<E>,
    g: Vec<E>,
    gth: E,
    pub(crate) pr: Vec<E>,
    pub(crate) dr: Vec<E>,

    linsys: Box<dyn KktSolver>,
    method: String,
    cone_work: ConeWork,
    callback: Box<dyn Callback>,
}

impl<'a> Solver<'a> {
    /// Validates the input, equilibrates a working copy, prefactors the
    /// linear-system subsolver, and allocates the workspace.
    pub fn init(data: &'a Data, cone: &'a Cone, settings: &Settings) -> Result<Self, Problem> {
        data.validate(cone, settings)?;

        let mut scaled = data.clone();
        let scale_factor = if settings.normalize {
            settings.scale
        } else {
            1.0
        };
        let scaling = settings
            .normalize
            .then(|| equilibrate(&mut scaled, scale_factor));

        let linsys: Box<dyn KktSolver> = match settings.linsys {
            LinSysChoice::Direct => Box::new(DirectKktSolver::new(&scaled, settings)?),
            LinSysChoice::Indirect => Box::new(IndirectKktSolver::new(&scaled, settings)?),
        };
        let method = linsys.method().to_string();
        let cone_work = ConeWork::new(cone)?;

        let (m, n) = (data.m, data.n);
        let l = n + m + 1;
        let callback: Box<dyn Callback> = if settings.verbose {
            Box::new(SummaryPrinter::new())
        } else {
            Box::new(NoOpCallback)
        };

        Ok(Self {
            data,
            cone,
            settings: settings.clone(),
            scaled,
            scaling,
            scale_factor,
            sc_b: 1.0,
            sc_c: 1.0,
            nm_b: 0.0,
            nm_c: 0.0,
            l,
            u: vec![0.0; l],
            v: vec![0.0; l],
            u_t: vec![0.0; l],
            u_prev: vec![0.0; l],
            h: vec![0.0; l - 1],
            g: vec![0.0; l - 1],
            gth: 0.0,
            pr: vec![0.0; m],
            dr: vec![0.0; n],
            linsys,
            method,
            cone_work,
            callback,
        })
    }

    /// Runs the iteration to a terminal status. `warm` seeds the iterates
    /// when warm-starting is enabled and the dimensions match; otherwise the
    /// solve cold-starts. Never fails: an aborted solve reports `Failure`
    /// with NaN solution vectors.
    pub fn solve(&mut self, warm: Option<&Solution>) -> (Solution, Info) {
        let start = Instant::now();
        self.solve_inner(warm, start)
            .unwrap_or_else(|_| failure_return(self.data.n, self.data.m))
    }

    fn solve_inner(
        &mut self,
        warm: Option<&Solution>,
        start: Instant,
    ) -> Result<(Solution, Info), Problem> {
        self.update_work(warm)?;
        self.callback
            .header(self.data, self.cone, &self.settings, &self.method);

        let mut r = Residuals::new();
        let mut termination = Convergence::Running;
        let mut iters_done = self.settings.max_iters;

        for i in 0..self.settings.max_iters {
            self.u_prev.copy_from_slice(&self.u);

            self.project_lin_sys(i)?;
            self.project_cones(i)?;
            self.update_dual_vars();

            termination = self.converged(i, &mut r);
            if let Convergence::Terminated(_) = termination {
                iters_done = i;
                break;
            }

            if i % PRINT_INTERVAL == 0 {
                self.callback
                    .summary(i, &r, start.elapsed().as_secs_f64());
            }
        }
        self.callback
            .summary(iters_done, &r, start.elapsed().as_secs_f64());

        let (mut sol, status) = self.set_solution(termination);
        let info = self.get_info(&mut sol, status, iters_done, start.elapsed().as_secs_f64());

        let linsys_summary = self.linsys.summary(&info);
        self.callback.footer(
            &info,
            iters_done == self.settings.max_iters,
            linsys_summary,
        );

        if let Some(scaling) = &self.scaling {
            unscale_solution(
                &mut sol.x,
                &mut sol.y,
                &mut sol.s,
                scaling,
                self.sc_b,
                self.sc_c,
                self.scale_factor,
            );
        }
        Ok((sol, info))
    }

    /// Per-solve setup: norms of the original data, b/c scaling, start
    /// iterates, and the `h`/`g`/`g'h` precomputation.
    fn update_work(&mut self, warm: Option<&Solution>) -> Result<(), Problem> {
        let (m, n) = (self.data.m, self.data.n);

        self.nm_b = norm(&self.data.b);
        self.nm_c = norm(&self.data.c);

        self.scaled.b.copy_from_slice(&self.data.b);
        self.scaled.c.copy_from_slice(&self.data.c);
        (self.sc_b, self.sc_c) = match &self.scaling {
            Some(scaling) => scale_bc(&mut self.scaled, scaling, self.scale_factor),
            None => (1.0, 1.0),
        };

        match warm {
            Some(sol)
                if self.settings.warm_start
                    && sol.x.len() == n
                    && sol.y.len() == m
                    && sol.s.len() == m =>
            {
                self.warm_start_vars(sol)
            }
            _ => self.cold_start_vars(),
        }

        self.h[..n].copy_from_slice(&self.scaled.c);
        self.h[n..].copy_from_slice(&self.scaled.b);
        self.g.copy_from_slice(&self.h);
        self.linsys.solve(&mut self.g, None, None)?;
        scale(&mut self.g[n..], -1.0);
        self.gth = inner_prod(&self.h, &self.g);
        Ok(())
    }

    fn cold_start_vars(&mut self) {
        let l = self.l;
        self.u.fill(0.0);
        self.v.fill(0.0);
        self.u[l - 1] = (l as E).sqrt();
        self.v[l - 1] = (l as E).sqrt();
    }

    fn warm_start_vars(&mut self, sol: &Solution) {
        let (m, n, l) = (self.data.m, self.data.n, self.l);
        self.u[..n].copy_from_slice(&sol.x);
        self.u[n..n + m].copy_from_slice(&sol.y);
        self.u[l - 1] = 1.0;
        self.v[..n].fill(0.0);
        self.v[n..n + m].copy_from_slice(&sol.s);
        self.v[l - 1] = 0.0;

        if let Some(scaling) = &self.scaling {
            let (ux, rest) = self.u.split_at_mut(n);
            let uy = &mut rest[..m];
            let vs = &mut self.v[n..n + m];
            scale_warm_start(
                ux,
                uy,
                vs,
                scaling,
                self.sc_b,
                self.sc_c,
                self.scale_factor,
            );
        }
    }

    /// Projection onto the affine subspace through the subsolver.
    fn project_lin_sys(&mut self, iter: usize) -> Result<(), Problem> {
        let (n, l) = (self.scaled.n, self.l);

        for i in 0..l {
            self.u_t[i] = self.u[i] + self.v[i];
        }
        scale(&mut self.u_t[..n], self.settings.rho_x);

        let tau_t = self.u_t[l - 1];
        add_scaled(&mut self.u_t[..l - 1], &self.h, -tau_t);
        let gh = inner_prod(&self.u_t[..l - 1], &self.g) / (self.gth + 1.0);
        add_scaled(&mut self.u_t[..l - 1], &self.h, -gh);
        scale(&mut self.u_t[n..l - 1], -1.0);

        self.linsys
            .solve(&mut self.u_t[..l - 1], Some(&self.u[..l - 1]), Some(iter))?;

        self.u_t[l - 1] += inner_prod(&self.u_t[..l - 1], &self.h);
        Ok(())
    }

    /// Relaxed projection of the dual block onto `K*`; the x block is not
    /// relaxed. Keeps `u[l-1] >= 0`.
    fn project_cones(&mut self, iter: usize) -> Result<(), Problem> {
        let (m, n, l) = (self.scaled.m, self.scaled.n, self.l);
        let alpha = self.settings.alpha;

        for i in 0..n {
            self.u[i] = self.u_t[i] - self.v[i];
        }
        for i in n..l {
            self.u[i] = alpha * self.u_t[i] + (1.0 - alpha) * self.u_prev[i] - self.v[i];
        }
        self.cone_work
            .proj_dual(self.cone, &mut self.u[n..n + m], iter)?;
        if self.u[l - 1] < 0.0 {
            self.u[l - 1] = 0.0;
        }
        Ok(())
    }

    fn update_dual_vars(&mut self) {
        let (n, l) = (self.scaled.n, self.l);
        let alpha = self.settings.alpha;

        if (alpha - 1.0).abs() < 1e-9 {
            for i in n..l {
                self.v[i] += self.u[i] - self.u_t[i];
            }
        } else {
            for i in n..l {
                self.v[i] += self.u[i] - alpha * self.u_t[i] - (1.0 - alpha) * self.u_prev[i];
            }
        }
    }
}

/// Solves the conic program in one shot: validate, allocate, iterate,
/// extract. Invalid input or a failed setup yields `Failure` with NaN
/// solution vectors rather than an error.
pub fn solve(data: &Data, cone: &Cone, settings: &Settings) -> (Solution, Info) {
    match Solver::init(data, cone, settings) {
        Ok(mut solver) => solver.solve(None),
        Err(problem) => {
            if settings.verbose {
                println!("FAILURE: {problem}");
            }
            failure_return(data.num_vars(), data.num_cons())
        }
    }
}
