//! # splitcone
//!
//! A first-order solver for convex cone programs
//!
//! ```text
//! min  c^T x
//! s.t. A x + s = b
//!      s in K
//! ```
//!
//! with dual variable `y in K*`, where `K` is a product of closed convex
//! cones. The method is operator splitting (ADMM) on the homogeneous
//! self-dual embedding, so one iteration stream produces an optimal point, a
//! primal-infeasibility certificate, or a dual-unboundedness certificate
//! without branching on which case holds.
//!
//! The one-shot entry point is [`solve`]; [`Solver`] exposes the
//! init / solve / drop lifecycle for workspace reuse and warm-start
//! continuation.

use derive_more::Display;
use serde::{Deserialize, Serialize};

pub type E = f64;
pub type I = usize;

pub mod callback;
pub mod cones;
pub mod linalg;
mod normalize;
pub mod problem;
pub mod solver;

#[cfg(test)]
pub mod tests;

pub use callback::Callback;
pub use cones::{Cone, ConeWork};
pub use linalg::solver::KktSolver;
pub use problem::Data;
pub use solver::residuals::Residuals;
pub use solver::{Solver, solve};

/// Terminal status of a solve.
#[derive(Debug, Display, PartialEq, Eq, Clone, Copy)]
pub enum Status {
    /// An optimal primal-dual pair was found to the requested tolerance.
    #[display("Solved")]
    Solved,
    /// The primal is unbounded below; `x`/`s` carry the certificate ray.
    #[display("Unbounded")]
    Unbounded,
    /// The primal is infeasible; `y` carries the certificate ray.
    #[display("Infeasible")]
    Infeasible,
    /// The iterates vanished; nothing can be concluded.
    #[display("Indeterminate")]
    Indeterminate,
    /// Invalid input or an aborted solve.
    #[display("Failure")]
    Failure,
}

impl Status {
    /// Integer encoding used by [`Info::status_val`]. Zero is reserved for
    /// "still running" and never surfaces.
    pub fn value(self) -> i32 {
        match self {
            Status::Solved => 1,
            Status::Unbounded => -1,
            Status::Infeasible => -2,
            Status::Indeterminate => -3,
            Status::Failure => -4,
        }
    }
}

/// Which linear-system subsolver backs the affine projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinSysChoice {
    /// Prefactored sparse LDLT; constant cost per iteration.
    Direct,
    /// Conjugate gradient on the reduced system; matrix-free, warm-started.
    Indirect,
}

/// Solver configuration. [`Settings::default`] matches the documented
/// defaults; construct with struct-update syntax for one-off overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Termination tolerance for residuals, gap, and certificates.
    pub eps: E,
    /// Over-relaxation parameter of the splitting, in (0, 2).
    pub alpha: E,
    /// Regularization of the x block of the KKT matrix.
    pub rho_x: E,
    /// Iteration limit; 0 runs no iterations and classifies the start point.
    pub max_iters: usize,
    /// Equilibrate the data before solving.
    pub normalize: bool,
    /// Global scaling applied with normalization.
    pub scale: E,
    /// Seed the iterates from a previous solution passed to
    /// [`Solver::solve`].
    pub warm_start: bool,
    /// Print progress and the final report to stdout.
    pub verbose: bool,
    /// Threshold below which the homogenization scalars are treated as zero
    /// when classifying the outcome.
    pub undet_tol: E,
    /// Linear-system subsolver selection.
    pub linsys: LinSysChoice,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            eps: 1e-3,
            alpha: 1.5,
            rho_x: 1e-3,
            max_iters: 2500,
            normalize: true,
            scale: 1.0,
            warm_start: false,
            verbose: true,
            undet_tol: 1e-9,
            linsys: LinSysChoice::Direct,
        }
    }
}

/// Primal-dual solution triple. For certificate statuses the vectors hold
/// the normalized ray (see [`Status`]); unusable blocks are NaN.
#[derive(Debug, Clone)]
pub struct Solution {
    pub x: Vec<E>,
    pub y: Vec<E>,
    pub s: Vec<E>,
}

/// Summary of a finished solve.
#[derive(Debug, Clone)]
pub struct Info {
    /// Integer encoding of `status`: Solved = 1, Unbounded = -1,
    /// Infeasible = -2, Indeterminate = -3, Failure = -4.
    pub status_val: i32,
    /// Human-readable status string.
    pub status: String,
    /// Iterations taken.
    pub iter: usize,
    /// Primal objective `c'x` (-1 for unbounded, NaN when meaningless).
    pub pobj: E,
    /// Dual objective `-b'y` (-1 for infeasible, NaN when meaningless).
    pub dobj: E,
    /// Primal residual, or the unboundedness certificate quality.
    pub res_pri: E,
    /// Dual residual, or the infeasibility certificate quality.
    pub res_dual: E,
    /// Relative duality gap.
    pub rel_gap: E,
    /// Wall-clock seconds.
    pub time: E,
}
