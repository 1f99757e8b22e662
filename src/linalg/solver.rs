use derive_more::{Display, Error};
use problemo::Problem;

use crate::E;
use crate::problem::Data;
use crate::{Info, Settings};

#[derive(Debug, Display, Error, PartialEq)]
pub enum LinSysError {
    #[display("Symbolic factorization error")]
    SymbolicFactorization,

    #[display("Numeric factorization error")]
    NumericFactorization,

    #[display("Memory reservation failed")]
    MemoryReservation,

    #[display("Memory allocation failed")]
    MemoryAllocation,

    #[display("Right-hand side dimension mismatch")]
    DimensionMismatch,

    #[display("Iterative solve did not converge")]
    NotConverged,
}

/// Strategy seam for the linear-system step of the splitting iteration.
///
/// Every iteration solves the same quasi-definite system
///
/// ```text
/// [ rho_x * I   A^T ] [ z_x ]   [ r_x ]
/// [     A       -I  ] [ z_y ] = [ r_y ]
/// ```
///
/// so implementations may prefactor in `new` and reuse the factorization for
/// the lifetime of the workspace. `solve` overwrites `rhs` with the solution;
/// `warm` is a hint an iterative method may start from, and `iter` is the
/// surrounding iteration index (`None` during workspace setup). Accuracy must
/// not degrade the convergence of the outer iteration.
pub trait KktSolver {
    /// Prefactors or otherwise prepares for repeated solves against the
    /// (already scaled) problem data.
    fn new(data: &Data, settings: &Settings) -> Result<Self, Problem>
    where
        Self: Sized;

    /// Solves the system in place.
    fn solve(&mut self, rhs: &mut [E], warm: Option<&[E]>, iter: Option<usize>)
    -> Result<(), Problem>;

    /// Short human-readable name, owned by the solver.
    fn method(&self) -> &str;

    /// Optional end-of-solve summary line for the verbose footer.
    fn summary(&self, _info: &Info) -> Option<String> {
        None
    }
}
