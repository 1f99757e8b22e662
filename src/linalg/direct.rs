//! Direct solver for the splitting iteration's quasi-definite system.
//!
//! Assembles the KKT matrix
//!
//! ```text
//! K = [ rho_x * I   A^T ]
//!     [     A       -I  ]
//! ```
//!
//! once per workspace, computes an AMD fill-reducing ordering, and prefactors
//! with Faer's simplicial LDLT. Quasi-definiteness guarantees the
//! factorization exists without pivoting under any symmetric permutation, so
//! each per-iteration solve is two triangular sweeps. The warm-start hint is
//! ignored.

use std::time::Instant;

use faer::Mat;
use faer::dyn_stack::{MemBuffer, MemStack, StackReq};
use faer::linalg::cholesky::ldlt::factor::LdltRegularization;
use faer::perm::{Perm, PermRef};
use faer::prelude::{Reborrow, ReborrowMut};
use faer::sparse::linalg::amd;
use faer::sparse::linalg::cholesky::simplicial::{self, SymbolicSimplicialCholesky};
use faer::sparse::{SparseColMat, SparseColMatRef, SymbolicSparseColMat, Triplet};
use problemo::{Problem, ProblemResult};

use crate::linalg::solver::{KktSolver, LinSysError};
use crate::problem::Data;
use crate::{E, I, Info, Settings};

pub struct DirectKktSolver {
    dim: I,
    symbolic: SymbolicSimplicialCholesky<I>,
    /// Numeric LDLT values, laid out per the symbolic analysis.
    l_values: Vec<E>,
    /// Fill-reducing permutation of the KKT matrix.
    perm: Perm<I>,
    /// Right-hand side scratch reused across solves.
    rhs: Mat<E>,
    n_solves: usize,
    solve_time: E,
}

impl KktSolver for DirectKktSolver {
    fn new(data: &Data, settings: &Settings) -> Result<Self, Problem> {
        let (m, n) = (data.m, data.n);
        let dim = n + m;

        let kkt = assemble_kkt(data, settings.rho_x)?;
        let nnz = kkt.as_ref().compute_nnz();

        // Fill reducing permutation
        let (perm_fwd, perm_inv) = {
            let mut perm = Vec::new();
            let mut perm_inv = Vec::new();
            perm.try_reserve_exact(dim)
                .via(LinSysError::MemoryReservation)?;
            perm_inv
                .try_reserve_exact(dim)
                .via(LinSysError::MemoryReservation)?;
            perm.resize(dim, 0usize);
            perm_inv.resize(dim, 0usize);

            let mut mem = MemBuffer::try_new(amd::order_scratch::<I>(dim, nnz))
                .via(LinSysError::MemoryAllocation)?;
            amd::order(
                &mut perm,
                &mut perm_inv,
                kkt.as_ref().symbolic(),
                amd::Control::default(),
                MemStack::new(&mut mem),
            )
            .via(LinSysError::SymbolicFactorization)?;

            (perm, perm_inv)
        };
        let perm = unsafe {
            Perm::new_unchecked(perm_fwd.into_boxed_slice(), perm_inv.into_boxed_slice())
        };

        let kkt_upper = permuted_upper(kkt.as_ref(), perm.as_ref())?;

        // symbolic analysis
        let symbolic = {
            let mut mem = MemBuffer::try_new(StackReq::any_of(&[
                simplicial::prefactorize_symbolic_cholesky_scratch::<I>(dim, nnz),
                simplicial::factorize_simplicial_symbolic_cholesky_scratch::<I>(dim),
            ]))
            .via(LinSysError::MemoryAllocation)?;
            let stack = MemStack::new(&mut mem);

            let mut etree = Vec::new();
            let mut col_counts = Vec::new();
            etree
                .try_reserve_exact(dim)
                .via(LinSysError::MemoryReservation)?;
            etree.resize(dim, 0isize);
            col_counts
                .try_reserve_exact(dim)
                .via(LinSysError::MemoryReservation)?;
            col_counts.resize(dim, 0usize);

            simplicial::prefactorize_symbolic_cholesky(
                &mut etree,
                &mut col_counts,
                kkt_upper.as_ref().symbolic(),
                stack,
            );
            simplicial::factorize_simplicial_symbolic_cholesky(
                kkt_upper.as_ref().symbolic(),
                // SAFETY: `etree` was filled by
                // `simplicial::prefactorize_symbolic_cholesky` above.
                unsafe { simplicial::EliminationTreeRef::from_inner(&etree) },
                &col_counts,
                stack,
            )
            .via(LinSysError::SymbolicFactorization)?
        };

        // numeric factorization
        let mut l_values = Vec::new();
        l_values
            .try_reserve_exact(symbolic.len_val())
            .via(LinSysError::MemoryReservation)?;
        l_values.resize(symbolic.len_val(), 0.0f64);

        {
            let mut mem = MemBuffer::try_new(
                simplicial::factorize_simplicial_numeric_ldlt_scratch::<I, E>(dim),
            )
            .via(LinSysError::MemoryAllocation)?;
            let stack = MemStack::new(&mut mem);

            simplicial::factorize_simplicial_numeric_ldlt::<I, E>(
                &mut l_values,
                kkt_upper.rb(),
                LdltRegularization::default(),
                &symbolic,
                stack,
            )
            .via(LinSysError::NumericFactorization)?;
        }

        Ok(Self {
            dim,
            symbolic,
            l_values,
            perm,
            rhs: Mat::zeros(dim, 1),
            n_solves: 0,
            solve_time: 0.0,
        })
    }

    fn solve(
        &mut self,
        rhs: &mut [E],
        _warm: Option<&[E]>,
        _iter: Option<usize>,
    ) -> Result<(), Problem> {
        if rhs.len() != self.dim {
            return Err(LinSysError::DimensionMismatch.into());
        }
        let start = Instant::now();

        for (i, &v) in rhs.iter().enumerate() {
            self.rhs[(i, 0)] = v;
        }

        let ldlt = simplicial::SimplicialLdltRef::<'_, I, E>::new(&self.symbolic, &self.l_values);

        let mut mem = MemBuffer::try_new(StackReq::all_of(&[
            faer::perm::permute_rows_in_place_scratch::<I, E>(self.dim, 1),
            self.symbolic.solve_in_place_scratch::<E>(self.dim),
        ]))
        .via(LinSysError::MemoryAllocation)?;
        let stack = MemStack::new(&mut mem);

        let mut sol = self.rhs.as_mut();
        faer::perm::permute_rows_in_place(sol.rb_mut(), self.perm.as_ref(), stack);
        ldlt.solve_in_place_with_conj(faer::Conj::No, sol.rb_mut(), faer::Par::Seq, stack);
        faer::perm::permute_rows_in_place(sol.rb_mut(), self.perm.as_ref().inverse(), stack);

        for (i, v) in rhs.iter_mut().enumerate() {
            *v = self.rhs[(i, 0)];
        }

        self.n_solves += 1;
        self.solve_time += start.elapsed().as_secs_f64();
        Ok(())
    }

    fn method(&self) -> &str {
        "sparse-direct"
    }

    fn summary(&self, _info: &Info) -> Option<String> {
        if self.n_solves == 0 {
            return None;
        }
        Some(format!(
            "avg linsys solve time: {:.2e}s\n",
            self.solve_time / self.n_solves as E
        ))
    }
}

/// Assembles the full symmetric KKT matrix from the problem data.
fn assemble_kkt(data: &Data, rho_x: E) -> Result<SparseColMat<I, E>, Problem> {
    let (m, n) = (data.m, data.n);
    let dim = n + m;

    let mut triplets = Vec::new();
    triplets
        .try_reserve_exact(dim + 2 * data.nnz())
        .via(LinSysError::MemoryReservation)?;
    for j in 0..n {
        triplets.push(Triplet::new(j, j, rho_x));
        let (rows, vals) = data.col(j);
        for (&i, &v) in rows.iter().zip(vals) {
            triplets.push(Triplet::new(n + i, j, v));
            triplets.push(Triplet::new(j, n + i, v));
        }
    }
    for i in 0..m {
        triplets.push(Triplet::new(n + i, n + i, -1.0));
    }

    SparseColMat::try_new_from_triplets(dim, dim, &triplets)
        .via(LinSysError::SymbolicFactorization)
}

/// Extracts the upper triangle of the symmetrically permuted matrix.
fn permuted_upper(
    mat: SparseColMatRef<I, E>,
    perm: PermRef<I>,
) -> Result<SparseColMat<I, E>, Problem> {
    let dim = mat.ncols();
    let nnz = mat.compute_nnz();

    let mut col_ptrs = Vec::new();
    let mut row_indices = Vec::new();
    let mut values = Vec::new();

    col_ptrs
        .try_reserve_exact(dim + 1)
        .via(LinSysError::MemoryReservation)?;
    col_ptrs.resize(dim + 1, 0usize);
    row_indices
        .try_reserve_exact(nnz)
        .via(LinSysError::MemoryReservation)?;
    row_indices.resize(nnz, 0usize);
    values
        .try_reserve_exact(nnz)
        .via(LinSysError::MemoryReservation)?;
    values.resize(nnz, 0.0f64);

    let mut mem = MemBuffer::try_new(faer::sparse::utils::permute_self_adjoint_scratch::<I>(dim))
        .via(LinSysError::MemoryAllocation)?;
    faer::sparse::utils::permute_self_adjoint_to_unsorted(
        &mut values,
        &mut col_ptrs,
        &mut row_indices,
        mat.rb(),
        perm.rb(),
        faer::Side::Upper,
        faer::Side::Upper,
        MemStack::new(&mut mem),
    );

    Ok(SparseColMat::<I, E>::new(
        unsafe { SymbolicSparseColMat::new_unchecked(dim, dim, col_ptrs, None, row_indices) },
        values,
    ))
}
