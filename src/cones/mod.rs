//! Cone descriptors and Euclidean projections onto them.
//!
//! A [`Cone`] describes a product of primitive cones in a fixed block order:
//! zero cone, nonnegative orthant, box cone, second-order cones,
//! positive-semidefinite cones, primal exponential cones, dual exponential
//! cones, power cones. The slack block of the conic program lives in this
//! product, so the total dimension must match the number of rows of `A`.
//!
//! [`ConeWork`] owns the projection scratch for one solver workspace.

pub(crate) mod exp;
pub(crate) mod psd;

use derive_more::{Display, Error};
use faer::Mat;
use problemo::Problem;

use crate::E;
use crate::linalg::vector_ops::{norm, scale};

/// Invalid cone descriptor.
#[derive(Debug, Display, Error, PartialEq)]
pub enum ConeError {
    #[display("second-order cone dimensions must be positive")]
    EmptySoc,

    #[display("semidefinite cone orders must be positive")]
    EmptyPsd,

    #[display("box cone bounds have mismatched lengths")]
    BoxBoundsMismatch,

    #[display("box cone bounds must satisfy lower <= upper")]
    BoxBoundsInverted,

    #[display("power cone parameters must lie in [-1,1] and be nonzero")]
    PowerParamOutOfRange,

    #[display("eigendecomposition failed in semidefinite projection")]
    Eigendecomposition,
}

/// Product-cone descriptor.
///
/// The slack vector is laid out in declaration order; each field contributes
/// the dimensions listed in its doc.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cone {
    /// Dimension of the zero cone (equality rows).
    pub zero: usize,
    /// Dimension of the nonnegative orthant.
    pub nonneg: usize,
    /// Lower bounds of the box cone `{(t, s) : t*bl <= s <= t*bu, t >= 0}`.
    /// Contributes `1 + bl.len()` dimensions when nonempty. Entries may be
    /// infinite.
    pub box_lower: Vec<E>,
    /// Upper bounds of the box cone; must match `box_lower` in length.
    pub box_upper: Vec<E>,
    /// Dimensions of second-order cones `{(t, z) : ||z|| <= t}`.
    pub soc: Vec<usize>,
    /// Side lengths of positive-semidefinite cones; each block stores a full
    /// column-major matrix and contributes `side * side` dimensions.
    pub psd: Vec<usize>,
    /// Number of primal exponential cones (3 dimensions each).
    pub exp_primal: usize,
    /// Number of dual exponential cones (3 dimensions each).
    pub exp_dual: usize,
    /// Power cone parameters, one 3-dimensional cone each; a negative
    /// parameter `-a` denotes the dual of the cone with parameter `a`.
    pub power: Vec<E>,
}

impl Cone {
    /// A single zero cone of dimension `dim`.
    pub fn zero(dim: usize) -> Self {
        Self {
            zero: dim,
            ..Self::default()
        }
    }

    /// A single nonnegative orthant of dimension `dim`.
    pub fn nonneg(dim: usize) -> Self {
        Self {
            nonneg: dim,
            ..Self::default()
        }
    }

    /// Second-order cones with the given dimensions.
    pub fn soc(dims: &[usize]) -> Self {
        Self {
            soc: dims.to_vec(),
            ..Self::default()
        }
    }

    /// Total dimension of the product.
    pub fn full_dim(&self) -> usize {
        let box_dim = if self.box_lower.is_empty() {
            0
        } else {
            1 + self.box_lower.len()
        };
        self.zero
            + self.nonneg
            + box_dim
            + self.soc.iter().sum::<usize>()
            + self.psd.iter().map(|s| s * s).sum::<usize>()
            + 3 * (self.exp_primal + self.exp_dual)
            + 3 * self.power.len()
    }

    /// Checks the descriptor for consistency.
    pub fn validate(&self) -> Result<(), Problem> {
        if self.soc.iter().any(|&q| q == 0) {
            return Err(ConeError::EmptySoc.into());
        }
        if self.psd.iter().any(|&s| s == 0) {
            return Err(ConeError::EmptyPsd.into());
        }
        if self.box_lower.len() != self.box_upper.len() {
            return Err(ConeError::BoxBoundsMismatch.into());
        }
        if self
            .box_lower
            .iter()
            .zip(&self.box_upper)
            .any(|(l, u)| l > u)
        {
            return Err(ConeError::BoxBoundsInverted.into());
        }
        if self.power.iter().any(|&a| !(a.abs() <= 1.0) || a == 0.0) {
            return Err(ConeError::PowerParamOutOfRange.into());
        }
        Ok(())
    }

    /// One-line-per-block description for the verbose header.
    pub fn header(&self) -> String {
        let mut out = String::new();
        if self.zero > 0 {
            out.push_str(&format!("zero vars: {}\n", self.zero));
        }
        if self.nonneg > 0 {
            out.push_str(&format!("linear vars: {}\n", self.nonneg));
        }
        if !self.box_lower.is_empty() {
            out.push_str(&format!("box vars: {}\n", 1 + self.box_lower.len()));
        }
        if !self.soc.is_empty() {
            out.push_str(&format!(
                "soc vars: {}, soc blocks: {}\n",
                self.soc.iter().sum::<usize>(),
                self.soc.len()
            ));
        }
        if !self.psd.is_empty() {
            out.push_str(&format!(
                "sd vars: {}, sd blocks: {}\n",
                self.psd.iter().map(|s| s * s).sum::<usize>(),
                self.psd.len()
            ));
        }
        if self.exp_primal > 0 {
            out.push_str(&format!("exp vars: {}\n", 3 * self.exp_primal));
        }
        if self.exp_dual > 0 {
            out.push_str(&format!("dual exp vars: {}\n", 3 * self.exp_dual));
        }
        if !self.power.is_empty() {
            out.push_str(&format!("power vars: {}\n", 3 * self.power.len()));
        }
        out
    }
}

/// Projection scratch owned by one workspace.
pub struct ConeWork {
    /// One symmetrized buffer per semidefinite block.
    psd_scratch: Vec<Mat<E>>,
    /// Negated box block for the Moreau decomposition in [`ConeWork::proj_dual`].
    box_scratch: Vec<E>,
}

impl ConeWork {
    /// Validates the descriptor and allocates projection scratch.
    pub fn new(cone: &Cone) -> Result<Self, Problem> {
        cone.validate()?;
        let box_dim = if cone.box_lower.is_empty() {
            0
        } else {
            1 + cone.box_lower.len()
        };
        Ok(Self {
            psd_scratch: cone.psd.iter().map(|&s| Mat::zeros(s, s)).collect(),
            box_scratch: vec![0.0; box_dim],
        })
    }

    /// Projects `x` onto the product cone in place. `x` must have length
    /// [`Cone::full_dim`]. The iteration index is carried for diagnostics.
    pub fn proj(&mut self, cone: &Cone, x: &mut [E], _iter: usize) -> Result<(), Problem> {
        let mut off = 0;

        for v in &mut x[off..off + cone.zero] {
            *v = 0.0;
        }
        off += cone.zero;

        for v in &mut x[off..off + cone.nonneg] {
            *v = E::max(*v, 0.0);
        }
        off += cone.nonneg;

        if !cone.box_lower.is_empty() {
            let dim = 1 + cone.box_lower.len();
            proj_box(&mut x[off..off + dim], &cone.box_lower, &cone.box_upper);
            off += dim;
        }

        for &q in &cone.soc {
            proj_soc(&mut x[off..off + q]);
            off += q;
        }

        for (&side, scratch) in cone.psd.iter().zip(&mut self.psd_scratch) {
            psd::proj_psd(&mut x[off..off + side * side], side, scratch)?;
            off += side * side;
        }

        for _ in 0..cone.exp_primal {
            exp::proj_exp(&mut x[off..off + 3]);
            off += 3;
        }
        for _ in 0..cone.exp_dual {
            exp::proj_exp_dual(&mut x[off..off + 3]);
            off += 3;
        }

        for &a in &cone.power {
            exp::proj_power(&mut x[off..off + 3], a);
            off += 3;
        }

        Ok(())
    }

    /// Projects `x` onto the dual of the product cone in place.
    ///
    /// This is the projection the iteration applies to its dual block: the
    /// slack lives in `K`, so the paired variable lives in `K*`. The zero
    /// cone dualizes to the free cone (no-op), the nonnegative orthant and
    /// the second-order and semidefinite cones are self-dual, the two
    /// exponential blocks swap, a power cone flips the sign of its
    /// parameter, and the box cone goes through the Moreau decomposition
    /// `proj_{K*}(w) = w + proj_K(-w)`.
    pub fn proj_dual(&mut self, cone: &Cone, x: &mut [E], _iter: usize) -> Result<(), Problem> {
        let mut off = cone.zero;

        for v in &mut x[off..off + cone.nonneg] {
            *v = E::max(*v, 0.0);
        }
        off += cone.nonneg;

        if !cone.box_lower.is_empty() {
            let dim = 1 + cone.box_lower.len();
            for (t, v) in self.box_scratch.iter_mut().zip(&x[off..off + dim]) {
                *t = -v;
            }
            proj_box(&mut self.box_scratch, &cone.box_lower, &cone.box_upper);
            for (v, t) in x[off..off + dim].iter_mut().zip(&self.box_scratch) {
                *v += t;
            }
            off += dim;
        }

        for &q in &cone.soc {
            proj_soc(&mut x[off..off + q]);
            off += q;
        }

        for (&side, scratch) in cone.psd.iter().zip(&mut self.psd_scratch) {
            psd::proj_psd(&mut x[off..off + side * side], side, scratch)?;
            off += side * side;
        }

        for _ in 0..cone.exp_primal {
            exp::proj_exp_dual(&mut x[off..off + 3]);
            off += 3;
        }
        for _ in 0..cone.exp_dual {
            exp::proj_exp(&mut x[off..off + 3]);
            off += 3;
        }

        for &a in &cone.power {
            exp::proj_power(&mut x[off..off + 3], -a);
            off += 3;
        }

        Ok(())
    }
}

/// Projection onto the second-order cone `{(t, z) : ||z|| <= t}`.
fn proj_soc(x: &mut [E]) {
    if x.len() == 1 {
        x[0] = E::max(x[0], 0.0);
        return;
    }
    let (t, z) = x.split_first_mut().unwrap();
    let nz = norm(z);
    if nz <= *t {
        return;
    }
    if nz <= -*t {
        *t = 0.0;
        for v in z.iter_mut() {
            *v = 0.0;
        }
        return;
    }
    let alpha = 0.5 * (*t + nz);
    *t = alpha;
    scale(z, alpha / nz);
}

/// Projection onto the box cone `{(t, s) : t*bl <= s <= t*bu, t >= 0}`.
///
/// Newton on the scalar `t`; for fixed `t` the optimal `s` is the clamp of
/// the input to `[t*bl, t*bu]`. Infinite bounds never activate.
fn proj_box(x: &mut [E], bl: &[E], bu: &[E]) {
    const MAX_ITERS: usize = 100;
    const TOL: E = 1e-12;

    let (t0, s0) = (x[0], &x[1..]);
    let mut t = E::max(t0, 0.0);
    for _ in 0..MAX_ITERS {
        let mut f = t - t0;
        let mut fp = 1.0;
        for ((&si, &li), &ui) in s0.iter().zip(bl).zip(bu) {
            if li.is_finite() && si < t * li {
                f += (t * li - si) * li;
                fp += li * li;
            } else if ui.is_finite() && si > t * ui {
                f += (t * ui - si) * ui;
                fp += ui * ui;
            }
        }
        let t_next = E::max(t - f / fp, 0.0);
        if (t_next - t).abs() < TOL {
            t = t_next;
            break;
        }
        t = t_next;
    }

    x[0] = t;
    for ((xi, &li), &ui) in x[1..].iter_mut().zip(bl).zip(bu) {
        *xi = xi.clamp(
            if li.is_finite() { t * li } else { -E::INFINITY },
            if ui.is_finite() { t * ui } else { E::INFINITY },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_dim() {
        let cone = Cone {
            zero: 2,
            nonneg: 3,
            box_lower: vec![-1.0, 0.0],
            box_upper: vec![1.0, 2.0],
            soc: vec![3, 4],
            psd: vec![2],
            exp_primal: 1,
            exp_dual: 1,
            power: vec![0.5],
        };
        assert_eq!(cone.full_dim(), 2 + 3 + 3 + 7 + 4 + 3 + 3 + 3);
        assert!(cone.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_descriptors() {
        assert!(Cone::soc(&[0]).validate().is_err());
        assert!(
            Cone {
                psd: vec![0],
                ..Cone::default()
            }
            .validate()
            .is_err()
        );
        assert!(
            Cone {
                box_lower: vec![1.0],
                box_upper: vec![0.0],
                ..Cone::default()
            }
            .validate()
            .is_err()
        );
        assert!(
            Cone {
                power: vec![1.5],
                ..Cone::default()
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn test_proj_zero_and_nonneg() {
        let cone = Cone {
            zero: 2,
            nonneg: 2,
            ..Cone::default()
        };
        let mut work = ConeWork::new(&cone).unwrap();
        let mut x = [1.0, -1.0, 2.0, -2.0];
        work.proj(&cone, &mut x, 0).unwrap();
        assert_eq!(x, [0.0, 0.0, 2.0, 0.0]);
    }

    #[test]
    fn test_proj_soc_interior_and_exterior() {
        // interior point is untouched
        let mut x = [2.0, 1.0, 0.0];
        proj_soc(&mut x);
        assert_eq!(x, [2.0, 1.0, 0.0]);

        // polar point maps to the origin
        let mut x = [-2.0, 1.0, 0.0];
        proj_soc(&mut x);
        assert_eq!(x, [0.0, 0.0, 0.0]);

        // boundary case: projection of (0, 2, 0) is (1, 1, 0)
        let mut x = [0.0, 2.0, 0.0];
        proj_soc(&mut x);
        assert!((x[0] - 1.0).abs() < 1e-15);
        assert!((x[1] - 1.0).abs() < 1e-15);
        assert_eq!(x[2], 0.0);
    }

    #[test]
    fn test_proj_box_fixed_point_and_clamp() {
        let bl = [-1.0, 0.0];
        let bu = [1.0, 2.0];

        // feasible point is untouched
        let mut x = [1.0, 0.5, 1.0];
        proj_box(&mut x, &bl, &bu);
        assert!((x[0] - 1.0).abs() < 1e-9);
        assert!((x[1] - 0.5).abs() < 1e-9);
        assert!((x[2] - 1.0).abs() < 1e-9);

        // clamping with t fixed by a large first coordinate
        let mut x = [10.0, 50.0, -3.0];
        proj_box(&mut x, &bl, &bu);
        assert!(x[0] >= 10.0 - 1e-9);
        assert!(x[1] <= x[0] * bu[0] + 1e-9);
        assert!(x[2] >= x[0] * bl[1] - 1e-9);
    }

    #[test]
    fn test_proj_dual_leaves_zero_block_free() {
        // the dual of the zero cone is the free cone
        let cone = Cone {
            zero: 2,
            nonneg: 2,
            ..Cone::default()
        };
        let mut work = ConeWork::new(&cone).unwrap();
        let mut x = [1.0, -1.0, 2.0, -2.0];
        work.proj_dual(&cone, &mut x, 0).unwrap();
        assert_eq!(x, [1.0, -1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_proj_dual_box_moreau() {
        // for w already in the dual cone, proj_K(-w) = 0 and w is fixed
        let cone = Cone {
            box_lower: vec![0.0],
            box_upper: vec![1.0],
            ..Cone::default()
        };
        let mut work = ConeWork::new(&cone).unwrap();
        // (t, s) = (1, 0): -w = (-1, 0) projects to the origin of the box cone
        let mut x = [1.0, 0.0];
        work.proj_dual(&cone, &mut x, 0).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-9);
        assert!(x[1].abs() < 1e-9);
    }

    #[test]
    fn test_proj_is_idempotent() {
        let cone = Cone {
            nonneg: 2,
            soc: vec![3],
            ..Cone::default()
        };
        let mut work = ConeWork::new(&cone).unwrap();
        let mut x = [1.0, -4.0, 0.5, 1.0, -1.0];
        work.proj(&cone, &mut x, 0).unwrap();
        let once = x;
        work.proj(&cone, &mut x, 1).unwrap();
        for (a, b) in x.iter().zip(&once) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
