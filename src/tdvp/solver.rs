//! Regularized solution of S·v = f for symmetric positive semidefinite S.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Cutoff of the pseudo-inverse used when a Cholesky solve fails.
const FALLBACK_RCOND: f64 = 1e-14;

/// Linear algebra used after the diagonal shift.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SolveMethod {
    /// Cholesky factorization; falls back to the pseudo-inverse when the
    /// shifted matrix is not positive definite.
    Cholesky,
    /// Pseudo-inverse discarding singular values below `rcond · σ_max`.
    ///
    /// With `smooth` each inverse singular value is damped by
    /// 1 / (1 + (rcond·σ_max / σ)⁶) instead of the hard cutoff.
    Pinv {
        rcond: f64,
        #[serde(default)]
        smooth: bool,
    },
}

/// Velocity with its linear-solve diagnostics.
#[derive(Clone, Debug)]
pub struct LinearSolution {
    pub velocity: DVector<f64>,
    /// ‖S·v - f‖ / ‖f‖ on the unregularized S; zero when f = 0
    pub residual: f64,
    /// Number of retained singular values, or the dimension for Cholesky;
    /// zero when f = 0
    pub rank: usize,
}

/// Regularized solver for the projected TDVP system.
///
/// The method has no default; callers and run files always name it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegularizedSolver {
    /// Absolute diagonal shift S_ii += diag_shift
    #[serde(default)]
    pub diag_shift: f64,
    /// Relative diagonal shift S_ii += diag_scale · S_ii
    #[serde(default)]
    pub diag_scale: f64,
    pub method: SolveMethod,
}

impl RegularizedSolver {
    pub fn new(method: SolveMethod) -> Self {
        Self { diag_shift: 0.0, diag_scale: 0.0, method }
    }

    pub fn with_diag_shift(mut self, shift: f64) -> Self {
        self.diag_shift = shift;
        self
    }

    pub fn with_diag_scale(mut self, scale: f64) -> Self {
        self.diag_scale = scale;
        self
    }

    /// S with both diagonal shifts applied.
    pub fn regularize(&self, s: &DMatrix<f64>) -> DMatrix<f64> {
        let mut reg = s.clone();
        for i in 0..reg.nrows().min(reg.ncols()) {
            reg[(i, i)] += self.diag_scale * s[(i, i)] + self.diag_shift;
        }
        reg
    }

    /// Solve S·v = f.
    ///
    /// Rank deficiency is absorbed by the regularization and never reported
    /// as an error; a vanishing right-hand side gives v = 0.
    pub fn solve(&self, s: &DMatrix<f64>, f: &DVector<f64>) -> LinearSolution {
        let f_norm = f.norm();
        if f_norm == 0.0 {
            return LinearSolution { velocity: DVector::zeros(f.len()), residual: 0.0, rank: 0 };
        }
        let reg = self.regularize(s);
        let (velocity, rank) = match self.method {
            SolveMethod::Cholesky => {
                let solved = reg.clone().cholesky()
                    .map(|chol| chol.solve(f))
                    .filter(|v| v.iter().all(|x| x.is_finite()));
                match solved {
                    Some(v) => (v, f.len()),
                    None => pinv_solve(reg, f, FALLBACK_RCOND, false),
                }
            }
            SolveMethod::Pinv { rcond, smooth } => pinv_solve(reg, f, rcond, smooth),
        };
        let residual = (s * &velocity - f).norm() / f_norm;
        LinearSolution { velocity, residual, rank }
    }
}

// v = V Σ⁺ Uᵀ f with truncated or smoothly damped inverse singular values
fn pinv_solve(reg: DMatrix<f64>, f: &DVector<f64>, rcond: f64, smooth: bool) -> (DVector<f64>, usize) {
    let svd = reg.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return (DVector::zeros(f.len()), 0);
    };
    let sigma = svd.singular_values;
    let sigma_max = sigma.max();
    if !(sigma_max > 0.0) {
        return (DVector::zeros(f.len()), 0);
    }
    let cutoff = rcond * sigma_max;
    let mut rank = 0;
    let inv = sigma.map(|s| {
        if s > cutoff {
            rank += 1;
        }
        if s <= 0.0 {
            0.0
        } else if smooth {
            1.0 / (s * (1.0 + (cutoff / s).powi(6)))
        } else if s > cutoff {
            1.0 / s
        } else {
            0.0
        }
    });
    let projected = (u.transpose() * f).component_mul(&inv);
    (v_t.transpose() * projected, rank)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn spd() -> DMatrix<f64> {
        DMatrix::from_row_slice(3, 3, &[
            4.0, 1.0, 0.5,
            1.0, 3.0, 0.2,
            0.5, 0.2, 2.0,
        ])
    }

    #[test]
    fn test_spd_system_is_recovered() {
        let s = spd();
        let v_true = DVector::from_vec(vec![0.3, -1.2, 2.0]);
        let f = &s * &v_true;
        for method in [SolveMethod::Cholesky, SolveMethod::Pinv { rcond: 1e-12, smooth: false }] {
            let sol = RegularizedSolver::new(method).solve(&s, &f);
            assert_abs_diff_eq!((sol.velocity - &v_true).norm(), 0.0, epsilon = 1e-10);
            assert_abs_diff_eq!(sol.residual, 0.0, epsilon = 1e-12);
            assert_eq!(sol.rank, 3);
        }
    }

    #[test]
    fn test_zero_force_gives_zero_velocity() {
        let sol = RegularizedSolver::new(SolveMethod::Cholesky).solve(&spd(), &DVector::zeros(3));
        assert_eq!(sol.velocity, DVector::zeros(3));
        assert_eq!(sol.residual, 0.0);
    }

    #[test]
    fn test_rank_deficient_system() {
        let s = DMatrix::from_diagonal(&DVector::from_vec(vec![1.0, 0.0]));
        let f = DVector::from_vec(vec![1.0, 1.0]);
        for method in [SolveMethod::Pinv { rcond: 1e-8, smooth: false }, SolveMethod::Cholesky] {
            let sol = RegularizedSolver::new(method).solve(&s, &f);
            assert_abs_diff_eq!(sol.velocity[0], 1.0, epsilon = 1e-12);
            assert_abs_diff_eq!(sol.velocity[1], 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(sol.residual, 0.5_f64.sqrt(), epsilon = 1e-12);
            assert_eq!(sol.rank, 1);
        }
    }

    #[test]
    fn test_diagonal_shift_damps_velocity() {
        let s = DMatrix::identity(2, 2);
        let f = DVector::from_vec(vec![1.0, -2.0]);
        let sol = RegularizedSolver::new(SolveMethod::Cholesky)
            .with_diag_shift(1.0)
            .solve(&s, &f);
        assert_abs_diff_eq!(sol.velocity[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(sol.velocity[1], -1.0, epsilon = 1e-12);
        // residual is measured against the unshifted matrix
        assert_abs_diff_eq!(sol.residual, 0.5, epsilon = 1e-12);

        let scaled = RegularizedSolver::new(SolveMethod::Cholesky)
            .with_diag_scale(0.25)
            .solve(&s, &f);
        assert_abs_diff_eq!(scaled.velocity[0], 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_smooth_cutoff_damps_small_modes() {
        let s = DMatrix::from_diagonal(&DVector::from_vec(vec![1.0, 1e-3]));
        let f = DVector::from_vec(vec![1.0, 1e-3]);
        let sol = RegularizedSolver::new(SolveMethod::Pinv { rcond: 1e-3, smooth: true }).solve(&s, &f);
        // σ = cutoff is damped by exactly one half
        assert_abs_diff_eq!(sol.velocity[1], 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(sol.velocity[0], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_method_from_yaml() {
        let solver: RegularizedSolver = serde_yaml::from_str(
            "diag_shift: 1.0e-4\nmethod:\n  kind: pinv\n  rcond: 1.0e-6\n"
        ).unwrap();
        assert_eq!(solver.method, SolveMethod::Pinv { rcond: 1e-6, smooth: false });
        assert_eq!(solver.diag_scale, 0.0);
    }

    #[test]
    fn test_method_must_be_named() {
        assert!(serde_yaml::from_str::<RegularizedSolver>("diag_shift: 1.0e-4\n").is_err());
        assert!(serde_yaml::from_str::<SolveMethod>("kind: pinv\n").is_err());
    }
}
