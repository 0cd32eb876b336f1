//! Monte Carlo estimates of the TDVP linear system.
//!
//! For weighted samples s with log-derivatives O_k(s) and local energies
//! E_loc(s) the estimator builds
//!
//!   S_kl = ⟨O_k* O_l⟩ - ⟨O_k⟩*⟨O_l⟩
//!   F_k  = ⟨O_k* E_loc⟩ - ⟨O_k⟩*⟨E_loc⟩
//!
//! and the real system S_r·θ̇ = f_r with S_r = P(S), f_r = P(c·F), where P
//! takes the real or imaginary part and c is -i for real-time evolution and
//! -1 for imaginary-time evolution.
//!
//! Both covariances are formed from centered, √w-scaled rows so S is
//! Hermitian and positive semidefinite up to rounding.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{TdvpError, TdvpResult};
use crate::operator::LocalStats;
use crate::sampling::SampleBatch;
use super::solver::RegularizedSolver;

/// Relative variance below which the state counts as an energy eigenstate.
const VARIANCE_FLOOR: f64 = 1e-12;

/// Kind of parameter dynamics.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dynamics {
    /// Schrödinger evolution i∂ψ/∂t = Hψ
    RealTime,
    /// Ground-state search ∂ψ/∂τ = -(H - E)ψ
    ImaginaryTime,
}

impl Dynamics {
    /// Factor multiplying F on the right-hand side.
    pub fn prefactor(&self) -> Complex64 {
        match self {
            Dynamics::RealTime => Complex64::new(0.0, -1.0),
            Dynamics::ImaginaryTime => Complex64::new(-1.0, 0.0),
        }
    }
}

/// Projection of the complex system onto real numbers.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MakeReal {
    #[default]
    Real,
    Imag,
}

impl MakeReal {
    pub fn project(&self, z: Complex64) -> f64 {
        match self {
            MakeReal::Real => z.re,
            MakeReal::Imag => z.im,
        }
    }
}

/// Solution of the TDVP system with its diagnostics.
#[derive(Clone, Debug)]
pub struct TdvpSolution {
    pub velocity: DVector<f64>,
    /// Relative TDVP error, see [`TdvpEquation::tdvp_error`]
    pub tdvp_error: f64,
    /// Relative linear residual ‖S_r·v - f_r‖ / ‖f_r‖
    pub residual: f64,
    /// Numerical rank used by the solve
    pub rank: usize,
}

/// Estimated geometric tensor, force and the projected real system.
#[derive(Clone, Debug)]
pub struct TdvpEquation {
    /// Complex quantum geometric tensor S
    pub s: DMatrix<Complex64>,
    /// Complex force F
    pub f: DVector<Complex64>,
    /// Projected tensor P(S)
    pub s_real: DMatrix<f64>,
    /// Projected right-hand side P(c·F)
    pub f_real: DVector<f64>,
    /// Statistics of the local energy
    pub energy: LocalStats,
}

impl TdvpEquation {
    /// Estimate S and F from a batch, its log-derivative matrix `o` (one row
    /// per sample) and local energies.
    ///
    /// An empty batch yields the zero system.
    pub fn estimate(
        batch: &SampleBatch,
        o: &DMatrix<Complex64>,
        e_loc: &[Complex64],
        dynamics: Dynamics,
        make_real: MakeReal,
    ) -> TdvpResult<Self> {
        let n = batch.len();
        let p = o.ncols();
        if o.nrows() != n {
            return Err(TdvpError::SampleCount { expected: n, got: o.nrows() });
        }
        if e_loc.len() != n {
            return Err(TdvpError::SampleCount { expected: n, got: e_loc.len() });
        }
        if n == 0 {
            return Ok(Self {
                s: DMatrix::zeros(p, p),
                f: DVector::zeros(p),
                s_real: DMatrix::zeros(p, p),
                f_real: DVector::zeros(p),
                energy: LocalStats::default(),
            });
        }

        let w = &batch.weights;
        let sqrt_w: Vec<f64> = w.iter().map(|x| x.max(0.0).sqrt()).collect();
        let o_mean = DVector::from_fn(p, |k, _| {
            (0..n).map(|s| o[(s, k)] * w[s]).sum::<Complex64>()
        });
        let energy = LocalStats::from_batch(batch, e_loc);

        let centered_o = DMatrix::from_fn(n, p, |s, k| (o[(s, k)] - o_mean[k]) * sqrt_w[s]);
        let centered_e = DVector::from_fn(n, |s, _| (e_loc[s] - energy.mean) * sqrt_w[s]);
        let centered_o_adj = centered_o.adjoint();
        let s = &centered_o_adj * &centered_o;
        let f = &centered_o_adj * &centered_e;

        let c = dynamics.prefactor();
        let s_real = s.map(|z| make_real.project(z));
        let f_real = f.map(|z| make_real.project(c * z));
        Ok(Self { s, f, s_real, f_real, energy })
    }

    pub fn num_params(&self) -> usize {
        self.f_real.len()
    }

    /// vᵀ S_r v on the unregularized projected tensor.
    pub fn metric_norm_sq(&self, v: &DVector<f64>) -> f64 {
        v.dot(&(&self.s_real * v))
    }

    /// √max(vᵀ S_r v, 0).
    pub fn metric_norm(&self, v: &DVector<f64>) -> f64 {
        self.metric_norm_sq(v).max(0.0).sqrt()
    }

    /// Relative TDVP error |1 + (vᵀS_r v - 2 v·f_r) / Var(E_loc)| with the
    /// metric of this estimate.
    pub fn tdvp_error(&self, v: &DVector<f64>) -> f64 {
        self.tdvp_error_with(v, self.metric_norm_sq(v))
    }

    /// Relative TDVP error with a caller-supplied squared norm of `v`.
    ///
    /// Zero when the local energy has no variance beyond rounding: the state
    /// is then an eigenstate and any velocity reproduces its evolution.
    pub fn tdvp_error_with(&self, v: &DVector<f64>, norm_sq: f64) -> f64 {
        if self.is_eigenstate() {
            return 0.0;
        }
        (1.0 + (norm_sq - 2.0 * v.dot(&self.f_real)) / self.energy.variance).abs()
    }

    /// Whether the local energy is constant up to rounding.
    pub fn is_eigenstate(&self) -> bool {
        self.energy.variance <= VARIANCE_FLOOR * self.energy.mean.norm_sqr().max(1.0)
    }

    /// Solve the projected system and attach both diagnostics.
    ///
    /// A vanishing force, or an energy eigenstate where F is pure rounding
    /// noise, yields the zero velocity with both diagnostics zero.
    pub fn solve(&self, solver: &RegularizedSolver) -> TdvpSolution {
        let p = self.num_params();
        if self.is_eigenstate() || self.f_real.iter().all(|x| *x == 0.0) {
            return TdvpSolution { velocity: DVector::zeros(p), tdvp_error: 0.0, residual: 0.0, rank: 0 };
        }
        let sol = solver.solve(&self.s_real, &self.f_real);
        let tdvp_error = self.tdvp_error(&sol.velocity);
        TdvpSolution {
            velocity: sol.velocity,
            tdvp_error,
            residual: sol.residual,
            rank: sol.rank,
        }
    }
}
