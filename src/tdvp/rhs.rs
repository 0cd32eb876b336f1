//! The TDVP velocity field θ̇ = S⁻¹f evaluated by sampling.

use nalgebra::{DMatrix, DVector};

use crate::error::{TdvpError, TdvpResult};
use crate::integrator::VelocityField;
use crate::operator::{local_values, LocalOperator, LocalStats};
use crate::sampling::Sampler;
use crate::wavefunction::WaveFunctionModel;
use super::estimator::{Dynamics, MakeReal, TdvpEquation};
use super::solver::RegularizedSolver;

/// Diagnostics of one velocity evaluation.
#[derive(Clone, Debug)]
pub struct TdvpDiagnostics {
    pub t: f64,
    pub energy: LocalStats,
    pub tdvp_error: f64,
    pub residual: f64,
    pub rank: usize,
    pub acceptance: f64,
}

/// Velocity field of the time-dependent variational principle.
///
/// Every call loads `params` into a private copy of the model, draws a fresh
/// batch, estimates S and f and solves for the velocity. With a Markov-chain
/// sampler the result is stochastic. The metric of the latest call is used
/// as the error norm of the integrator.
pub struct TdvpRhs<'a, M: WaveFunctionModel> {
    model: M,
    sampler: &'a mut Sampler,
    hamiltonian: &'a dyn LocalOperator,
    solver: &'a RegularizedSolver,
    n_samples: usize,
    dynamics: Dynamics,
    make_real: MakeReal,
    metric: Option<DMatrix<f64>>,
    diagnostics: Vec<TdvpDiagnostics>,
}

impl<'a, M: WaveFunctionModel> TdvpRhs<'a, M> {
    pub fn new(
        model: M,
        sampler: &'a mut Sampler,
        hamiltonian: &'a dyn LocalOperator,
        solver: &'a RegularizedSolver,
        n_samples: usize,
    ) -> Self {
        Self {
            model,
            sampler,
            hamiltonian,
            solver,
            n_samples,
            dynamics: Dynamics::RealTime,
            make_real: MakeReal::Real,
            metric: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_dynamics(mut self, dynamics: Dynamics) -> Self {
        self.dynamics = dynamics;
        self
    }

    pub fn with_make_real(mut self, make_real: MakeReal) -> Self {
        self.make_real = make_real;
        self
    }

    /// Estimate the TDVP system at `params` without solving it.
    pub fn equation(&mut self, params: &DVector<f64>) -> TdvpResult<(TdvpEquation, f64)> {
        self.model.set_params(params)?;
        let batch = self.sampler.sample(&self.model, self.n_samples);
        let o = self.model.gradients(&batch.configs);
        let e_loc = local_values(self.hamiltonian, &self.model, &batch)?;
        let eq = TdvpEquation::estimate(&batch, &o, &e_loc, self.dynamics, self.make_real)?;
        Ok((eq, batch.acceptance))
    }

    /// Diagnostics of every evaluation since the last call, oldest first.
    pub fn take_diagnostics(&mut self) -> Vec<TdvpDiagnostics> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn last_diagnostics(&self) -> Option<&TdvpDiagnostics> {
        self.diagnostics.last()
    }
}

impl<M: WaveFunctionModel> VelocityField for TdvpRhs<'_, M> {
    fn velocity(&mut self, t: f64, params: &DVector<f64>) -> TdvpResult<DVector<f64>> {
        let (eq, acceptance) = self.equation(params)?;
        let sol = eq.solve(self.solver);
        if sol.velocity.iter().any(|x| !x.is_finite()) {
            return Err(TdvpError::NonFinite(t));
        }
        self.diagnostics.push(TdvpDiagnostics {
            t,
            energy: eq.energy,
            tdvp_error: sol.tdvp_error,
            residual: sol.residual,
            rank: sol.rank,
            acceptance,
        });
        self.metric = Some(eq.s_real);
        Ok(sol.velocity)
    }

    /// √(vᵀ S v) with the tensor of the latest evaluation.
    fn norm(&self, v: &DVector<f64>) -> f64 {
        match &self.metric {
            Some(s) => v.dot(&(s * v)).max(0.0).sqrt(),
            None => v.norm(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::operator::PauliOperator;
    use crate::sampling::ExactSampler;
    use crate::tdvp::SolveMethod;
    use crate::wavefunction::ComplexRbm;

    #[test]
    fn test_eigenstate_has_zero_velocity() {
        let rbm = ComplexRbm::new(3, 1);
        let h = PauliOperator::transverse_field(3).unwrap();
        let mut sampler = Sampler::from(ExactSampler::new(3).unwrap());
        let solver = RegularizedSolver::new(SolveMethod::Cholesky);
        let params = rbm.get_params();
        let mut rhs = TdvpRhs::new(rbm, &mut sampler, &h, &solver, 0);
        let v = rhs.velocity(0.0, &params).unwrap();
        assert_abs_diff_eq!(v.norm(), 0.0, epsilon = 1e-12);
        let diag = rhs.take_diagnostics();
        assert_eq!(diag.len(), 1);
        assert_abs_diff_eq!(diag[0].energy.mean.re, -3.0, epsilon = 1e-12);
        assert_eq!(diag[0].tdvp_error, 0.0);
        assert!(rhs.take_diagnostics().is_empty());
    }

    #[test]
    fn test_metric_norm_after_evaluation() {
        let rbm = ComplexRbm::with_random_weights(3, 1, 0.2, 3).unwrap();
        let h = PauliOperator::transverse_field_ising(3, 1.0, 0.5, 0.1, true).unwrap();
        let mut sampler = Sampler::from(ExactSampler::new(3).unwrap());
        let solver = RegularizedSolver::new(SolveMethod::Pinv { rcond: 1e-10, smooth: false });
        let params = rbm.get_params();
        let mut rhs = TdvpRhs::new(rbm, &mut sampler, &h, &solver, 0)
            .with_dynamics(Dynamics::ImaginaryTime);
        let probe = DVector::from_element(params.len(), 1.0);
        assert_abs_diff_eq!(rhs.norm(&probe), probe.norm(), epsilon = 1e-12);
        let (eq, _) = rhs.equation(&params).unwrap();
        let v = rhs.velocity(0.0, &params).unwrap();
        assert_abs_diff_eq!(rhs.norm(&v), eq.metric_norm(&v), epsilon = 1e-10);
        let diag = rhs.last_diagnostics().unwrap();
        assert!(diag.tdvp_error < 1.0);
        assert!(diag.energy.variance > 0.0);
    }
}
