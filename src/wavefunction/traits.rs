//! Wave function traits for spin-lattice variational states.
//!
//! A model maps a configuration `s` to the complex log-amplitude ln ψ(s) and
//! provides the log-derivatives O_k(s) = ∂ ln ψ(s) / ∂θ_k with respect to its
//! flat vector of real parameters θ.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use rayon::prelude::*;

use crate::error::TdvpResult;
use crate::hilbert::SpinConfig;

/// Variational wave function with real trainable parameters.
///
/// Batched evaluation is an order-independent map over configurations and is
/// run on the rayon thread pool.
pub trait WaveFunctionModel: Clone + Send + Sync {
    /// Number of lattice sites.
    fn n_sites(&self) -> usize;

    /// Number of real variational parameters.
    fn num_params(&self) -> usize;

    /// Current parameter values.
    fn get_params(&self) -> DVector<f64>;

    /// Overwrite all parameters; the length must equal [`num_params`].
    ///
    /// [`num_params`]: WaveFunctionModel::num_params
    fn set_params(&mut self, params: &DVector<f64>) -> TdvpResult<()>;

    /// ln ψ(s).
    fn log_psi(&self, config: &SpinConfig) -> Complex64;

    /// O_k(s) = ∂ ln ψ(s) / ∂θ_k for all parameters.
    fn log_derivatives(&self, config: &SpinConfig) -> DVector<Complex64>;

    /// ln ψ for a batch of configurations.
    fn evaluate(&self, configs: &[SpinConfig]) -> Vec<Complex64> {
        configs.par_iter().map(|c| self.log_psi(c)).collect()
    }

    /// Log-derivative matrix with one row per configuration.
    fn gradients(&self, configs: &[SpinConfig]) -> DMatrix<Complex64> {
        let rows: Vec<DVector<Complex64>> = configs.par_iter()
            .map(|c| self.log_derivatives(c))
            .collect();
        DMatrix::from_fn(rows.len(), self.num_params(), |i, k| rows[i][k])
    }

    /// Log-derivatives by central differences.
    fn numerical_log_derivatives(&self, config: &SpinConfig, h: f64) -> TdvpResult<DVector<Complex64>> {
        let params = self.get_params();
        let mut shifted = self.clone();
        let mut grad = DVector::zeros(params.len());
        for k in 0..params.len() {
            let mut p_fwd = params.clone();
            let mut p_bwd = params.clone();
            p_fwd[k] += h;
            p_bwd[k] -= h;
            shifted.set_params(&p_fwd)?;
            let fwd = shifted.log_psi(config);
            shifted.set_params(&p_bwd)?;
            let bwd = shifted.log_psi(config);
            grad[k] = (fwd - bwd) / (2.0 * h);
        }
        Ok(grad)
    }
}
