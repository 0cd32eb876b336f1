//! Local estimators of operator expectation values.
//!
//! For an operator O and a configuration s the local value is
//!
//!   O_loc(s) = Σ_{s'} ⟨s|O|s'⟩ ψ(s') / ψ(s)
//!
//! whose |ψ|²-weighted average is ⟨ψ|O|ψ⟩ / ⟨ψ|ψ⟩. With O = H this is the
//! local energy.

use num_complex::Complex64;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{TdvpError, TdvpResult};
use crate::sampling::SampleBatch;
use crate::wavefunction::WaveFunctionModel;
use super::traits::LocalOperator;

/// O_loc(s) for every configuration of `batch`.
pub fn local_values<O, M>(op: &O, model: &M, batch: &SampleBatch) -> TdvpResult<Vec<Complex64>>
where
    O: LocalOperator + ?Sized,
    M: WaveFunctionModel,
{
    TdvpError::check_sites(model.n_sites(), op.n_sites())?;
    let values = batch.configs.par_iter()
        .zip(batch.log_psi.par_iter())
        .map(|(s, lp)| {
            let (connected, elements) = op.connected_elements(s);
            connected.iter().zip(elements)
                .map(|(sp, e)| {
                    if sp == s {
                        e
                    } else {
                        e * (model.log_psi(sp) - lp).exp()
                    }
                })
                .sum::<Complex64>()
        })
        .collect();
    Ok(values)
}

/// Weighted statistics of a set of local values.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LocalStats {
    /// Weighted mean
    pub mean: Complex64,
    /// Weighted variance Σ w |x - mean|²
    pub variance: f64,
    /// Standard error of the mean from the effective sample size
    pub error: f64,
    /// Number of samples
    pub n_samples: usize,
}

impl LocalStats {
    pub fn from_batch(batch: &SampleBatch, values: &[Complex64]) -> Self {
        if batch.is_empty() {
            return Self::default();
        }
        let mean = batch.mean(values);
        let variance = batch.weights.iter().zip(values)
            .map(|(w, x)| w * (x - mean).norm_sqr())
            .sum::<f64>();
        let n_eff = batch.effective_size();
        let error = if n_eff > 1.0 { (variance / n_eff).sqrt() } else { 0.0 };
        Self { mean, variance, error, n_samples: batch.len() }
    }
}
