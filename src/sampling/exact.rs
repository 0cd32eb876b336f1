//! Exhaustive enumeration of the spin basis.

use crate::error::TdvpResult;
use crate::hilbert::{all_configs, SpinConfig};
use crate::wavefunction::WaveFunctionModel;
use super::batch::SampleBatch;

/// Returns every basis configuration weighted by |ψ|², so Monte Carlo
/// averages become exact expectation values.
#[derive(Clone, Debug)]
pub struct ExactSampler {
    basis: Vec<SpinConfig>,
}

impl ExactSampler {
    pub fn new(n_sites: usize) -> TdvpResult<Self> {
        Ok(Self { basis: all_configs(n_sites)? })
    }

    pub fn n_sites(&self) -> usize {
        self.basis.first().map_or(0, SpinConfig::len)
    }

    pub fn sample<M: WaveFunctionModel>(&self, model: &M) -> SampleBatch {
        let log_psi = model.evaluate(&self.basis);
        SampleBatch::born_weighted(self.basis.clone(), log_psi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::wavefunction::ComplexRbm;

    #[test]
    fn test_weights_match_born_rule() {
        let rbm = ComplexRbm::with_random_weights(3, 1, 0.4, 9).unwrap();
        let batch = ExactSampler::new(3).unwrap().sample(&rbm);
        assert_eq!(batch.len(), 8);
        let z: f64 = batch.log_psi.iter().map(|lp| (2.0 * lp.re).exp()).sum();
        for (lp, w) in batch.log_psi.iter().zip(batch.weights.iter()) {
            assert_relative_eq!(*w, (2.0 * lp.re).exp() / z, epsilon = 1e-12);
        }
        assert_relative_eq!(batch.weights.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }
}
