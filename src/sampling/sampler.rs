//! Closed set of sampling strategies.

use crate::wavefunction::WaveFunctionModel;
use super::batch::SampleBatch;
use super::exact::ExactSampler;
use super::metropolis::MetropolisSampler;

/// Source of weighted configuration batches.
#[derive(Clone, Debug)]
pub enum Sampler {
    /// Full basis enumeration; `n_samples` is ignored.
    Exact(ExactSampler),
    /// Markov-chain Monte Carlo.
    Metropolis(MetropolisSampler),
}

impl Sampler {
    pub fn sample<M: WaveFunctionModel>(&mut self, model: &M, n_samples: usize) -> SampleBatch {
        match self {
            Sampler::Exact(s) => s.sample(model),
            Sampler::Metropolis(s) => s.sample(model, n_samples),
        }
    }

    pub fn n_sites(&self) -> usize {
        match self {
            Sampler::Exact(s) => s.n_sites(),
            Sampler::Metropolis(s) => s.n_sites(),
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Sampler::Exact(_))
    }
}

impl From<ExactSampler> for Sampler {
    fn from(s: ExactSampler) -> Self {
        Sampler::Exact(s)
    }
}

impl From<MetropolisSampler> for Sampler {
    fn from(s: MetropolisSampler) -> Self {
        Sampler::Metropolis(s)
    }
}
