//! Markov Chain Monte Carlo sampling of |ψ|² with single spin flips.
//!
//! Each chain proposes flipping one uniformly chosen site and accepts with
//! probability min(1, |ψ(s')/ψ(s)|²). Chains persist between calls so that a
//! slowly changing wave function only needs a short re-thermalization. Chains
//! are advanced in parallel, each with its own generator seeded from the
//! master seed, so results are reproducible regardless of thread count.

use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::hilbert::SpinConfig;
use crate::wavefunction::WaveFunctionModel;
use super::batch::SampleBatch;

/// Parameters for the Metropolis sampler.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MetropolisParams {
    /// Number of independent chains
    pub n_chains: usize,
    /// Sweeps discarded at the start of every call
    pub n_thermalize: usize,
    /// Proposals per sweep; 0 means one per site
    pub sweep_size: usize,
    /// Master seed
    pub seed: u64,
}

impl Default for MetropolisParams {
    fn default() -> Self {
        Self {
            n_chains: 16,
            n_thermalize: 20,
            sweep_size: 0,
            seed: 1234,
        }
    }
}

/// State of a single chain.
#[derive(Clone, Debug)]
struct Chain {
    config: SpinConfig,
    log_psi: Complex64,
    rng: StdRng,
}

impl Chain {
    // one single-spin-flip Metropolis proposal
    fn propose<M: WaveFunctionModel>(&mut self, model: &M) -> bool {
        let site = self.rng.gen_range(0..self.config.len());
        let proposal = self.config.flipped(&[site]);
        let new_log_psi = model.log_psi(&proposal);
        let acceptance_ratio = (2.0 * (new_log_psi.re - self.log_psi.re)).exp();
        if self.rng.gen::<f64>() < acceptance_ratio {
            self.config = proposal;
            self.log_psi = new_log_psi;
            true
        } else {
            false
        }
    }
}

/// Metropolis sampler over spin configurations.
#[derive(Clone, Debug)]
pub struct MetropolisSampler {
    params: MetropolisParams,
    n_sites: usize,
    chains: Vec<Chain>,
}

impl MetropolisSampler {
    pub fn new(n_sites: usize, params: MetropolisParams) -> Self {
        let mut master = StdRng::seed_from_u64(params.seed);
        let chains = (0..params.n_chains.max(1))
            .map(|_| {
                let mut rng = StdRng::seed_from_u64(master.gen());
                let config = SpinConfig::random(n_sites, &mut rng);
                Chain { config, log_psi: Complex64::default(), rng }
            })
            .collect();
        Self { params, n_sites, chains }
    }

    pub fn n_sites(&self) -> usize {
        self.n_sites
    }

    fn sweep_size(&self) -> usize {
        if self.params.sweep_size == 0 { self.n_sites.max(1) } else { self.params.sweep_size }
    }

    /// Draw `n_samples` configurations with uniform weights.
    pub fn sample<M: WaveFunctionModel>(&mut self, model: &M, n_samples: usize) -> SampleBatch {
        if n_samples == 0 || self.n_sites == 0 {
            return SampleBatch::uniform(Vec::new(), Vec::new(), 1.0);
        }
        let n_chains = self.chains.len();
        let per_chain = (n_samples + n_chains - 1) / n_chains;
        let sweep = self.sweep_size();
        let n_thermalize = self.params.n_thermalize;

        let results: Vec<(Vec<SpinConfig>, Vec<Complex64>, usize)> = self.chains
            .par_iter_mut()
            .map(|chain| {
                // parameters may have changed since the last call
                chain.log_psi = model.log_psi(&chain.config);
                for _ in 0..n_thermalize * sweep {
                    chain.propose(model);
                }
                let mut configs = Vec::with_capacity(per_chain);
                let mut log_psi = Vec::with_capacity(per_chain);
                let mut accepted = 0;
                for _ in 0..per_chain {
                    for _ in 0..sweep {
                        if chain.propose(model) {
                            accepted += 1;
                        }
                    }
                    configs.push(chain.config.clone());
                    log_psi.push(chain.log_psi);
                }
                (configs, log_psi, accepted)
            })
            .collect();

        let total_moves = n_chains * per_chain * sweep;
        let accepted: usize = results.iter().map(|r| r.2).sum();
        let (mut configs, mut log_psi): (Vec<_>, Vec<_>) = results.into_iter()
            .flat_map(|(c, l, _)| c.into_iter().zip(l))
            .unzip();
        configs.truncate(n_samples);
        log_psi.truncate(n_samples);
        SampleBatch::uniform(configs, log_psi, accepted as f64 / total_moves as f64)
    }
}
