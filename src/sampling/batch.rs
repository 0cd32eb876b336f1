//! Weighted batches of sampled configurations.

use num_complex::Complex64;

use crate::hilbert::SpinConfig;

/// Configurations with their log-amplitudes and normalized weights.
///
/// Weights sum to one for a non-empty batch. They are uniform for Markov-chain
/// samples and equal to |ψ(s)|² / Σ|ψ|² for exhaustive enumeration.
#[derive(Clone, Debug, Default)]
pub struct SampleBatch {
    pub configs: Vec<SpinConfig>,
    pub log_psi: Vec<Complex64>,
    pub weights: Vec<f64>,
    /// Fraction of accepted Metropolis proposals; 1 for exact sampling
    pub acceptance: f64,
}

impl SampleBatch {
    /// Batch with uniform weights 1/N.
    pub fn uniform(configs: Vec<SpinConfig>, log_psi: Vec<Complex64>, acceptance: f64) -> Self {
        let n = configs.len();
        let weights = vec![1.0 / n.max(1) as f64; n];
        Self { configs, log_psi, weights, acceptance }
    }

    /// Batch weighted by |ψ|², normalized after shifting by the largest
    /// Re ln ψ to avoid overflow.
    pub fn born_weighted(configs: Vec<SpinConfig>, log_psi: Vec<Complex64>) -> Self {
        let max_re = log_psi.iter()
            .map(|lp| lp.re)
            .fold(f64::NEG_INFINITY, f64::max);
        let raw: Vec<f64> = log_psi.iter()
            .map(|lp| (2.0 * (lp.re - max_re)).exp())
            .collect();
        let norm: f64 = raw.iter().sum();
        let weights = if norm > 0.0 && norm.is_finite() {
            raw.iter().map(|w| w / norm).collect()
        } else {
            vec![0.0; raw.len()]
        };
        Self { configs, log_psi, weights, acceptance: 1.0 }
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Σ wₛ xₛ; zero for an empty batch.
    pub fn mean(&self, values: &[Complex64]) -> Complex64 {
        self.weights.iter().zip(values).map(|(w, x)| *x * *w).sum()
    }

    /// Effective sample size (Σw)² / Σw².
    pub fn effective_size(&self) -> f64 {
        let sum_sq: f64 = self.weights.iter().map(|w| w * w).sum();
        if sum_sq == 0.0 {
            return 0.0;
        }
        let sum: f64 = self.weights.iter().sum();
        sum * sum / sum_sq
    }
}
