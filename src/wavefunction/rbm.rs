//! Restricted Boltzmann machine with complex weights.
//!
//! ln ψ(σ) = Σᵢ aᵢσᵢ + Σⱼ ln cosh(θⱼ),   θⱼ = bⱼ + Σᵢ Wⱼᵢσᵢ
//!
//! All complex weights are exposed as (re, im) pairs of real parameters, laid
//! out as `[a | b | W]` with `W` in row-major order. Since ln ψ is holomorphic
//! in every complex weight w = x + iy, the real-parameter log-derivatives are
//! ∂/∂x = d and ∂/∂y = i·d with d the complex derivative.

use std::f64::consts::LN_2;

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::error::{TdvpError, TdvpResult};
use crate::hilbert::SpinConfig;
use super::traits::WaveFunctionModel;

/// ln cosh(z), stable for large |Re z|.
pub fn log_cosh(z: Complex64) -> Complex64 {
    let z = if z.re < 0.0 { -z } else { z };
    z + (1.0 + (-2.0 * z).exp()).ln() - LN_2
}

#[derive(Clone, Debug)]
pub struct ComplexRbm {
    n_visible: usize,
    n_hidden: usize,
    /// Visible bias
    a: DVector<Complex64>,
    /// Hidden bias
    b: DVector<Complex64>,
    /// Couplings, `n_hidden × n_visible`
    w: DMatrix<Complex64>,
}

impl ComplexRbm {
    /// RBM with `alpha · n_visible` hidden units and all weights zero.
    ///
    /// The zero network is the uniform superposition, i.e. the ground state of
    /// -Σ σˣ.
    pub fn new(n_visible: usize, alpha: usize) -> Self {
        let n_hidden = alpha * n_visible;
        Self {
            n_visible,
            n_hidden,
            a: DVector::zeros(n_visible),
            b: DVector::zeros(n_hidden),
            w: DMatrix::zeros(n_hidden, n_visible),
        }
    }

    /// Zero biases and couplings with real and imaginary parts drawn from
    /// N(0, scale²).
    pub fn with_random_weights(n_visible: usize, alpha: usize, scale: f64, seed: u64) -> TdvpResult<Self> {
        TdvpError::check_positive("weight scale", scale)?;
        let mut rbm = Self::new(n_visible, alpha);
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, scale)
            .map_err(|e| TdvpError::Config(format!("weight distribution: {}", e)))?;
        for w in rbm.w.iter_mut() {
            *w = Complex64::new(normal.sample(&mut rng), normal.sample(&mut rng));
        }
        Ok(rbm)
    }

    pub fn n_hidden(&self) -> usize {
        self.n_hidden
    }

    fn n_complex(&self) -> usize {
        self.n_visible + self.n_hidden + self.n_hidden * self.n_visible
    }

    fn spins(config: &SpinConfig) -> DVector<Complex64> {
        DVector::from_iterator(
            config.len(),
            config.spins().iter().map(|&s| Complex64::new(s as f64, 0.0)),
        )
    }

    // hidden-unit activations θ = b + W σ
    fn theta(&self, sigma: &DVector<Complex64>) -> DVector<Complex64> {
        &self.b + &self.w * sigma
    }

    // complex derivatives in parameter order
    fn complex_derivatives(&self, config: &SpinConfig) -> Vec<Complex64> {
        let sigma = Self::spins(config);
        let tanh: Vec<Complex64> = self.theta(&sigma).iter().map(|t| t.tanh()).collect();
        let mut d = Vec::with_capacity(self.n_complex());
        d.extend(sigma.iter().copied());
        d.extend(tanh.iter().copied());
        for tj in tanh.iter() {
            for si in sigma.iter() {
                d.push(tj * si);
            }
        }
        d
    }
}

impl WaveFunctionModel for ComplexRbm {
    fn n_sites(&self) -> usize {
        self.n_visible
    }

    fn num_params(&self) -> usize {
        2 * self.n_complex()
    }

    fn get_params(&self) -> DVector<f64> {
        // column-major storage of Wᵀ is row-major W
        let wt = self.w.transpose();
        let complex = self.a.iter()
            .chain(self.b.iter())
            .chain(wt.iter());
        DVector::from_iterator(
            self.num_params(),
            complex.flat_map(|c| [c.re, c.im]),
        )
    }

    fn set_params(&mut self, params: &DVector<f64>) -> TdvpResult<()> {
        TdvpError::check_params(self.num_params(), params.len())?;
        let mut values = params.as_slice()
            .chunks_exact(2)
            .map(|p| Complex64::new(p[0], p[1]));
        for a in self.a.iter_mut() {
            *a = values.next().unwrap_or_default();
        }
        for b in self.b.iter_mut() {
            *b = values.next().unwrap_or_default();
        }
        for j in 0..self.n_hidden {
            for i in 0..self.n_visible {
                self.w[(j, i)] = values.next().unwrap_or_default();
            }
        }
        Ok(())
    }

    fn log_psi(&self, config: &SpinConfig) -> Complex64 {
        let sigma = Self::spins(config);
        let visible: Complex64 = self.a.iter().zip(sigma.iter()).map(|(a, s)| a * s).sum();
        let hidden: Complex64 = self.theta(&sigma).iter().map(|t| log_cosh(*t)).sum();
        visible + hidden
    }

    fn log_derivatives(&self, config: &SpinConfig) -> DVector<Complex64> {
        let d = self.complex_derivatives(config);
        DVector::from_iterator(
            self.num_params(),
            d.into_iter().flat_map(|dk| [dk, Complex64::i() * dk]),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::hilbert::all_configs;

    #[test]
    fn test_zero_network_is_uniform() {
        let rbm = ComplexRbm::new(4, 2);
        assert_eq!(rbm.num_params(), 2 * (4 + 8 + 32));
        for c in all_configs(4).unwrap() {
            assert_abs_diff_eq!(rbm.log_psi(&c).norm(), 0.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_params_roundtrip_and_length_check() {
        let mut rbm = ComplexRbm::with_random_weights(3, 1, 0.1, 11).unwrap();
        let p = rbm.get_params();
        let mut other = ComplexRbm::new(3, 1);
        other.set_params(&p).unwrap();
        assert_eq!(other.get_params(), p);
        let c = SpinConfig::new(vec![1, -1, -1]).unwrap();
        assert_abs_diff_eq!((rbm.log_psi(&c) - other.log_psi(&c)).norm(), 0.0, epsilon = 1e-14);

        let short = DVector::zeros(p.len() - 1);
        assert!(matches!(
            rbm.set_params(&short),
            Err(TdvpError::ParameterLength { .. })
        ));
    }

    #[test]
    fn test_log_derivatives_match_central_differences() {
        let mut rbm = ComplexRbm::with_random_weights(4, 1, 0.3, 5).unwrap();
        let mut p = rbm.get_params();
        // switch on the biases as well
        for k in 0..16 {
            p[k] = 0.05 * (k as f64 - 8.0);
        }
        rbm.set_params(&p).unwrap();
        let c = SpinConfig::new(vec![1, -1, 1, 1]).unwrap();
        let analytical = rbm.log_derivatives(&c);
        let numerical = rbm.numerical_log_derivatives(&c, 1e-5).unwrap();
        for k in 0..rbm.num_params() {
            assert_abs_diff_eq!(analytical[k].re, numerical[k].re, epsilon = 1e-7);
            assert_abs_diff_eq!(analytical[k].im, numerical[k].im, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_log_cosh_large_arguments() {
        let z = Complex64::new(800.0, 0.3);
        let expected = z - LN_2;
        assert_abs_diff_eq!((log_cosh(z) - expected).norm(), 0.0, epsilon = 1e-10);
        assert_abs_diff_eq!((log_cosh(-z) - expected).norm(), 0.0, epsilon = 1e-10);
        let small = Complex64::new(0.2, -0.1);
        assert_abs_diff_eq!((log_cosh(small) - small.cosh().ln()).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_batched_gradients_shape() {
        let rbm = ComplexRbm::with_random_weights(3, 2, 0.1, 3).unwrap();
        let configs = all_configs(3).unwrap();
        let o = rbm.gradients(&configs);
        assert_eq!(o.shape(), (8, rbm.num_params()));
        let row = rbm.log_derivatives(&configs[5]);
        for k in 0..rbm.num_params() {
            assert_eq!(o[(5, k)], row[k]);
        }
    }
}
