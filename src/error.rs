//! Error types for the TDVP core and its collaborators.
//!
//! Numerical trouble inside a single solve (near-singular geometric tensor,
//! vanishing force) is never an error; it is absorbed by regularization and
//! explicit zero cases. What remains here are failures the caller has to act
//! on: non-convergence of the adaptive integrator, malformed input, and I/O.

use thiserror::Error;

pub type TdvpResult<T> = Result<T, TdvpError>;

#[derive(Debug, Error)]
pub enum TdvpError {
    /// The adaptive integrator needed a step smaller than its minimum.
    #[error("step size underflow at t = {t:.6e}: dt = {dt:.3e} is below the minimum {min_step:.3e}")]
    StepSizeUnderflow { t: f64, dt: f64, min_step: f64 },

    /// The adaptive integrator rejected too many consecutive trial steps.
    #[error("error bound could not be satisfied at t = {t:.6e} after {retries} retries (last error {error:.3e})")]
    RetryLimit { t: f64, retries: usize, error: f64 },

    /// A parameter vector of the wrong length was handed to a model.
    #[error("parameter vector has length {got}; expected {expected}")]
    ParameterLength { expected: usize, got: usize },

    /// A configuration of the wrong length was handed to a model or operator.
    #[error("configuration has {got} sites; expected {expected}")]
    SiteCount { expected: usize, got: usize },

    /// Per-sample inputs of an estimator disagree in length.
    #[error("expected {expected} samples; got {got}")]
    SampleCount { expected: usize, got: usize },

    /// An operator term addresses a site outside the lattice.
    #[error("site index {site} out of range for {n_sites} sites")]
    SiteOutOfRange { site: usize, n_sites: usize },

    /// Exhaustive enumeration was requested for too large a Hilbert space.
    #[error("exact enumeration of {0} sites exceeds the limit of {max} sites", max = crate::hilbert::MAX_EXACT_SITES)]
    HilbertTooLarge(usize),

    /// A velocity field produced non-finite values.
    #[error("velocity field returned non-finite values at t = {0:.6e}")]
    NonFinite(f64),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl TdvpError {
    pub(crate) fn check_positive(name: &str, value: f64) -> TdvpResult<()> {
        (value > 0.0 && value.is_finite())
            .then_some(())
            .ok_or_else(|| Self::Config(format!("{} must be positive and finite; got {}", name, value)))
    }

    pub(crate) fn check_params(expected: usize, got: usize) -> TdvpResult<()> {
        (expected == got)
            .then_some(())
            .ok_or(Self::ParameterLength { expected, got })
    }

    pub(crate) fn check_sites(expected: usize, got: usize) -> TdvpResult<()> {
        (expected == got)
            .then_some(())
            .ok_or(Self::SiteCount { expected, got })
    }
}
