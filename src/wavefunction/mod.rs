//! Wavefunction module - variational models for spin lattices.

mod traits;
mod rbm;

pub use traits::WaveFunctionModel;
pub use rbm::{ComplexRbm, log_cosh};
