//! Rust TDVP - time evolution of neural quantum states
//!
//! This crate integrates the time-dependent variational principle for
//! variational wave functions on spin-1/2 lattices: Monte Carlo estimates of
//! the quantum geometric tensor and force, regularized linear solves, and
//! adaptive-step integration of the resulting parameter equations, in real
//! or imaginary time.

pub mod error;
pub mod hilbert;
pub mod operator;
pub mod wavefunction;
pub mod sampling;
pub mod tdvp;
pub mod integrator;
pub mod evolution;
pub mod io;

// Re-export commonly used types at crate root
pub use error::{TdvpError, TdvpResult};
pub use hilbert::SpinConfig;
pub use operator::{LocalOperator, Pauli, PauliString, PauliOperator, LocalStats, local_values};
pub use wavefunction::{WaveFunctionModel, ComplexRbm};
pub use sampling::{SampleBatch, ExactSampler, MetropolisParams, MetropolisSampler, Sampler};
pub use tdvp::{Dynamics, MakeReal, TdvpEquation, TdvpSolution, RegularizedSolver, SolveMethod, LinearSolution, TdvpRhs, TdvpDiagnostics};
pub use integrator::{VelocityField, FnField, StepOutcome, AdaptiveHeun, AdaptiveHeunParams, FixedScheme, Integrator};
pub use evolution::{TimeEvolution, StepRecord, Recorder, NullRecorder, MemoryRecorder, YamlRecorder, read_records};
pub use io::{read_config, SimulationConfig};
