//! YAML run configuration.
//!
//! ```yaml
//! system:
//!   n_sites: 4
//!   hamiltonian: { kind: ising, j: 1.0, g: 0.3, h: 0.25 }
//! model: { alpha: 1 }
//! sampler: { kind: exact }
//! tdvp:
//!   dynamics: real_time
//!   solver: { method: { kind: pinv, rcond: 1.0e-8 } }
//! integrator: { kind: adaptive_heun, dt0: 1.0e-3, tol: 1.0e-4 }
//! observables:
//!   - name: x
//!     operator: { kind: x_polarization }
//! t_max: 0.1
//! output: trajectory.yml
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{TdvpError, TdvpResult};
use crate::evolution::TimeEvolution;
use crate::integrator::{AdaptiveHeunParams, FixedScheme, Integrator};
use crate::operator::{PauliOperator, PauliString};
use crate::sampling::{ExactSampler, MetropolisParams, MetropolisSampler, Sampler};
use crate::tdvp::{Dynamics, MakeReal, RegularizedSolver};
use crate::wavefunction::ComplexRbm;

/// One Pauli string of a custom operator, e.g. `{ coeff: -1.0, ops: "X0 Z1" }`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TermSpec {
    pub coeff: f64,
    #[serde(default)]
    pub coeff_im: f64,
    pub ops: String,
}

/// Operator by name.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperatorSpec {
    Ising {
        j: f64,
        g: f64,
        #[serde(default)]
        h: f64,
        #[serde(default = "default_true")]
        periodic: bool,
    },
    TransverseField,
    XPolarization,
    ZPolarization,
    ZzCorrelation { distance: usize },
    Pauli { terms: Vec<TermSpec> },
}

fn default_true() -> bool {
    true
}

impl OperatorSpec {
    pub fn build(&self, n_sites: usize) -> TdvpResult<PauliOperator> {
        match self {
            OperatorSpec::Ising { j, g, h, periodic } => {
                PauliOperator::transverse_field_ising(n_sites, *j, *g, *h, *periodic)
            }
            OperatorSpec::TransverseField => PauliOperator::transverse_field(n_sites),
            OperatorSpec::XPolarization => PauliOperator::x_polarization(n_sites),
            OperatorSpec::ZPolarization => PauliOperator::z_polarization(n_sites),
            OperatorSpec::ZzCorrelation { distance } => PauliOperator::zz_correlation(n_sites, *distance),
            OperatorSpec::Pauli { terms } => {
                let mut op = PauliOperator::new(n_sites);
                for term in terms {
                    op.add_term(PauliString::parse(Complex64::new(term.coeff, term.coeff_im), &term.ops)?)?;
                }
                Ok(op)
            }
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SystemConfig {
    pub n_sites: usize,
    pub hamiltonian: OperatorSpec,
}

/// Complex RBM settings; a zero `init_scale` starts from the zero network.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub alpha: usize,
    pub init_scale: f64,
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self { alpha: 1, init_scale: 0.0, seed: 0 }
    }
}

impl ModelConfig {
    pub fn build(&self, n_sites: usize) -> TdvpResult<ComplexRbm> {
        if self.init_scale > 0.0 {
            ComplexRbm::with_random_weights(n_sites, self.alpha, self.init_scale, self.seed)
        } else {
            Ok(ComplexRbm::new(n_sites, self.alpha))
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SamplerConfig {
    Exact,
    Metropolis(MetropolisParams),
}

impl SamplerConfig {
    pub fn build(&self, n_sites: usize) -> TdvpResult<Sampler> {
        Ok(match self {
            SamplerConfig::Exact => ExactSampler::new(n_sites)?.into(),
            SamplerConfig::Metropolis(params) => MetropolisSampler::new(n_sites, *params).into(),
        })
    }
}

/// TDVP options; the solver must always be spelled out.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TdvpConfig {
    #[serde(default = "TdvpConfig::default_dynamics")]
    pub dynamics: Dynamics,
    #[serde(default)]
    pub make_real: MakeReal,
    pub solver: RegularizedSolver,
}

impl TdvpConfig {
    fn default_dynamics() -> Dynamics {
        Dynamics::RealTime
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegratorConfig {
    AdaptiveHeun(AdaptiveHeunParams),
    Fixed { scheme: FixedScheme, dt: f64 },
}

impl IntegratorConfig {
    pub fn build(&self) -> TdvpResult<Integrator> {
        match self {
            IntegratorConfig::AdaptiveHeun(params) => Integrator::adaptive(*params),
            IntegratorConfig::Fixed { scheme, dt } => Integrator::fixed(*scheme, *dt),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObservableConfig {
    pub name: String,
    pub operator: OperatorSpec,
}

/// Complete description of a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub system: SystemConfig,
    #[serde(default)]
    pub model: ModelConfig,
    pub sampler: SamplerConfig,
    #[serde(default = "SimulationConfig::default_n_samples")]
    pub n_samples: usize,
    pub tdvp: TdvpConfig,
    pub integrator: IntegratorConfig,
    /// Operator reported as the energy; the Hamiltonian when absent
    #[serde(default)]
    pub energy_operator: Option<OperatorSpec>,
    #[serde(default)]
    pub observables: Vec<ObservableConfig>,
    pub t_max: f64,
    /// YAML file receiving one document per step
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub verbose: bool,
}

impl SimulationConfig {
    fn default_n_samples() -> usize {
        1000
    }

    /// Assemble the driver described by this configuration.
    pub fn build(&self) -> TdvpResult<TimeEvolution<ComplexRbm>> {
        let n = self.system.n_sites;
        if n == 0 {
            return Err(TdvpError::Config("n_sites must be at least 1".to_string()));
        }
        TdvpError::check_positive("t_max", self.t_max)?;
        let mut evolution = TimeEvolution::new(
            self.model.build(n)?,
            self.sampler.build(n)?,
            self.system.hamiltonian.build(n)?,
            self.tdvp.solver.clone(),
            self.integrator.build()?,
        )?
        .with_n_samples(self.n_samples)
        .with_dynamics(self.tdvp.dynamics)
        .with_make_real(self.tdvp.make_real)
        .with_verbose(self.verbose);
        if let Some(spec) = &self.energy_operator {
            evolution = evolution.with_energy_operator(spec.build(n)?)?;
        }
        for obs in self.observables.iter() {
            evolution = evolution.with_observable(&obs.name, obs.operator.build(n)?)?;
        }
        Ok(evolution)
    }
}

/// Read a [`SimulationConfig`] from a YAML file.
pub fn read_config<P: AsRef<Path>>(filename: P) -> TdvpResult<SimulationConfig> {
    let file = File::open(filename)?;
    let reader = BufReader::new(file);
    let config: SimulationConfig = serde_yaml::from_reader(reader)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::MemoryRecorder;
    use crate::operator::LocalOperator;
    use crate::wavefunction::WaveFunctionModel;

    const RUN: &str = r#"
system:
  n_sites: 3
  hamiltonian: { kind: ising, j: 1.0, g: 0.5, h: 0.1 }
model: { alpha: 2, init_scale: 0.05, seed: 3 }
sampler: { kind: metropolis, n_chains: 4, seed: 11 }
n_samples: 200
tdvp:
  dynamics: imaginary_time
  solver:
    diag_shift: 1.0e-3
    method: { kind: cholesky }
integrator: { kind: fixed, scheme: heun, dt: 0.05 }
energy_operator: { kind: transverse_field }
observables:
  - name: x
    operator: { kind: x_polarization }
  - name: zz1
    operator: { kind: zz_correlation, distance: 1 }
  - name: custom
    operator:
      kind: pauli
      terms:
        - { coeff: 0.5, ops: "X0 X1" }
        - { coeff: -1.0, coeff_im: 0.0, ops: "Z2" }
t_max: 0.1
"#;

    #[test]
    fn test_parse_full_config() {
        let config: SimulationConfig = serde_yaml::from_str(RUN).unwrap();
        assert_eq!(config.system.n_sites, 3);
        assert_eq!(config.n_samples, 200);
        assert_eq!(config.tdvp.dynamics, Dynamics::ImaginaryTime);
        assert_eq!(config.tdvp.make_real, MakeReal::Real);
        assert_eq!(config.observables.len(), 3);
        match &config.sampler {
            SamplerConfig::Metropolis(p) => {
                assert_eq!(p.n_chains, 4);
                assert_eq!(p.n_thermalize, MetropolisParams::default().n_thermalize);
            }
            SamplerConfig::Exact => panic!("expected metropolis sampler"),
        }
        assert!(config.output.is_none());
        assert!(!config.verbose);
    }

    #[test]
    fn test_build_and_run() {
        let config: SimulationConfig = serde_yaml::from_str(RUN).unwrap();
        let mut evolution = config.build().unwrap();
        assert_eq!(evolution.model().num_params(), 2 * (3 + 6 + 18));
        let mut recorder = MemoryRecorder::default();
        assert_eq!(evolution.run(config.t_max, &mut recorder).unwrap(), 2);
        let last = recorder.records.last().unwrap();
        assert!(last.observables.contains_key("zz1"));
        assert!(last.energy.mean.re.is_finite());
    }

    #[test]
    fn test_operator_specs() {
        let ising = OperatorSpec::Ising { j: 1.0, g: 0.3, h: 0.0, periodic: false }.build(4).unwrap();
        // three bonds and four field terms
        assert_eq!(ising.n_terms(), 7);
        assert_eq!(OperatorSpec::XPolarization.build(4).unwrap().max_connections(), 4);
        assert!(OperatorSpec::ZzCorrelation { distance: 4 }.build(4).is_err());
        let bad = OperatorSpec::Pauli { terms: vec![TermSpec { coeff: 1.0, coeff_im: 0.0, ops: "X7".into() }] };
        assert!(bad.build(4).is_err());
    }

    #[test]
    fn test_adaptive_integrator_defaults() {
        let config: IntegratorConfig = serde_yaml::from_str("kind: adaptive_heun\ndt0: 1.0e-3\ntol: 1.0e-4\n").unwrap();
        match &config {
            IntegratorConfig::AdaptiveHeun(p) => {
                assert_eq!(p.max_retries, AdaptiveHeunParams::default().max_retries);
                assert_eq!(p.max_step, AdaptiveHeunParams::default().max_step);
            }
            IntegratorConfig::Fixed { .. } => panic!("expected adaptive integrator"),
        }
        assert!(config.build().is_ok());
    }

    #[test]
    fn test_solver_is_required() {
        let without_tdvp: String = RUN.lines()
            .filter(|l| !["tdvp:", "  dynamics:", "  solver:", "    diag_shift:", "    method:"]
                .iter().any(|p| l.starts_with(p)))
            .collect::<Vec<_>>()
            .join("\n");
        assert!(serde_yaml::from_str::<SimulationConfig>(&without_tdvp).is_err());

        let without_method = RUN.replace("    method: { kind: cholesky }\n", "");
        assert!(serde_yaml::from_str::<SimulationConfig>(&without_method).is_err());

        let tdvp: TdvpConfig = serde_yaml::from_str("solver: { method: { kind: cholesky } }").unwrap();
        assert_eq!(tdvp.dynamics, Dynamics::RealTime);
        assert_eq!(tdvp.make_real, MakeReal::Real);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(matches!(read_config("/nonexistent/run.yml"), Err(TdvpError::Io(_))));
    }
}
