//! Time-evolution driver.
//!
//! Each step hands a fresh [`TdvpRhs`] to the integrator, loads the accepted
//! parameters into the model, measures energy and observables on a new batch
//! and passes the resulting [`StepRecord`] to the recorder. The driver owns
//! the only authoritative copy of the parameters; rejected integrator
//! attempts never touch it.

use std::collections::BTreeMap;

use crate::error::{TdvpError, TdvpResult};
use crate::integrator::Integrator;
use crate::operator::{local_values, LocalOperator, LocalStats};
use crate::sampling::Sampler;
use crate::tdvp::{Dynamics, MakeReal, RegularizedSolver, TdvpRhs};
use crate::wavefunction::WaveFunctionModel;
use super::record::{Recorder, StepRecord};

/// Relative slack below which the remaining time counts as zero.
const TIME_EPS: f64 = 1e-12;

/// TDVP time evolution of a variational state.
pub struct TimeEvolution<M: WaveFunctionModel> {
    model: M,
    sampler: Sampler,
    hamiltonian: Box<dyn LocalOperator>,
    energy_operator: Option<Box<dyn LocalOperator>>,
    observables: Vec<(String, Box<dyn LocalOperator>)>,
    solver: RegularizedSolver,
    integrator: Integrator,
    n_samples: usize,
    dynamics: Dynamics,
    make_real: MakeReal,
    verbose: bool,
    t: f64,
    step: usize,
    trajectory: Vec<StepRecord>,
}

impl<M: WaveFunctionModel> TimeEvolution<M> {
    /// Driver for `hamiltonian` starting from the current parameters of
    /// `model`, with an explicit regularization policy for the TDVP solve.
    pub fn new<H>(
        model: M,
        sampler: Sampler,
        hamiltonian: H,
        solver: RegularizedSolver,
        integrator: Integrator,
    ) -> TdvpResult<Self>
    where H: LocalOperator + 'static
    {
        TdvpError::check_sites(model.n_sites(), sampler.n_sites())?;
        TdvpError::check_sites(model.n_sites(), hamiltonian.n_sites())?;
        Ok(Self {
            model,
            sampler,
            hamiltonian: Box::new(hamiltonian),
            energy_operator: None,
            observables: Vec::new(),
            solver,
            integrator,
            n_samples: 1000,
            dynamics: Dynamics::RealTime,
            make_real: MakeReal::Real,
            verbose: false,
            t: 0.0,
            step: 0,
            trajectory: Vec::new(),
        })
    }

    /// Report a different operator as the energy; the Hamiltonian still
    /// drives the evolution.
    pub fn with_energy_operator<O: LocalOperator + 'static>(mut self, op: O) -> TdvpResult<Self> {
        TdvpError::check_sites(self.model.n_sites(), op.n_sites())?;
        self.energy_operator = Some(Box::new(op));
        Ok(self)
    }

    pub fn with_observable<O: LocalOperator + 'static>(mut self, name: &str, op: O) -> TdvpResult<Self> {
        TdvpError::check_sites(self.model.n_sites(), op.n_sites())?;
        self.observables.push((name.to_string(), Box::new(op)));
        Ok(self)
    }

    /// Set number of samples per estimate; ignored by the exact sampler.
    pub fn with_n_samples(mut self, n: usize) -> Self {
        self.n_samples = n;
        self
    }

    pub fn with_dynamics(mut self, dynamics: Dynamics) -> Self {
        self.dynamics = dynamics;
        self
    }

    pub fn with_make_real(mut self, make_real: MakeReal) -> Self {
        self.make_real = make_real;
        self
    }

    pub fn with_verbose(mut self, v: bool) -> Self {
        self.verbose = v;
        self
    }

    pub fn t(&self) -> f64 {
        self.t
    }

    /// Accepted steps so far.
    pub fn steps(&self) -> usize {
        self.step
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Records handed out so far, starting with the initial state.
    pub fn trajectory(&self) -> &[StepRecord] {
        &self.trajectory
    }

    /// Sample the current state and evaluate energy and observables.
    fn measure(&mut self, dt: f64) -> TdvpResult<StepRecord> {
        let batch = self.sampler.sample(&self.model, self.n_samples);
        let energy_op = self.energy_operator.as_deref().unwrap_or(self.hamiltonian.as_ref());
        let e_loc = local_values(energy_op, &self.model, &batch)?;
        let energy = LocalStats::from_batch(&batch, &e_loc);
        let mut observables = BTreeMap::new();
        for (name, op) in self.observables.iter() {
            let values = local_values(op.as_ref(), &self.model, &batch)?;
            observables.insert(name.clone(), LocalStats::from_batch(&batch, &values));
        }
        Ok(StepRecord {
            step: self.step,
            t: self.t,
            dt,
            energy,
            observables,
            tdvp_error: None,
            residual: None,
            rejections: 0,
            acceptance: batch.acceptance,
            params: self.model.get_params().iter().copied().collect(),
        })
    }

    fn push(&mut self, record: StepRecord, recorder: &mut dyn Recorder) -> TdvpResult<()> {
        recorder.record(&record)?;
        if self.verbose {
            let observables: Vec<String> = record.observables.iter()
                .map(|(name, s)| format!("{} = {:.5}", name, s.mean.re))
                .collect();
            println!("  Step {:4}: t = {:9.5}, dt = {:.2e}, E = {:10.5} ± {:.4}, r² = {:.2e}, res = {:.2e}, rej = {}, {}",
                record.step, record.t, record.dt, record.energy.mean.re, record.energy.error,
                record.tdvp_error.unwrap_or(0.0), record.residual.unwrap_or(0.0),
                record.rejections, observables.join(", "));
        }
        self.trajectory.push(record);
        Ok(())
    }

    /// Evolve up to `t_max`, returning the number of steps taken.
    ///
    /// The initial state is recorded on the first call. The last step is
    /// clipped so the run ends exactly at `t_max`. On an integrator failure
    /// the error is returned and everything recorded so far is kept.
    pub fn run(&mut self, t_max: f64, recorder: &mut dyn Recorder) -> TdvpResult<usize> {
        if !t_max.is_finite() {
            return Err(TdvpError::Config(format!("t_max must be finite; got {}", t_max)));
        }
        if self.verbose {
            println!("TDVP Time Evolution");
            println!("===================");
            println!("  Sites:           {}", self.model.n_sites());
            println!("  Parameters:      {}", self.model.num_params());
            if self.sampler.is_exact() {
                println!("  Samples/step:    exact enumeration");
            } else {
                println!("  Samples/step:    {}", self.n_samples);
            }
            println!("  Dynamics:        {:?} ({:?} part)", self.dynamics, self.make_real);
            println!("  Solver:          {:?}", self.solver);
            println!("  Integrator:      {:?}", self.integrator);
            println!("  t:               {:.4} -> {:.4}", self.t, t_max);
            println!();
        }

        if self.trajectory.is_empty() {
            let record = self.measure(0.0)?;
            self.push(record, recorder)?;
        }

        let eps = TIME_EPS * t_max.abs().max(1.0);
        let mut taken = 0;
        while t_max - self.t > eps {
            let remaining = t_max - self.t;
            let params = self.model.get_params();
            let (outcome, diagnostics) = {
                let mut rhs = TdvpRhs::new(
                    self.model.clone(),
                    &mut self.sampler,
                    self.hamiltonian.as_ref(),
                    &self.solver,
                    self.n_samples,
                )
                .with_dynamics(self.dynamics)
                .with_make_real(self.make_real);
                let outcome = self.integrator.step(self.t, &mut rhs, &params, remaining);
                (outcome, rhs.take_diagnostics())
            };
            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(e) => {
                    if self.verbose {
                        println!("\n  Integration stopped at t = {:.6}: {}", self.t, e);
                    }
                    recorder.flush()?;
                    return Err(e);
                }
            };

            self.model.set_params(&outcome.params)?;
            self.t = if remaining - outcome.dt <= eps { t_max } else { self.t + outcome.dt };
            self.step += 1;
            taken += 1;

            let mut record = self.measure(outcome.dt)?;
            // diagnostics of the solve at the start of the step
            if let Some(first) = diagnostics.first() {
                record.tdvp_error = Some(first.tdvp_error);
                record.residual = Some(first.residual);
            }
            record.rejections = outcome.rejections;
            self.push(record, recorder)?;
        }
        recorder.flush()?;

        if self.verbose {
            if let (Some(first), Some(last)) = (self.trajectory.first(), self.trajectory.last()) {
                println!("\nFinal results:");
                println!("  Steps:        {}", self.step);
                println!("  Time:         {:.6}", self.t);
                println!("  Energy:       {:10.5} ± {:.4}", last.energy.mean.re, last.energy.error);
                println!("  Energy drift: {:.3e}", last.energy.mean.re - first.energy.mean.re);
            }
        }
        Ok(taken)
    }
}
