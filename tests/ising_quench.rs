//! End-to-end runs of the TDVP driver on a small transverse-field Ising ring.

use approx::assert_abs_diff_eq;

use rust_tdvp::{
    ComplexRbm, Dynamics, ExactSampler, FixedScheme, Integrator, AdaptiveHeunParams,
    MemoryRecorder, MetropolisParams, MetropolisSampler, NullRecorder, PauliOperator,
    RegularizedSolver, Sampler, SolveMethod, TdvpError, TimeEvolution, WaveFunctionModel,
};

const N: usize = 4;
const J: f64 = 1.0;
const G: f64 = 0.3;
const H: f64 = 0.25;

fn hamiltonian() -> PauliOperator {
    PauliOperator::transverse_field_ising(N, J, G, H, true).unwrap()
}

fn pinv() -> RegularizedSolver {
    RegularizedSolver::new(SolveMethod::Pinv { rcond: 1e-8, smooth: false })
}

fn evolve(model: ComplexRbm, integrator: Integrator) -> TimeEvolution<ComplexRbm> {
    let sampler = Sampler::from(ExactSampler::new(N).unwrap());
    TimeEvolution::new(model, sampler, hamiltonian(), pinv(), integrator)
        .unwrap()
        .with_observable("x", PauliOperator::x_polarization(N).unwrap())
        .unwrap()
}

/// Zero network: exactly |+⟩, but hidden units receive no force.
fn quench(integrator: Integrator) -> TimeEvolution<ComplexRbm> {
    evolve(ComplexRbm::new(N, 1), integrator)
}

/// Weak random couplings near |+⟩ with every parameter block active.
fn quench_from_random(integrator: Integrator) -> TimeEvolution<ComplexRbm> {
    evolve(ComplexRbm::with_random_weights(N, 1, 0.1, 1).unwrap(), integrator)
}

// visible biases come first as (re, im) pairs
fn hidden_block(params: &[f64]) -> &[f64] {
    &params[2 * N..]
}

fn exact_ground_energy() -> f64 {
    hamiltonian().to_dense().unwrap().symmetric_eigen().eigenvalues.min()
}

/// Lowest energy of a translation-invariant product state, by scanning the
/// Bloch angle in the x-z plane.
fn product_state_energy() -> f64 {
    let n = N as f64;
    (0..=200_000)
        .map(|k| -std::f64::consts::PI + k as f64 * std::f64::consts::PI / 100_000.0)
        .map(|theta| {
            let (sin, cos) = theta.sin_cos();
            -J * n * cos * cos - G * n * sin - H * n * cos
        })
        .fold(f64::INFINITY, f64::min)
}

fn adaptive(dt0: f64, tol: f64) -> Integrator {
    Integrator::adaptive(AdaptiveHeunParams { dt0, tol, ..Default::default() }).unwrap()
}

#[test]
fn test_quench_conserves_energy_and_moves_polarization() {
    let mut evolution = quench(adaptive(1e-3, 1e-4));
    let mut recorder = MemoryRecorder::default();
    evolution.run(0.1, &mut recorder).unwrap();

    let records = &recorder.records;
    let first = &records[0];
    let last = records.last().unwrap();
    assert_eq!(evolution.t(), 0.1);
    assert_eq!(last.t, 0.1);

    // |+⟩ has ⟨H⟩ = -g·N and ⟨X⟩ = 1
    assert_abs_diff_eq!(first.energy.mean.re, -G * N as f64, epsilon = 1e-12);
    assert_abs_diff_eq!(first.observables["x"].mean.re, 1.0, epsilon = 1e-12);

    let drift = (last.energy.mean.re - first.energy.mean.re).abs() / first.energy.mean.re.abs();
    assert!(drift <= 1e-3, "relative energy drift {}", drift);
    let x_final = last.observables["x"].mean.re;
    assert!(x_final < 1.0 - 5e-4, "x polarization stayed at {}", x_final);

    for pair in records.windows(2) {
        assert!(pair[1].t > pair[0].t);
        assert!(pair[1].tdvp_error.is_some());
        assert!(pair[1].residual.unwrap() >= 0.0);
    }
}

#[test]
fn test_quench_from_random_weights_moves_hidden_units() {
    let mut evolution = quench_from_random(adaptive(1e-3, 1e-4));
    evolution.run(0.1, &mut NullRecorder).unwrap();

    let trajectory = evolution.trajectory();
    let first = &trajectory[0];
    let last = trajectory.last().unwrap();
    assert_eq!(last.t, 0.1);

    let drift = (last.energy.mean.re - first.energy.mean.re).abs() / first.energy.mean.re.abs();
    assert!(drift <= 1e-3, "relative energy drift {}", drift);

    let x_initial = first.observables["x"].mean.re;
    let x_final = last.observables["x"].mean.re;
    assert!(x_final < x_initial - 5e-3, "x polarization went from {} to {}", x_initial, x_final);

    let hidden_change: f64 = hidden_block(&first.params).iter()
        .zip(hidden_block(&last.params))
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        .sqrt();
    assert!(hidden_change > 0.05, "hidden parameters moved by {}", hidden_change);
}

#[test]
fn test_imaginary_time_from_zero_network_reaches_product_state() {
    let e_exact = exact_ground_energy();
    let e_product = product_state_energy();
    assert!(e_product > e_exact + 2e-4);

    let mut evolution = quench(adaptive(1e-2, 1e-3)).with_dynamics(Dynamics::ImaginaryTime);
    evolution.run(2.0, &mut NullRecorder).unwrap();

    let energies: Vec<f64> = evolution.trajectory().iter().map(|r| r.energy.mean.re).collect();
    let e_final = *energies.last().unwrap();
    assert!(e_final >= e_exact - 1e-6, "{} below the exact ground state {}", e_final, e_exact);
    assert!(e_final <= e_product + 1e-4, "final energy {} above the product optimum {}", e_final, e_product);
    for pair in energies.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-6, "energy rose from {} to {}", pair[0], pair[1]);
    }
}

#[test]
fn test_imaginary_time_from_random_weights_beats_product_state() {
    let e_exact = exact_ground_energy();
    let e_product = product_state_energy();

    let mut evolution = quench_from_random(adaptive(1e-2, 1e-3)).with_dynamics(Dynamics::ImaginaryTime);
    evolution.run(5.0, &mut NullRecorder).unwrap();

    let trajectory = evolution.trajectory();
    let e_final = trajectory.last().unwrap().energy.mean.re;
    assert!(e_final >= e_exact - 1e-6, "{} below the exact ground state {}", e_final, e_exact);
    assert!(e_final < e_product - 1e-4, "final energy {} not below the product optimum {}", e_final, e_product);
    assert!(hidden_block(&trajectory.last().unwrap().params).iter().any(|p| p.abs() > 1e-2));
}

#[test]
fn test_fixed_step_run_ends_on_t_max() {
    let mut evolution = quench(Integrator::fixed(FixedScheme::Euler, 0.03).unwrap());
    let taken = evolution.run(0.1, &mut NullRecorder).unwrap();
    assert_eq!(taken, 4);
    assert_eq!(evolution.t(), 0.1);
    let trajectory = evolution.trajectory();
    assert_eq!(trajectory.len(), 5);
    assert_abs_diff_eq!(trajectory[4].dt, 0.01, epsilon = 1e-12);
}

#[test]
fn test_integrator_failure_keeps_progress() {
    let params = AdaptiveHeunParams { dt0: 1e-3, tol: 1e-15, min_step: 5e-4, ..Default::default() };
    let mut evolution = quench(Integrator::adaptive(params).unwrap());
    let initial = evolution.model().get_params();
    let mut recorder = MemoryRecorder::default();
    let result = evolution.run(0.1, &mut recorder);
    assert!(matches!(result, Err(TdvpError::StepSizeUnderflow { .. })));
    assert_eq!(evolution.trajectory().len(), 1);
    assert_eq!(recorder.records.len(), 1);
    assert_eq!(evolution.t(), 0.0);
    assert_eq!(evolution.model().get_params(), initial);
}

#[test]
fn test_metropolis_run_tracks_exact_energy() {
    let params = MetropolisParams { n_chains: 8, n_thermalize: 10, sweep_size: 0, seed: 7 };
    let sampler = Sampler::from(MetropolisSampler::new(N, params));
    let mut evolution = TimeEvolution::new(
        ComplexRbm::new(N, 1),
        sampler,
        hamiltonian(),
        pinv().with_diag_shift(1e-4),
        Integrator::fixed(FixedScheme::Heun, 0.02).unwrap(),
    )
    .unwrap()
    .with_n_samples(2000);

    evolution.run(0.04, &mut NullRecorder).unwrap();
    let trajectory = evolution.trajectory();
    assert_eq!(trajectory.len(), 3);
    // statistical error of the initial estimate is about 0.05
    assert_abs_diff_eq!(trajectory[0].energy.mean.re, -G * N as f64, epsilon = 0.25);
    assert!(trajectory.iter().all(|r| r.energy.mean.re.is_finite()));
    assert!(trajectory.iter().all(|r| r.acceptance > 0.5));
}
