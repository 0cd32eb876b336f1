//! Traits for velocity fields driving the parameter ODE.

use nalgebra::DVector;

use crate::error::TdvpResult;

/// Right-hand side dθ/dt = v(t, θ) of the parameter equation of motion.
///
/// Implementations backed by Monte Carlo sampling are stochastic: two calls
/// with identical `(t, params)` may return different velocities. Each call is
/// still a function of its arguments only; no parameter state is shared with
/// the caller.
pub trait VelocityField {
    /// Velocity at time `t` for parameters `params`.
    fn velocity(&mut self, t: f64, params: &DVector<f64>) -> TdvpResult<DVector<f64>>;

    /// Norm used to judge integration errors; Euclidean unless the field
    /// carries its own metric.
    fn norm(&self, v: &DVector<f64>) -> f64 {
        v.norm()
    }
}

/// Velocity field backed by a closure.
pub struct FnField<F>(pub F);

impl<F> VelocityField for FnField<F>
where F: FnMut(f64, &DVector<f64>) -> DVector<f64>
{
    fn velocity(&mut self, t: f64, params: &DVector<f64>) -> TdvpResult<DVector<f64>> {
        Ok((self.0)(t, params))
    }
}

/// Result of one accepted step.
#[derive(Clone, Debug)]
pub struct StepOutcome {
    /// Parameters at `t + dt`
    pub params: DVector<f64>,
    /// Size of the accepted step
    pub dt: f64,
    /// Suggested size of the following step
    pub next_dt: f64,
    /// Error estimate of the accepted step; zero for fixed-step schemes
    pub error: f64,
    /// Rejected attempts before acceptance
    pub rejections: usize,
}
