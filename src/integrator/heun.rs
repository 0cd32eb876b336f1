//! Adaptive second-order (Heun) integration by step doubling.
//!
//! Each attempt advances the parameters once with a full Heun step of size
//! `dt` and once with two Heun steps of size `dt / 2`, reusing the velocity at
//! the starting point: five field evaluations per attempt, four after the
//! first. The norm of the difference between the two updates, measured with
//! the field's own norm, is the error estimate. The more accurate two-step
//! update is kept on acceptance.
//!
//! The step size is rescaled by
//!
//!   factor = clamp(0.9 · (tol / err)^(1/3), 0.2, 2.0)
//!
//! after every attempt. A rejected attempt leaves the starting point
//! untouched and is retried with the smaller step.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{TdvpError, TdvpResult};
use super::traits::{StepOutcome, VelocityField};

const SAFETY: f64 = 0.9;
const SHRINK_MIN: f64 = 0.2;
const GROWTH_MAX: f64 = 2.0;

/// Step-size multiplier for an attempt with error estimate `error`.
///
/// Errors at or below `tol` never shrink the step beyond the safety margin;
/// a vanishing error grows it by the full cap. Non-finite errors shrink it by
/// the full cap.
pub fn step_factor(error: f64, tol: f64) -> f64 {
    if !error.is_finite() {
        return SHRINK_MIN;
    }
    if error <= 0.0 {
        return GROWTH_MAX;
    }
    (SAFETY * (tol / error).cbrt()).clamp(SHRINK_MIN, GROWTH_MAX)
}

/// Settings of the adaptive Heun integrator.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct AdaptiveHeunParams {
    /// Initial step size
    pub dt0: f64,
    /// Error tolerance per step
    pub tol: f64,
    /// Largest step ever proposed
    #[serde(default = "AdaptiveHeunParams::default_max_step")]
    pub max_step: f64,
    /// Smallest step before giving up
    #[serde(default = "AdaptiveHeunParams::default_min_step")]
    pub min_step: f64,
    /// Consecutive rejections before giving up
    #[serde(default = "AdaptiveHeunParams::default_max_retries")]
    pub max_retries: usize,
}

impl AdaptiveHeunParams {
    fn default_max_step() -> f64 {
        0.1
    }

    fn default_min_step() -> f64 {
        1e-12
    }

    fn default_max_retries() -> usize {
        50
    }
}

impl Default for AdaptiveHeunParams {
    fn default() -> Self {
        Self {
            dt0: 1e-3,
            tol: 1e-4,
            max_step: Self::default_max_step(),
            min_step: Self::default_min_step(),
            max_retries: Self::default_max_retries(),
        }
    }
}

/// Adaptive Heun integrator carrying the suggested size of the next step.
#[derive(Clone, Debug)]
pub struct AdaptiveHeun {
    params: AdaptiveHeunParams,
    dt: f64,
}

impl AdaptiveHeun {
    pub fn new(params: AdaptiveHeunParams) -> TdvpResult<Self> {
        TdvpError::check_positive("dt0", params.dt0)?;
        TdvpError::check_positive("tol", params.tol)?;
        TdvpError::check_positive("max_step", params.max_step)?;
        if !(params.min_step >= 0.0 && params.min_step < params.max_step) {
            return Err(TdvpError::Config(format!(
                "min_step must lie in [0, max_step); got {}", params.min_step
            )));
        }
        Ok(Self { dt: params.dt0.min(params.max_step), params })
    }

    /// Size the next call will attempt first.
    pub fn suggested_dt(&self) -> f64 {
        self.dt
    }

    /// Advance `params` from `t` by one accepted step no longer than
    /// `max_dt`.
    ///
    /// Clipping to `max_dt` affects only this step; the carried suggestion is
    /// not reduced by it.
    pub fn step<F: VelocityField + ?Sized>(
        &mut self,
        t: f64,
        field: &mut F,
        params: &DVector<f64>,
        max_dt: f64,
    ) -> TdvpResult<StepOutcome> {
        TdvpError::check_positive("max_dt", max_dt)?;
        let clipped = self.dt > max_dt;
        let mut dt = self.dt.min(max_dt);
        let k0 = field.velocity(t, params)?;
        let mut error = f64::NAN;

        for attempt in 0..=self.params.max_retries {
            // one full step
            let k_full = field.velocity(t + dt, &(params + &k0 * dt))?;
            let dy_full = (&k0 + &k_full) * (0.5 * dt);

            // two half steps
            let k1 = field.velocity(t + 0.5 * dt, &(params + &k0 * (0.5 * dt)))?;
            let mut dy_half = (&k0 + &k1) * (0.25 * dt);
            let y1 = params + &dy_half;
            let k2 = field.velocity(t + 0.5 * dt, &y1)?;
            let k3 = field.velocity(t + dt, &(&y1 + &k2 * (0.5 * dt)))?;
            dy_half += (&k2 + &k3) * (0.25 * dt);

            error = field.norm(&(&dy_half - &dy_full));
            let factor = step_factor(error, self.params.tol);

            if error.is_finite() && error <= self.params.tol {
                let grown = (dt * factor).min(self.params.max_step);
                let next_dt = if clipped { grown.max(self.dt) } else { grown };
                self.dt = next_dt;
                return Ok(StepOutcome {
                    params: params + dy_half,
                    dt,
                    next_dt,
                    error,
                    rejections: attempt,
                });
            }

            dt *= factor;
            if dt < self.params.min_step {
                return Err(TdvpError::StepSizeUnderflow {
                    t,
                    dt,
                    min_step: self.params.min_step,
                });
            }
            self.dt = dt;
        }
        Err(TdvpError::RetryLimit { t, retries: self.params.max_retries, error })
    }
}
