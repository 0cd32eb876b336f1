//! Fixed-step schemes and the integrator selection used by the driver.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{TdvpError, TdvpResult};
use super::heun::{AdaptiveHeun, AdaptiveHeunParams};
use super::traits::{StepOutcome, VelocityField};

/// Explicit single-step schemes with a constant step size.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedScheme {
    /// θ + dt·v(t, θ)
    Euler,
    /// Explicit trapezoid: θ + dt/2·(k₀ + v(t + dt, θ + dt·k₀))
    Heun,
}

impl FixedScheme {
    pub fn advance<F: VelocityField + ?Sized>(
        &self,
        t: f64,
        dt: f64,
        field: &mut F,
        params: &DVector<f64>,
    ) -> TdvpResult<DVector<f64>> {
        let k0 = field.velocity(t, params)?;
        match self {
            FixedScheme::Euler => Ok(params + k0 * dt),
            FixedScheme::Heun => {
                let k1 = field.velocity(t + dt, &(params + &k0 * dt))?;
                Ok(params + (k0 + k1) * (0.5 * dt))
            }
        }
    }
}

/// Time stepper for the parameter ODE.
#[derive(Clone, Debug)]
pub enum Integrator {
    Fixed { scheme: FixedScheme, dt: f64 },
    Adaptive(AdaptiveHeun),
}

impl Integrator {
    pub fn fixed(scheme: FixedScheme, dt: f64) -> TdvpResult<Self> {
        TdvpError::check_positive("dt", dt)?;
        Ok(Integrator::Fixed { scheme, dt })
    }

    pub fn adaptive(params: AdaptiveHeunParams) -> TdvpResult<Self> {
        Ok(Integrator::Adaptive(AdaptiveHeun::new(params)?))
    }

    /// Size the next step will attempt before clipping.
    pub fn suggested_dt(&self) -> f64 {
        match self {
            Integrator::Fixed { dt, .. } => *dt,
            Integrator::Adaptive(heun) => heun.suggested_dt(),
        }
    }

    /// Advance `params` from `t` by one step no longer than `max_dt`.
    pub fn step<F: VelocityField + ?Sized>(
        &mut self,
        t: f64,
        field: &mut F,
        params: &DVector<f64>,
        max_dt: f64,
    ) -> TdvpResult<StepOutcome> {
        match self {
            Integrator::Fixed { scheme, dt } => {
                TdvpError::check_positive("max_dt", max_dt)?;
                let h = dt.min(max_dt);
                let params = scheme.advance(t, h, field, params)?;
                Ok(StepOutcome { params, dt: h, next_dt: *dt, error: 0.0, rejections: 0 })
            }
            Integrator::Adaptive(heun) => heun.step(t, field, params, max_dt),
        }
    }
}

impl From<AdaptiveHeun> for Integrator {
    fn from(heun: AdaptiveHeun) -> Self {
        Integrator::Adaptive(heun)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::integrator::FnField;

    fn decay() -> FnField<impl FnMut(f64, &DVector<f64>) -> DVector<f64>> {
        FnField(|_t: f64, p: &DVector<f64>| -p)
    }

    #[test]
    fn test_euler_and_heun_single_step() {
        let p = DVector::from_element(1, 1.0);
        let euler = FixedScheme::Euler.advance(0.0, 0.1, &mut decay(), &p).unwrap();
        assert_abs_diff_eq!(euler[0], 0.9, epsilon = 1e-15);
        // 1 - h + h²/2
        let heun = FixedScheme::Heun.advance(0.0, 0.1, &mut decay(), &p).unwrap();
        assert_abs_diff_eq!(heun[0], 0.905, epsilon = 1e-15);
    }

    #[test]
    fn test_heun_is_second_order() {
        let run = |dt: f64| {
            let mut int = Integrator::fixed(FixedScheme::Heun, dt).unwrap();
            let mut field = decay();
            let (mut t, mut p) = (0.0, DVector::from_element(1, 1.0));
            while 1.0 - t > 1e-12 {
                let out = int.step(t, &mut field, &p, 1.0 - t).unwrap();
                t += out.dt;
                p = out.params;
            }
            (p[0] - (-1.0_f64).exp()).abs()
        };
        let ratio = run(0.02) / run(0.01);
        assert!(ratio > 3.5 && ratio < 4.5, "ratio {}", ratio);
    }

    #[test]
    fn test_fixed_step_is_clipped() {
        let mut int = Integrator::fixed(FixedScheme::Euler, 0.03).unwrap();
        let out = int.step(0.09, &mut decay(), &DVector::from_element(1, 1.0), 0.01).unwrap();
        assert_abs_diff_eq!(out.dt, 0.01, epsilon = 1e-15);
        assert_abs_diff_eq!(out.next_dt, 0.03, epsilon = 1e-15);
        assert_abs_diff_eq!(int.suggested_dt(), 0.03, epsilon = 1e-15);
    }

    #[test]
    fn test_non_positive_step_rejected() {
        assert!(Integrator::fixed(FixedScheme::Euler, 0.0).is_err());
        assert!(Integrator::fixed(FixedScheme::Heun, f64::NAN).is_err());
    }
}
