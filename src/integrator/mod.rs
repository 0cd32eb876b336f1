//! Integrator module - time stepping of the parameter vector.

mod traits;
mod heun;
mod fixed;

pub use traits::{VelocityField, FnField, StepOutcome};
pub use heun::{AdaptiveHeun, AdaptiveHeunParams, step_factor};
pub use fixed::{FixedScheme, Integrator};
