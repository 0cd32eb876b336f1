//! TDVP module - geometric tensor estimation, regularized solves and the
//! resulting parameter velocity field.

mod estimator;
mod solver;
mod rhs;

pub use estimator::{Dynamics, MakeReal, TdvpEquation, TdvpSolution};
pub use solver::{LinearSolution, RegularizedSolver, SolveMethod};
pub use rhs::{TdvpDiagnostics, TdvpRhs};
