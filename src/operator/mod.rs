//! Operator module - branch-free operators on spin configurations.

mod traits;
mod pauli;
mod local;

pub use traits::LocalOperator;
pub use pauli::{Pauli, PauliString, PauliOperator};
pub use local::{local_values, LocalStats};
