//! Traits for operators acting on spin configurations.

use num_complex::Complex64;
use crate::hilbert::SpinConfig;

/// An operator given row by row in the computational basis.
///
/// For a configuration `s` an implementation enumerates every `s'` with
/// ⟨s|O|s'⟩ ≠ 0 together with that matrix element. The number of entries per
/// row never exceeds [`LocalOperator::max_connections`].
pub trait LocalOperator: Sync {
    /// Number of lattice sites the operator acts on.
    fn n_sites(&self) -> usize;

    /// Upper bound on the number of connected configurations per row.
    fn max_connections(&self) -> usize;

    /// Connected configurations `s'` and matrix elements ⟨s|O|s'⟩.
    fn connected_elements(&self, config: &SpinConfig) -> (Vec<SpinConfig>, Vec<Complex64>);
}
