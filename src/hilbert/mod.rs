//! Hilbert module - spin-1/2 basis configurations.

mod spin;

pub use spin::{SpinConfig, all_configs, MAX_EXACT_SITES};
