//! Computational-basis configurations of a chain of spin-1/2 sites.
//!
//! A configuration stores one σᶻ eigenvalue (+1 or -1) per site. Site `i`
//! maps to bit `i` of the basis index, with a set bit meaning spin down.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{TdvpError, TdvpResult};

/// Largest chain that may be enumerated exhaustively.
pub const MAX_EXACT_SITES: usize = 24;

/// One basis state of an `n`-site spin chain.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpinConfig {
    spins: Vec<i8>,
}

impl SpinConfig {
    /// Build a configuration from explicit ±1 values.
    pub fn new(spins: Vec<i8>) -> TdvpResult<Self> {
        if let Some(bad) = spins.iter().find(|&&s| s != 1 && s != -1) {
            return Err(TdvpError::Config(format!("spin values must be +1 or -1; got {}", bad)));
        }
        Ok(Self { spins })
    }

    /// All spins up.
    pub fn all_up(n_sites: usize) -> Self {
        Self { spins: vec![1; n_sites] }
    }

    /// Decode basis index `index` into a configuration of `n_sites` spins.
    pub fn from_index(index: usize, n_sites: usize) -> Self {
        let spins = (0..n_sites)
            .map(|i| if (index >> i) & 1 == 0 { 1 } else { -1 })
            .collect();
        Self { spins }
    }

    /// Uniformly random configuration.
    pub fn random<R: Rng + ?Sized>(n_sites: usize, rng: &mut R) -> Self {
        let spins = (0..n_sites)
            .map(|_| if rng.gen::<bool>() { 1 } else { -1 })
            .collect();
        Self { spins }
    }

    /// Basis index of this configuration; inverse of [`SpinConfig::from_index`].
    pub fn to_index(&self) -> usize {
        self.spins.iter().enumerate()
            .filter(|(_, &s)| s < 0)
            .fold(0, |acc, (i, _)| acc | (1 << i))
    }

    pub fn len(&self) -> usize {
        self.spins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spins.is_empty()
    }

    /// σᶻ eigenvalue at `site`.
    #[inline]
    pub fn spin(&self, site: usize) -> i8 {
        self.spins[site]
    }

    pub fn spins(&self) -> &[i8] {
        &self.spins
    }

    /// Copy with the spins at `sites` flipped. A site listed twice is flipped
    /// back.
    pub fn flipped(&self, sites: &[usize]) -> Self {
        let mut spins = self.spins.clone();
        for &i in sites {
            spins[i] = -spins[i];
        }
        Self { spins }
    }
}

/// Every basis configuration of `n_sites` spins, ordered by basis index.
pub fn all_configs(n_sites: usize) -> TdvpResult<Vec<SpinConfig>> {
    if n_sites > MAX_EXACT_SITES {
        return Err(TdvpError::HilbertTooLarge(n_sites));
    }
    Ok((0..1_usize << n_sites)
        .map(|k| SpinConfig::from_index(k, n_sites))
        .collect())
}
